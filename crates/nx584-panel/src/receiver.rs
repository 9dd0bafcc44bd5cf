use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nx584_frame::message_type::{checksum_quirk, type_name};
use nx584_frame::{hex, DecodedFrame, FrameError, FrameReader, FrameStatus, Message};

use crate::commands;
use crate::error::Result;
use crate::gate::HandshakeGate;
use crate::listener::ListenerRegistry;
use crate::queue::TransferQueue;
use crate::stats::Counters;

/// Inbound worker.
///
/// For each frame: queue an acknowledgment at the head of the transfer
/// queue if the panel asked for one, open the handshake gate, and hand
/// frames that passed verification to the listeners. The acknowledgment is
/// always positive, even for frames that failed verification.
pub struct Receiver<R> {
    reader: FrameReader<R>,
    queue: Arc<TransferQueue<Message>>,
    gate: Arc<HandshakeGate>,
    listeners: Arc<ListenerRegistry>,
    counters: Arc<Counters>,
    cancel: Arc<AtomicBool>,
    enqueue_timeout: Option<Duration>,
}

impl<R: Read> Receiver<R> {
    pub fn new(
        stream: R,
        queue: Arc<TransferQueue<Message>>,
        gate: Arc<HandshakeGate>,
        listeners: Arc<ListenerRegistry>,
        counters: Arc<Counters>,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            reader: FrameReader::new(stream),
            queue,
            gate,
            listeners,
            counters,
            cancel,
            enqueue_timeout: None,
        }
    }

    /// Bound the wait for queue space when queueing acknowledgments.
    pub fn with_enqueue_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.enqueue_timeout = timeout;
        self
    }

    /// Run until cancelled (`Ok`) or the stream closes or fails (`Err`).
    pub fn run(mut self) -> Result<()> {
        tracing::info!("receiver started");
        let result = self.run_loop();
        match &result {
            Ok(()) => tracing::info!("receiver shutdown"),
            Err(err) => tracing::error!(error = %err, "receiver terminated"),
        }
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            if self.cancelled() {
                return Ok(());
            }
            let frame = match self.reader.read_frame() {
                Ok(frame) => frame,
                Err(err) if err.is_timeout() => continue,
                Err(_) if self.cancelled() => return Ok(()),
                Err(err @ FrameError::ConnectionClosed) => {
                    if self.reader.buffered_len() > 0 {
                        tracing::warn!(
                            buffered = self.reader.buffered_len(),
                            "stream closed mid-frame"
                        );
                    }
                    return Err(err.into());
                }
                Err(err) => return Err(err.into()),
            };
            self.handle_frame(frame);
        }
    }

    /// Process one decoded frame.
    pub fn handle_frame(&self, frame: DecodedFrame) {
        self.counters.frame_received();
        let DecodedFrame { message, status } = frame;

        if message.ack_required() {
            self.queue_ack();
        }

        self.gate.set(true);

        let Some(type_code) = message.type_code() else {
            tracing::debug!("empty frame from panel; nothing to dispatch");
            return;
        };

        match status {
            FrameStatus::Valid => {
                tracing::debug!(
                    type_code,
                    kind = type_name(type_code),
                    len = message.len(),
                    "frame received"
                );
                let faults = self.listeners.dispatch(type_code, &message);
                self.counters.listener_faults(faults);
            }
            FrameStatus::ChecksumMismatch { expected, received } => {
                self.counters.checksum_failure();
                if checksum_quirk(type_code) {
                    tracing::debug!(
                        type_code,
                        expected = %hex(&expected),
                        received = %hex(&received),
                        "checksum mismatch on zone snapshot; discarding"
                    );
                } else {
                    tracing::warn!(
                        type_code,
                        expected = %hex(&expected),
                        received = %hex(&received),
                        frame = %hex(message.as_bytes()),
                        "checksum mismatch; discarding frame"
                    );
                }
            }
            FrameStatus::InvalidEscape { byte } => {
                self.counters.checksum_failure();
                tracing::warn!(
                    type_code,
                    byte,
                    frame = %hex(message.as_bytes()),
                    "invalid escape sequence; discarding frame"
                );
            }
        }
    }

    fn queue_ack(&self) {
        let ack = commands::ack();
        let queued = match self.enqueue_timeout {
            Some(timeout) => self.queue.prepend_timeout(ack, timeout),
            None => self.queue.prepend(ack),
        };
        match queued {
            Ok(()) => self.counters.ack_queued(),
            Err(err) => tracing::warn!(error = %err, "acknowledgment not queued"),
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use bytes::BytesMut;
    use nx584_frame::encode_frame;

    use super::*;
    use crate::error::PanelError;
    use crate::listener::PanelListener;

    type Seen = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

    struct Fixture {
        queue: Arc<TransferQueue<Message>>,
        gate: Arc<HandshakeGate>,
        listeners: Arc<ListenerRegistry>,
        counters: Arc<Counters>,
        seen: Seen,
    }

    impl Fixture {
        fn new() -> Self {
            let listeners = Arc::new(ListenerRegistry::new());
            let seen: Seen = Arc::default();
            let sink = Arc::clone(&seen);
            listeners.register(Arc::new(move |code: u8, msg: &Message| {
                sink.lock().unwrap().push((code, msg.as_bytes().to_vec()));
            }));
            Self {
                queue: Arc::new(TransferQueue::new(100)),
                gate: Arc::new(HandshakeGate::new(false)),
                listeners,
                counters: Arc::new(Counters::default()),
                seen,
            }
        }

        fn receiver(&self, wire: Vec<u8>) -> Receiver<Cursor<Vec<u8>>> {
            Receiver::new(
                Cursor::new(wire),
                Arc::clone(&self.queue),
                Arc::clone(&self.gate),
                Arc::clone(&self.listeners),
                Arc::clone(&self.counters),
                Arc::new(AtomicBool::new(false)),
            )
        }
    }

    fn frame(message: &[u8]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        encode_frame(message, &mut buf).unwrap();
        buf.to_vec()
    }

    fn corrupt(mut wire: Vec<u8>) -> Vec<u8> {
        let last = wire.len() - 1;
        wire[last] = wire[last].wrapping_add(1);
        wire
    }

    #[test]
    fn system_status_is_acked_and_dispatched() {
        let fx = Fixture::new();
        let payload = [0x88, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0];
        let wire = frame(&payload);
        assert_eq!(&wire[wire.len() - 2..], &[0x94, 0x6B]);

        let err = fx.receiver(wire).run().unwrap_err();
        assert!(matches!(err, PanelError::Frame(FrameError::ConnectionClosed)));

        assert_eq!(fx.queue.len(), 1);
        assert_eq!(fx.queue.take().unwrap().as_bytes(), &[0x1D]);
        assert_eq!(*fx.seen.lock().unwrap(), vec![(0x08, payload.to_vec())]);
        assert!(fx.gate.is_ready());
    }

    #[test]
    fn frame_without_ack_bit_is_not_acked() {
        let fx = Fixture::new();
        let _ = fx.receiver(frame(&[0x04, 0x02, 0x00])).run();
        assert!(fx.queue.is_empty());
        assert!(fx.gate.is_ready());
        assert_eq!(*fx.seen.lock().unwrap(), vec![(0x04, vec![0x04, 0x02, 0x00])]);
    }

    #[test]
    fn checksum_failure_still_acks_and_opens_gate() {
        let fx = Fixture::new();
        let _ = fx.receiver(corrupt(frame(&[0x88, 0x00, 0x01]))).run();

        assert_eq!(fx.queue.len(), 1, "positive ack is sent regardless");
        assert!(fx.gate.is_ready());
        assert!(fx.seen.lock().unwrap().is_empty());

        let stats = fx.counters.snapshot(0);
        assert_eq!(stats.checksum_failures, 1);
        assert_eq!(stats.frames_received, 1);
        assert_eq!(stats.acks_queued, 1);
    }

    #[test]
    fn zone_snapshot_checksum_failure_is_not_dispatched() {
        let fx = Fixture::new();
        let _ = fx.receiver(corrupt(frame(&[0x85, 0x00, 0x11]))).run();
        assert!(fx.seen.lock().unwrap().is_empty());
        assert_eq!(fx.queue.len(), 1);
        assert_eq!(fx.counters.snapshot(0).checksum_failures, 1);
    }

    #[test]
    fn invalid_escape_is_treated_as_corrupt() {
        let fx = Fixture::new();
        let _ = fx.receiver(vec![0x7E, 0x02, 0x08, 0x7D, 0x11, 0x00, 0x00]).run();
        assert!(fx.seen.lock().unwrap().is_empty());
        assert!(fx.gate.is_ready());
        assert_eq!(fx.counters.snapshot(0).checksum_failures, 1);
    }

    #[test]
    fn empty_frame_opens_gate_without_dispatch() {
        let fx = Fixture::new();
        let _ = fx.receiver(vec![0x7E, 0x00, 0x00, 0x00]).run();
        assert!(fx.gate.is_ready());
        assert!(fx.queue.is_empty());
        assert!(fx.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn noise_between_frames_is_skipped() {
        let fx = Fixture::new();
        let mut wire = vec![0x00, 0xAA];
        wire.extend(frame(&[0x06, 0x00]));
        wire.extend([0x13, 0x37]);
        wire.extend(frame(&[0x87, 0x7E, 0x7D]));
        let _ = fx.receiver(wire).run();

        let seen = fx.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1], (0x07, vec![0x87, 0x7E, 0x7D]));
    }

    #[test]
    fn panicking_listener_does_not_stop_the_loop() {
        let fx = Fixture::new();
        let bad: Arc<dyn PanelListener> = Arc::new(|_: u8, _: &Message| panic!("boom"));
        fx.listeners.register(bad);

        let mut wire = frame(&[0x08, 0x01]);
        wire.extend(frame(&[0x08, 0x02]));
        let _ = fx.receiver(wire).run();

        assert_eq!(fx.seen.lock().unwrap().len(), 2);
        assert_eq!(fx.counters.snapshot(0).listener_faults, 2);
    }

    #[test]
    fn cancelled_receiver_exits_cleanly() {
        let fx = Fixture::new();
        let cancel = Arc::new(AtomicBool::new(true));
        let rx = Receiver::new(
            Cursor::new(frame(&[0x08])),
            Arc::clone(&fx.queue),
            Arc::clone(&fx.gate),
            Arc::clone(&fx.listeners),
            Arc::clone(&fx.counters),
            cancel,
        );
        assert!(rx.run().is_ok());
        assert!(fx.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn ack_with_full_queue_is_dropped_after_timeout() {
        let fx = Fixture::new();
        let queue = Arc::new(TransferQueue::new(1));
        queue.append(commands::system_status()).unwrap();
        let rx = Receiver::new(
            Cursor::new(frame(&[0x88, 0x00])),
            Arc::clone(&queue),
            Arc::clone(&fx.gate),
            Arc::clone(&fx.listeners),
            Arc::clone(&fx.counters),
            Arc::new(AtomicBool::new(false)),
        )
        .with_enqueue_timeout(Some(Duration::from_millis(20)));
        let _ = rx.run();

        assert_eq!(queue.len(), 1);
        assert_eq!(fx.counters.snapshot(0).acks_queued, 0);
        assert_eq!(fx.seen.lock().unwrap().len(), 1);
    }
}
