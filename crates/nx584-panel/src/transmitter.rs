use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use nx584_frame::{FrameWriter, Message};

use crate::error::{PanelError, Result};
use crate::gate::{GateWait, HandshakeGate};
use crate::queue::TransferQueue;
use crate::stats::Counters;

/// Outbound worker: one message per handshake cycle.
///
/// Each cycle waits for the panel to signal readiness (sending anyway once
/// the handshake timeout passes), takes the next queued message, frames it
/// and writes it. After a bare acknowledgment the gate is reopened at once,
/// because the panel never answers an acknowledgment.
pub struct Transmitter<W> {
    writer: FrameWriter<W>,
    queue: Arc<TransferQueue<Message>>,
    gate: Arc<HandshakeGate>,
    handshake_timeout: Duration,
    counters: Arc<Counters>,
}

impl<W: Write> Transmitter<W> {
    pub fn new(
        stream: W,
        queue: Arc<TransferQueue<Message>>,
        gate: Arc<HandshakeGate>,
        handshake_timeout: Duration,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            writer: FrameWriter::new(stream),
            queue,
            gate,
            handshake_timeout,
            counters,
        }
    }

    /// Run until the queue or gate is closed (`Ok`) or a write fails (`Err`).
    pub fn run(mut self) -> Result<()> {
        tracing::info!(
            timeout_ms = self.handshake_timeout.as_millis() as u64,
            "transmitter started"
        );
        let result = self.run_loop();
        match &result {
            Ok(()) => tracing::info!("transmitter shutdown"),
            Err(err) => tracing::error!(error = %err, "transmitter terminated"),
        }
        result
    }

    fn run_loop(&mut self) -> Result<()> {
        loop {
            match self.gate.take_ready(self.handshake_timeout) {
                GateWait::Ready => {}
                GateWait::TimedOut => {
                    tracing::debug!("no handshake from panel; sending anyway");
                }
                GateWait::Closed => return Ok(()),
            }

            let message = match self.queue.take() {
                Ok(message) => message,
                Err(PanelError::QueueClosed) => return Ok(()),
                Err(err) => return Err(err),
            };

            let written = self.writer.write_message(&message);
            if written.is_ok() {
                self.counters.frame_sent();
            }
            self.queue.task_done();
            written?;

            tracing::debug!(
                type_code = message.type_code().unwrap_or_default(),
                len = message.len(),
                "frame sent"
            );

            if message.is_bare_ack() {
                self.gate.set(true);
            }
        }
    }
}
