use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use bytes::Bytes;
use chrono::NaiveDateTime;
use nx584_frame::Message;
use nx584_transport::{ByteStream, PanelStream, StreamShutdown, TransportAddr};

use crate::clock::WallClock;
use crate::commands;
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::gate::HandshakeGate;
use crate::listener::{ListenerRegistry, PanelListener};
use crate::queue::TransferQueue;
use crate::receiver::Receiver;
use crate::stats::{ConnectionStats, Counters};
use crate::transmitter::Transmitter;

/// A live session with the panel.
///
/// Owns the stream, the transfer queue, the handshake gate and the two
/// worker threads. Dropping the connection disconnects it.
pub struct Connection {
    queue: Arc<TransferQueue<Message>>,
    gate: Arc<HandshakeGate>,
    listeners: Arc<ListenerRegistry>,
    counters: Arc<Counters>,
    cancel: Arc<AtomicBool>,
    shutdown: Box<dyn StreamShutdown>,
    transmitter: Option<JoinHandle<Result<()>>>,
    receiver: Option<JoinHandle<Result<()>>>,
    config: PanelConfig,
}

/// Start a session over an already open stream with default configuration.
pub fn connect<S: ByteStream>(stream: S) -> Result<Connection> {
    connect_with_config(stream, PanelConfig::default(), None)
}

/// Start a session with explicit configuration.
///
/// Pass `listeners` to have subscribers in place before the first frame
/// arrives.
pub fn connect_with_config<S: ByteStream>(
    stream: S,
    config: PanelConfig,
    listeners: Option<Arc<ListenerRegistry>>,
) -> Result<Connection> {
    config.validate()?;
    stream.set_stream_read_timeout(Some(config.poll_interval))?;
    let reader_stream = stream.try_clone_stream()?;
    let shutdown: Box<dyn StreamShutdown> = Box::new(stream.try_clone_stream()?);

    let queue = Arc::new(TransferQueue::new(config.queue_capacity));
    let gate = Arc::new(HandshakeGate::new(true));
    let listeners = listeners.unwrap_or_default();
    let counters = Arc::new(Counters::default());
    let cancel = Arc::new(AtomicBool::new(false));

    let transmitter = Transmitter::new(
        stream,
        Arc::clone(&queue),
        Arc::clone(&gate),
        config.handshake_timeout,
        Arc::clone(&counters),
    );
    let receiver = Receiver::new(
        reader_stream,
        Arc::clone(&queue),
        Arc::clone(&gate),
        Arc::clone(&listeners),
        Arc::clone(&counters),
        Arc::clone(&cancel),
    )
    .with_enqueue_timeout(config.enqueue_timeout);

    let mut conn = Connection {
        queue,
        gate,
        listeners,
        counters,
        cancel,
        shutdown,
        transmitter: None,
        receiver: None,
        config,
    };

    conn.transmitter = Some(conn.spawn_worker("nx584-transmitter", move || transmitter.run())?);
    conn.receiver = Some(conn.spawn_worker("nx584-receiver", move || receiver.run())?);

    tracing::info!(
        queue_capacity = conn.queue.capacity(),
        handshake_timeout_ms = conn.config.handshake_timeout.as_millis() as u64,
        "connected to panel"
    );
    Ok(conn)
}

impl Connection {
    /// Open a transport address and start a session on it.
    pub fn open(addr: &TransportAddr, config: PanelConfig) -> Result<Self> {
        let stream: PanelStream = nx584_transport::open(addr)?;
        tracing::debug!(%addr, kind = stream.kind(), "transport opened");
        connect_with_config(stream, config, None)
    }

    /// Spawn a worker whose unexpected exit closes the queue and gate, so
    /// producers and the other worker are not left blocked.
    fn spawn_worker<F>(&self, name: &'static str, work: F) -> Result<JoinHandle<Result<()>>>
    where
        F: FnOnce() -> Result<()> + Send + 'static,
    {
        let queue = Arc::clone(&self.queue);
        let gate = Arc::clone(&self.gate);
        let cancel = Arc::clone(&self.cancel);
        thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let result = work();
                if result.is_err() && !cancel.load(Ordering::Acquire) {
                    let discarded = queue.close();
                    gate.close();
                    tracing::warn!(worker = name, discarded, "connection lost");
                }
                result
            })
            .map_err(|source| PanelError::Spawn { name, source })
    }

    /// Queue a message for transmission.
    ///
    /// Blocks while the queue is full, or fails with
    /// [`PanelError::QueueFull`] once the configured enqueue timeout passes.
    pub fn send(&self, message: Message) -> Result<()> {
        let queued = match self.config.enqueue_timeout {
            Some(timeout) => self.queue.append_timeout(message, timeout),
            None => self.queue.append(message),
        };
        match queued {
            Ok(()) => Ok(()),
            Err(PanelError::QueueClosed) => Err(PanelError::Disconnected),
            Err(err) => {
                tracing::warn!(error = %err, "message not delivered");
                Err(err)
            }
        }
    }

    /// Validate raw message bytes and queue them.
    pub fn send_bytes(&self, bytes: impl Into<Bytes>) -> Result<()> {
        self.send(Message::new(bytes)?)
    }

    /// Add a listener. Returns false if it was already subscribed.
    pub fn subscribe(&self, listener: Arc<dyn PanelListener>) -> bool {
        self.listeners.register(listener)
    }

    /// Remove a listener. Returns how many registrations were removed.
    pub fn unsubscribe(&self, listener: &Arc<dyn PanelListener>) -> usize {
        self.listeners.unregister(listener)
    }

    /// Set the panel clock.
    pub fn set_clock(&self, at: &NaiveDateTime) -> Result<()> {
        self.send(commands::set_clock(at)?)
    }

    /// Set the panel clock to the current time of `clock`.
    pub fn sync_clock(&self, clock: &dyn WallClock) -> Result<()> {
        self.set_clock(&clock.now())
    }

    /// Queue the start-up status sweep: every zone, every partition, then
    /// the system status. Returns the number of messages queued.
    pub fn query_panel(&self, zones: u16) -> Result<usize> {
        let mut queued = 0;
        for zone in 1..=zones {
            self.send(commands::zone_status(zone)?)?;
            queued += 1;
        }
        for partition in 1..=commands::PARTITION_COUNT {
            self.send(commands::partition_status(partition)?)?;
            queued += 1;
        }
        self.send(commands::system_status())?;
        Ok(queued + 1)
    }

    /// Queue a name request for zones 1..=zones. Returns the number queued.
    ///
    /// Every zone number is checked before anything is queued.
    pub fn query_zone_names(&self, zones: u16) -> Result<usize> {
        let requests = (1..=zones)
            .map(commands::zone_name)
            .collect::<Result<Vec<_>>>()?;
        let queued = requests.len();
        for request in requests {
            self.send(request)?;
        }
        Ok(queued)
    }

    /// Wait until every queued message has been written.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        if self.queue.wait_until_drained(timeout) {
            Ok(())
        } else if self.queue.is_closed() {
            Err(PanelError::Disconnected)
        } else {
            Err(PanelError::Timeout(timeout))
        }
    }

    /// True until [`disconnect`](Self::disconnect) is called or a worker
    /// loses the stream.
    pub fn is_connected(&self) -> bool {
        !self.queue.is_closed()
    }

    pub fn stats(&self) -> ConnectionStats {
        self.counters.snapshot(self.queue.len())
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    /// Stop both workers and release the stream. Idempotent.
    ///
    /// Messages still queued are discarded.
    pub fn disconnect(&mut self) {
        if self.transmitter.is_none() && self.receiver.is_none() {
            return;
        }

        self.cancel.store(true, Ordering::Release);
        let discarded = self.queue.close();
        self.gate.close();
        if discarded > 0 {
            tracing::info!(discarded, "discarding unsent messages");
        }
        if let Err(err) = self.shutdown.shutdown_stream() {
            tracing::debug!(error = %err, "stream shutdown failed");
        }

        for (name, handle) in [
            ("transmitter", self.transmitter.take()),
            ("receiver", self.receiver.take()),
        ] {
            let Some(handle) = handle else { continue };
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => tracing::debug!(worker = name, error = %err, "worker had failed"),
                Err(_) => tracing::error!(worker = name, "worker panicked"),
            }
        }
        tracing::info!("disconnected from panel");
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("connected", &self.is_connected())
            .field("queue", &self.queue)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
