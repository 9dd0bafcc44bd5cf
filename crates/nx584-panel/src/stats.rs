use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Point-in-time traffic counters for a connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStats {
    /// Frames written to the stream.
    pub frames_sent: u64,
    /// Frames read from the stream, valid or not.
    pub frames_received: u64,
    /// Received frames that failed checksum or escape verification.
    pub checksum_failures: u64,
    /// Acknowledgments queued in answer to the panel.
    pub acks_queued: u64,
    /// Listener callbacks that panicked.
    pub listener_faults: u64,
    /// Messages waiting in the transfer queue.
    pub queued: usize,
}

/// Live counters shared by the worker loops.
#[derive(Debug, Default)]
pub struct Counters {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    checksum_failures: AtomicU64,
    acks_queued: AtomicU64,
    listener_faults: AtomicU64,
}

impl Counters {
    pub fn frame_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn frame_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn ack_queued(&self) {
        self.acks_queued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn listener_faults(&self, count: usize) {
        if count > 0 {
            self.listener_faults
                .fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self, queued: usize) -> ConnectionStats {
        ConnectionStats {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            checksum_failures: self.checksum_failures.load(Ordering::Relaxed),
            acks_queued: self.acks_queued.load(Ordering::Relaxed),
            listener_faults: self.listener_faults.load(Ordering::Relaxed),
            queued,
        }
    }
}
