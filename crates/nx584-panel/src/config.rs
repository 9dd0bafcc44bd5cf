use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{PanelError, Result};

/// Default transfer queue capacity.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default time the transmitter waits for the panel to signal readiness.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Default read timeout used to notice cancellation on serial ports.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Runtime behavior of a [`Connection`](crate::Connection).
///
/// Durations serialize as integer milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Maximum number of outbound messages waiting for the transmitter.
    pub queue_capacity: usize,
    /// How long the transmitter waits for the panel before sending anyway.
    #[serde(rename = "handshake_timeout_ms", with = "millis")]
    pub handshake_timeout: Duration,
    /// Bounded wait for a full queue. `None` blocks until space frees up.
    #[serde(rename = "enqueue_timeout_ms", with = "opt_millis")]
    pub enqueue_timeout: Option<Duration>,
    /// Read timeout for the receiver, so it can observe disconnect on
    /// streams that cannot be shut down from another thread.
    #[serde(rename = "poll_interval_ms", with = "millis")]
    pub poll_interval: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            enqueue_timeout: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl PanelConfig {
    /// Reject settings that would leave a worker unable to stop.
    ///
    /// A zero poll interval means reads never time out, so on a transport
    /// whose shutdown is a no-op the receiver could never observe a
    /// disconnect.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(PanelError::InvalidArgument(
                "poll_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod opt_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
