//! Protocol engine for NX-584 security panels.
//!
//! nx584 talks to a panel's serial interface: it frames and checksums
//! messages, paces transmission on the panel's acknowledgments, and hands
//! decoded frames to subscribers.
//!
//! # Crate Structure
//!
//! - [`transport`]: Duplex byte streams (serial, TCP bridge, Unix socket)
//! - [`frame`]: Frame codec, messages and message type codes
//! - [`panel`]: Connection engine and command builders (behind `panel` feature)

/// Re-export transport types.
pub mod transport {
    pub use nx584_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use nx584_frame::*;
}

/// Re-export panel types (requires `panel` feature).
#[cfg(feature = "panel")]
pub mod panel {
    pub use nx584_panel::*;
}
