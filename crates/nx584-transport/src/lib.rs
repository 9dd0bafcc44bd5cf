//! Duplex byte streams for the NX-584 panel protocol.
//!
//! Provides a unified interface over the ways a panel's serial interface is
//! usually reached:
//! - a local serial device (termios raw mode, Unix only)
//! - a TCP serial bridge
//! - a Unix domain socket (simulators, tests)
//!
//! This is the lowest layer of the workspace. The protocol engine only needs
//! the [`ByteStream`] trait; [`PanelStream`] is the concrete type returned by
//! [`open`].

pub mod addr;
pub mod error;
pub mod traits;

#[cfg(unix)]
pub mod serial;

pub use addr::{open, open_str, TransportAddr};
pub use error::{Result, TransportError};
pub use traits::{ByteStream, PanelStream, StreamShutdown};

#[cfg(unix)]
pub use serial::SerialPort;

/// Baud rate used when an address does not name one.
pub const DEFAULT_BAUD: u32 = 9600;
