//! Connection engine for NX-584 security panels.
//!
//! A [`Connection`] runs two worker threads over one duplex stream. The
//! transmitter sends queued messages one at a time, waiting for the panel
//! to signal readiness between frames. The receiver decodes inbound frames,
//! acknowledges those that ask for it, and passes verified frames to the
//! subscribed [`PanelListener`]s.
//!
//! ```no_run
//! use std::sync::Arc;
//! use nx584_panel::{commands, Connection, Message, PanelConfig};
//!
//! # fn main() -> nx584_panel::Result<()> {
//! let addr = "serial:/dev/ttyUSB0@9600".parse()?;
//! let conn = Connection::open(&addr, PanelConfig::default())?;
//! conn.subscribe(Arc::new(|code: u8, msg: &Message| {
//!     println!("type {code:#04x}: {msg:?}");
//! }));
//! conn.send(commands::system_status())?;
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod gate;
pub mod listener;
pub mod queue;
pub mod receiver;
pub mod stats;
pub mod transmitter;

pub use clock::{FixedClock, SystemClock, WallClock};
pub use commands::ArmAction;
pub use config::PanelConfig;
pub use connection::{connect, connect_with_config, Connection};
pub use error::{PanelError, Result};
pub use gate::{GateWait, HandshakeGate};
pub use listener::{ListenerRegistry, PanelListener};
pub use nx584_frame::Message;
pub use queue::TransferQueue;
pub use receiver::Receiver;
pub use stats::ConnectionStats;
pub use transmitter::Transmitter;
