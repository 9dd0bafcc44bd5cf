use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Subcommand};
use nx584_frame::Message;
use nx584_panel::{Connection, PanelConfig, PanelListener};
use nx584_transport::TransportAddr;

use crate::exit::{panel_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod clock;
pub mod command;
pub mod monitor;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print every frame the panel sends.
    Monitor(MonitorArgs),
    /// Send raw message bytes (type byte first).
    Send(SendArgs),
    /// Send a named panel request.
    Command(CommandArgs),
    /// Set the panel clock.
    SetClock(ClockArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: PanelConfig) -> CliResult<i32> {
    match command {
        Command::Monitor(args) => monitor::run(args, format, config),
        Command::Send(args) => send::run(args, format, config),
        Command::Command(args) => command::run(args, format, config),
        Command::SetClock(args) => clock::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct MonitorArgs {
    /// Panel address (serial:/dev/ttyUSB0@9600, tcp:host:port, unix:/path).
    #[arg(env = "NX584_PORT")]
    pub addr: String,
    /// Request zone, partition and system status on connect.
    #[arg(long)]
    pub query: bool,
    /// Number of zones to request with --query.
    #[arg(long, default_value = "24", requires = "query")]
    pub zones: u16,
    /// Also request every zone name with --query.
    #[arg(long, requires = "query")]
    pub names: bool,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Print connection counters on exit.
    #[arg(long)]
    pub stats: bool,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Panel address (serial:/dev/ttyUSB0@9600, tcp:host:port, unix:/path).
    #[arg(env = "NX584_PORT")]
    pub addr: String,
    /// Message bytes in hex, type byte first (e.g. `28` or `3D 02 FF`).
    #[arg(required = true)]
    pub bytes: Vec<String>,
    #[command(flatten)]
    pub reply: ReplyArgs,
}

#[derive(Args, Debug)]
pub struct CommandArgs {
    /// Panel address (serial:/dev/ttyUSB0@9600, tcp:host:port, unix:/path).
    #[arg(env = "NX584_PORT")]
    pub addr: String,
    #[command(subcommand)]
    pub request: Request,
    #[command(flatten)]
    pub reply: ReplyArgs,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Request {
    /// Request a zone name (zones start at 1).
    ZoneName { zone: u16 },
    /// Request a zone status (zones start at 1).
    ZoneStatus { zone: u16 },
    /// Request a partition status (1-8).
    PartitionStatus { partition: u8 },
    /// Request the partition snapshot.
    PartitionSnapshot,
    /// Request the system status.
    SystemStatus,
    /// Request user information.
    UserInfo { user: u8 },
    /// Silence the sounder without disarming.
    AudibleOff,
    /// Disarm all partitions.
    Disarm,
    /// Arm all partitions in away mode.
    ArmAway,
    /// Arm all partitions in stay mode.
    ArmStay,
    /// Start auto-arm on all partitions.
    AutoArm,
    /// Send a positive acknowledgment.
    Ack,
    /// Send a negative acknowledgment.
    Nak,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// Wait for the next frame from the panel and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for delivery and for the reply (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ClockArgs {
    /// Panel address (serial:/dev/ttyUSB0@9600, tcp:host:port, unix:/path).
    #[arg(env = "NX584_PORT")]
    pub addr: String,
    /// Time to set, "YYYY-MM-DD HH:MM". Defaults to the local time.
    #[arg(long)]
    pub at: Option<String>,
    /// Maximum time to wait for delivery (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse an address and open a connection to it.
pub(crate) fn open(addr: &str, config: PanelConfig) -> CliResult<Connection> {
    let addr: TransportAddr = addr
        .parse()
        .map_err(|err| transport_error("bad panel address", err))?;
    Connection::open(&addr, config).map_err(|err| panel_error("connect failed", err))
}

/// Subscribe a listener that forwards every dispatched frame to a channel.
pub(crate) fn tap(conn: &Connection) -> Receiver<(u8, Message)> {
    let (tx, rx) = mpsc::channel();
    let listener: Arc<dyn PanelListener> = Arc::new(move |code: u8, message: &Message| {
        let _ = tx.send((code, message.clone()));
    });
    conn.subscribe(listener);
    rx
}

/// Send a message, wait until it is written, and optionally print the
/// panel's next frame.
pub(crate) fn deliver(
    conn: &Connection,
    message: Message,
    reply: &ReplyArgs,
    format: OutputFormat,
) -> CliResult<()> {
    let timeout = parse_duration(&reply.wait_timeout)?;
    let frames = reply.wait.then(|| tap(conn));

    conn.send(message)
        .map_err(|err| panel_error("send failed", err))?;
    conn.flush(timeout)
        .map_err(|err| panel_error("send failed", err))?;

    if let Some(frames) = frames {
        let (code, frame) = frames.recv_timeout(timeout).map_err(|_| {
            CliError::new(
                crate::exit::TIMEOUT,
                format!("no reply from panel within {timeout:?}"),
            )
        })?;
        crate::output::print_frame(code, &frame, format);
        // Let the acknowledgment for the reply go out before disconnecting.
        conn.flush(timeout)
            .map_err(|err| panel_error("acknowledge failed", err))?;
    }
    Ok(())
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = match input.strip_suffix("ms") {
        Some(num) => (num, true),
        None => (input.strip_suffix('s').unwrap_or(input), false),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
