mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;
use nx584_panel::PanelConfig;

use crate::cmd::Command;
use crate::exit::CliResult;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "nx584", version, about = "NX-584 security panel client")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr). NX584_LOG directives take precedence.
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Maximum number of messages waiting to be sent.
    #[arg(long, value_name = "N", default_value = "100", global = true)]
    queue_capacity: usize,

    /// How long to wait for the panel between frames (e.g. 5s, 500ms).
    #[arg(long, value_name = "DURATION", default_value = "5s", global = true)]
    handshake_timeout: String,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    fn panel_config(&self) -> CliResult<PanelConfig> {
        Ok(PanelConfig {
            queue_capacity: self.queue_capacity,
            handshake_timeout: cmd::parse_duration(&self.handshake_timeout)?,
            ..PanelConfig::default()
        })
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cli
        .panel_config()
        .and_then(|config| cmd::run(cli.command, format, config));

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}
