use chrono::NaiveDateTime;
use nx584_panel::{PanelConfig, SystemClock, WallClock};

use crate::cmd::{open, parse_duration, ClockArgs};
use crate::exit::{panel_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

const CLOCK_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn run(args: ClockArgs, format: OutputFormat, config: PanelConfig) -> CliResult<i32> {
    let timeout = parse_duration(&args.timeout)?;
    let at = match &args.at {
        Some(text) => parse_clock(text)?,
        None => SystemClock.now(),
    };

    let mut conn = open(&args.addr, config)?;
    conn.set_clock(&at)
        .map_err(|err| panel_error("set-clock failed", err))?;
    conn.flush(timeout)
        .map_err(|err| panel_error("set-clock failed", err))?;
    conn.disconnect();

    let text = at.format(CLOCK_FORMAT).to_string();
    match format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "clock": text })),
        OutputFormat::Table | OutputFormat::Pretty => println!("panel clock set to {text}"),
        OutputFormat::Raw => {}
    }
    Ok(SUCCESS)
}

fn parse_clock(text: &str) -> CliResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), CLOCK_FORMAT).map_err(|err| {
        CliError::new(
            USAGE,
            format!("--at must look like 2026-10-17 14:30: {err}"),
        )
    })
}
