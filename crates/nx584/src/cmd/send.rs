use nx584_frame::Message;
use nx584_panel::PanelConfig;

use crate::cmd::{deliver, open, SendArgs};
use crate::exit::{frame_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::OutputFormat;

pub fn run(args: SendArgs, format: OutputFormat, config: PanelConfig) -> CliResult<i32> {
    let message = parse_message(&args.bytes.join(" "))?;
    let mut conn = open(&args.addr, config)?;
    deliver(&conn, message, &args.reply, format)?;
    conn.disconnect();
    Ok(SUCCESS)
}

fn parse_message(input: &str) -> CliResult<Message> {
    let bytes = parse_hex(input)?;
    Message::new(bytes).map_err(|err| frame_error("invalid message", err))
}

/// Parse hex digits, ignoring spaces, commas, colons and `0x` prefixes.
fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || c == ',' || c == ':')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    if digits.len() % 2 != 0 {
        return Err(CliError::new(
            USAGE,
            format!("odd number of hex digits in '{input}'"),
        ));
    }

    (0..digits.len())
        .step_by(2)
        .map(|i| {
            digits
                .get(i..i + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("invalid hex byte in '{input}'")))
        })
        .collect()
}
