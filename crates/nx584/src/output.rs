use std::io::{IsTerminal, Write};

use chrono::Local;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use nx584_frame::{hex, message_type, Message};
use nx584_panel::ConnectionStats;
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    type_code: u8,
    type_name: &'a str,
    ack_required: bool,
    len: usize,
    data: String,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(type_code: u8, message: &'a Message) -> Self {
        Self {
            type_code,
            type_name: message_type::type_name(type_code),
            ack_required: message.ack_required(),
            len: message.len(),
            data: hex(message.data()),
            timestamp: Local::now().to_rfc3339(),
        }
    }
}

pub fn print_frame(type_code: u8, message: &Message, format: OutputFormat) {
    let out = FrameOutput::new(type_code, message);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["TYPE", "NAME", "ACK", "LEN", "DATA"])
                .add_row(vec![
                    format!("{:#04x}", out.type_code),
                    out.type_name.to_string(),
                    out.ack_required.to_string(),
                    out.len.to_string(),
                    out.data.clone(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "{} type={:#04x} ({}) ack={} len={} data=[{}]",
                out.timestamp, out.type_code, out.type_name, out.ack_required, out.len, out.data
            );
        }
        OutputFormat::Raw => print_raw(message.as_bytes()),
    }
}

pub fn print_stats(stats: &ConnectionStats, format: OutputFormat) {
    match format {
        OutputFormat::Json | OutputFormat::Raw => print_json(stats),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line: Vec<String> = stats_rows(stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            println!("{}", line.join(" "));
        }
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn stats_rows(stats: &ConnectionStats) -> [(&'static str, u64); 6] {
    [
        ("frames_sent", stats.frames_sent),
        ("frames_received", stats.frames_received),
        ("checksum_failures", stats.checksum_failures),
        ("acks_queued", stats.acks_queued),
        ("listener_faults", stats.listener_faults),
        ("queued", stats.queued as u64),
    ]
}
