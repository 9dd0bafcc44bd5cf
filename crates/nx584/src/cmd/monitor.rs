use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use nx584_panel::PanelConfig;

use crate::cmd::{open, tap, MonitorArgs};
use crate::exit::{panel_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_frame, print_stats, OutputFormat};

/// How often the loop checks for Ctrl-C and a dropped connection.
const POLL: Duration = Duration::from_millis(200);

pub fn run(args: MonitorArgs, format: OutputFormat, config: PanelConfig) -> CliResult<i32> {
    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut conn = open(&args.addr, config)?;
    let frames = tap(&conn);

    if args.names {
        let queued = conn
            .query_zone_names(args.zones)
            .map_err(|err| panel_error("zone name query failed", err))?;
        tracing::info!(queued, "zone name query queued");
    }
    if args.query {
        let queued = conn
            .query_panel(args.zones)
            .map_err(|err| panel_error("status query failed", err))?;
        tracing::info!(queued, zones = args.zones, "status query queued");
    }

    let mut printed = 0usize;
    let outcome = loop {
        if !running.load(Ordering::SeqCst) {
            break Ok(SUCCESS);
        }
        if args.count.is_some_and(|count| printed >= count) {
            break Ok(SUCCESS);
        }

        match frames.recv_timeout(POLL) {
            Ok((code, message)) => {
                print_frame(code, &message, format);
                printed = printed.saturating_add(1);
            }
            Err(RecvTimeoutError::Timeout) if conn.is_connected() => {}
            Err(_) => break Err(CliError::new(TRANSPORT_ERROR, "panel connection lost")),
        }
    };

    if args.count.is_some() {
        // Acknowledgments for the last frames may still be queued.
        let _ = conn.flush(POLL);
    }
    conn.disconnect();
    if args.stats {
        print_stats(&conn.stats(), format);
    }
    outcome
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
