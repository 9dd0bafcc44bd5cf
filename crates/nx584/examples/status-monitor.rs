//! Connect to a panel, run the start-up status sweep and print every
//! frame for a minute.
//!
//! ```text
//! cargo run --example status-monitor -- serial:/dev/ttyUSB0@9600 16
//! ```

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use nx584::frame::{hex, message_type};
use nx584::panel::{Connection, Message, PanelConfig};
use nx584::transport::TransportAddr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let addr: TransportAddr = args
        .next()
        .unwrap_or_else(|| "serial:/dev/ttyUSB0".to_string())
        .parse()?;
    let zones: u16 = args.next().map(|z| z.parse()).transpose()?.unwrap_or(8);

    let mut conn = Connection::open(&addr, PanelConfig::default())?;
    conn.subscribe(Arc::new(|code: u8, msg: &Message| {
        println!(
            "{:<20} ack={} [{}]",
            message_type::type_name(code),
            msg.ack_required(),
            hex(msg.data())
        );
    }));

    let queued = conn.query_panel(zones)?;
    println!("queued {queued} status requests on {addr}");

    thread::sleep(Duration::from_secs(60));
    println!("{:?}", conn.stats());
    conn.disconnect();
    Ok(())
}
