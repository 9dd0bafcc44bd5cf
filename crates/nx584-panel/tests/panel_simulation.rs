//! End-to-end tests against a simulated panel on the far side of a socket pair.
#![cfg(unix)]

use std::os::unix::net::UnixStream;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use nx584_frame::{FrameReader, FrameWriter};
use nx584_panel::{
    commands, connect_with_config, ArmAction, Connection, FixedClock, ListenerRegistry, Message,
    PanelConfig, PanelListener,
};

type Log = Arc<Mutex<Vec<(u8, Vec<u8>)>>>;

/// What the simulated panel saw from the host.
#[derive(Debug, Default)]
struct PanelLog {
    commands: Vec<Vec<u8>>,
    acks: usize,
}

/// Answers every request the way a panel does: a status frame with the
/// acknowledgment bit set, or a bare positive acknowledgment for
/// commands that carry no reply.
fn run_panel(stream: UnixStream, expected_commands: usize) -> thread::JoinHandle<PanelLog> {
    thread::spawn(move || {
        stream
            .set_read_timeout(Some(Duration::from_secs(10)))
            .unwrap();
        let mut writer = FrameWriter::new(stream.try_clone().unwrap());
        let mut reader = FrameReader::new(stream);
        let mut log = PanelLog::default();

        // Each reply the panel sends with bit 7 set is answered by an ack.
        let mut acks_expected = 0;
        while log.commands.len() < expected_commands || log.acks < acks_expected {
            let frame = reader.read_frame().unwrap();
            assert!(frame.is_valid(), "host sent a corrupt frame");
            let bytes = frame.message.as_bytes().to_vec();
            if bytes == [0x1D] {
                log.acks += 1;
                continue;
            }
            let reply: Vec<u8> = match bytes[0] {
                0x24 => vec![0x84, bytes[1], 0x00, 0x00, 0x00, 0x00, 0x00],
                0x26 => vec![0x86, bytes[1], 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00],
                0x28 => vec![0x88, 0x00, 0x01, 0, 0, 0, 0, 0, 0, 0, 0],
                _ => vec![0x1D],
            };
            if reply[0] & 0x80 != 0 {
                acks_expected += 1;
            }
            log.commands.push(bytes);
            writer.send(&reply).unwrap();
        }
        log
    })
}

fn recording_registry() -> (Arc<ListenerRegistry>, Log) {
    let registry = Arc::new(ListenerRegistry::new());
    let log: Log = Arc::default();
    let sink = Arc::clone(&log);
    registry.register(Arc::new(move |code: u8, msg: &Message| {
        sink.lock().unwrap().push((code, msg.as_bytes().to_vec()));
    }));
    (registry, log)
}

fn connect_pair(registry: Arc<ListenerRegistry>) -> (Connection, UnixStream) {
    let (host, panel) = UnixStream::pair().unwrap();
    let config = PanelConfig {
        handshake_timeout: Duration::from_secs(3),
        ..PanelConfig::default()
    };
    (
        connect_with_config(host, config, Some(registry)).unwrap(),
        panel,
    )
}

fn wait_for(log: &Log, count: usize) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while log.lock().unwrap().len() < count && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn bootstrap_query_runs_in_lockstep() {
    let (registry, log) = recording_registry();
    let (mut conn, panel) = connect_pair(registry);
    let panel = run_panel(panel, 2 + 8 + 1);

    let started = Instant::now();
    assert_eq!(conn.query_panel(2).unwrap(), 11);
    let panel_log = panel.join().unwrap();
    wait_for(&log, 11);

    // Every reply opened the gate, so no send waited out the timeout.
    assert!(started.elapsed() < Duration::from_secs(3));

    assert_eq!(panel_log.acks, 11);
    assert_eq!(panel_log.commands[0], vec![0x24, 0x00]);
    assert_eq!(panel_log.commands[1], vec![0x24, 0x01]);
    assert_eq!(panel_log.commands[2], vec![0x26, 0x00]);
    assert_eq!(panel_log.commands[9], vec![0x26, 0x07]);
    assert_eq!(panel_log.commands[10], vec![0x28]);

    let seen = log.lock().unwrap();
    let codes: Vec<u8> = seen.iter().map(|(code, _)| *code).collect();
    assert_eq!(codes[..2], [0x04, 0x04]);
    assert!(codes[2..10].iter().all(|&c| c == 0x06));
    assert_eq!(codes[10], 0x08);
    assert_eq!(seen[1].1[1], 0x01, "zone 2 reply");
    drop(seen);

    conn.flush(Duration::from_secs(2)).unwrap();
    let stats = conn.stats();
    assert_eq!(stats.frames_received, 11);
    assert_eq!(stats.acks_queued, 11);
    assert_eq!(stats.frames_sent, 22);
    conn.disconnect();
}

#[test]
fn clock_and_keypad_commands_reach_the_panel() {
    let (registry, _log) = recording_registry();
    let (conn, panel) = connect_pair(registry);
    let panel = run_panel(panel, 2);

    let at = NaiveDate::from_ymd_opt(2026, 10, 17)
        .unwrap()
        .and_hms_opt(14, 30, 0)
        .unwrap();
    conn.sync_clock(&FixedClock(at)).unwrap();
    conn.send(commands::keypad_function(ArmAction::ArmStay))
        .unwrap();

    let panel_log = panel.join().unwrap();
    assert_eq!(
        panel_log.commands,
        vec![
            vec![0x3B, 0x1A, 0x0A, 0x11, 0x0E, 0x1E, 0x06],
            vec![0x3D, 0x03, 0xFF],
        ]
    );
    assert_eq!(panel_log.acks, 0);
}

#[test]
fn corrupt_frames_are_acked_but_not_delivered() {
    let (registry, log) = recording_registry();
    let (conn, panel) = connect_pair(registry);
    panel
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    let mut writer = FrameWriter::new(panel.try_clone().unwrap());
    let mut reader = FrameReader::new(panel.try_clone().unwrap());

    // Line noise, then a system status frame with a broken checksum.
    let mut wire = vec![0x00, 0x55, 0xAA];
    wire.extend_from_slice(&[0x7E, 0x02, 0x88, 0x00, 0x8A, 0x18]);
    std::io::Write::write_all(&mut &panel, &wire).unwrap();

    let ack = reader.read_frame().unwrap();
    assert_eq!(ack.message.as_bytes(), &[0x1D]);

    writer.send(&[0x88, 0x00]).unwrap();
    let ack = reader.read_frame().unwrap();
    assert_eq!(ack.message.as_bytes(), &[0x1D]);

    wait_for(&log, 1);
    assert_eq!(*log.lock().unwrap(), vec![(0x08, vec![0x88, 0x00])]);
    let stats = conn.stats();
    assert_eq!(stats.checksum_failures, 1);
    assert_eq!(stats.frames_received, 2);
}

#[test]
fn failing_listener_does_not_starve_others() {
    let (registry, log) = recording_registry();
    let (conn, panel) = connect_pair(Arc::clone(&registry));

    let bad: Arc<dyn PanelListener> = Arc::new(|_: u8, _: &Message| panic!("listener bug"));
    assert!(conn.subscribe(Arc::clone(&bad)));
    assert!(!conn.subscribe(Arc::clone(&bad)));

    let mut writer = FrameWriter::new(panel);
    writer.send(&[0x0A, 0x01, 0x02]).unwrap();
    wait_for(&log, 1);
    assert_eq!(log.lock().unwrap().len(), 1);

    assert_eq!(conn.unsubscribe(&bad), 1);
    writer.send(&[0x0A, 0x03, 0x04]).unwrap();
    wait_for(&log, 2);
    assert_eq!(log.lock().unwrap().len(), 2);
    assert_eq!(conn.stats().listener_faults, 1);
}

#[test]
fn queued_messages_are_discarded_on_disconnect() {
    let (registry, _log) = recording_registry();
    let (host, _panel) = UnixStream::pair().unwrap();
    let config = PanelConfig {
        handshake_timeout: Duration::from_secs(30),
        ..PanelConfig::default()
    };
    let mut conn = connect_with_config(host, config, Some(registry)).unwrap();

    // The first send consumes the initial readiness; the rest wait on the
    // panel, which never answers.
    for _ in 0..5 {
        conn.send(commands::system_status()).unwrap();
    }
    assert!(conn.flush(Duration::from_millis(100)).is_err());

    let started = Instant::now();
    conn.disconnect();
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(!conn.is_connected());
}
