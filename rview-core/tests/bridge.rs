//! Integration tests: the runtime bridge driving a loopback session on
//! its own thread, observed from the presentation side.

use std::path::PathBuf;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};

use rview_core::protocol::{KeyScancode, KeyUnicode, MouseInput, RemoteButton};
use rview_core::{
    BridgeEvent, ChannelSink, Dialect, DisplayPatch, Framebuffer, InputEvent, LoopbackConnection,
    LoopbackProbe, ModifierSet, PixelFormat, RemoteEvent, RuntimeBridge, ScriptSettings,
    SessionState,
};

const WAIT: Duration = Duration::from_secs(5);
const P_PIXEL: [u8; 4] = [0x11, 0x22, 0x33, 0xFF];
const Q_PIXEL: [u8; 4] = [0xAA, 0xBB, 0xCC, 0xFF];

// ── Helpers ──────────────────────────────────────────────────────

fn start(
    width: u32,
    height: u32,
    dialect: Dialect,
    script: Option<ScriptSettings>,
) -> (RuntimeBridge, LoopbackProbe, Receiver<BridgeEvent>) {
    let mut conn = LoopbackConnection::new(dialect, width, height);
    let probe = conn.probe().unwrap();
    let (sink, events) = ChannelSink::new();
    let bridge = RuntimeBridge::start(Box::new(conn), script, sink).unwrap();
    (bridge, probe, events)
}

fn wait_connected(bridge: &RuntimeBridge) {
    let deadline = Instant::now() + WAIT;
    while !bridge.state().is_connected() {
        assert!(Instant::now() < deadline, "session never connected");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn next_patch(events: &Receiver<BridgeEvent>) -> DisplayPatch {
    match events.recv_timeout(WAIT).unwrap() {
        BridgeEvent::Patch(patch) => patch,
        other => panic!("expected patch, got {other:?}"),
    }
}

/// Disconnect notifications left in the queue once the bridge is gone.
fn disconnects(events: &Receiver<BridgeEvent>) -> usize {
    events
        .try_iter()
        .filter(|e| *e == BridgeEvent::Disconnected)
        .count()
}

fn next_command(probe: &mut LoopbackProbe) -> InputEvent {
    let deadline = Instant::now() + WAIT;
    loop {
        if let Ok(command) = probe.commands.try_recv() {
            return command;
        }
        assert!(Instant::now() < deadline, "no command reached the connection");
        std::thread::sleep(Duration::from_millis(1));
    }
}

fn script_file(name: &str, body: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("rview-it-{}-{name}.txt", std::process::id()));
    std::fs::write(&path, body).unwrap();
    path
}

// ── Compositing ──────────────────────────────────────────────────

#[test]
fn end_to_end_patches_800x600() {
    let (mut bridge, probe, events) = start(800, 600, Dialect::Rdp, None);
    let mut fb = Framebuffer::new(800, 600, PixelFormat::Bgra8);

    // Test pattern painted on connect.
    fb.apply_patch(next_patch(&events));

    let p = DisplayPatch::filled(0, 0, 800, 600, &P_PIXEL);
    let p_pixels = p.pixels.clone();
    probe.send(RemoteEvent::Video(p)).unwrap();
    fb.apply_patch(next_patch(&events));
    assert_eq!(fb.data(), &p_pixels[..]);

    let q = DisplayPatch::filled(10, 10, 5, 5, &Q_PIXEL);
    probe.send(RemoteEvent::Video(q)).unwrap();
    fb.apply_patch(next_patch(&events));

    let mut changed = 0;
    for y in 0..600 {
        for x in 0..800 {
            let inside = (10..15).contains(&x) && (10..15).contains(&y);
            let px = fb.pixel(x, y).unwrap();
            if inside {
                assert_eq!(px, &Q_PIXEL[..]);
                changed += 1;
            } else {
                assert_eq!(px, &P_PIXEL[..], "pixel ({x},{y}) changed");
            }
        }
    }
    assert_eq!(changed, 25);

    bridge.close();
    assert!(bridge.wait(WAIT));
}

#[test]
fn unknown_and_ack_events_are_ignored() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Rdp, None);
    next_patch(&events);

    probe.send(RemoteEvent::Other("MONITOR_LAYOUT".into())).unwrap();
    probe.send(RemoteEvent::ClipboardNewDataAvailable).unwrap();
    probe.send(RemoteEvent::ClipboardConsumed).unwrap();
    probe.send(RemoteEvent::Video(DisplayPatch::filled(0, 0, 1, 1, &[1, 2, 3, 4]))).unwrap();

    let patch = next_patch(&events);
    assert_eq!((patch.width, patch.height), (1, 1));
    assert!(bridge.state().is_connected());

    bridge.close();
    assert!(bridge.wait(WAIT));
}

// ── Commands ─────────────────────────────────────────────────────

#[test]
fn input_reaches_the_connection_in_order() {
    let (mut bridge, mut probe, _events) = start(4, 4, Dialect::Rdp, None);
    wait_connected(&bridge);

    let key = InputEvent::KeyScancode(KeyScancode::press(0x1E, ModifierSet::SHIFT));
    let click = InputEvent::Mouse(MouseInput::press(3, 4, RemoteButton::Left));
    let ch = InputEvent::KeyUnicode(KeyUnicode { ch: 'z', pressed: false });
    bridge.send(key.clone()).unwrap();
    bridge.send(click.clone()).unwrap();
    bridge.sender().send(ch.clone()).unwrap();

    assert_eq!(next_command(&mut probe), key);
    assert_eq!(next_command(&mut probe), click);
    assert_eq!(next_command(&mut probe), ch);

    bridge.close();
    assert!(bridge.wait(WAIT));
}

// ── Termination ──────────────────────────────────────────────────

#[test]
fn connect_failure_notifies_once() {
    let mut conn = LoopbackConnection::new(Dialect::Rdp, 4, 4);
    let probe = conn.probe().unwrap();
    probe.refuse_connect();
    let (sink, events) = ChannelSink::new();
    let mut bridge = RuntimeBridge::start(Box::new(conn), None, sink).unwrap();

    assert_eq!(events.recv_timeout(WAIT).unwrap(), BridgeEvent::Disconnected);
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 0);
    assert_eq!(bridge.state(), SessionState::Terminated);
    assert_eq!(probe.terminate_calls(), 0);
}

#[test]
fn remote_disconnect_notifies_once() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Vnc, None);
    wait_connected(&bridge);

    probe.disconnect();
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 1);
    assert_eq!(probe.terminate_calls(), 1);
    assert!(bridge.state().is_terminated());
}

#[test]
fn protocol_error_ends_session() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Rdp, None);
    wait_connected(&bridge);

    probe.fail("corrupt bitmap").unwrap();
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 1);
    assert_eq!(probe.terminate_calls(), 1);
}

#[test]
fn sentinel_then_terminate_notifies_once() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Rdp, None);
    wait_connected(&bridge);

    bridge.send(InputEvent::Shutdown).unwrap();
    bridge.terminate();
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 1);
    assert_eq!(probe.terminate_calls(), 1);
}

#[test]
fn local_close_does_not_notify() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Rdp, None);
    wait_connected(&bridge);

    bridge.send(InputEvent::Shutdown).unwrap();
    bridge.close();
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 0);
    assert_eq!(probe.terminate_calls(), 1);
    assert!(bridge.state().is_terminated());

    // Sends after teardown fail instead of blocking.
    assert!(bridge.send(InputEvent::Shutdown).is_err());
}

#[test]
fn remote_disconnect_after_local_close_stays_silent() {
    let (mut bridge, probe, events) = start(4, 4, Dialect::Rdp, None);
    wait_connected(&bridge);

    bridge.close();
    probe.disconnect();
    assert!(bridge.wait(WAIT));
    assert_eq!(disconnects(&events), 0);
}

// ── Script ───────────────────────────────────────────────────────

#[test]
fn script_autostarts_through_the_inbound_path() {
    let settings = ScriptSettings {
        path: script_file("auto", "STRING h"),
        autostart_delay: Some(Duration::from_millis(20)),
        layout: "enus".into(),
    };
    let (mut bridge, mut probe, _events) = start(4, 4, Dialect::Rdp, Some(settings));

    assert_eq!(
        next_command(&mut probe),
        InputEvent::KeyScancode(KeyScancode::press(0x23, ModifierSet::empty()))
    );
    assert_eq!(
        next_command(&mut probe),
        InputEvent::KeyScancode(KeyScancode::release(0x23, ModifierSet::empty()))
    );

    bridge.close();
    assert!(bridge.wait(WAIT));
}

#[test]
fn script_manual_trigger_in_character_mode() {
    let settings = ScriptSettings {
        path: script_file("manual", "STRINGLN ok"),
        autostart_delay: None,
        layout: "enus".into(),
    };
    let (mut bridge, mut probe, _events) = start(4, 4, Dialect::Vnc, Some(settings));
    wait_connected(&bridge);

    bridge.trigger_script();
    let typed: Vec<InputEvent> = (0..6).map(|_| next_command(&mut probe)).collect();
    let pressed: String = typed
        .iter()
        .filter_map(|e| match e {
            InputEvent::KeyUnicode(KeyUnicode { ch, pressed: true }) => Some(*ch),
            _ => None,
        })
        .collect();
    assert_eq!(pressed, "ok\n");

    bridge.close();
    assert!(bridge.wait(WAIT));
}
