//! Script replay into the session's command queue.
//!
//! The injector submits through the same inbound queue as live input.
//! Scancode-mode dialects get layout scancodes (Shift wrapped around
//! shifted characters); character-mode dialects get `KeyUnicode` for
//! text. Chords are always sent as scancodes.
//!
//! Replay is best effort: on cancellation the remaining actions are
//! abandoned and nothing already sent is rolled back.
//!
//! The injector shares the bridge's single-threaded runtime. Loading and
//! compiling run on the blocking pool, and the send loop yields every
//! [`SEND_BATCH`] events so video and stop handling keep running.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::connection::Dialect;
use crate::error::ViewerError;
use crate::protocol::{InputEvent, KeyScancode, KeyUnicode, ModifierSet};
use crate::script::layout::{KeyboardLayout, scancode};
use crate::script::reader::{ChordKey, Script, ScriptStep};

/// Pause before a manually triggered replay, so the keys of the trigger
/// combo reach the remote side before the script's own.
pub const KEY_FLUSH_DELAY: Duration = Duration::from_millis(100);

/// Key events sent between yields to the runtime.
pub const SEND_BATCH: usize = 64;

// ── KeyAction ────────────────────────────────────────────────────

/// One low-level action of a compiled script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Scancode { scancode: u16, pressed: bool },
    Char { ch: char, pressed: bool },
    Wait(Duration),
}

impl KeyAction {
    fn into_event(self) -> Option<InputEvent> {
        match self {
            KeyAction::Scancode { scancode, pressed } => Some(InputEvent::KeyScancode(if pressed {
                KeyScancode::press(scancode, ModifierSet::empty())
            } else {
                KeyScancode::release(scancode, ModifierSet::empty())
            })),
            KeyAction::Char { ch, pressed } => Some(InputEvent::KeyUnicode(KeyUnicode { ch, pressed })),
            KeyAction::Wait(_) => None,
        }
    }
}

fn tap(out: &mut Vec<KeyAction>, scancode: u16) {
    out.push(KeyAction::Scancode { scancode, pressed: true });
    out.push(KeyAction::Scancode { scancode, pressed: false });
}

/// Flatten a script into key actions.
///
/// Fails on the first character the layout cannot type, before anything
/// is sent.
pub fn compile(
    script: &Script,
    layout: KeyboardLayout,
    char_mode: bool,
) -> Result<Vec<KeyAction>, ViewerError> {
    let mut out = Vec::new();
    for step in script.steps() {
        match step {
            ScriptStep::Delay(d) => out.push(KeyAction::Wait(*d)),
            ScriptStep::Type(text) if char_mode => {
                for ch in text.chars() {
                    out.push(KeyAction::Char { ch, pressed: true });
                    out.push(KeyAction::Char { ch, pressed: false });
                }
            }
            ScriptStep::Type(text) => {
                for ch in text.chars() {
                    let stroke = layout.stroke(ch).ok_or(ViewerError::UnmappedChar(ch))?;
                    if stroke.shift {
                        out.push(KeyAction::Scancode { scancode: scancode::LSHIFT, pressed: true });
                        tap(&mut out, stroke.scancode);
                        out.push(KeyAction::Scancode { scancode: scancode::LSHIFT, pressed: false });
                    } else {
                        tap(&mut out, stroke.scancode);
                    }
                }
            }
            ScriptStep::Chord(keys) => {
                let codes = keys
                    .iter()
                    .map(|k| match *k {
                        ChordKey::Named(code) => Ok(code),
                        ChordKey::Char(ch) => layout
                            .stroke(ch)
                            .map(|s| s.scancode)
                            .ok_or(ViewerError::UnmappedChar(ch)),
                    })
                    .collect::<Result<Vec<u16>, ViewerError>>()?;
                for &code in &codes {
                    out.push(KeyAction::Scancode { scancode: code, pressed: true });
                }
                for &code in codes.iter().rev() {
                    out.push(KeyAction::Scancode { scancode: code, pressed: false });
                }
            }
        }
    }
    Ok(out)
}

// ── Settings / cursor ────────────────────────────────────────────

/// Where the script lives and when it starts on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptSettings {
    pub path: PathBuf,
    /// `None` disables auto-start; `Some(d)` replays once `d` elapsed.
    pub autostart_delay: Option<Duration>,
    /// Layout short name used in scancode mode.
    pub layout: String,
}

/// Progress through a compiled script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptCursor {
    pub position: usize,
    pub pending_delay: bool,
}

/// How a replay is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Wait the given delay, then replay.
    Delayed(Duration),
    /// Manual trigger: replay after the key flush pause.
    Immediate,
}

/// How a replay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    Completed { sent: usize },
    Cancelled { sent: usize },
}

// ── ScriptInjector ───────────────────────────────────────────────

/// Replays a script file into the command queue.
///
/// The file is read on every replay so edits are picked up by the next
/// manual trigger.
pub struct ScriptInjector {
    settings: ScriptSettings,
    dialect: Dialect,
    commands: mpsc::UnboundedSender<InputEvent>,
    trigger: Arc<Notify>,
    cancel: CancellationToken,
}

impl ScriptInjector {
    pub fn new(
        settings: ScriptSettings,
        dialect: Dialect,
        commands: mpsc::UnboundedSender<InputEvent>,
        trigger: Arc<Notify>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            settings,
            dialect,
            commands,
            trigger,
            cancel,
        }
    }

    /// Start one replay.
    pub async fn start(&self, mode: StartMode) -> Result<ReplayOutcome, ViewerError> {
        let wait = match mode {
            StartMode::Delayed(d) => d,
            StartMode::Immediate => KEY_FLUSH_DELAY,
        };
        tokio::select! {
            _ = self.cancel.cancelled() => return Ok(ReplayOutcome::Cancelled { sent: 0 }),
            _ = tokio::time::sleep(wait) => {}
        }
        self.replay().await
    }

    /// Load, compile and send the script now.
    pub async fn replay(&self) -> Result<ReplayOutcome, ViewerError> {
        let layout = KeyboardLayout::by_short_name(&self.settings.layout)?;
        let script = Script::from_file(&self.settings.path).await?;
        let char_mode = self.dialect.types_characters();
        let actions =
            tokio::task::spawn_blocking(move || compile(&script, layout, char_mode)).await??;
        info!(
            "replaying {} ({} actions, {} mode)",
            self.settings.path.display(),
            actions.len(),
            if char_mode { "character" } else { "scancode" }
        );

        let mut cursor = ScriptCursor::default();
        let mut sent = 0;
        while let Some(&action) = actions.get(cursor.position) {
            if self.cancel.is_cancelled() {
                debug!("script cancelled at action {}", cursor.position);
                return Ok(ReplayOutcome::Cancelled { sent });
            }
            if let KeyAction::Wait(d) = action {
                cursor.pending_delay = true;
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!("script cancelled during delay at action {}", cursor.position);
                        return Ok(ReplayOutcome::Cancelled { sent });
                    }
                    _ = tokio::time::sleep(d) => {}
                }
                cursor.pending_delay = false;
            } else if let Some(event) = action.into_event() {
                self.commands.send(event)?;
                sent += 1;
                if sent % SEND_BATCH == 0 {
                    tokio::task::yield_now().await;
                }
            }
            cursor.position += 1;
        }
        Ok(ReplayOutcome::Completed { sent })
    }

    /// Injector lifecycle: the optional auto-start, then one replay per
    /// manual trigger until cancelled.
    pub async fn run(self) {
        if let Some(delay) = self.settings.autostart_delay {
            debug!("script auto-start in {delay:?}");
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                // A manual trigger during the wait replaces the auto-start.
                _ = self.trigger.notified() => self.start(StartMode::Immediate).await,
                _ = tokio::time::sleep(delay) => self.replay().await,
            };
            self.report(result);
        }

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = self.trigger.notified() => {
                    let result = self.start(StartMode::Immediate).await;
                    self.report(result);
                }
            }
        }
        debug!("script injector finished");
    }

    fn report(&self, result: Result<ReplayOutcome, ViewerError>) {
        match result {
            Ok(ReplayOutcome::Completed { sent }) => info!("script done, {sent} key events sent"),
            Ok(ReplayOutcome::Cancelled { sent }) => {
                info!("script abandoned after {sent} key events")
            }
            Err(e) => warn!("script failed: {e}"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn write_script(name: &str, body: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rview-{}-{name}.txt", std::process::id()));
        std::fs::write(&path, body).unwrap();
        path
    }

    fn injector(
        path: PathBuf,
        delay: Option<Duration>,
        dialect: Dialect,
    ) -> (
        ScriptInjector,
        mpsc::UnboundedReceiver<InputEvent>,
        Arc<Notify>,
        CancellationToken,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let trigger = Arc::new(Notify::new());
        let cancel = CancellationToken::new();
        let settings = ScriptSettings {
            path,
            autostart_delay: delay,
            layout: "enus".into(),
        };
        (
            ScriptInjector::new(settings, dialect, tx, Arc::clone(&trigger), cancel.clone()),
            rx,
            trigger,
            cancel,
        )
    }

    fn sc(scancode: u16, pressed: bool) -> KeyAction {
        KeyAction::Scancode { scancode, pressed }
    }

    #[test]
    fn compile_wraps_shift_around_capitals() {
        let script = Script::parse("STRING aB").unwrap();
        let actions = compile(&script, KeyboardLayout::EnUs, false).unwrap();
        assert_eq!(
            actions,
            vec![
                sc(0x1E, true),
                sc(0x1E, false),
                sc(scancode::LSHIFT, true),
                sc(0x30, true),
                sc(0x30, false),
                sc(scancode::LSHIFT, false),
            ]
        );
    }

    #[test]
    fn compile_chord_releases_in_reverse() {
        let script = Script::parse("GUI r").unwrap();
        let actions = compile(&script, KeyboardLayout::EnUs, true).unwrap();
        assert_eq!(
            actions,
            vec![
                sc(scancode::LWIN, true),
                sc(0x13, true),
                sc(0x13, false),
                sc(scancode::LWIN, false),
            ]
        );
    }

    #[test]
    fn compile_char_mode_sends_characters() {
        let script = Script::parse("STRING é").unwrap();
        let actions = compile(&script, KeyboardLayout::EnUs, true).unwrap();
        assert_eq!(
            actions,
            vec![
                KeyAction::Char { ch: 'é', pressed: true },
                KeyAction::Char { ch: 'é', pressed: false },
            ]
        );
        assert!(matches!(
            compile(&script, KeyboardLayout::EnUs, false),
            Err(ViewerError::UnmappedChar('é'))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_is_sent_before_the_delay() {
        let path = write_script("delay", "STRING a");
        let (inj, mut rx, _trigger, cancel) =
            injector(path, Some(Duration::from_secs(5)), Dialect::Rdp);
        let task = tokio::spawn(inj.run());

        tokio::time::sleep(Duration::from_millis(4_900)).await;
        assert!(rx.try_recv().is_err());

        let first = tokio::time::timeout(Duration::from_millis(200), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            first,
            InputEvent::KeyScancode(KeyScancode::press(0x1E, ModifierSet::empty()))
        );

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn no_autostart_without_delay() {
        let path = write_script("noauto", "STRING a");
        let (inj, mut rx, _trigger, cancel) = injector(path, None, Dialect::Rdp);
        let task = tokio::spawn(inj.run());

        tokio::time::sleep(Duration::from_secs(3_600)).await;
        assert!(rx.try_recv().is_err());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn manual_trigger_skips_the_delay() {
        let path = write_script("manual", "STRING a");
        let (inj, mut rx, trigger, cancel) =
            injector(path, Some(Duration::from_secs(3_600)), Dialect::Vnc);
        let task = tokio::spawn(inj.run());

        tokio::task::yield_now().await;
        trigger.notify_one();
        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first, InputEvent::KeyUnicode(KeyUnicode { ch: 'a', pressed: true }));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_abandons_remaining_actions() {
        let path = write_script("cancel", "STRING a\nDELAY 1000\nSTRING b");
        let (inj, mut rx, _trigger, cancel) = injector(path, None, Dialect::Rdp);

        let replay = tokio::spawn(async move { inj.replay().await });
        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_some());
        cancel.cancel();

        let outcome = replay.await.unwrap().unwrap();
        assert_eq!(outcome, ReplayOutcome::Cancelled { sent: 2 });
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn long_replay_leaves_room_for_other_tasks() {
        let path = write_script("long", &format!("STRING abc\nREPEAT {}", 2_000));
        let (inj, mut rx, _trigger, _cancel) = injector(path, None, Dialect::Rdp);
        let marker_tx = inj.commands.clone();

        let replay = tokio::spawn(async move { inj.replay().await });
        assert!(rx.recv().await.is_some());

        // Queued behind a replay that is already sending.
        let marker = tokio::spawn(async move { marker_tx.send(InputEvent::Shutdown).unwrap() });

        let outcome = replay.await.unwrap().unwrap();
        marker.await.unwrap();
        let ReplayOutcome::Completed { sent } = outcome else {
            panic!("replay did not complete: {outcome:?}");
        };
        assert_eq!(sent, 2_001 * 3 * 2);

        let mut rest = Vec::new();
        while let Ok(event) = rx.try_recv() {
            rest.push(event);
        }
        let at = rest.iter().position(InputEvent::is_shutdown).unwrap();
        assert!(at < SEND_BATCH * 4, "marker only ran after {at} key events");
    }

    #[tokio::test]
    async fn unknown_layout_fails_replay() {
        let path = write_script("layout", "STRING a");
        let (tx, _rx) = mpsc::unbounded_channel();
        let settings = ScriptSettings {
            path,
            autostart_delay: None,
            layout: "klingon".into(),
        };
        let inj = ScriptInjector::new(
            settings,
            Dialect::Rdp,
            tx,
            Arc::new(Notify::new()),
            CancellationToken::new(),
        );
        assert!(matches!(inj.replay().await, Err(ViewerError::UnknownLayout(_))));
    }
}
