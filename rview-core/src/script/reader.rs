//! Keystroke script reader.
//!
//! One command per line:
//!
//! ```text
//! REM comment              ignored
//! DELAY <ms>               pause
//! DEFAULT_DELAY <ms>       pause inserted after every later command
//! STRING <text>            type text
//! STRINGLN <text>          type text, then Enter
//! REPEAT <n>               run the previous command n more times
//! GUI r                    chord: keys pressed in order, released in reverse
//! ```
//!
//! `DEFAULTDELAY` is accepted as an alias. Blank lines are skipped.
//! A single REPEAT is capped at [`MAX_REPEAT`] and a whole script at
//! [`MAX_STEPS`] steps.

use std::path::Path;
use std::time::Duration;

use crate::error::ViewerError;
use crate::script::layout::named_key;

/// Largest count a single `REPEAT` line accepts.
pub const MAX_REPEAT: usize = 10_000;

/// Largest number of steps a parsed script may hold.
pub const MAX_STEPS: usize = 1_000_000;

// ── Steps ────────────────────────────────────────────────────────

/// A key inside a chord.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordKey {
    /// A named key, already resolved to its scancode.
    Named(u16),
    /// A single character, resolved against the layout at replay time.
    Char(char),
}

/// One parsed script step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Type(String),
    Chord(Vec<ChordKey>),
    Delay(Duration),
}

/// A parsed script: an ordered list of steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Script {
    steps: Vec<ScriptStep>,
}

impl Script {
    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Read and parse a script file without blocking the runtime.
    pub async fn from_file(path: &Path) -> Result<Self, ViewerError> {
        let source = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ViewerError::ScriptFile {
                path: path.to_path_buf(),
                source,
            })?;
        tokio::task::spawn_blocking(move || Self::parse(&source)).await?
    }

    /// Parse script source. Errors carry the 1-based line number.
    pub fn parse(source: &str) -> Result<Self, ViewerError> {
        let mut steps = Vec::new();
        let mut default_delay = Duration::ZERO;
        // Steps produced by the last command, for REPEAT.
        let mut last: Vec<ScriptStep> = Vec::new();

        for (idx, raw) in source.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            let (command, rest) = match line.trim_start().split_once(' ') {
                Some((c, r)) => (c, r),
                None => (line.trim(), ""),
            };
            let err = |message: String| ViewerError::Script {
                line: line_no,
                message,
            };

            let mut produced: Vec<ScriptStep> = match command.to_ascii_uppercase().as_str() {
                "REM" => continue,
                "DELAY" => {
                    let ms = parse_millis(rest).map_err(err)?;
                    steps.push(ScriptStep::Delay(ms));
                    continue;
                }
                "DEFAULT_DELAY" | "DEFAULTDELAY" => {
                    default_delay = parse_millis(rest).map_err(err)?;
                    continue;
                }
                "REPEAT" => {
                    let n: usize = rest
                        .trim()
                        .parse()
                        .map_err(|_| err(format!("bad repeat count {:?}", rest.trim())))?;
                    if last.is_empty() {
                        return Err(err("REPEAT with nothing to repeat".into()));
                    }
                    if n > MAX_REPEAT {
                        return Err(err(format!("repeat count {n} exceeds {MAX_REPEAT}")));
                    }
                    if steps.len() + n * last.len() > MAX_STEPS {
                        return Err(err(format!("script exceeds {MAX_STEPS} steps")));
                    }
                    for _ in 0..n {
                        steps.extend(last.iter().cloned());
                    }
                    continue;
                }
                "STRING" => vec![ScriptStep::Type(rest.to_string())],
                "STRINGLN" => vec![ScriptStep::Type(format!("{rest}\n"))],
                _ => vec![ScriptStep::Chord(parse_chord(line).map_err(err)?)],
            };

            if !default_delay.is_zero() {
                produced.push(ScriptStep::Delay(default_delay));
            }
            if steps.len() + produced.len() > MAX_STEPS {
                return Err(err(format!("script exceeds {MAX_STEPS} steps")));
            }
            steps.extend(produced.iter().cloned());
            last = produced;
        }

        Ok(Self { steps })
    }
}

impl From<Vec<ScriptStep>> for Script {
    fn from(steps: Vec<ScriptStep>) -> Self {
        Self { steps }
    }
}

fn parse_millis(arg: &str) -> Result<Duration, String> {
    arg.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| format!("bad delay {:?}", arg.trim()))
}

fn parse_chord(line: &str) -> Result<Vec<ChordKey>, String> {
    line.split_whitespace()
        .map(|token| {
            if let Some(code) = named_key(token) {
                return Ok(ChordKey::Named(code));
            }
            let mut chars = token.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Ok(ChordKey::Char(ch.to_ascii_lowercase())),
                _ => Err(format!("unknown key {token:?}")),
            }
        })
        .collect()
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::layout::scancode;

    #[test]
    fn strings_delays_and_comments() {
        let script = Script::parse("REM hello\n\nSTRING ab c\nDELAY 250\nSTRINGLN x\n").unwrap();
        assert_eq!(
            script.steps(),
            &[
                ScriptStep::Type("ab c".into()),
                ScriptStep::Delay(Duration::from_millis(250)),
                ScriptStep::Type("x\n".into()),
            ]
        );
    }

    #[test]
    fn chords_resolve_named_keys() {
        let script = Script::parse("GUI r\r\nCTRL ALT DELETE").unwrap();
        assert_eq!(
            script.steps(),
            &[
                ScriptStep::Chord(vec![ChordKey::Named(scancode::LWIN), ChordKey::Char('r')]),
                ScriptStep::Chord(vec![
                    ChordKey::Named(scancode::LCTRL),
                    ChordKey::Named(scancode::LALT),
                    ChordKey::Named(scancode::DELETE),
                ]),
            ]
        );
    }

    #[test]
    fn default_delay_follows_each_command() {
        let script = Script::parse("DEFAULTDELAY 10\nENTER\nSTRING a").unwrap();
        let d = ScriptStep::Delay(Duration::from_millis(10));
        assert_eq!(
            script.steps(),
            &[
                ScriptStep::Chord(vec![ChordKey::Named(scancode::ENTER)]),
                d.clone(),
                ScriptStep::Type("a".into()),
                d,
            ]
        );
    }

    #[test]
    fn repeat_replays_previous_command() {
        let script = Script::parse("STRING a\nREPEAT 2").unwrap();
        assert_eq!(script.steps().len(), 3);
        assert!(script.steps().iter().all(|s| *s == ScriptStep::Type("a".into())));
    }

    #[test]
    fn errors_carry_line_numbers() {
        let err = Script::parse("STRING ok\nDELAY soon").unwrap_err();
        assert!(matches!(err, ViewerError::Script { line: 2, .. }));

        let err = Script::parse("REPEAT 3").unwrap_err();
        assert!(matches!(err, ViewerError::Script { line: 1, .. }));

        let err = Script::parse("\nFROBNICATE now").unwrap_err();
        assert!(matches!(err, ViewerError::Script { line: 2, .. }));
    }

    #[test]
    fn oversized_repeat_is_rejected() {
        let script = Script::parse(&format!("STRING a\nREPEAT {MAX_REPEAT}")).unwrap();
        assert_eq!(script.steps().len(), MAX_REPEAT + 1);

        let err = Script::parse("STRING a\nREPEAT 20000000").unwrap_err();
        assert!(matches!(err, ViewerError::Script { line: 2, .. }));

        let err = Script::parse("STRING a\nREPEAT 99999999999999999999999").unwrap_err();
        assert!(matches!(err, ViewerError::Script { line: 2, .. }));
    }

    #[test]
    fn total_steps_are_capped() {
        let mut source = String::from("STRING a\n");
        for _ in 0..(MAX_STEPS / MAX_REPEAT) {
            source.push_str(&format!("REPEAT {MAX_REPEAT}\n"));
        }
        let err = Script::parse(&source).unwrap_err();
        let last_line = MAX_STEPS / MAX_REPEAT + 1;
        assert!(matches!(err, ViewerError::Script { line, .. } if line == last_line));
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let err = Script::from_file(Path::new("/nonexistent/rview/script.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ViewerError::ScriptFile { .. }));
    }
}
