//! Console triggers.
//!
//! Each stdin line is one press: `m` toggles the scheduling mode, `a` injects
//! an aperiodic burst, `q` quits.

use crossbeam::channel::{self, Receiver};
use std::io::{self, BufRead};
use std::thread;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ToggleMode,
    AperiodicLoad,
    Quit,
}

impl Trigger {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "m" | "mode" => Some(Self::ToggleMode),
            "a" | "load" => Some(Self::AperiodicLoad),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Read stdin on a background thread. The receiver disconnects at end of input.
pub fn spawn_stdin_reader() -> io::Result<Receiver<Trigger>> {
    let (tx, rx) = channel::unbounded();
    thread::Builder::new()
        .name("rtsup-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                match Trigger::parse(&line) {
                    Some(trigger) => {
                        if tx.send(trigger).is_err() {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => eprintln!(
                        "unknown command '{}' (m = mode, a = load, q = quit)",
                        line.trim()
                    ),
                }
            }
        })?;
    Ok(rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Trigger::parse("m"), Some(Trigger::ToggleMode));
        assert_eq!(Trigger::parse("  A \n"), Some(Trigger::AperiodicLoad));
        assert_eq!(Trigger::parse("quit"), Some(Trigger::Quit));
        assert_eq!(Trigger::parse("x"), None);
        assert_eq!(Trigger::parse(""), None);
    }
}
