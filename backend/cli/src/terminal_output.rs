//! Terminal output utilities: ANSI formatting, user notes, phase progress.
//!
//! Replies are the only thing written to stdout; notes and progress go to
//! stderr so `codecontext ask ... > answer.md` captures just the answer.

use std::io::IsTerminal;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use codecontext_core::TurnPhase;

// ---------------------------------------------------------------------------
// ANSI Color/Style helpers
// ---------------------------------------------------------------------------

pub const RESET: &str = "\x1b[0m";
pub const BOLD: &str = "\x1b[1m";
pub const DIM: &str = "\x1b[2m";

pub const RED: &str = "\x1b[31m";
pub const GREEN: &str = "\x1b[32m";
pub const YELLOW: &str = "\x1b[33m";
pub const CYAN: &str = "\x1b[36m";

/// Check if the terminal supports color output.
pub fn supports_color() -> bool {
    std::env::var("NO_COLOR").is_err()
        && (std::env::var("COLORTERM").is_ok()
            || std::env::var("TERM")
                .map(|t| t != "dumb")
                .unwrap_or(false))
}

/// Color for rendered replies: only when stdout is an interactive terminal.
pub fn stdout_color() -> bool {
    supports_color() && std::io::stdout().is_terminal()
}

/// Strip ANSI escape codes from a string.
pub fn strip_ansi(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\x1b' {
            // Skip until 'm'
            for next in chars.by_ref() {
                if next == 'm' { break; }
            }
        } else {
            result.push(c);
        }
    }
    result
}

// ---------------------------------------------------------------------------
// Formatted notes
// ---------------------------------------------------------------------------

fn note(symbol: &str, color: &str, plain_tag: &str, msg: &str) -> String {
    if supports_color() {
        format!("{color}{BOLD}{symbol}{RESET} {msg}")
    } else {
        format!("{plain_tag}: {}", strip_ansi(msg))
    }
}

pub fn note_info(msg: &str) {
    eprintln!("{}", note("ℹ", CYAN, "INFO", msg));
}

pub fn note_warn(msg: &str) {
    eprintln!("{}", note("⚠", YELLOW, "WARN", msg));
}

/// The single notification shown when a turn fails.
pub fn note_error(msg: &str) {
    eprintln!("{}", note("✗", RED, "ERROR", msg));
}

pub fn note_success(msg: &str) {
    eprintln!("{}", note("✓", GREEN, "OK", msg));
}

// ---------------------------------------------------------------------------
// Phase progress
// ---------------------------------------------------------------------------

pub fn phase_label(phase: TurnPhase) -> Option<&'static str> {
    match phase {
        TurnPhase::Idle => None,
        TurnPhase::FetchingSource => Some("Fetching source file..."),
        TurnPhase::Generating => Some("Generating reply..."),
    }
}

/// Print a progress line for every busy phase the session publishes.
/// Abort the handle once the turn returns.
pub fn spawn_phase_reporter(mut rx: watch::Receiver<TurnPhase>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            let phase = *rx.borrow_and_update();
            if let Some(label) = phase_label(phase) {
                if supports_color() {
                    eprintln!("{DIM}{label}{RESET}");
                } else {
                    eprintln!("{label}");
                }
            }
        }
    })
}
