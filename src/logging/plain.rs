//! Plain-text rendering of log events for the install log file.
use tracing::Level;

use super::subscriber::{DRY_RUN_TARGET, STAGE_TARGET};

/// How an event is presented, derived from its level and target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum LineKind {
    Stage,
    DryRun,
    Error,
    Warn,
    Info,
    Debug,
}

impl LineKind {
    pub(super) fn classify(level: Level, target: &str) -> Self {
        match (level, target) {
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, STAGE_TARGET) => Self::Stage,
            (Level::INFO, DRY_RUN_TARGET) => Self::DryRun,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    const fn tag(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::DryRun => "    [dry run] ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Info => "    ",
            Self::Debug => "    [debug] ",
        }
    }
}

/// Banner written once at the top of a fresh log file.
pub(super) fn run_header(version: &str) -> String {
    let rule = "=".repeat(42);
    format!(
        "{rule}\naquila-install {version} {}\n{rule}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}

/// One timestamped log-file line, ANSI codes removed.
pub(super) fn render(kind: LineKind, msg: &str) -> String {
    format!(
        "[{}] {}{}",
        chrono::Utc::now().format("%H:%M:%S"),
        kind.tag(),
        strip_ansi(msg)
    )
}

/// Remove ANSI escape sequences.
///
/// CSI sequences (`ESC [` ... final byte in `@`..=`~`) are dropped whole;
/// any other escape drops only the byte that follows `ESC`.
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() == Some('[') {
            let _ = chars.by_ref().find(|ch| ('@'..='~').contains(ch));
        }
    }
    out
}
