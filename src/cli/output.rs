//! CLI output helpers: machine-readable JSON and a small human layout.

use colored::Colorize;

use crate::error::Result;

/// Emit a JSON value to stdout (machine mode).
pub fn emit_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Accumulates human-readable output lines, emitted in one go so a
/// command's output stays atomic relative to tracing on stderr.
#[derive(Debug, Default)]
pub struct HumanLayout {
    lines: Vec<String>,
}

impl HumanLayout {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.bold().to_string());
        self
    }

    pub fn line(&mut self, text: &str) -> &mut Self {
        self.lines.push(text.to_string());
        self
    }

    pub fn bullet(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("  • {text}"));
        self
    }

    pub fn kv(&mut self, key: &str, value: &str) -> &mut Self {
        self.lines.push(format!("  {}: {value}", key.dimmed()));
        self
    }

    pub fn warn(&mut self, text: &str) -> &mut Self {
        self.lines.push(format!("  {} {text}", "⚠".yellow()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }
}

pub fn emit_human(layout: HumanLayout) {
    for line in layout.lines {
        println!("{line}");
    }
}
