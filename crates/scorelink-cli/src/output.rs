//! Terminal output for the `scorelink` commands
//!
//! Human mode prints marked lines to stdout and errors to stderr. JSON mode
//! prints one document per command and nothing else on stdout, so the
//! result can be piped straight into `jq`.

use serde_json::{json, Value};

const MARK_OK: char = '\u{2713}';
const MARK_FAILED: char = '\u{2717}';

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn is_json(&self) -> bool {
        matches!(self, OutputFormat::Json)
    }
}

/// Sink for everything a command reports
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn info(&self, message: &str);
    /// A titled block of indented lines, separated from what came before
    fn section(&self, title: &str, lines: &[String]);
    /// Outcome of one checked step of a longer run
    fn step(&self, name: &str, ok: bool);
    fn print_json(&self, value: &Value);
}

fn marked(ok: bool, message: &str) -> String {
    let mark = if ok { MARK_OK } else { MARK_FAILED };
    format!("{mark} {message}")
}

fn section_lines(title: &str, lines: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 2);
    out.push(String::new());
    out.push(title.to_string());
    out.extend(lines.iter().map(|line| format!("  {line}")));
    out
}

fn envelope(ok: bool, message: &str) -> Value {
    if ok {
        json!({ "success": true, "message": message })
    } else {
        json!({ "success": false, "error": message })
    }
}

pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("{}", marked(true, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", marked(false, &format!("Error: {message}")));
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn section(&self, title: &str, lines: &[String]) {
        for line in section_lines(title, lines) {
            println!("{line}");
        }
    }
    fn step(&self, name: &str, ok: bool) {
        println!("{}", marked(ok, name));
    }
    fn print_json(&self, _value: &Value) {}
}

pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!("{}", envelope(true, message));
    }
    fn error(&self, message: &str) {
        eprintln!("{}", envelope(false, message));
    }
    fn info(&self, _message: &str) {}
    fn section(&self, _title: &str, _lines: &[String]) {}
    fn step(&self, _name: &str, _ok: bool) {}
    fn print_json(&self, value: &Value) {
        println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marked_lines() {
        assert_eq!(marked(true, "initial push"), "\u{2713} initial push");
        assert_eq!(marked(false, "reconnect"), "\u{2717} reconnect");
    }

    #[test]
    fn test_section_indents_body_after_blank_line() {
        let lines = section_lines("Primary board", &["Team A  3".to_string()]);
        assert_eq!(lines, vec!["", "Primary board", "  Team A  3"]);
    }

    #[test]
    fn test_envelope_shapes() {
        assert_eq!(
            envelope(true, "saved"),
            json!({ "success": true, "message": "saved" })
        );
        assert_eq!(
            envelope(false, "no database"),
            json!({ "success": false, "error": "no database" })
        );
    }
}
