//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use voicewatch_core::{NotificationTarget, Table};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print the members of one record
    pub fn print_members(&self, key: &str, members: &[String]) {
        match self.format {
            OutputFormat::Human => {
                println!("{}: {}", key, members.join(", "));
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"key": key, "members": members})
                );
            }
            OutputFormat::Quiet => {
                for member in members {
                    println!("{}", member);
                }
            }
        }
    }

    /// Print every record of a table
    pub fn print_records(&self, table: &Table) {
        match self.format {
            OutputFormat::Human => {
                if table.is_empty() {
                    println!("No records found.");
                    return;
                }
                for (key, members) in table {
                    println!("{} | {}", truncate(key, 24), members.join(", "));
                }
                println!("\n{} record(s)", table.len());
            }
            OutputFormat::Json => {
                let records: Vec<_> = table
                    .iter()
                    .map(|(key, members)| serde_json::json!({"key": key, "members": members}))
                    .collect();
                println!("{}", serde_json::Value::Array(records));
            }
            OutputFormat::Quiet => {
                for key in table.keys() {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print who gets notified for a subject
    pub fn print_targets(&self, subject: &str, targets: &[NotificationTarget]) {
        match self.format {
            OutputFormat::Human => {
                if targets.is_empty() {
                    println!("Nobody is watching {}.", subject);
                    return;
                }
                println!("Watchers of {}:", subject);
                for target in targets {
                    println!(
                        "  {} ({})",
                        target.watcher,
                        target.contact.as_deref().unwrap_or("no contact")
                    );
                }
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"subject": subject, "targets": targets})
                );
            }
            OutputFormat::Quiet => {
                for target in targets {
                    println!("{}", target.watcher);
                }
            }
        }
    }

    /// Print the subjects a watcher follows
    pub fn print_subjects(&self, watcher: &str, subjects: &[String]) {
        match self.format {
            OutputFormat::Human => {
                if subjects.is_empty() {
                    println!("{} is not watching anyone.", watcher);
                    return;
                }
                for subject in subjects {
                    println!("{}", subject);
                }
                println!("\n{} subject(s)", subjects.len());
            }
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"watcher": watcher, "subjects": subjects})
                );
            }
            OutputFormat::Quiet => {
                for subject in subjects {
                    println!("{}", subject);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// Truncate a string to max length, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_flags() {
        assert_eq!(OutputFormat::from_flags(false, false), OutputFormat::Human);
        assert_eq!(OutputFormat::from_flags(true, false), OutputFormat::Json);
        assert_eq!(OutputFormat::from_flags(false, true), OutputFormat::Quiet);
        // Quiet takes precedence
        assert_eq!(OutputFormat::from_flags(true, true), OutputFormat::Quiet);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("this is a long string", 10), "this is...");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate("ééééééééééé", 6), "ééé...");
    }
}
