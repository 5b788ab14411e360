//! Terminal and JSON rendering for upload runs
//!
//! Progress lines and summaries go to stdout and are silenced by `--quiet`.
//! Anything that makes the run fail (a failed task, a skipped entry, a setup
//! error) goes to stderr and is printed even in quiet mode. In JSON mode
//! stdout carries exactly one document, which already lists failures and
//! skipped entries, so only setup errors are echoed.

use serde::Serialize;

use cosup_core::{ObjectInfo, UploadFailure, WalkIssue};

use super::OutputConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Done,
    Failed,
    Skipped,
}

impl Mark {
    fn symbol(self) -> &'static str {
        match self {
            Self::Done => "✓",
            Self::Failed => "✗",
            Self::Skipped => "⚠",
        }
    }

    fn ansi_color(self) -> &'static str {
        match self {
            Self::Done => "32",
            Self::Failed => "31",
            Self::Skipped => "33",
        }
    }
}

/// Renders the plan, per-object results and the final summary
#[derive(Debug, Clone, Default)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn is_json(&self) -> bool {
        self.config.json
    }

    fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    fn marked(&self, mark: Mark, message: &str) -> String {
        if self.colors_enabled() {
            format!("\x1b[{}m{}\x1b[0m {message}", mark.ansi_color(), mark.symbol())
        } else {
            format!("{} {message}", mark.symbol())
        }
    }

    /// One stored object, as `bucket/key (size)`
    pub fn uploaded(&self, bucket: &str, object: &ObjectInfo) {
        self.println(&object_line(bucket, object));
    }

    /// A task that failed; always printed
    pub fn failure(&self, failure: &UploadFailure) {
        if self.config.json {
            return;
        }
        eprintln!("{}", self.marked(Mark::Failed, &failure_line(failure)));
    }

    /// An entry the walk could not plan; always printed
    pub fn skipped(&self, issue: &WalkIssue) {
        if self.config.json {
            return;
        }
        eprintln!("{}", self.marked(Mark::Skipped, &issue_line(issue)));
    }

    /// Closing line of a run where everything went through
    pub fn summary(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{}", self.marked(Mark::Done, message));
    }

    /// Closing line of a run that will exit non-zero; always printed
    pub fn incomplete(&self, message: &str) {
        if self.config.json {
            return;
        }
        eprintln!("{}", self.marked(Mark::Failed, message));
    }

    /// Error that stops the run before any upload starts
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({ "error": message });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else {
            eprintln!("{}", self.marked(Mark::Failed, message));
        }
    }

    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Plain stdout line, silenced by `--quiet`
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }
}

fn object_line(bucket: &str, object: &ObjectInfo) -> String {
    if object.is_dir {
        format!("{bucket}/{} (directory marker)", object.key)
    } else {
        format!("{bucket}/{} ({})", object.key, object.size_human)
    }
}

fn failure_line(failure: &UploadFailure) -> String {
    if failure.directory_marker {
        format!("{} (directory marker): {}", failure.key, failure.error)
    } else {
        format!("{}: {}", failure.key, failure.error)
    }
}

fn issue_line(issue: &WalkIssue) -> String {
    match &issue.path {
        Some(path) => format!("Skipped {}: {}", path.display(), issue.message),
        None => format!("Skipped entry: {}", issue.message),
    }
}
