//! Colored output helpers for CLI
//!
//! Status lines go to stderr so that stdout carries only the research answer
//! (or JSON) and can be piped.

use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the name and version line
    pub fn banner(&self) {
        if self.colored {
            eprintln!(
                "\n   {} {}\n",
                "deepsearch".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
        } else {
            eprintln!("\n   deepsearch v{}\n", env!("CARGO_PKG_VERSION"));
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✓".green().bold(), message.green());
        } else {
            eprintln!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "•".blue(), message);
        } else {
            eprintln!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            eprintln!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a file creation message
    pub fn created(&self, file_type: &str, path: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "create".green().bold(),
                format!("[{}]", file_type).dimmed(),
                path
            );
        } else {
            eprintln!("  [CREATE] [{}] {}", file_type, path);
        }
    }

    /// Print a skipped file message
    pub fn skipped(&self, path: &str, reason: &str) {
        if self.colored {
            eprintln!(
                "  {} {} {}",
                "skip".yellow().bold(),
                path,
                format!("({})", reason).dimmed()
            );
        } else {
            eprintln!("  [SKIP] {} ({})", path, reason);
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.colored {
            eprintln!("\n{}", title.bright_white().bold().underline());
        } else {
            eprintln!("\n{}\n{}", title, "=".repeat(title.chars().count()));
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            eprintln!("  {}: {}", key.cyan(), value);
        } else {
            eprintln!("  {}: {}", key, value);
        }
    }

    /// Print a hint message
    pub fn hint(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "hint:".dimmed(), message.dimmed());
        } else {
            eprintln!("  hint: {}", message);
        }
    }

    /// Print a command example
    pub fn command(&self, cmd: &str) {
        if self.colored {
            eprintln!("    {} {}", "$".dimmed(), cmd.bright_white());
        } else {
            eprintln!("    $ {}", cmd);
        }
    }

    /// Print a completion message
    pub fn complete(&self, message: &str) {
        if self.colored {
            eprintln!("\n  {} {}\n", "✓".green().bold(), message.green().bold());
        } else {
            eprintln!("\n  [DONE] {}\n", message);
        }
    }

    /// Print the research answer to stdout
    pub fn answer(&self, text: &str) {
        println!("{}", text.trim_end());
    }

    /// Show the chat prompt and read one line.
    ///
    /// Returns `None` on EOF or read failure.
    pub fn prompt(&self) -> Option<String> {
        if self.colored {
            eprint!("{} ", "?>".bright_cyan().bold());
        } else {
            eprint!("?> ");
        }
        io::stderr().flush().ok();

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(input),
        }
    }

    /// Print newline
    pub fn newline(&self) {
        eprintln!();
    }
}

/// Whether a chat line asks to end the session
pub fn is_exit_command(line: &str) -> bool {
    matches!(line.trim().to_lowercase().as_str(), "exit" | "quit" | ":q")
}
