use chrono::DateTime;
use chrono::Utc;

use crate::error::ExecError;

pub const PLATFORM_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Facts about the machine the generated command will run on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformContext {
    pub os: String,
    pub arch: String,
    pub current_date: String,
}

impl PlatformContext {
    pub fn current() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            current_date: now.format(PLATFORM_DATE_FORMAT).to_string(),
        }
    }
}

pub trait CommandModel: Send + Sync {
    fn name(&self) -> &str;

    /// Turns a natural-language request into a single shell command.
    fn generate_command(&self, prompt: &str, context: &PlatformContext)
        -> Result<String, ExecError>;

    fn explain_command(&self, command: &str) -> Result<String, ExecError>;
}

pub trait ShellRunner: Send + Sync {
    /// Runs to completion. Success is decided by the exit status alone.
    fn run(&self, command: &str) -> Result<String, ExecError>;
}

pub trait ClipboardSink: Send + Sync {
    /// Returns a confirmation message on success.
    fn copy(&self, text: &str) -> Result<String, ExecError>;
}
