//! Pipeline-boundary error type.
//!
//! Everything that can abort a command ends up as an `AppError` carrying the
//! process exit code. Recoverable conditions (retries, dropped records,
//! skipped files) never become an `AppError`; they are logged and counted.

/// Bad configuration, unreadable input directory, missing artifacts.
pub const EXIT_INPUT: u8 = 2;
/// The run finished but there was nothing usable to work with.
pub const EXIT_NO_DATA: u8 = 3;
/// Upstream or model failure.
pub const EXIT_UPSTREAM: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::new(EXIT_INPUT, message)
    }

    pub fn no_data(message: impl Into<String>) -> Self {
        Self::new(EXIT_NO_DATA, message)
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::new(EXIT_UPSTREAM, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
