use colored::{ColoredString, Colorize};
use std::fmt::Display;

#[derive(PartialEq, Eq)]
pub enum Status {
    Info,
    Warning,
    Error,
}

impl Status {
    fn symbol(&self) -> ColoredString {
        match self {
            Self::Info => "~".cyan(),
            Self::Warning => "!".yellow(),
            Self::Error => "!".red(),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

// Everything goes to stderr; stdout is reserved for sweep results so the
// tool stays pipeline-friendly.
pub fn status(status: &Status, message: &impl Display) {
    eprintln!("[{status}] {message}");
}

#[macro_export]
macro_rules! log_info {
    ($message:expr) => {
        $crate::io::logger::status(&$crate::io::logger::Status::Info, &$message);
    };
}

#[macro_export]
macro_rules! log_warn {
    ($message:expr) => {
        $crate::io::logger::status(&$crate::io::logger::Status::Warning, &$message);
    };
}

#[macro_export]
macro_rules! log_error {
    ($message:expr) => {
        $crate::io::logger::status(&$crate::io::logger::Status::Error, &$message);
    };
}
