use serde::{Deserialize, Serialize};

/// Constructs an Error::Parse for the given format string.
#[macro_export]
macro_rules! errparse {
    ($($args:tt)*) => {
        $crate::error::Error::Parse(format!($($args)*)).into()
    };
}

/// Constructs an Error::InvalidInput for the given format string.
#[macro_export]
macro_rules! errinput {
    ($($args:tt)*) => {
        $crate::error::Error::InvalidInput(format!($($args)*)).into()
    };
}

/// trippySQL errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Error {
    /// A statement failed to parse. The message names the offending clause,
    /// e.g. "at WHERE: empty WHERE clause", and is displayed verbatim.
    Parse(String),
    /// Invalid user input outside of a SQL statement, e.g. shell commands or
    /// configuration values.
    InvalidInput(String),
    /// An IO error.
    IO(String),
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Parse(msg) => write!(f, "{msg}"),
            Error::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            Error::IO(msg) => write!(f, "io error: {msg}"),
        }
    }
}

/// A trippySQL Result returning Error.
pub type Result<T> = std::result::Result<T, Error>;

impl<T> From<Error> for Result<T> {
    fn from(error: Error) -> Self {
        Err(error)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<log::ParseLevelError> for Error {
    fn from(err: log::ParseLevelError) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<log::SetLoggerError> for Error {
    fn from(err: log::SetLoggerError) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<rustyline::error::ReadlineError> for Error {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidInput(err.to_string())
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Error::IO(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IO(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_display_verbatim() {
        let error = Error::Parse("at WHERE: empty WHERE clause".into());
        assert_eq!(error.to_string(), "at WHERE: empty WHERE clause");
    }

    #[test]
    fn macros_build_err_results() {
        let result: Result<()> = errparse!("at {}: expected '='", "UPDATE");
        assert_eq!(result, Err(Error::Parse("at UPDATE: expected '='".into())));

        let result: Result<()> = errinput!("unknown command {}", "!foo");
        assert_eq!(result, Err(Error::InvalidInput("unknown command !foo".into())));
    }
}
