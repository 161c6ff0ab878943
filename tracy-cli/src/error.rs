//! Error handling for the tracy CLI

use std::path::PathBuf;
use thiserror::Error;
use tracy_core::TracyError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Analysis(#[from] TracyError),
}

impl CliError {
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io { message: message.into() }
    }

    pub fn file_not_found(path: PathBuf) -> Self {
        Self::FileNotFound { path }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::io(err.to_string())
    }
}

impl From<toml::de::Error> for CliError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(format!("TOML parsing error: {}", err))
    }
}

impl From<toml::ser::Error> for CliError {
    fn from(err: toml::ser::Error) -> Self {
        Self::config(format!("TOML serialization error: {}", err))
    }
}

pub type CliResult<T> = Result<T, CliError>;

/// Error message followed by hints for the common failure modes
pub fn format_error_with_suggestions(error: &CliError) -> String {
    let mut message = error.to_string();

    match error {
        CliError::FileNotFound { path } | CliError::Analysis(TracyError::InputMissing { path }) => {
            message.push_str(&format!(
                "\n\nSuggestions:\n\
                 • Check that the file path is correct: {}\n\
                 • Ensure you have read permissions for the file\n\
                 • Compressed FASTA references need a .gz extension",
                path.display()
            ));
        }

        CliError::Analysis(TracyError::UnknownFormat(_)) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Run the base caller first and pass its JSON output\n\
                 • Ensure the file is not corrupted or truncated",
            );
        }

        CliError::Analysis(TracyError::NoReferenceMatch { .. }) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check that the trace comes from the supplied genome\n\
                 • Lower --support or --kmer for short or noisy traces\n\
                 • Reduce --trim-left/--trim-right if few bases remain",
            );
        }

        CliError::Analysis(TracyError::Decomposition(_)) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Raise --maxindel if a larger indel is expected\n\
                 • Trim low-quality trace ends with --trim-left/--trim-right",
            );
        }

        CliError::Config { .. } | CliError::Analysis(TracyError::Configuration(_)) => {
            message.push_str(
                "\n\nSuggestions:\n\
                 • Check your tracy.toml configuration file\n\
                 • Use 'tracy config' to print a sample configuration\n\
                 • Verify that all configuration values are valid",
            );
        }

        _ => {}
    }

    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CliError::config("test message");
        assert!(matches!(err, CliError::Config { .. }));
        assert_eq!(err.to_string(), "Configuration error: test message");
    }

    #[test]
    fn test_error_suggestions() {
        let err = CliError::file_not_found(PathBuf::from("genome.fa"));
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.contains("Suggestions:"));
        assert!(formatted.contains("Check that the file path is correct"));

        let err = CliError::from(TracyError::NoReferenceMatch { support: 1, required: 3 });
        let formatted = format_error_with_suggestions(&err);
        assert!(formatted.starts_with("No reference match"));
        assert!(formatted.contains("--support"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let cli_err: CliError = io_err.into();
        assert!(matches!(cli_err, CliError::Io { .. }));
    }
}
