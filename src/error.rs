use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Archive-level failures. Fatal for the file being analysed, never for a batch.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("Unsupported extension '{extension}' for '{path}'")]
    UnsupportedExtension { path: PathBuf, extension: String },

    #[error("Failed to open file '{path}': {source}")]
    Open { path: PathBuf, source: io::Error },

    #[error("Failed to initialize {codec} decoder for '{path}': {source}")]
    Decoder {
        path: PathBuf,
        codec: &'static str,
        source: io::Error,
    },

    #[error("Read error in '{path}' after {games} games: {source}")]
    Read {
        path: PathBuf,
        games: u64,
        source: io::Error,
    },
}

/// Invalid analysis settings, detected before any file is touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "Lower ELO threshold cannot be higher than or equal to higher ELO threshold ({lo} >= {hi})"
    )]
    RatingRange { lo: i32, hi: i32 },

    #[error("Invalid number of captures: {0} (expected 0 < captures < 30)")]
    Captures(u32),

    #[error("Unknown time control class '{0}' (expected bullet, blitz, rapid or slow)")]
    TimeControlClass(String),
}

impl ConfigError {
    /// Process exit code used by the command line tool.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::RatingRange { .. } => 1,
            Self::Captures(_) => 2,
            Self::TimeControlClass(_) => 3,
        }
    }
}

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("Failed to access stats file '{path}': {source}")]
    Io { path: PathBuf, source: io::Error },

    #[error("Malformed stats file '{path}': {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Stats file '{0}' has neither an 'EGTB' nor an 'EGTB_most_games' section")]
    MissingEgtb(PathBuf),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Failure of a single file run: either the archive or its artifact.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Stats(#[from] StatsError),
}

#[derive(Debug, Clone, Default)]
pub struct ErrorAccumulator(Option<String>);

impl ErrorAccumulator {
    pub fn push(&mut self, msg: &str) {
        match &mut self.0 {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(msg);
            }
            None => {
                self.0 = Some(msg.to_string());
            }
        }
    }

    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_multiple_messages_uses_separator() {
        let mut accumulator = ErrorAccumulator::default();
        accumulator.push("illegal san 'Qxh9'");
        accumulator.push("ambiguous san 'Nd2'");

        assert_eq!(
            accumulator.as_deref(),
            Some("illegal san 'Qxh9'; ambiguous san 'Nd2'")
        );
    }

    #[test]
    fn test_empty_accumulator() {
        let mut accumulator = ErrorAccumulator::default();
        assert!(accumulator.is_empty());
        assert!(accumulator.as_deref().is_none());

        accumulator.push("error");
        assert!(!accumulator.is_empty());
        assert_eq!(accumulator.as_deref(), Some("error"));
    }

    #[test]
    fn test_config_error_exit_codes_match_cli_contract() {
        assert_eq!(ConfigError::RatingRange { lo: 10, hi: 5 }.exit_code(), 1);
        assert_eq!(ConfigError::Captures(30).exit_code(), 2);
    }

    #[test]
    fn test_format_error_message_names_extension() {
        let err = FormatError::UnsupportedExtension {
            path: PathBuf::from("games.rar"),
            extension: "rar".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported extension 'rar' for 'games.rar'");
    }
}
