pub mod config;
pub mod egtb;
pub mod engine;
pub mod error;
pub mod filter;
pub mod log;
pub mod pipeline;
pub mod reader;
pub mod replay;
pub mod stats;
pub mod timecontrol;
pub mod types;
pub mod visitor;

pub use config::AnalysisConfig;
pub use egtb::{egtb_name_from_pieces, material_diff};
pub use engine::{RulesEngine, ShakmatyEngine};
pub use error::{AnalysisError, ConfigError, FormatError, StatsError};
pub use pipeline::{RunReport, analyse_file, analyse_file_with, analyse_path};
pub use replay::{Outcome, UnsuitableReason};
pub use stats::{CumulativeStats, RunStats, combine};
pub use types::{GameRecord, TimeControlClass};
