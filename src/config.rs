use std::num::NonZeroUsize;
use std::thread;

use crate::error::ConfigError;
use crate::filter::GameFilter;
use crate::types::TimeControlClass;

/// 32 starting pieces minus 7 remaining.
pub const REQUIRED_CAPTURES_7_MAN: u32 = 25;
pub const DEFAULT_LO_ELO: i32 = 2000;
pub const DEFAULT_HI_ELO: i32 = 4000;

pub const WORK_QUEUE_CAPACITY: usize = 10_000;
pub const RESULTS_QUEUE_CAPACITY: usize = 1_000;

/// One producer and one collector run next to the workers.
pub fn default_workers() -> usize {
    let cpus = thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1);
    cpus.saturating_sub(2).max(2)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    pub lo_elo: i32,
    pub hi_elo: i32,
    pub exclude: Vec<TimeControlClass>,
    pub captures: u32,
    pub workers: usize,
}

impl AnalysisConfig {
    pub fn new(
        lo_elo: i32,
        hi_elo: i32,
        exclude: Vec<TimeControlClass>,
        captures: u32,
    ) -> Result<Self, ConfigError> {
        if lo_elo >= hi_elo {
            return Err(ConfigError::RatingRange {
                lo: lo_elo,
                hi: hi_elo,
            });
        }
        if !(1..30).contains(&captures) {
            return Err(ConfigError::Captures(captures));
        }

        Ok(Self {
            lo_elo,
            hi_elo,
            exclude,
            captures,
            workers: default_workers(),
        })
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn filter(&self) -> GameFilter {
        GameFilter::new(self.lo_elo, self.hi_elo, &self.exclude)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lo_elo: DEFAULT_LO_ELO,
            hi_elo: DEFAULT_HI_ELO,
            exclude: Vec::new(),
            captures: REQUIRED_CAPTURES_7_MAN,
            workers: default_workers(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_inverted_or_equal_ratings() {
        assert_eq!(
            AnalysisConfig::new(2500, 2500, Vec::new(), 25),
            Err(ConfigError::RatingRange { lo: 2500, hi: 2500 })
        );
        assert!(AnalysisConfig::new(3000, 2000, Vec::new(), 25).is_err());
    }

    #[test]
    fn test_capture_bounds_are_exclusive() {
        assert_eq!(
            AnalysisConfig::new(0, 1, Vec::new(), 0),
            Err(ConfigError::Captures(0))
        );
        assert_eq!(
            AnalysisConfig::new(0, 1, Vec::new(), 30),
            Err(ConfigError::Captures(30))
        );
        assert!(AnalysisConfig::new(0, 1, Vec::new(), 1).is_ok());
        assert!(AnalysisConfig::new(0, 1, Vec::new(), 29).is_ok());
    }

    #[test]
    fn test_default_workers_is_at_least_two() {
        assert!(default_workers() >= 2);
        assert!(AnalysisConfig::default().workers >= 2);
    }

    #[test]
    fn test_with_workers_never_zero() {
        let config = AnalysisConfig::default().with_workers(0);
        assert_eq!(config.workers, 1);
    }
}
