use crate::timecontrol::categorize_timecontrol;
use crate::types::{GameRecord, TimeControlClass};

const TERMINATION_TAG: &str = "Termination";
const ABANDONED: &str = "Abandoned";
const WHITE_ELO_TAG: &str = "WhiteElo";
const BLACK_ELO_TAG: &str = "BlackElo";
const TIME_CONTROL_TAG: &str = "TimeControl";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    Abandoned,
    RatingOutOfRange,
    ExcludedTimeControl(TimeControlClass),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterDecision {
    Include(TimeControlClass),
    Skip(SkipReason),
}

pub fn is_abandoned(record: &GameRecord) -> bool {
    record.header(TERMINATION_TAG) == Some(ABANDONED)
}

fn parse_rating(raw: Option<&str>) -> Option<i32> {
    raw?.trim().parse().ok()
}

/// Both ratings must be integers inside `[lo, hi]`. Missing tags and values
/// such as `?` count as out of range.
pub fn is_in_elo_range(record: &GameRecord, lo: i32, hi: i32) -> bool {
    let range = lo..=hi;
    match (
        parse_rating(record.header(WHITE_ELO_TAG)),
        parse_rating(record.header(BLACK_ELO_TAG)),
    ) {
        (Some(white), Some(black)) => range.contains(&white) && range.contains(&black),
        _ => false,
    }
}

pub fn time_control(record: &GameRecord) -> TimeControlClass {
    categorize_timecontrol(record.header(TIME_CONTROL_TAG))
}

/// Record-level gate in front of the replay workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameFilter {
    lo_elo: i32,
    hi_elo: i32,
    excluded: [bool; 4],
}

impl GameFilter {
    pub fn new(lo_elo: i32, hi_elo: i32, exclude: &[TimeControlClass]) -> Self {
        let mut excluded = [false; 4];
        for class in exclude {
            excluded[class.index()] = true;
        }
        Self {
            lo_elo,
            hi_elo,
            excluded,
        }
    }

    pub fn is_excluded(&self, class: TimeControlClass) -> bool {
        self.excluded[class.index()]
    }

    pub fn evaluate(&self, record: &GameRecord) -> FilterDecision {
        if is_abandoned(record) {
            return FilterDecision::Skip(SkipReason::Abandoned);
        }
        if !is_in_elo_range(record, self.lo_elo, self.hi_elo) {
            return FilterDecision::Skip(SkipReason::RatingOutOfRange);
        }

        let class = time_control(record);
        if self.is_excluded(class) {
            FilterDecision::Skip(SkipReason::ExcludedTimeControl(class))
        } else {
            FilterDecision::Include(class)
        }
    }
}
