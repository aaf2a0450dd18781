use crate::types::TimeControlClass;

/// Marker used by Lichess for correspondence games and games without a clock.
pub const NO_CLOCK_MARKER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Missing tag or a format this tool does not understand.
    Unknown,
    /// `-`: no fixed clock.
    Unlimited,
    /// `<base>+<increment>`; only the base in seconds is kept.
    Normal { base_seconds: u32 },
}

fn parse_u32(s: &str) -> Option<u32> {
    s.trim().parse().ok()
}

/// Parses the `TimeControl` tag. Only the `<base>+<increment>` form is
/// recognised, with exactly one `+` and a numeric base; the increment is
/// not inspected. Everything else is [`Mode::Unknown`].
pub fn parse_timecontrol(raw: Option<&str>) -> Mode {
    let Some(input) = raw.map(str::trim) else {
        return Mode::Unknown;
    };

    if input == NO_CLOCK_MARKER {
        return Mode::Unlimited;
    }

    let Some((base, increment)) = input.split_once('+') else {
        return Mode::Unknown;
    };
    if increment.contains('+') {
        return Mode::Unknown;
    }

    match parse_u32(base) {
        Some(base_seconds) => Mode::Normal { base_seconds },
        None => Mode::Unknown,
    }
}

/// Class by starting time only; the increment does not move a game between
/// classes.
pub fn category_from_mode(mode: Mode) -> TimeControlClass {
    match mode {
        Mode::Normal { base_seconds } => match base_seconds {
            0..=60 => TimeControlClass::Bullet,
            61..=300 => TimeControlClass::Blitz,
            301..=900 => TimeControlClass::Rapid,
            _ => TimeControlClass::Slow,
        },
        Mode::Unknown | Mode::Unlimited => TimeControlClass::Slow,
    }
}

pub fn categorize_timecontrol(raw: Option<&str>) -> TimeControlClass {
    category_from_mode(parse_timecontrol(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_base_and_increment() {
        assert_eq!(
            parse_timecontrol(Some("180+2")),
            Mode::Normal { base_seconds: 180 }
        );
        assert_eq!(parse_timecontrol(Some("-")), Mode::Unlimited);
        assert_eq!(parse_timecontrol(None), Mode::Unknown);
        assert_eq!(parse_timecontrol(Some("40/7200:3600")), Mode::Unknown);
        assert_eq!(parse_timecontrol(Some("x+5")), Mode::Unknown);
        assert_eq!(parse_timecontrol(Some("300+5+3")), Mode::Unknown);
        assert_eq!(parse_timecontrol(Some("300")), Mode::Unknown);
    }

    #[test]
    fn test_category_threshold_boundaries() {
        assert_eq!(categorize_timecontrol(Some("0+1")), TimeControlClass::Bullet);
        assert_eq!(categorize_timecontrol(Some("60+0")), TimeControlClass::Bullet);
        assert_eq!(categorize_timecontrol(Some("61+0")), TimeControlClass::Blitz);
        assert_eq!(categorize_timecontrol(Some("300+0")), TimeControlClass::Blitz);
        assert_eq!(categorize_timecontrol(Some("301+0")), TimeControlClass::Rapid);
        assert_eq!(categorize_timecontrol(Some("900+0")), TimeControlClass::Rapid);
        assert_eq!(categorize_timecontrol(Some("901+0")), TimeControlClass::Slow);
    }

    #[test]
    fn test_category_ignores_increment() {
        assert_eq!(categorize_timecontrol(Some("60+30")), TimeControlClass::Bullet);
        assert_eq!(categorize_timecontrol(Some("300+x")), TimeControlClass::Blitz);
        assert_eq!(categorize_timecontrol(Some("600+")), TimeControlClass::Rapid);
    }

    #[test]
    fn test_category_no_clock_and_garbage_are_slow() {
        assert_eq!(categorize_timecontrol(Some("-")), TimeControlClass::Slow);
        assert_eq!(categorize_timecontrol(Some("G/90")), TimeControlClass::Slow);
        assert_eq!(categorize_timecontrol(Some("")), TimeControlClass::Slow);
        assert_eq!(categorize_timecontrol(None), TimeControlClass::Slow);
    }
}
