use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use crate::egtb::egtb_name_from_pieces;
use crate::engine::RulesEngine;
use crate::types::GameRecord;

pub const STARTING_PIECES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum UnsuitableReason {
    /// Fewer than `captures + 2` half-moves.
    TooShort,
    /// The mainline ended before the target piece count.
    NeverReached,
    /// The rules engine reported bad notation.
    IllegalMoves,
    /// The target position is the last one of the game.
    Terminal,
    /// The next half-move captures again.
    Trivializable,
    /// The rules engine panicked on this record.
    EngineFault,
}

impl UnsuitableReason {
    pub const ALL: [UnsuitableReason; 6] = [
        Self::TooShort,
        Self::NeverReached,
        Self::IllegalMoves,
        Self::Terminal,
        Self::Trivializable,
        Self::EngineFault,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TooShort => "too_short",
            Self::NeverReached => "never_reached",
            Self::IllegalMoves => "illegal_moves",
            Self::Terminal => "terminal",
            Self::Trivializable => "trivializable",
            Self::EngineFault => "engine_fault",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for UnsuitableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Suitable(String),
    Unsuitable(UnsuitableReason),
}

/// Replays a game until `captures` pieces have left the board and names the
/// tablebase for that position.
///
/// The first capture can happen on half-move 3 at the earliest, so
/// `captures + 2` half-moves are played before the piece count is checked.
/// The position only counts if one more half-move exists and that move does
/// not capture.
pub fn play_game<E>(engine: &mut E, record: &GameRecord, captures: u32) -> Outcome
where
    E: RulesEngine + ?Sized,
{
    engine.load(record);

    for _ in 0..captures.saturating_add(2) {
        if !engine.apply_next() {
            return Outcome::Unsuitable(UnsuitableReason::TooShort);
        }
    }

    let target = STARTING_PIECES.saturating_sub(captures as usize);
    while engine.piece_count() != target {
        if !engine.apply_next() {
            return Outcome::Unsuitable(UnsuitableReason::NeverReached);
        }
    }

    if engine.errors().is_some() {
        return Outcome::Unsuitable(UnsuitableReason::IllegalMoves);
    }

    let reached = engine.piece_set();

    if !engine.apply_next() {
        return Outcome::Unsuitable(UnsuitableReason::Terminal);
    }
    if engine.piece_count() < reached.len() {
        return Outcome::Unsuitable(UnsuitableReason::Trivializable);
    }

    Outcome::Suitable(egtb_name_from_pieces(reached))
}

/// Per-worker replayer. Owns one engine and survives engine panics: a
/// panicking record resolves to [`UnsuitableReason::EngineFault`].
pub struct Replayer<E> {
    engine: E,
    captures: u32,
}

impl<E: RulesEngine> Replayer<E> {
    pub fn new(engine: E, captures: u32) -> Self {
        Self { engine, captures }
    }

    pub fn replay(&mut self, record: &GameRecord) -> Outcome {
        let captures = self.captures;
        let engine = &mut self.engine;
        panic::catch_unwind(AssertUnwindSafe(|| play_game(engine, record, captures)))
            .unwrap_or(Outcome::Unsuitable(UnsuitableReason::EngineFault))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{STANDARD_PIECES, ScriptedEngine, ShakmatyEngine};

    fn game(movetext: &str) -> GameRecord {
        GameRecord {
            headers: Vec::new(),
            movetext: movetext.to_string(),
        }
    }

    fn scripted(start: &str, script: &[&str]) -> GameRecord {
        GameRecord {
            headers: vec![("Start".to_string(), start.to_string())],
            movetext: script.join(" "),
        }
    }

    fn real(movetext: &str, captures: u32) -> Outcome {
        play_game(&mut ShakmatyEngine::new(), &game(movetext), captures)
    }

    #[test]
    fn test_rejects_game_shorter_than_captures_plus_two() {
        assert_eq!(
            real("1. e4 d5 *", 1),
            Outcome::Unsuitable(UnsuitableReason::TooShort)
        );

        // Exactly captures + 2 half-moves is enough to start counting.
        let record = scripted(STANDARD_PIECES, &[STANDARD_PIECES; 3]);
        assert_eq!(
            play_game(&mut ScriptedEngine::default(), &record, 1),
            Outcome::Unsuitable(UnsuitableReason::NeverReached)
        );
    }

    #[test]
    fn test_rejects_game_that_never_reaches_target() {
        assert_eq!(
            real("1. e4 e5 2. Nf3 Nc6 3. Bb5 a6 *", 1),
            Outcome::Unsuitable(UnsuitableReason::NeverReached)
        );
    }

    #[test]
    fn test_rejects_terminal_position() {
        assert_eq!(
            real("1. e4 d5 2. exd5 Qxd5 0-1", 2),
            Outcome::Unsuitable(UnsuitableReason::Terminal)
        );
    }

    #[test]
    fn test_rejects_trivializable_position() {
        assert_eq!(
            real("1. e4 d5 2. exd5 Qxd5 3. Nc3 *", 1),
            Outcome::Unsuitable(UnsuitableReason::Trivializable)
        );
    }

    #[test]
    fn test_rejects_game_with_illegal_moves() {
        assert_eq!(
            real("1. e4 d5 2. exd5 Qxd5 3. Ke3 Nf6 *", 2),
            Outcome::Unsuitable(UnsuitableReason::IllegalMoves)
        );
    }

    #[test]
    fn test_classifies_stable_position() {
        assert_eq!(
            real("1. e4 d5 2. exd5 Qxd5 3. Nc3 Qa5 *", 2),
            Outcome::Suitable("KQRRBBNNPPPPPPPvKQRRBBNNPPPPPPP".to_string())
        );
    }

    #[test]
    fn test_scripted_endgame_entry() {
        let mut script = vec!["KRPPkrp"; 28];
        script.extend(["KRPkr", "KRPkr"]);
        let record = scripted("KRPPkrp", &script);

        assert_eq!(
            play_game(&mut ScriptedEngine::default(), &record, 27),
            Outcome::Suitable("KRPvKR".to_string())
        );
    }

    #[test]
    fn test_illegal_moves_checked_before_terminal() {
        let mut script = vec!["KQkq"; 30];
        script.extend(["KQk", "??"]);
        let record = scripted("KQkq", &script);

        assert_eq!(
            play_game(&mut ScriptedEngine::default(), &record, 29),
            Outcome::Unsuitable(UnsuitableReason::IllegalMoves)
        );
    }

    #[test]
    fn test_huge_capture_count_is_too_short() {
        let record = scripted(STANDARD_PIECES, &[STANDARD_PIECES; 3]);
        assert_eq!(
            play_game(&mut ScriptedEngine::default(), &record, u32::MAX),
            Outcome::Unsuitable(UnsuitableReason::TooShort)
        );
    }

    #[test]
    fn test_replayer_turns_engine_panic_into_fault() {
        let mut replayer = Replayer::new(ScriptedEngine::default(), 1);
        let faulty = scripted(STANDARD_PIECES, &["panic"]);

        assert_eq!(
            replayer.replay(&faulty),
            Outcome::Unsuitable(UnsuitableReason::EngineFault)
        );

        // The same replayer keeps working afterwards.
        let ok = scripted(STANDARD_PIECES, &[STANDARD_PIECES, STANDARD_PIECES]);
        assert_eq!(
            replayer.replay(&ok),
            Outcome::Unsuitable(UnsuitableReason::TooShort)
        );
    }
}
