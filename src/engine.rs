use shakmaty::{CastlingMode, Chess, Move, Position, fen::Fen, san::San};

use crate::egtb::PieceSet;
use crate::error::ErrorAccumulator;
use crate::types::GameRecord;
use crate::visitor::parse_movetext_mainline;

/// Board-state capability the replayer drives. Implementations own all chess
/// rules; the replayer only counts and classifies pieces.
pub trait RulesEngine {
    /// Resets the engine to the game's starting position and queues its
    /// mainline.
    fn load(&mut self, record: &GameRecord);

    /// Plays the next queued half-move. `false` once the mainline is exhausted.
    fn apply_next(&mut self) -> bool;

    /// Pieces currently on the board as FEN symbols.
    fn piece_set(&self) -> PieceSet;

    fn piece_count(&self) -> usize {
        self.piece_set().len()
    }

    /// Notation problems found while loading the game, `; `-separated.
    fn errors(&self) -> Option<&str>;
}

/// [`RulesEngine`] backed by `shakmaty`.
///
/// The whole mainline is validated on load: an unparsable or illegal SAN is
/// recorded as an error and truncates the mainline at that point.
#[derive(Default)]
pub struct ShakmatyEngine {
    pos: Chess,
    moves: std::vec::IntoIter<Move>,
    errors: ErrorAccumulator,
}

impl ShakmatyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn starting_position(record: &GameRecord, errors: &mut ErrorAccumulator) -> Chess {
        let Some(fen) = record.header("FEN") else {
            return Chess::default();
        };

        let parsed = Fen::from_ascii(fen.as_bytes())
            .map_err(|e| e.to_string())
            .and_then(|fen| {
                fen.into_position::<Chess>(CastlingMode::Chess960)
                    .map_err(|e| e.to_string())
            });

        match parsed {
            Ok(pos) => pos,
            Err(e) => {
                errors.push(&format!("invalid FEN '{fen}': {e}"));
                Chess::default()
            }
        }
    }

    fn validate_mainline(start: &Chess, sans: &[San], errors: &mut ErrorAccumulator) -> Vec<Move> {
        let mut scratch = start.clone();
        let mut moves = Vec::with_capacity(sans.len());

        for (ply, san) in sans.iter().enumerate() {
            match san.to_move(&scratch) {
                Ok(m) => {
                    scratch.play_unchecked(m.clone());
                    moves.push(m);
                }
                Err(e) => {
                    errors.push(&format!("illegal san '{san}' at ply {}: {e}", ply + 1));
                    break;
                }
            }
        }

        moves
    }
}

impl RulesEngine for ShakmatyEngine {
    fn load(&mut self, record: &GameRecord) {
        let mut errors = ErrorAccumulator::default();
        let start = Self::starting_position(record, &mut errors);

        let parsed = parse_movetext_mainline(&record.movetext);
        if let Some(parse_error) = parsed.parse_error.as_deref() {
            errors.push(parse_error);
        }

        let moves = if errors.is_empty() {
            Self::validate_mainline(&start, &parsed.sans, &mut errors)
        } else {
            Vec::new()
        };

        self.pos = start;
        self.moves = moves.into_iter();
        self.errors = errors;
    }

    fn apply_next(&mut self) -> bool {
        match self.moves.next() {
            Some(m) => {
                self.pos.play_unchecked(m);
                true
            }
            None => false,
        }
    }

    fn piece_set(&self) -> PieceSet {
        let board = self.pos.board();
        board
            .occupied()
            .into_iter()
            .filter_map(|square| board.piece_at(square))
            .map(|piece| piece.char())
            .collect()
    }

    fn piece_count(&self) -> usize {
        self.pos.board().occupied().count()
    }

    fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }
}

/// Test double that fabricates board states from a script instead of chess
/// rules. Each movetext token is the complete piece string after that
/// half-move; `??` records a notation error and ends the script, `panic`
/// panics when played. A `Start` header replaces the 32-piece opening set.
#[cfg(test)]
#[derive(Default)]
pub(crate) struct ScriptedEngine {
    current: PieceSet,
    script: std::collections::VecDeque<String>,
    errors: ErrorAccumulator,
}

#[cfg(test)]
pub(crate) const STANDARD_PIECES: &str = "RNBQKBNRPPPPPPPPpppppppprnbqkbnr";

#[cfg(test)]
impl RulesEngine for ScriptedEngine {
    fn load(&mut self, record: &GameRecord) {
        self.current = record
            .header("Start")
            .unwrap_or(STANDARD_PIECES)
            .chars()
            .collect();
        self.errors = ErrorAccumulator::default();
        self.script.clear();

        for token in record.movetext.split_whitespace() {
            if token == "??" {
                self.errors.push("scripted notation error");
                break;
            }
            self.script.push_back(token.to_string());
        }
    }

    fn apply_next(&mut self) -> bool {
        match self.script.pop_front() {
            Some(token) if token == "panic" => panic!("scripted engine fault"),
            Some(token) => {
                self.current = token.chars().collect();
                true
            }
            None => false,
        }
    }

    fn piece_set(&self) -> PieceSet {
        self.current.clone()
    }

    fn errors(&self) -> Option<&str> {
        self.errors.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(movetext: &str) -> GameRecord {
        GameRecord {
            headers: Vec::new(),
            movetext: movetext.to_string(),
        }
    }

    fn sorted(pieces: PieceSet) -> String {
        let mut pieces: Vec<char> = pieces.into_vec();
        pieces.sort_unstable();
        pieces.into_iter().collect()
    }

    #[test]
    fn test_shakmaty_engine_starts_with_full_board() {
        let mut engine = ShakmatyEngine::new();
        engine.load(&game("1. e4 e5 *"));

        assert_eq!(engine.piece_count(), 32);
        assert_eq!(sorted(engine.piece_set()), sorted(STANDARD_PIECES.chars().collect()));
        assert!(engine.errors().is_none());
    }

    #[test]
    fn test_shakmaty_engine_tracks_captures() {
        let mut engine = ShakmatyEngine::new();
        engine.load(&game("1. e4 d5 2. exd5 Qxd5 *"));

        let mut counts = Vec::new();
        while engine.apply_next() {
            counts.push(engine.piece_count());
        }

        assert_eq!(counts, [32, 32, 31, 30]);
        assert_eq!(engine.piece_set().iter().filter(|&&p| p == 'P').count(), 7);
        assert_eq!(engine.piece_set().iter().filter(|&&p| p == 'p').count(), 7);
    }

    #[test]
    fn test_shakmaty_engine_records_illegal_move_and_truncates() {
        let mut engine = ShakmatyEngine::new();
        engine.load(&game("1. e4 e5 2. Ke3 Nc6 *"));

        assert!(engine.errors().is_some_and(|e| e.contains("Ke3")));
        assert!(engine.apply_next());
        assert!(engine.apply_next());
        assert!(!engine.apply_next());
    }

    #[test]
    fn test_shakmaty_engine_reload_resets_state() {
        let mut engine = ShakmatyEngine::new();
        engine.load(&game("1. e4 d5 2. Kf3 *"));
        assert!(engine.errors().is_some());

        engine.load(&game("1. d4 *"));
        assert!(engine.errors().is_none());
        assert!(engine.apply_next());
        assert!(!engine.apply_next());
        assert_eq!(engine.piece_count(), 32);
    }

    #[test]
    fn test_shakmaty_engine_honours_fen_header() {
        let record = GameRecord {
            headers: vec![(
                "FEN".to_string(),
                "4k3/8/8/8/8/8/4P3/4K3 w - - 0 1".to_string(),
            )],
            movetext: "1. e4 Kd7 *".to_string(),
        };
        let mut engine = ShakmatyEngine::new();
        engine.load(&record);

        assert_eq!(engine.piece_count(), 3);
        assert!(engine.apply_next());
        assert!(engine.apply_next());
        assert!(engine.errors().is_none());
    }

    #[test]
    fn test_shakmaty_engine_invalid_fen_is_an_error() {
        let record = GameRecord {
            headers: vec![("FEN".to_string(), "not a fen".to_string())],
            movetext: "1. e4 *".to_string(),
        };
        let mut engine = ShakmatyEngine::new();
        engine.load(&record);

        assert!(engine.errors().is_some_and(|e| e.starts_with("invalid FEN")));
        assert!(!engine.apply_next());
    }

    #[test]
    fn test_scripted_engine_plays_script() {
        let mut engine = ScriptedEngine::default();
        engine.load(&GameRecord {
            headers: vec![("Start".to_string(), "KQkq".to_string())],
            movetext: "KQkq KQk ?? Kk".to_string(),
        });

        assert_eq!(engine.piece_count(), 4);
        assert!(engine.apply_next());
        assert!(engine.apply_next());
        assert_eq!(engine.piece_count(), 3);
        assert!(!engine.apply_next());
        assert!(engine.errors().is_some());
    }
}
