use std::io;
use std::ops::ControlFlow;

use pgn_reader::{Nag, RawComment, Reader, SanPlus, Skip, Visitor};
use shakmaty::san::San;
use smallvec::SmallVec;

pub type SanList = SmallVec<[San; 128]>;

macro_rules! pgn_visitor_skip_variations {
    () => {
        fn nag(&mut self, _: &mut Self::Movetext, _: Nag) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn partial_comment(
            &mut self,
            _: &mut Self::Movetext,
            _: RawComment<'_>,
        ) -> ControlFlow<Self::Output> {
            ControlFlow::Continue(())
        }

        fn begin_variation(&mut self, _: &mut Self::Movetext) -> ControlFlow<Self::Output, Skip> {
            ControlFlow::Continue(Skip(true))
        }
    };
}

/// Collects the mainline SAN tokens of a movetext, dropping comments, NAGs
/// and variations.
#[derive(Default)]
pub struct MainlineVisitor {
    sans: SanList,
}

impl Visitor for MainlineVisitor {
    type Tags = ();
    type Movetext = ();
    type Output = ();

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        self.sans.clear();
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, _tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(())
    }

    fn san(
        &mut self,
        _movetext: &mut Self::Movetext,
        san_plus: SanPlus,
    ) -> ControlFlow<Self::Output> {
        self.sans.push(san_plus.san);
        ControlFlow::Continue(())
    }

    pgn_visitor_skip_variations!();

    fn end_game(&mut self, _movetext: Self::Movetext) -> Self::Output {}
}

pub struct ParsedMovetext {
    pub sans: SanList,
    pub parse_error: Option<String>,
}

/// Reads the mainline out of a single-game movetext string.
pub fn parse_movetext_mainline(movetext: &str) -> ParsedMovetext {
    if movetext.trim().is_empty() {
        return ParsedMovetext {
            sans: SanList::new(),
            parse_error: None,
        };
    }

    let mut reader = Reader::new(io::Cursor::new(movetext.as_bytes()));
    let mut visitor = MainlineVisitor::default();

    let parse_error = match reader.read_game(&mut visitor) {
        Ok(Some(())) => None,
        Ok(None) => Some("movetext contained no game".to_string()),
        Err(e) => Some(format!("movetext read error: {e}")),
    };

    ParsedMovetext {
        sans: visitor.sans,
        parse_error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sans(movetext: &str) -> Vec<String> {
        parse_movetext_mainline(movetext)
            .sans
            .iter()
            .map(ToString::to_string)
            .collect()
    }

    #[test]
    fn test_mainline_basic() {
        assert_eq!(sans("1. e4 e5 2. Nf3 Nc6 1-0"), ["e4", "e5", "Nf3", "Nc6"]);
    }

    #[test]
    fn test_mainline_skips_lichess_annotations() {
        let movetext = "1. d4 { [%eval 0.25] [%clk 0:03:00] } 1... Nf6 { [%eval 0.22] } 2. c4 $1 *";
        assert_eq!(sans(movetext), ["d4", "Nf6", "c4"]);
    }

    #[test]
    fn test_mainline_skips_variations() {
        assert_eq!(sans("1. e4 (1. d4 d5) 1... c5 (1... e5 2. Nf3) 2. Nf3 *"), [
            "e4", "c5", "Nf3"
        ]);
    }

    #[test]
    fn test_mainline_strips_check_suffixes() {
        assert_eq!(sans("1. e4 f5 2. Qh5+ g6 *"), ["e4", "f5", "Qh5", "g6"]);
    }

    #[test]
    fn test_empty_movetext() {
        let parsed = parse_movetext_mainline("   ");
        assert!(parsed.sans.is_empty());
        assert!(parsed.parse_error.is_none());
    }
}
