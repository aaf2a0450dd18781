use std::cmp::Ordering;

use smallvec::SmallVec;

/// Board pieces as FEN symbols: uppercase white, lowercase black.
pub type PieceSet = SmallVec<[char; 32]>;

/// Separator between the two sides of a tablebase name, as in `KQvKR`.
pub const SIDE_SEPARATOR: char = 'v';

/// Order of pieces inside one side of a tablebase name: KQRBNP.
fn piece_rank(symbol: char) -> u8 {
    match symbol {
        'K' => 0,
        'Q' => 1,
        'R' => 2,
        'B' => 3,
        'N' => 4,
        'P' => 5,
        _ => 6,
    }
}

fn piece_value(symbol: char) -> Option<u32> {
    match symbol {
        // Both sides always have one.
        'K' => Some(0),
        'P' => Some(1),
        'N' | 'B' => Some(3),
        'R' => Some(5),
        'Q' => Some(9),
        _ => None,
    }
}

fn side_string(mut pieces: SmallVec<[char; 16]>) -> String {
    pieces.sort_by_key(|&p| piece_rank(p));
    pieces.into_iter().collect()
}

/// Orders two sides for the name: more pieces first; on equal count the side
/// whose pieces rank higher in KQRBNP order goes first. Identical sides
/// compare equal, so the name never depends on which colour holds what.
fn compare_sides(a: &str, b: &str) -> Ordering {
    b.len().cmp(&a.len()).then_with(|| {
        let ranks = |s: &str| s.chars().map(piece_rank).collect::<SmallVec<[u8; 16]>>();
        ranks(a).cmp(&ranks(b))
    })
}

/// Canonical Syzygy-style name for a set of pieces, e.g. `KRPvKR`.
pub fn egtb_name_from_pieces<I>(pieces: I) -> String
where
    I: IntoIterator<Item = char>,
{
    let mut white = SmallVec::<[char; 16]>::new();
    let mut black = SmallVec::<[char; 16]>::new();
    for piece in pieces {
        if piece.is_ascii_uppercase() {
            white.push(piece);
        } else {
            black.push(piece.to_ascii_uppercase());
        }
    }

    let white = side_string(white);
    let black = side_string(black);

    let (first, second) = match compare_sides(&white, &black) {
        Ordering::Greater => (black, white),
        Ordering::Less | Ordering::Equal => (white, black),
    };
    format!("{first}{SIDE_SEPARATOR}{second}")
}

/// Absolute material imbalance of a tablebase name with K=0, P=1, N=B=3,
/// R=5, Q=9. `None` if the name is not `<side>v<side>` over KQRBNP.
pub fn material_diff(name: &str) -> Option<u32> {
    let (a, b) = name.split_once(SIDE_SEPARATOR)?;
    let side_value = |side: &str| side.chars().map(piece_value).sum::<Option<u32>>();
    Some(side_value(a)?.abs_diff(side_value(b)?))
}
