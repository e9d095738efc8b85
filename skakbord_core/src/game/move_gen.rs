//! Pseudo-legal move generation and the legality filter.
//!
//! Pseudo-legal destinations respect piece movement only; whether a move
//! leaves its own king attacked is decided afterwards by applying the move to
//! a copy of the board and re-enumerating the opponent's destinations. The
//! board is a 64-byte value, so the copy is cheap.

use arrayvec::ArrayVec;

use crate::board::{Board, Castling, Color, Piece, PieceType, Square};

use super::outcome::CheckState;

/// Destinations reachable from a single square. A queen in the middle of an
/// open board has 27, so 28 always suffices.
pub type DestVec = ArrayVec<Square, 28>;

const KNIGHT_JUMPS: [(i8, i8); 8] = [
    (-2, -1),
    (-2, 1),
    (-1, 2),
    (1, 2),
    (2, -1),
    (2, 1),
    (-1, -2),
    (1, -2),
];

const KING_STEPS: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

const ORTHOGONALS: [(i8, i8); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const DIAGONALS: [(i8, i8); 4] = [(-1, -1), (-1, 1), (1, -1), (1, 1)];

/// Enumerates the destinations the piece on `from` could move to, ignoring
/// whether doing so would expose its own king.
pub fn pseudo_destinations(
    board: &Board,
    from: Square,
    en_passant: Option<Square>,
    castling: Castling,
) -> DestVec {
    let mut out = DestVec::new();
    let piece = match board.get(from) {
        Some(piece) => piece,
        None => return out,
    };

    match piece.piece_type() {
        PieceType::Pawn => pawn_destinations(board, from, piece.color(), en_passant, &mut out),
        PieceType::Knight => jump_destinations(board, from, piece.color(), &KNIGHT_JUMPS, &mut out),
        PieceType::King => {
            jump_destinations(board, from, piece.color(), &KING_STEPS, &mut out);
            castle_destinations(board, from, piece.color(), castling, &mut out);
        }
        PieceType::Bishop => ray_destinations(board, from, piece.color(), &DIAGONALS, &mut out),
        PieceType::Rook => ray_destinations(board, from, piece.color(), &ORTHOGONALS, &mut out),
        PieceType::Queen => {
            ray_destinations(board, from, piece.color(), &ORTHOGONALS, &mut out);
            ray_destinations(board, from, piece.color(), &DIAGONALS, &mut out);
        }
    }

    out
}

fn pawn_destinations(
    board: &Board,
    from: Square,
    color: Color,
    en_passant: Option<Square>,
    out: &mut DestVec,
) {
    // White pawns walk towards rank 0 (Black's back rank), black pawns the
    // other way.
    let (forward, start_rank) = match color {
        Color::White => (-1, 6),
        Color::Black => (1, 1),
    };

    if let Some(ahead) = from.step(forward, 0) {
        if board.get(ahead).is_none() {
            out.push(ahead);

            if from.rank() == start_rank {
                if let Some(double) = ahead.step(forward, 0) {
                    if board.get(double).is_none() {
                        out.push(double);
                    }
                }
            }
        }
    }

    for side in [-1, 1] {
        if let Some(target) = from.step(forward, side) {
            let capturable = match board.get(target) {
                Some(occupant) => occupant.color() != color,
                None => Some(target) == en_passant,
            };
            if capturable {
                out.push(target);
            }
        }
    }
}

fn jump_destinations(
    board: &Board,
    from: Square,
    color: Color,
    jumps: &[(i8, i8)],
    out: &mut DestVec,
) {
    for &(dr, df) in jumps {
        if let Some(target) = from.step(dr, df) {
            match board.get(target) {
                Some(occupant) if occupant.color() == color => {}
                _ => out.push(target),
            }
        }
    }
}

fn ray_destinations(
    board: &Board,
    from: Square,
    color: Color,
    directions: &[(i8, i8)],
    out: &mut DestVec,
) {
    for &(dr, df) in directions {
        let mut cursor = from;
        while let Some(target) = cursor.step(dr, df) {
            match board.get(target) {
                None => out.push(target),
                Some(occupant) => {
                    if occupant.color() != color {
                        out.push(target);
                    }
                    break;
                }
            }
            cursor = target;
        }
    }
}

/// Castling candidates: the relevant right must survive, the king must stand
/// on its home square with its rook on the matching corner, and the squares
/// strictly between them must be empty. Check constraints are the legality
/// filter's job.
fn castle_destinations(
    board: &Board,
    from: Square,
    color: Color,
    castling: Castling,
    out: &mut DestVec,
) {
    let (home, kingside, queenside) = match color {
        Color::White => (
            Square::WHITE_KING_HOME,
            Castling::WHITE_KINGSIDE,
            Castling::WHITE_QUEENSIDE,
        ),
        Color::Black => (
            Square::BLACK_KING_HOME,
            Castling::BLACK_KINGSIDE,
            Castling::BLACK_QUEENSIDE,
        ),
    };
    if from != home {
        return;
    }
    let rank = from.rank();
    let rook = Some(Piece::rook(color));

    if castling.contains(kingside)
        && board.get(Square::new_unchecked(rank, 7)) == rook
        && (5..=6).all(|file| board.get(Square::new_unchecked(rank, file)).is_none())
    {
        out.push(Square::new_unchecked(rank, 6));
    }

    if castling.contains(queenside)
        && board.get(Square::new_unchecked(rank, 0)) == rook
        && (1..=3).all(|file| board.get(Square::new_unchecked(rank, file)).is_none())
    {
        out.push(Square::new_unchecked(rank, 2));
    }
}

/// Reports which kings are attacked by a pseudo-legal destination of the
/// other side in the current position.
pub fn check_state(board: &Board) -> CheckState {
    let mut white_checked = false;
    let mut black_checked = false;

    for (_, from) in board.pieces() {
        for target in pseudo_destinations(board, from, None, Castling::empty()) {
            if let Some(occupant) = board.get(target) {
                if occupant.is_king() {
                    match occupant.color() {
                        Color::White => white_checked = true,
                        Color::Black => black_checked = true,
                    }
                }
            }
        }
    }

    match (white_checked, black_checked) {
        (true, true) => CheckState::Both,
        (true, false) => CheckState::White,
        (false, true) => CheckState::Black,
        (false, false) => CheckState::Clear,
    }
}

/// The destinations from `from` that do not leave the mover's king attacked.
pub fn legal_destinations(
    board: &Board,
    from: Square,
    en_passant: Option<Square>,
    castling: Castling,
) -> DestVec {
    let piece = match board.get(from) {
        Some(piece) => piece,
        None => return DestVec::new(),
    };

    pseudo_destinations(board, from, en_passant, castling)
        .into_iter()
        .filter(|&to| is_legal(board, piece, from, to, en_passant))
        .collect()
}

fn is_legal(board: &Board, piece: Piece, from: Square, to: Square, ep: Option<Square>) -> bool {
    if piece.is_king() && from.file().abs_diff(to.file()) == 2 {
        // No castling out of check, and the square the king crosses must be
        // safe as well.
        if check_state(board).checks(piece.color()) {
            return false;
        }
        let transit = Square::new_unchecked(from.rank(), (from.file() + to.file()) / 2);
        if exposes_own_king(board, piece.color(), from, transit, ep) {
            return false;
        }
    }

    !exposes_own_king(board, piece.color(), from, to, ep)
}

fn exposes_own_king(board: &Board, color: Color, from: Square, to: Square, ep: Option<Square>) -> bool {
    let mut copy = *board;
    // The promotion choice cannot affect the mover's own king safety; apply
    // promotions as a queen.
    let promotion = Some(Piece::new(color, PieceType::Queen));
    copy.apply_unchecked(from, to, promotion, ep);
    check_state(&copy).checks(color)
}
