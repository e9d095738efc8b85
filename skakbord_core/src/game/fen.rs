use thiserror::Error;

use crate::board::{Board, Castling, Color, Piece, Square};

use super::Game;

/// Reasons a FEN string can be rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FenError {
    #[error("expected 6 space-separated fields, found {0}")]
    FieldCount(usize),
    #[error("expected 8 ranks in the piece placement field, found {0}")]
    RankCount(usize),
    #[error("rank {0:?} does not describe exactly 8 squares")]
    RankWidth(String),
    #[error("invalid piece character {0:?}")]
    BadPiece(char),
    #[error("invalid side to move {0:?}")]
    BadSideToMove(String),
    #[error("invalid castling field {0:?}")]
    BadCastling(String),
    #[error("invalid en passant field {0:?}")]
    BadEnPassant(String),
    #[error("invalid halfmove clock {0:?}")]
    BadHalfmoveClock(String),
    #[error("invalid fullmove number {0:?}")]
    BadFullmoves(String),
}

/// The six fields of a decoded FEN string.
pub(super) struct FenFields {
    pub board: Board,
    pub to_move: Color,
    pub castling: Castling,
    pub en_passant: Option<Square>,
    pub halfmove_clock: u32,
    pub fullmoves: u32,
}

pub(super) fn parse(fen: &str) -> Result<FenFields, FenError> {
    let fields: Vec<_> = fen.split_ascii_whitespace().collect();
    if fields.len() != 6 {
        return Err(FenError::FieldCount(fields.len()));
    }

    let ranks: Vec<_> = fields[0].split('/').collect();
    if ranks.len() != 8 {
        return Err(FenError::RankCount(ranks.len()));
    }

    let mut board = Board::empty();
    for (rank, rank_text) in ranks.into_iter().enumerate() {
        let mut file = 0u8;
        for c in rank_text.chars() {
            match c {
                '1'..='8' => file += c as u8 - b'0',
                _ => {
                    let piece = Piece::try_from_fen_char(c).ok_or(FenError::BadPiece(c))?;
                    match Square::new(rank as u8, file) {
                        Some(square) => board.set(square, Some(piece)),
                        None => return Err(FenError::RankWidth(rank_text.to_owned())),
                    }
                    file += 1;
                }
            }
            if file > 8 {
                return Err(FenError::RankWidth(rank_text.to_owned()));
            }
        }
        if file != 8 {
            return Err(FenError::RankWidth(rank_text.to_owned()));
        }
    }

    let to_move = match fields[1] {
        "w" => Color::White,
        "b" => Color::Black,
        other => return Err(FenError::BadSideToMove(other.to_owned())),
    };

    let castling = if fields[2] == "-" {
        Castling::empty()
    } else {
        let mut flags = Castling::empty();
        for c in fields[2].chars() {
            flags |= match c {
                'K' => Castling::WHITE_KINGSIDE,
                'Q' => Castling::WHITE_QUEENSIDE,
                'k' => Castling::BLACK_KINGSIDE,
                'q' => Castling::BLACK_QUEENSIDE,
                _ => return Err(FenError::BadCastling(fields[2].to_owned())),
            };
        }
        flags
    };

    let en_passant = if fields[3] == "-" {
        None
    } else {
        Some(
            fields[3]
                .parse()
                .map_err(|_| FenError::BadEnPassant(fields[3].to_owned()))?,
        )
    };

    let halfmove_clock = fields[4]
        .parse()
        .map_err(|_| FenError::BadHalfmoveClock(fields[4].to_owned()))?;
    let fullmoves = fields[5]
        .parse()
        .map_err(|_| FenError::BadFullmoves(fields[5].to_owned()))?;

    Ok(FenFields {
        board,
        to_move,
        castling,
        en_passant,
        halfmove_clock,
        fullmoves,
    })
}

pub(super) fn render(game: &Game) -> String {
    let mut result = String::new();

    for rank in 0..8 {
        let mut empty_run = 0;
        for file in 0..8 {
            let square = Square::new_unchecked(rank, file);
            match game.board.get(square) {
                None => empty_run += 1,
                Some(piece) => {
                    if empty_run > 0 {
                        result.push((empty_run + b'0') as _);
                        empty_run = 0;
                    }
                    result.push(piece.as_fen_char());
                }
            }
        }
        if empty_run > 0 {
            result.push((empty_run + b'0') as _);
        }
        if rank < 7 {
            result.push('/');
        }
    }

    result.push(' ');
    result.push(if game.to_move.is_white() { 'w' } else { 'b' });
    result.push(' ');
    result.push_str(&game.castling.as_fen_str());
    result.push(' ');
    match game.en_passant {
        Some(square) => result.push_str(&square.to_string()),
        None => result.push('-'),
    }
    result.push(' ');
    result.push_str(&game.halfmove_clock.to_string());
    result.push(' ');
    result.push_str(&game.fullmoves.to_string());

    result
}
