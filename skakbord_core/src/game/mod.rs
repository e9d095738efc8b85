//! Authoritative game state: the board plus turn, clocks, castling rights,
//! en passant, the cached legal-move table and repetition bookkeeping.

mod fen;
mod move_gen;
mod outcome;

use std::collections::HashMap;

use thiserror::Error;

use crate::board::{Board, Castling, Color, Piece, PieceType, Square, STARTING_POSITION_FEN};

pub use fen::FenError;
pub use move_gen::{check_state, DestVec};
pub use outcome::{CheckState, MoveOutcome, Score};

/// Repetition bookkeeping keys on the piece placement and the castling
/// rights, partitioned by the side to move.
type PositionKey = (Board, Castling);

/// Ways a proposed move can be refused. All of them leave the game state
/// untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("the game is already over")]
    GameOver,
    #[error("no piece on {0}")]
    EmptySquare(Square),
    #[error("the piece on the origin square belongs to the opponent")]
    WrongSide,
    #[error("the destination is not a legal move for that piece")]
    IllegalMove,
    #[error("a pawn reaching the last rank must name a promotion piece")]
    PromotionRequired,
    #[error("a promotion was supplied for a move that does not promote")]
    UnexpectedPromotion,
    #[error("pawns may only promote to a queen, rook, bishop or knight")]
    InvalidPromotion,
}

/// A full game of chess.
///
/// Holds the position and everything needed to judge moves: whose turn it
/// is, the clocks, castling rights, the en-passant target, a legal-move
/// table for the side to move (recomputed after every accepted move) and the
/// position counts for the threefold-repetition rule.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    to_move: Color,
    castling: Castling,
    en_passant: Option<Square>,
    halfmove_clock: u32,
    fullmoves: u32,

    legal_moves: HashMap<Square, DestVec>,
    white_positions: HashMap<PositionKey, u32>,
    black_positions: HashMap<PositionKey, u32>,
    score: Score,
}

impl Game {
    /// A game from the standard starting position.
    pub fn starting_position() -> Self {
        Self::from_fen(STARTING_POSITION_FEN).unwrap()
    }

    /// Builds a game from a FEN string, computing the legal-move table and
    /// recording the initial position for repetition purposes.
    pub fn from_fen(fen: &str) -> Result<Self, FenError> {
        let fields = fen::parse(fen)?;

        let mut game = Self {
            board: fields.board,
            to_move: fields.to_move,
            castling: fields.castling,
            en_passant: fields.en_passant,
            halfmove_clock: fields.halfmove_clock,
            fullmoves: fields.fullmoves,

            legal_moves: HashMap::new(),
            white_positions: HashMap::new(),
            black_positions: HashMap::new(),
            score: Score::Unfinished,
        };
        game.refresh_legal_moves();
        game.record_position();
        Ok(game)
    }

    /// The current position as a FEN string.
    pub fn fen(&self) -> String {
        fen::render(self)
    }

    /// The side to move.
    pub fn to_move(&self) -> Color {
        self.to_move
    }

    /// The piece placement.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Remaining castling rights.
    pub fn castling(&self) -> Castling {
        self.castling
    }

    /// The square a pawn that double-advanced last ply crossed, if any.
    pub fn en_passant(&self) -> Option<Square> {
        self.en_passant
    }

    /// Halfmoves since the last pawn move or capture.
    pub fn halfmove_clock(&self) -> u32 {
        self.halfmove_clock
    }

    /// The fullmove number, starting at 1 and incremented after each Black
    /// move.
    pub fn fullmoves(&self) -> u32 {
        self.fullmoves
    }

    /// The game result so far; `0-0` until a terminal state is reached.
    pub fn score(&self) -> Score {
        self.score
    }

    /// Whether a terminal state has been reached (or imposed).
    pub fn finished(&self) -> bool {
        self.score != Score::Unfinished
    }

    /// Imposes a final result from outside the rules, e.g. when a player
    /// abandons the game. Does nothing if the game already ended.
    pub fn conclude(&mut self, score: Score) {
        if self.score == Score::Unfinished {
            self.score = score;
        }
    }

    /// The cached legal destinations from `square` for the side to move.
    /// Empty for empty squares and for the opponent's pieces.
    pub fn legal_destinations(&self, square: Square) -> &[Square] {
        self.legal_moves
            .get(&square)
            .map_or(&[], |dests| dests.as_slice())
    }

    /// Validates and applies a move for the side to move, returning the
    /// classification of the resulting position. Rejected moves leave the
    /// state untouched.
    pub fn try_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    ) -> Result<MoveOutcome, MoveError> {
        if self.finished() {
            return Err(MoveError::GameOver);
        }

        let piece = self.board.get(from).ok_or(MoveError::EmptySquare(from))?;
        if piece.color() != self.to_move {
            return Err(MoveError::WrongSide);
        }
        if !self.legal_destinations(from).contains(&to) {
            return Err(MoveError::IllegalMove);
        }

        let promoting = piece.is_pawn() && to.rank() == promotion_rank(self.to_move);
        let promoted = match (promoting, promotion) {
            (true, None) => return Err(MoveError::PromotionRequired),
            (true, Some(kind)) => {
                if !kind.is_promotion_target() {
                    return Err(MoveError::InvalidPromotion);
                }
                Some(Piece::new(self.to_move, kind))
            }
            (false, Some(_)) => return Err(MoveError::UnexpectedPromotion),
            (false, None) => None,
        };

        let next_en_passant = if piece.is_pawn() && from.rank().abs_diff(to.rank()) == 2 {
            Square::new((from.rank() + to.rank()) / 2, from.file())
        } else {
            None
        };
        let lost_rights = rights_removed(&self.board, piece, from, to);

        let captured = self.board.apply_unchecked(from, to, promoted, self.en_passant);

        self.halfmove_clock = if captured || piece.is_pawn() {
            0
        } else {
            self.halfmove_clock + 1
        };
        self.en_passant = next_en_passant;
        self.castling.remove(lost_rights);
        if self.to_move.is_black() {
            self.fullmoves += 1;
        }
        self.to_move = self.to_move.flip();
        self.refresh_legal_moves();

        let outcome = self.classify();
        match outcome {
            MoveOutcome::Checkmate => self.score = Score::loss_for(self.to_move),
            MoveOutcome::Stalemate | MoveOutcome::FiftyMoveRule | MoveOutcome::Repetition => {
                self.score = Score::Draw
            }
            MoveOutcome::Ongoing | MoveOutcome::Check => {}
        }

        Ok(outcome)
    }

    fn refresh_legal_moves(&mut self) {
        self.legal_moves = self
            .board
            .pieces()
            .filter(|(piece, _)| piece.color() == self.to_move)
            .map(|(_, from)| {
                (
                    from,
                    move_gen::legal_destinations(&self.board, from, self.en_passant, self.castling),
                )
            })
            .collect();
    }

    /// Classifies the position just reached, from the viewpoint of the side
    /// now to move.
    fn classify(&mut self) -> MoveOutcome {
        let checked = check_state(&self.board).checks(self.to_move);
        let any_moves = self.legal_moves.values().any(|dests| !dests.is_empty());
        let repeated = self.record_position();

        if !any_moves {
            if checked {
                MoveOutcome::Checkmate
            } else {
                MoveOutcome::Stalemate
            }
        } else if self.halfmove_clock >= 100 {
            MoveOutcome::FiftyMoveRule
        } else if repeated {
            MoveOutcome::Repetition
        } else if checked {
            MoveOutcome::Check
        } else {
            MoveOutcome::Ongoing
        }
    }

    /// Counts the current position towards threefold repetition, keyed by
    /// the side to move, and reports whether it has now occurred three
    /// times. A ply in which an en-passant capture is actually available is
    /// skipped: the capture chance makes the position distinct from later
    /// lookalikes.
    fn record_position(&mut self) -> bool {
        if let Some(target) = self.en_passant {
            let capture_available = self.legal_moves.iter().any(|(&from, dests)| {
                dests.contains(&target)
                    && self
                        .board
                        .get(from)
                        .is_some_and(|piece| piece.is_pawn())
            });
            if capture_available {
                return false;
            }
        }

        let positions = match self.to_move {
            Color::White => &mut self.white_positions,
            Color::Black => &mut self.black_positions,
        };
        let seen = positions.entry((self.board, self.castling)).or_insert(0);
        *seen += 1;
        *seen >= 3
    }
}

impl Default for Game {
    fn default() -> Self {
        Self::starting_position()
    }
}

const fn promotion_rank(color: Color) -> u8 {
    match color {
        Color::White => 0,
        Color::Black => 7,
    }
}

/// The castling rights a move takes away: both of a colour's rights when its
/// king moves, and the right tied to a home corner when a rook moves off it
/// or anything captures a rook standing on it.
fn rights_removed(board: &Board, piece: Piece, from: Square, to: Square) -> Castling {
    let mut removed = Castling::empty();

    match piece.piece_type() {
        PieceType::King => {
            removed |= match piece.color() {
                Color::White => Castling::WHITE,
                Color::Black => Castling::BLACK,
            }
        }
        PieceType::Rook => removed |= corner_right(from),
        _ => {}
    }

    if board.get(to).is_some_and(|target| target.is_rook()) {
        removed |= corner_right(to);
    }

    removed
}

fn corner_right(square: Square) -> Castling {
    match square {
        Square::A1 => Castling::WHITE_QUEENSIDE,
        Square::H1 => Castling::WHITE_KINGSIDE,
        Square::A8 => Castling::BLACK_QUEENSIDE,
        Square::H8 => Castling::BLACK_KINGSIDE,
        _ => Castling::empty(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn play(game: &mut Game, moves: &[(&str, &str)]) -> MoveOutcome {
        let mut last = MoveOutcome::Ongoing;
        for &(from, to) in moves {
            last = game
                .try_move(from.parse().unwrap(), to.parse().unwrap(), None)
                .unwrap_or_else(|err| panic!("{from}{to} rejected: {err}"));
        }
        last
    }

    #[test]
    fn fools_mate() {
        let mut game = Game::starting_position();
        let outcome = play(
            &mut game,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );

        assert_eq!(outcome, MoveOutcome::Checkmate);
        assert_eq!(game.score(), Score::BlackWins);
        assert!(game.finished());
    }

    #[test]
    fn scholars_mate() {
        let mut game = Game::starting_position();
        let outcome = play(
            &mut game,
            &[
                ("e2", "e4"),
                ("e7", "e5"),
                ("d1", "h5"),
                ("b8", "c6"),
                ("f1", "c4"),
                ("g8", "f6"),
                ("h5", "f7"),
            ],
        );

        assert_eq!(outcome, MoveOutcome::Checkmate);
        assert_eq!(game.score(), Score::WhiteWins);
    }

    #[test]
    fn moves_after_the_end_are_refused() {
        let mut game = Game::starting_position();
        play(
            &mut game,
            &[("f2", "f3"), ("e7", "e5"), ("g2", "g4"), ("d8", "h4")],
        );

        assert_eq!(
            game.try_move(Square::E2, Square::E4, None),
            Err(MoveError::GameOver)
        );
    }

    #[test]
    fn check_is_reported_and_play_continues() {
        let mut game = Game::starting_position();
        let outcome = play(&mut game, &[("e2", "e4"), ("f7", "f6"), ("d1", "h5")]);

        assert_eq!(outcome, MoveOutcome::Check);
        assert_eq!(game.score(), Score::Unfinished);
        assert!(!game.finished());
    }

    #[test]
    fn en_passant_capture_removes_the_pawn_and_clears_the_target() {
        let mut game =
            Game::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3")
                .unwrap();

        let outcome = game.try_move(Square::E5, Square::F6, None).unwrap();
        assert_eq!(outcome, MoveOutcome::Ongoing);
        assert_eq!(game.board().get(Square::F6), Some(Piece::WHITE_PAWN));
        assert_eq!(game.board().get(Square::F5), None);
        assert_eq!(game.en_passant(), None);
        // En passant counts as a capture for the halfmove clock.
        assert_eq!(game.halfmove_clock(), 0);
    }

    #[test]
    fn double_advance_sets_the_en_passant_target() {
        let mut game = Game::starting_position();
        game.try_move(Square::E2, Square::E4, None).unwrap();
        assert_eq!(game.en_passant(), Some(Square::E3));

        game.try_move(Square::G8, Square::F6, None).unwrap();
        assert_eq!(game.en_passant(), None);
    }

    #[test]
    fn promotion_requires_a_piece_and_places_it() {
        let mut game = Game::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();

        assert_eq!(
            game.try_move(Square::A7, Square::A8, None),
            Err(MoveError::PromotionRequired)
        );

        let outcome = game
            .try_move(Square::A7, Square::A8, Some(PieceType::Queen))
            .unwrap();
        assert_eq!(outcome, MoveOutcome::Check);
        assert_eq!(game.board().get(Square::A8), Some(Piece::WHITE_QUEEN));
    }

    #[test]
    fn promotion_suffix_on_a_plain_move_is_refused() {
        let mut game = Game::starting_position();
        assert_eq!(
            game.try_move(Square::E2, Square::E4, Some(PieceType::Queen)),
            Err(MoveError::UnexpectedPromotion)
        );

        // The refusal left the state untouched.
        game.try_move(Square::E2, Square::E4, None).unwrap();
    }

    #[test]
    fn promotion_to_king_or_pawn_is_refused() {
        let mut game = Game::from_fen("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(
            game.try_move(Square::A7, Square::A8, Some(PieceType::King)),
            Err(MoveError::InvalidPromotion)
        );
        assert_eq!(
            game.try_move(Square::A7, Square::A8, Some(PieceType::Pawn)),
            Err(MoveError::InvalidPromotion)
        );
    }

    #[test]
    fn illegal_inputs_are_refused_without_side_effects() {
        let mut game = Game::starting_position();
        let before = game.fen();

        assert_eq!(
            game.try_move(Square::E4, Square::E5, None),
            Err(MoveError::EmptySquare(Square::E4))
        );
        assert_eq!(
            game.try_move(Square::E7, Square::E5, None),
            Err(MoveError::WrongSide)
        );
        assert_eq!(
            game.try_move(Square::E2, Square::E5, None),
            Err(MoveError::IllegalMove)
        );
        assert_eq!(
            game.try_move(Square::G1, Square::G3, None),
            Err(MoveError::IllegalMove)
        );

        assert_eq!(game.fen(), before);
        assert_eq!(game.halfmove_clock(), 0);
    }

    #[test]
    fn halfmove_clock_resets_on_pawn_moves_and_captures() {
        let mut game = Game::starting_position();

        play(&mut game, &[("e2", "e4"), ("d7", "d5")]);
        assert_eq!(game.halfmove_clock(), 0);

        play(&mut game, &[("g1", "f3")]);
        assert_eq!(game.halfmove_clock(), 1);

        play(&mut game, &[("b8", "c6")]);
        assert_eq!(game.halfmove_clock(), 2);

        play(&mut game, &[("e4", "d5")]);
        assert_eq!(game.halfmove_clock(), 0);
    }

    #[test]
    fn fullmove_number_increments_after_black_moves() {
        let mut game = Game::starting_position();
        assert_eq!(game.fullmoves(), 1);

        play(&mut game, &[("e2", "e4")]);
        assert_eq!(game.fullmoves(), 1);

        play(&mut game, &[("e7", "e5")]);
        assert_eq!(game.fullmoves(), 2);
    }

    #[test]
    fn king_move_clears_both_rights() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(&mut game, &[("e1", "e2")]);
        assert_eq!(game.castling(), Castling::BLACK);
    }

    #[test]
    fn castling_updates_rights_and_moves_the_rook() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();

        play(&mut game, &[("e1", "g1")]);
        assert_eq!(game.board().get(Square::G1), Some(Piece::WHITE_KING));
        assert_eq!(game.board().get(Square::F1), Some(Piece::WHITE_ROOK));
        assert_eq!(game.castling(), Castling::BLACK);

        play(&mut game, &[("e8", "c8")]);
        assert_eq!(game.board().get(Square::C8), Some(Piece::BLACK_KING));
        assert_eq!(game.board().get(Square::D8), Some(Piece::BLACK_ROOK));
        assert_eq!(game.castling(), Castling::empty());
    }

    #[test]
    fn rook_moves_clear_their_corner_right() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        play(&mut game, &[("a1", "a4")]);
        assert_eq!(
            game.castling(),
            Castling::WHITE_KINGSIDE | Castling::BLACK
        );
    }

    #[test]
    fn capturing_a_home_corner_rook_clears_the_right() {
        let mut game = Game::from_fen("r3k2r/8/8/8/8/6n1/8/R3K2R b KQkq - 0 1").unwrap();

        play(&mut game, &[("g3", "h1")]);
        assert_eq!(
            game.castling(),
            Castling::WHITE_QUEENSIDE | Castling::BLACK
        );

        play(&mut game, &[("a1", "a8")]);
        assert_eq!(game.castling(), Castling::BLACK_KINGSIDE);
    }

    #[test]
    fn stalemate_is_a_draw() {
        let mut game = Game::from_fen("k7/8/8/8/8/8/8/6QK w - - 0 1").unwrap();
        let outcome = play(&mut game, &[("g1", "b6")]);

        assert_eq!(outcome, MoveOutcome::Stalemate);
        assert_eq!(game.score(), Score::Draw);
    }

    #[test]
    fn fifty_move_rule_draws_when_the_clock_reaches_100() {
        let mut game = Game::from_fen("4k3/8/8/8/8/8/8/4KR2 w - - 99 60").unwrap();
        let outcome = play(&mut game, &[("f1", "f2")]);

        assert_eq!(outcome, MoveOutcome::FiftyMoveRule);
        assert_eq!(game.halfmove_clock(), 100);
        assert_eq!(game.score(), Score::Draw);
    }

    #[test]
    fn threefold_repetition_draws() {
        let mut game = Game::starting_position();
        let shuffle = [
            ("g1", "f3"),
            ("g8", "f6"),
            ("f3", "g1"),
            ("f6", "g8"),
        ];

        let outcome = play(&mut game, &shuffle);
        assert_eq!(outcome, MoveOutcome::Ongoing);

        let outcome = play(&mut game, &shuffle[..3]);
        assert_eq!(outcome, MoveOutcome::Ongoing);

        // The knights return to their corners for the second time: the
        // starting position with White to move is now on its third
        // occurrence.
        let outcome = play(&mut game, &shuffle[3..]);
        assert_eq!(outcome, MoveOutcome::Repetition);
        assert_eq!(game.score(), Score::Draw);
    }

    #[test]
    fn legal_move_table_never_exposes_the_own_king() {
        let mut game = Game::starting_position();
        play(
            &mut game,
            &[("e2", "e4"), ("e7", "e5"), ("d1", "h5"), ("g8", "f6")],
        );

        for square in Square::all() {
            for &to in game.legal_destinations(square) {
                let mut probe = game.clone();
                probe
                    .try_move(square, to, None)
                    .unwrap_or_else(|err| panic!("cached move {square}{to} rejected: {err}"));
            }
        }
    }

    #[test]
    fn conclude_sets_and_keeps_a_result() {
        let mut game = Game::starting_position();
        game.conclude(Score::WhiteWins);
        assert_eq!(game.score(), Score::WhiteWins);

        game.conclude(Score::Draw);
        assert_eq!(game.score(), Score::WhiteWins);
    }
}
