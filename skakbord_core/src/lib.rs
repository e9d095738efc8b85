//! Rules engine for a single game of chess.
//!
//! [`board`] holds the value types (pieces, squares, castling rights and the
//! 8×8 board itself); [`game`] layers move generation, legality filtering,
//! outcome classification and the FEN codec on top. The crate performs no
//! I/O.

pub mod board;
pub mod game;
