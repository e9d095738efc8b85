use std::fmt::{Debug, Display, Write};
use std::str::FromStr;

use paste::paste;
use seq_macro::seq;
use thiserror::Error;

/// A square of the chessboard.
///
/// Internally an integer from 0-63, ordered by increasing file then rank,
/// with rank 0 being Black's back rank (the rank written first in FEN) and
/// file 0 being the a-file. So 0 is a8, 7 is h8, 56 is a1 and 63 is h1.
///
/// The algebraic rank digit runs the other way: rank 0 prints as `8`, rank 7
/// as `1`.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Square(u8);

impl Square {
    /// Home square of the white king.
    pub const WHITE_KING_HOME: Self = Self::E1;
    /// Home square of the black king.
    pub const BLACK_KING_HOME: Self = Self::E8;

    /// Constructs a [`Square`] from a rank and file, both numbered 0-7.
    ///
    /// Returns [`None`] if either is out of range.
    pub const fn new(rank: u8, file: u8) -> Option<Self> {
        if rank >= 8 || file >= 8 {
            None
        } else {
            Some(Self(8 * rank + file))
        }
    }

    /// Constructs a [`Square`] from a rank and file without range checking.
    ///
    /// Out-of-range inputs are truncated so the result is always a valid
    /// square, just probably not the one you wanted.
    pub const fn new_unchecked(rank: u8, file: u8) -> Self {
        Self((rank % 8) * 8 + (file % 8))
    }

    /// The rank of this square, 0 (Black's back rank) to 7 (White's).
    pub const fn rank(self) -> u8 {
        self.0 / 8
    }

    /// The file of this square, 0 (a-file) to 7 (h-file).
    pub const fn file(self) -> u8 {
        self.0 % 8
    }

    /// Index of this square as a [`usize`], for flat 64-element arrays.
    pub const fn index(self) -> usize {
        self.0 as _
    }

    /// The square reached by stepping `dr` ranks and `df` files from this
    /// one, or [`None`] if that walks off the board.
    pub const fn step(self, dr: i8, df: i8) -> Option<Self> {
        let rank = self.rank() as i8 + dr;
        let file = self.file() as i8 + df;
        if rank < 0 || rank >= 8 || file < 0 || file >= 8 {
            None
        } else {
            Some(Self::new_unchecked(rank as u8, file as u8))
        }
    }

    /// Iterates over every square, a8 through h1.
    pub fn all() -> impl Iterator<Item = Square> {
        (0..64).map(Square)
    }
}

impl Display for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_char((self.file() + b'a') as _)?;
        f.write_char((8 - self.rank() + b'0') as _)
    }
}

impl Debug for Square {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "{}{}",
            (self.file() + b'A') as char,
            (8 - self.rank() + b'0') as char
        ))
    }
}

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
#[error("invalid square")]
pub struct ParseSquareError;

impl FromStr for Square {
    type Err = ParseSquareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        let file = chars.next().ok_or(ParseSquareError)?;
        let rank = chars.next().ok_or(ParseSquareError)?;
        if chars.next().is_some() {
            return Err(ParseSquareError);
        }

        if !('a'..='h').contains(&file) || !('1'..='8').contains(&rank) {
            return Err(ParseSquareError);
        }

        Ok(Square::new_unchecked(
            8 - (rank as u8 - b'0'),
            file as u8 - b'a',
        ))
    }
}

/// Board square aliases
#[allow(clippy::eq_op, clippy::char_lit_as_u8)]
impl Square {
    seq!(RANK in 1..=8 {
        seq!(FILE in 'A'..='H' {
            paste! {
                pub const [<FILE RANK>]: Square = Square::new_unchecked(8 - RANK, FILE as u8 - b'A');
            }
        });
    });
}
