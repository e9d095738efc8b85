use std::fmt::Display;

use crate::board::Color;

/// Which kings are attacked in a position.
///
/// "Attacked" means some pseudo-legal destination of the other side is the
/// king's square; a pinned attacker still gives check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Clear,
    White,
    Black,
    Both,
}

impl CheckState {
    /// Whether the king of `color` is attacked.
    pub const fn checks(self, color: Color) -> bool {
        match self {
            CheckState::Clear => false,
            CheckState::White => color.is_white(),
            CheckState::Black => color.is_black(),
            CheckState::Both => true,
        }
    }
}

/// Classification of the position reached by an accepted move, from the
/// point of view of the player now to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing special; play continues.
    Ongoing,
    /// The player to move is in check but has moves; play continues.
    Check,
    /// The player to move is in check with no legal moves.
    Checkmate,
    /// The player to move has no legal moves but is not in check.
    Stalemate,
    /// One hundred halfmoves without a pawn move or capture.
    FiftyMoveRule,
    /// The same position occurred for the third time.
    Repetition,
}

impl MoveOutcome {
    /// The character appended to move messages: `+` for check, `#` for
    /// checkmate, `-` for a drawn finish, nothing otherwise.
    pub const fn annotation(self) -> Option<char> {
        match self {
            MoveOutcome::Ongoing => None,
            MoveOutcome::Check => Some('+'),
            MoveOutcome::Checkmate => Some('#'),
            MoveOutcome::Stalemate | MoveOutcome::FiftyMoveRule | MoveOutcome::Repetition => {
                Some('-')
            }
        }
    }

    /// Whether this outcome ends the game.
    pub const fn is_terminal(self) -> bool {
        !matches!(self, MoveOutcome::Ongoing | MoveOutcome::Check)
    }
}

/// The result of the game so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Score {
    /// No result yet; rendered as `0-0`.
    #[default]
    Unfinished,
    WhiteWins,
    BlackWins,
    Draw,
}

impl Score {
    /// A win for `color`.
    pub const fn win_for(color: Color) -> Self {
        match color {
            Color::White => Score::WhiteWins,
            Color::Black => Score::BlackWins,
        }
    }

    /// A loss for `color`.
    pub const fn loss_for(color: Color) -> Self {
        Self::win_for(color.flip())
    }
}

impl Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Score::Unfinished => "0-0",
            Score::WhiteWins => "1-0",
            Score::BlackWins => "0-1",
            Score::Draw => "1/2-1/2",
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn annotations() {
        assert_eq!(MoveOutcome::Ongoing.annotation(), None);
        assert_eq!(MoveOutcome::Check.annotation(), Some('+'));
        assert_eq!(MoveOutcome::Checkmate.annotation(), Some('#'));
        assert_eq!(MoveOutcome::Stalemate.annotation(), Some('-'));
        assert_eq!(MoveOutcome::FiftyMoveRule.annotation(), Some('-'));
        assert_eq!(MoveOutcome::Repetition.annotation(), Some('-'));
    }

    #[test]
    fn terminal_outcomes() {
        assert!(!MoveOutcome::Ongoing.is_terminal());
        assert!(!MoveOutcome::Check.is_terminal());
        assert!(MoveOutcome::Checkmate.is_terminal());
        assert!(MoveOutcome::Stalemate.is_terminal());
        assert!(MoveOutcome::FiftyMoveRule.is_terminal());
        assert!(MoveOutcome::Repetition.is_terminal());
    }

    #[test]
    fn score_display() {
        assert_eq!(Score::Unfinished.to_string(), "0-0");
        assert_eq!(Score::WhiteWins.to_string(), "1-0");
        assert_eq!(Score::BlackWins.to_string(), "0-1");
        assert_eq!(Score::Draw.to_string(), "1/2-1/2");
    }

    #[test]
    fn score_for_colors() {
        assert_eq!(Score::win_for(Color::White), Score::WhiteWins);
        assert_eq!(Score::loss_for(Color::White), Score::BlackWins);
        assert_eq!(Score::win_for(Color::Black), Score::BlackWins);
        assert_eq!(Score::loss_for(Color::Black), Score::WhiteWins);
    }

    #[test]
    fn check_state_queries() {
        assert!(!CheckState::Clear.checks(Color::White));
        assert!(CheckState::White.checks(Color::White));
        assert!(!CheckState::White.checks(Color::Black));
        assert!(CheckState::Both.checks(Color::White));
        assert!(CheckState::Both.checks(Color::Black));
    }
}
