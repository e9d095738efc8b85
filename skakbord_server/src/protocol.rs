//! Parsing of client commands and rendering of server replies.
//!
//! The side to move may send exactly three shapes of payload:
//!
//! * `moves <square>` asks for the legal destinations from a square;
//! * `<from><to>` is a move in coordinate notation, e.g. `e2e4`;
//! * `<from><to>=X` is a promoting pawn move, `X` one of `QRBN`.
//!
//! Anything else earns a `no`.

use std::fmt::Write;

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{char, one_of},
    combinator::{all_consuming, map, opt},
    sequence::{pair, preceded, tuple},
    IResult,
};

use skakbord_core::board::{PieceType, Square};

/// A well-formed client message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    /// `moves <square>`
    Moves(Square),
    /// `<from><to>[=X]`
    Move {
        from: Square,
        to: Square,
        promotion: Option<PieceType>,
    },
}

fn square(input: &str) -> IResult<&str, Square> {
    map(
        pair(one_of("abcdefgh"), one_of("12345678")),
        |(file, rank)| Square::new_unchecked(8 - (rank as u8 - b'0'), file as u8 - b'a'),
    )(input)
}

fn promotion_piece(input: &str) -> IResult<&str, PieceType> {
    map(one_of("QRBN"), |c| match c {
        'Q' => PieceType::Queen,
        'R' => PieceType::Rook,
        'B' => PieceType::Bishop,
        'N' => PieceType::Knight,
        _ => unreachable!(),
    })(input)
}

fn moves_query(input: &str) -> IResult<&str, ClientCommand> {
    map(preceded(tag("moves "), square), ClientCommand::Moves)(input)
}

fn move_command(input: &str) -> IResult<&str, ClientCommand> {
    map(
        tuple((square, square, opt(preceded(char('='), promotion_piece)))),
        |(from, to, promotion)| ClientCommand::Move {
            from,
            to,
            promotion,
        },
    )(input)
}

/// Parses a client payload. Returns [`None`] for anything that is not one
/// of the recognized shapes, in its entirety.
pub fn parse_command(input: &str) -> Option<ClientCommand> {
    all_consuming(alt((moves_query, move_command)))(input)
        .ok()
        .map(|(_, command)| command)
}

/// Renders the reply to a `moves` query: the square echoed back, then the
/// legal destinations concatenated without separators.
pub fn moves_reply(square: Square, destinations: &[Square]) -> String {
    let mut reply = format!("moves {square} ");
    for destination in destinations {
        let _ = write!(reply, "{destination}");
    }
    reply
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_moves_queries() {
        assert_eq!(
            parse_command("moves e2"),
            Some(ClientCommand::Moves(Square::E2))
        );
        assert_eq!(
            parse_command("moves h8"),
            Some(ClientCommand::Moves(Square::H8))
        );
    }

    #[test]
    fn parses_plain_moves() {
        assert_eq!(
            parse_command("e2e4"),
            Some(ClientCommand::Move {
                from: Square::E2,
                to: Square::E4,
                promotion: None,
            })
        );
        assert_eq!(
            parse_command("g8f6"),
            Some(ClientCommand::Move {
                from: Square::G8,
                to: Square::F6,
                promotion: None,
            })
        );
    }

    #[test]
    fn parses_promotions() {
        for (suffix, piece) in [
            ('Q', PieceType::Queen),
            ('R', PieceType::Rook),
            ('B', PieceType::Bishop),
            ('N', PieceType::Knight),
        ] {
            assert_eq!(
                parse_command(&format!("e7e8={suffix}")),
                Some(ClientCommand::Move {
                    from: Square::E7,
                    to: Square::E8,
                    promotion: Some(piece),
                })
            );
        }
    }

    #[test]
    fn rejects_malformed_payloads() {
        for payload in [
            "",
            "e2",
            "e2e",
            "e2e9",
            "i2e4",
            "e2e4 ",
            " e2e4",
            "e2e4=K",
            "e2e4=q",
            "e2e4=",
            "e2e4Q",
            "moves",
            "moves ",
            "moves e9",
            "moves e2 ",
            "MOVES e2",
            "resign",
        ] {
            assert_eq!(parse_command(payload), None, "accepted {payload:?}");
        }
    }

    #[test]
    fn moves_reply_concatenates_destinations() {
        assert_eq!(
            moves_reply(Square::E2, &[Square::E3, Square::E4]),
            "moves e2 e3e4"
        );
        assert_eq!(moves_reply(Square::A8, &[]), "moves a8 ");
    }
}
