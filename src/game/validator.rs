use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove, MoveGen, Piece, Square};

use crate::error::GameError;

/// Outcome of validating a proposed move against a position.
///
/// `Illegal` is a normal result, not an error; [`MoveValidator::validate`]
/// only fails on malformed input.
#[derive(Debug, Clone)]
pub enum MoveVerdict {
    Illegal,
    Legal {
        mv: ChessMove,
        board_after: Board,
        is_check: bool,
        is_checkmate: bool,
        is_stalemate: bool,
    },
}

/// Stateless wrapper over the `chess` crate's rule engine. Shared freely
/// across games; all functions are pure.
pub struct MoveValidator;

impl MoveValidator {
    /// Validate `from`/`to`/`promotion` against `board`.
    pub fn validate(
        board: &Board,
        from: &str,
        to: &str,
        promotion: Option<&str>,
    ) -> Result<MoveVerdict, GameError> {
        let from = Self::parse_square(from)?;
        let to = Self::parse_square(to)?;
        if from == to {
            return Err(GameError::IllegalMove(
                "from and to squares cannot be the same".to_string(),
            ));
        }
        let promotion = Self::parse_promotion(promotion)?;

        let mv = ChessMove::new(from, to, promotion);
        if !board.legal(mv) {
            return Ok(MoveVerdict::Illegal);
        }

        let board_after = board.make_move_new(mv);
        Ok(MoveVerdict::Legal {
            mv,
            board_after,
            is_check: board_after.checkers().popcnt() > 0,
            is_checkmate: board_after.status() == BoardStatus::Checkmate,
            is_stalemate: board_after.status() == BoardStatus::Stalemate,
        })
    }

    /// All legal moves in `board`, in UCI notation.
    pub fn legal_moves(board: &Board) -> Vec<String> {
        MoveGen::new_legal(board)
            .map(|mv| {
                let mut uci = format!("{}{}", mv.get_source(), mv.get_dest());
                if let Some(piece) = mv.get_promotion() {
                    uci.push_str(Self::promotion_letter(piece));
                }
                uci
            })
            .collect()
    }

    /// True when neither side has mating material: no pawns, rooks or
    /// queens, and at most one minor piece per side.
    pub fn insufficient_material(board: &Board) -> bool {
        let heavy = *board.pieces(Piece::Pawn)
            | *board.pieces(Piece::Rook)
            | *board.pieces(Piece::Queen);
        if heavy.popcnt() > 0 {
            return false;
        }
        let minors = *board.pieces(Piece::Knight) | *board.pieces(Piece::Bishop);
        let white_minors = minors & *board.color_combined(chess::Color::White);
        let black_minors = minors & *board.color_combined(chess::Color::Black);
        white_minors.popcnt() <= 1 && black_minors.popcnt() <= 1
    }

    pub fn promotion_letter(piece: Piece) -> &'static str {
        match piece {
            Piece::Queen => "q",
            Piece::Rook => "r",
            Piece::Bishop => "b",
            Piece::Knight => "n",
            Piece::Pawn | Piece::King => "",
        }
    }

    fn parse_square(input: &str) -> Result<Square, GameError> {
        Square::from_str(input.trim().to_lowercase().as_str())
            .map_err(|_| GameError::IllegalMove(format!("invalid square '{}'", input)))
    }

    fn parse_promotion(input: Option<&str>) -> Result<Option<Piece>, GameError> {
        let Some(input) = input else {
            return Ok(None);
        };
        match input.trim().to_lowercase().as_str() {
            "q" => Ok(Some(Piece::Queen)),
            "r" => Ok(Some(Piece::Rook)),
            "b" => Ok(Some(Piece::Bishop)),
            "n" => Ok(Some(Piece::Knight)),
            other => Err(GameError::IllegalMove(format!(
                "invalid promotion piece '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_a_legal_opening_move() {
        let board = Board::default();
        let verdict = MoveValidator::validate(&board, "e2", "e4", None).unwrap();
        match verdict {
            MoveVerdict::Legal {
                board_after,
                is_check,
                is_checkmate,
                is_stalemate,
                ..
            } => {
                assert!(!is_check && !is_checkmate && !is_stalemate);
                assert_eq!(
                    board_after.to_string(),
                    "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
                );
            }
            MoveVerdict::Illegal => panic!("e2e4 must be legal"),
        }
    }

    #[test]
    fn rejects_an_illegal_move_as_a_verdict() {
        let board = Board::default();
        let verdict = MoveValidator::validate(&board, "e2", "e5", None).unwrap();
        assert!(matches!(verdict, MoveVerdict::Illegal));
    }

    #[test]
    fn malformed_input_is_an_error_not_a_verdict() {
        let board = Board::default();
        assert!(MoveValidator::validate(&board, "z9", "e4", None).is_err());
        assert!(MoveValidator::validate(&board, "e2", "e2", None).is_err());
        assert!(MoveValidator::validate(&board, "e2", "e4", Some("k")).is_err());
    }

    #[test]
    fn promotion_requires_the_piece() {
        let board = Board::from_str("4k3/P7/8/8/8/8/8/4K3 w - - 0 1").unwrap();
        let bare = MoveValidator::validate(&board, "a7", "a8", None).unwrap();
        assert!(matches!(bare, MoveVerdict::Illegal));
        let promoted = MoveValidator::validate(&board, "a7", "a8", Some("q")).unwrap();
        assert!(matches!(promoted, MoveVerdict::Legal { .. }));
    }

    #[test]
    fn detects_checkmate() {
        // Fool's mate, one move before the end.
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2")
                .unwrap();
        let verdict = MoveValidator::validate(&board, "d8", "h4", None).unwrap();
        match verdict {
            MoveVerdict::Legal {
                is_check,
                is_checkmate,
                ..
            } => {
                assert!(is_check);
                assert!(is_checkmate);
            }
            MoveVerdict::Illegal => panic!("Qh4# must be legal"),
        }
    }

    #[test]
    fn detects_stalemate() {
        let board = Board::from_str("7k/8/6K1/5Q2/8/8/8/8 w - - 0 1").unwrap();
        let verdict = MoveValidator::validate(&board, "f5", "f7", None).unwrap();
        match verdict {
            MoveVerdict::Legal {
                is_check,
                is_checkmate,
                is_stalemate,
                ..
            } => {
                assert!(!is_check);
                assert!(!is_checkmate);
                assert!(is_stalemate);
            }
            MoveVerdict::Illegal => panic!("Qf7 must be legal"),
        }
    }

    #[test]
    fn insufficient_material_positions() {
        let kk = Board::from_str("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert!(MoveValidator::insufficient_material(&kk));
        let kbk = Board::from_str("8/8/8/4k3/8/2B5/8/4K3 w - - 0 1").unwrap();
        assert!(MoveValidator::insufficient_material(&kbk));
        let knkn = Board::from_str("8/8/3n4/4k3/8/2N5/8/4K3 w - - 0 1").unwrap();
        assert!(MoveValidator::insufficient_material(&knkn));
        let krk = Board::from_str("8/8/8/4k3/8/2R5/8/4K3 w - - 0 1").unwrap();
        assert!(!MoveValidator::insufficient_material(&krk));
        assert!(!MoveValidator::insufficient_material(&Board::default()));
    }

    #[test]
    fn twenty_legal_moves_in_the_starting_position() {
        assert_eq!(MoveValidator::legal_moves(&Board::default()).len(), 20);
    }
}
