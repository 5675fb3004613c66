use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use xiangqi::board::Board;
use xiangqi::check;
use xiangqi::game::{Game, Status};
use xiangqi::legality;
use xiangqi::location::{Location, Move};
use xiangqi::movegen;
use xiangqi::piece::{Color, PieceKind};
use xiangqi::rules::{self, Counters, EndReason, Limits, Outcome};

fn mv(text: &str) -> Move {
    text.parse().unwrap()
}

fn location(text: &str) -> Location {
    text.parse().unwrap()
}

/// Boards reached by random play from the opening, both colors to move.
fn random_positions(seed: u64, games: usize, plies: usize) -> Vec<(Board, Color)> {
    let mut random = StdRng::seed_from_u64(seed);
    let mut positions = Vec::new();

    for _ in 0..games {
        let mut game = Game::opening();
        for _ in 0..plies {
            positions.push((game.board().clone(), game.turn()));
            let moves = game.moves();
            if moves.is_empty() || game.outcome().is_some() {
                break;
            }
            let mv = moves[random.random_range(0..moves.len())];
            assert!(game.play(mv));
        }
    }

    positions
}

fn between(board: &Board, mv: Move) -> usize {
    let (dx, dy) = ((mv.to.x() - mv.from.x()).signum(), (mv.to.y() - mv.from.y()).signum());
    let mut count = 0;
    let mut current = mv.from;
    while let Some(next) = current.shift_xy(dx, dy) {
        if next == mv.to {
            break;
        }
        if board[next].is_some() {
            count += 1;
        }
        current = next;
    }
    count
}

#[test]
fn unscreened_cannon_captures_do_not_exist() {
    let board = Board::opening();

    for (from, blocked, screened) in [("b2", "b7", "b9"), ("h2", "h7", "h9")] {
        let pseudo = movegen::pseudo_moves(&board, location(from));
        let safe = legality::safe_moves(&board, location(from));

        let blocked = Move {
            from: location(from),
            to: location(blocked),
        };
        assert!(!pseudo.contains(&blocked), "{blocked}");
        assert!(!safe.contains(&blocked), "{blocked}");

        let screened = Move {
            from: location(from),
            to: location(screened),
        };
        assert!(pseudo.contains(&screened), "{screened}");
        assert!(safe.contains(&screened), "{screened}");
    }
}

#[test]
fn trapped_general_is_checkmated() {
    // the a9 chariot checks along the back rank, b8 covers the rank below and the black
    // soldier on a3 can neither block nor capture
    let board = Board::from_fen("R3k4/1R7/9/9/9/9/p8/9/9/3K5").unwrap();
    assert!(check::is_in_check(Color::Black, &board));
    assert!(!legality::has_safe_moves(&board, Color::Black));
    assert!(!movegen::pseudo_moves(&board, location("a3")).is_empty());

    let outcome = rules::evaluate(&board, Color::Red, &Counters::default(), &Limits::default());
    assert_eq!(outcome, Some(Outcome::loss(Color::Black, EndReason::Checkmate)));
}

#[test]
fn safe_moves_never_leave_the_general_attacked() {
    for (board, turn) in random_positions(21, 6, 120) {
        for mv in legality::all_safe_moves(&board, turn) {
            assert!(!check::is_in_check(turn, &board.with_move(mv)), "{mv} in {}", board.fen());
        }
    }
}

#[test]
fn no_safe_moves_means_checkmate_or_stalemate() {
    for (board, turn) in random_positions(5, 4, 200) {
        let outcome = rules::evaluate(&board, turn.opponent(), &Counters::default(), &Limits::default());
        if legality::has_safe_moves(&board, turn) {
            assert_eq!(outcome, None);
            continue;
        }

        let reason = if check::is_in_check(turn, &board) {
            EndReason::Checkmate
        } else {
            EndReason::Stalemate
        };
        assert_eq!(outcome, Some(Outcome::loss(turn, reason)));
    }
}

#[test]
fn piece_geometry_holds_in_random_positions() {
    for (board, turn) in random_positions(13, 6, 120) {
        for (from, piece) in board.iter_color(turn) {
            for mv in movegen::pseudo_moves(&board, from) {
                let (dx, dy) = (mv.to.x() - from.x(), mv.to.y() - from.y());
                assert!(board[mv.to].is_none_or(|target| target.color() != turn));

                match piece.kind() {
                    PieceKind::Elephant => {
                        assert!(mv.to.on_home_side(turn), "{mv}");
                        let eye = from.shift_xy(dx / 2, dy / 2).unwrap();
                        assert!(board[eye].is_none(), "{mv}");
                    }
                    PieceKind::Horse => {
                        let leg = if dx.abs() == 2 {
                            from.shift_x(dx / 2)
                        } else {
                            from.shift_y(dy / 2)
                        };
                        assert!(board[leg.unwrap()].is_none(), "{mv}");
                    }
                    PieceKind::Cannon => {
                        let expected = if board[mv.to].is_some() { 1 } else { 0 };
                        assert_eq!(between(&board, mv), expected, "{mv} in {}", board.fen());
                    }
                    PieceKind::Chariot => assert_eq!(between(&board, mv), 0, "{mv}"),
                    PieceKind::General | PieceKind::Advisor => assert!(mv.to.in_palace(turn), "{mv}"),
                    PieceKind::Soldier => assert_ne!(dy, -turn.forward(), "{mv}"),
                }
            }
        }
    }
}

#[test]
fn twelve_consecutive_checks_lose() {
    let board = Board::from_fen("4k4/9/9/R8/9/9/9/9/9/5K3").unwrap();
    let mut game = Game::new(board, Color::Red).unwrap();

    assert!(game.play(mv("a6e6")));
    let mut general = "e9";
    let mut chariot = "e6";

    for _ in 1..12 {
        assert_eq!(game.outcome(), None);
        let (to_general, to_chariot) = if general == "e9" { ("d9", "d6") } else { ("e9", "e6") };
        assert!(game.play(mv(&format!("{general}{to_general}"))));
        assert!(game.play(mv(&format!("{chariot}{to_chariot}"))));
        (general, chariot) = (to_general, to_chariot);
    }

    assert_eq!(game.counters().checks[Color::Red.index()], 12);
    assert_eq!(game.outcome(), Some(Outcome::loss(Color::Red, EndReason::PerpetualCheck)));
    assert_eq!(game.status(), Status::PerpetualCheck);
}

#[test]
fn shuffling_pieces_draws_by_no_progress_then_by_the_cap() {
    let shuffle = ["h0g2", "h9g7", "g2h0", "g7h9"];

    let mut game = Game::opening();
    for (ply, text) in shuffle.iter().cycle().take(60).enumerate() {
        assert_eq!(game.outcome(), None, "ended early at ply {ply}");
        assert!(game.play(mv(text)));
    }
    assert_eq!(game.outcome(), Some(Outcome::draw(EndReason::NoProgress)));

    let limits = Limits {
        no_progress: 1000,
        effective_moves: 1000,
        ..Limits::default()
    };
    let mut game = Game::opening_with_limits(limits);
    for text in shuffle.iter().cycle().take(300) {
        assert!(game.play(mv(text)));
    }
    assert_eq!(game.counters().total, 300);
    assert_eq!(game.outcome(), Some(Outcome::draw(EndReason::MoveCap)));
}

#[test]
fn captures_reset_the_progress_counter() {
    let mut game = Game::opening();
    for text in ["h0g2", "h9g7", "g2h0", "g7h9"] {
        assert!(game.play(mv(text)));
    }
    assert_eq!(game.counters().progress, 4);

    assert!(game.play(mv("b2b9")));
    assert_eq!(game.counters().progress, 0);
    assert!(game.play(mv("a9b9")));
    assert_eq!(game.counters().progress, 0);
    assert!(game.play(mv("a3a4")));
    assert_eq!(game.counters().progress, 1);
}
