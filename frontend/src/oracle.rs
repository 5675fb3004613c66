//! Move suggestions for computer-controlled seats. Suggestions are never trusted: anything that
//! is not one of the current safe moves, or does not arrive in time, is replaced by a random
//! safe move.

use log::{trace, warn};
use rand::Rng;
use smol::Timer;
use std::time::Duration;
use xiangqi::board::Board;
use xiangqi::game::Game;
use xiangqi::location::Move;
use xiangqi::piece::Color;
use xiangqi::ranker::Ranker;

pub trait MoveOracle {
    /// Proposes a move for `turn`, or `None` to decline.
    fn suggest(&self, board: Board, turn: Color) -> impl Future<Output = Option<Move>>;
}

/// Suggests the best move found by a [`Ranker`] search of fixed depth.
#[derive(Copy, Clone, Debug)]
pub struct RankerOracle {
    pub depth: u32,
}

impl RankerOracle {
    pub fn new(depth: u32) -> Self {
        Self { depth }
    }
}

impl MoveOracle for RankerOracle {
    fn suggest(&self, board: Board, turn: Color) -> impl Future<Output = Option<Move>> {
        let depth = self.depth;
        smol::unblock(move || {
            let mut ranker = Ranker::new(board, turn);
            ranker.rank(depth);
            ranker.best()
        })
    }
}

enum Suggestion {
    Offered(Option<Move>),
    TimedOut,
}

/// Picks the next move for the side to move of `game`, asking `oracle` first and falling back to
/// a uniformly random safe move. `None` only when there is nothing to play.
pub async fn choose_move<O: MoveOracle + ?Sized, R: Rng + ?Sized>(
    oracle: &O,
    game: &Game,
    timeout: Duration,
    random: &mut R,
) -> Option<Move> {
    let moves = game.moves();
    if moves.is_empty() || game.outcome().is_some() {
        return None;
    }

    let suggestion = smol::future::or(
        async { Suggestion::Offered(oracle.suggest(game.board().clone(), game.turn()).await) },
        async {
            Timer::after(timeout).await;
            Suggestion::TimedOut
        },
    )
    .await;

    match suggestion {
        Suggestion::Offered(Some(mv)) if game.is_legal(mv) => {
            trace!("oracle suggested {mv}");
            return Some(mv);
        }
        Suggestion::Offered(Some(mv)) => warn!("oracle suggested unsafe move {mv}, playing a random move"),
        Suggestion::Offered(None) => warn!("oracle declined to suggest a move, playing a random move"),
        Suggestion::TimedOut => warn!("oracle did not answer within {timeout:?}, playing a random move"),
    }

    Some(moves[random.random_range(0..moves.len())])
}
