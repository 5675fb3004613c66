use crate::piece::Color;
use std::time::Duration;

/// Independent countdowns per color. Only the side to move loses time.
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub struct Clock {
    remaining: [Duration; 2],
}

impl Clock {
    pub fn new(per_side: Duration) -> Self {
        Self {
            remaining: [per_side; 2],
        }
    }

    pub fn remaining(&self, color: Color) -> Duration {
        self.remaining[color.index()]
    }

    pub fn is_flagged(&self, color: Color) -> bool {
        self.remaining(color).is_zero()
    }

    /// Charges `elapsed` to `turn`, returning `turn` if its time just ran out.
    pub fn tick(&mut self, turn: Color, elapsed: Duration) -> Option<Color> {
        let remaining = &mut self.remaining[turn.index()];
        if remaining.is_zero() {
            return None;
        }

        *remaining = remaining.saturating_sub(elapsed);
        remaining.is_zero().then_some(turn)
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
