use std::sync::atomic::{AtomicU8, Ordering};

/// How boards, pieces and games are rendered as text.
#[derive(Copy, Clone, Debug)]
pub struct DisplayFormat {
    /// Chinese glyphs instead of doubled board-format letters.
    pub chinese: bool,
    /// ANSI colour and emphasis.
    pub effects: bool,
    /// Single line output.
    pub concise: bool,
}

const CHINESE: u8 = 1;
const EFFECTS: u8 = 2;

// process wide preference picked by the binaries from their arguments
static DEFAULTS: AtomicU8 = AtomicU8::new(CHINESE | EFFECTS);

impl DisplayFormat {
    fn from_defaults(concise: bool) -> Self {
        let flags = DEFAULTS.load(Ordering::Relaxed);
        Self {
            chinese: flags & CHINESE != 0,
            effects: flags & EFFECTS != 0,
            concise,
        }
    }

    pub fn pretty() -> Self {
        Self::from_defaults(false)
    }

    /// Plain text suitable for logs and the wire.
    pub fn string() -> Self {
        Self {
            chinese: false,
            effects: false,
            concise: true,
        }
    }

    pub fn with_concise(&self, concise: bool) -> Self {
        Self { concise, ..*self }
    }

    pub fn set_defaults(chinese: bool, effects: bool) {
        let mut flags = 0;
        if chinese {
            flags |= CHINESE;
        }
        if effects {
            flags |= EFFECTS;
        }
        DEFAULTS.store(flags, Ordering::Relaxed);
    }
}
