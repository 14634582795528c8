//! Default values and validation bounds for CLI options.

/// Matches the classic two-minute anti-repetition window.
pub const DEFAULT_JOKE_COOLDOWN_MS: u64 = 120_000;

/// Below this the cooldown stops being an anti-repetition policy at all.
pub const MIN_JOKE_COOLDOWN_MS: u64 = 1_000;

/// One hour; longer windows starve the pool for the whole session.
pub const MAX_JOKE_COOLDOWN_MS: u64 = 3_600_000;
