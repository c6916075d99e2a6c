//! Game Signals
//!
//! Outbound interface to the collaborators that sit outside the scheduler:
//! the monster behaviour controller and the win/lose state.

/// Receiver of scheduler outputs, injected at construction.
pub trait GameSignals {
    /// Called once per tick with the current aggression level (0..=3).
    fn register_aggression_level(&mut self, level: u8);

    /// Called once, the first tick the game clock reaches the win time.
    fn game_won(&mut self);
}

/// Discards every signal.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSignals;

impl GameSignals for NullSignals {
    fn register_aggression_level(&mut self, _level: u8) {}

    fn game_won(&mut self) {}
}

/// Keeps what it was told, for tests and the headless runner.
#[derive(Debug, Clone, Default)]
pub struct RecordingSignals {
    /// Last level pushed
    pub level: u8,
    /// Highest level ever pushed
    pub peak_level: u8,
    /// Number of level pushes received
    pub level_pushes: u64,
    /// Number of win signals received
    pub wins: u32,
}

impl RecordingSignals {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GameSignals for RecordingSignals {
    fn register_aggression_level(&mut self, level: u8) {
        self.level = level;
        self.peak_level = self.peak_level.max(level);
        self.level_pushes += 1;
    }

    fn game_won(&mut self) {
        self.wins += 1;
    }
}
