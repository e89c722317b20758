/// Whether the target is currently on screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MatchState {
    /// No match; the "found" signal is armed.
    #[default]
    Idle,
    /// Match present; the signal has fired and stays disarmed until the match is lost.
    Matched,
}

/// Edge detector for the one-shot "found" signal.
#[derive(Clone, Debug, Default)]
pub struct MatchNotifier {
    state: MatchState,
}

impl MatchNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    /// Feed the latest `has_match` value. Returns true exactly on the idle -> matched edge.
    pub fn observe(&mut self, has_match: bool) -> bool {
        match (self.state, has_match) {
            (MatchState::Idle, true) => {
                self.state = MatchState::Matched;
                true
            }
            (MatchState::Matched, false) => {
                self.state = MatchState::Idle;
                false
            }
            _ => false,
        }
    }

    pub fn reset(&mut self) {
        self.state = MatchState::Idle;
    }
}
