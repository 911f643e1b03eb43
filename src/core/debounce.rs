/// Press debouncer — turns rapid repeated presses into speed-up / skip.

use std::time::Duration;

/// What a press means once its neighbours are taken into account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressAction {
    /// A lone press, or the first of a burst.
    Single,
    /// Second press inside the window: reveal the text faster.
    SpeedUp,
    /// Third press inside the window: reveal everything now.
    Skip,
}

/// Counts presses whose gaps stay inside `window`.
///
/// The timestamp rolls with every press, and the count starts over at 1
/// whenever the gap since the previous press exceeds the window. A third
/// press resets the count, so a fourth rapid press starts a new burst.
#[derive(Debug, Clone)]
pub struct PressDebouncer {
    window: Duration,
    last_press: Option<Duration>,
    count: u8,
}

impl PressDebouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_press: None,
            count: 0,
        }
    }

    /// Register a press at `now` and classify it.
    pub fn press(&mut self, now: Duration) -> PressAction {
        let within = self
            .last_press
            .map(|last| now.saturating_sub(last) <= self.window)
            .unwrap_or(false);
        self.last_press = Some(now);

        self.count = if within { self.count + 1 } else { 1 };

        match self.count {
            2 => PressAction::SpeedUp,
            3 => {
                self.count = 0;
                PressAction::Skip
            }
            _ => PressAction::Single,
        }
    }

    pub fn reset(&mut self) {
        self.last_press = None;
        self.count = 0;
    }
}
