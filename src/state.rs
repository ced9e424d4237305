use std::time::Duration;

use crate::timer::HideTimer;

pub const DEFAULT_FADE_DELAY: Duration = Duration::from_millis(10_000);

/// Everything the visibility controller knows about the overlay
pub struct VisibilityState {
    pub is_hovered: bool,
    pub is_paused: bool,
    pub fade_delay: Duration,
    /// At most one hide is ever pending
    pub pending_hide: Option<HideTimer>,
    /// Bumped on every schedule and cancel so a superseded timer that already woke up does nothing
    pub generation: u64,
    /// Last visibility pushed to the sink, `None` until the first push
    pub last_applied: Option<bool>,
}

impl VisibilityState {
    pub fn new(fade_delay: Duration) -> Self {
        Self {
            is_hovered: false,
            is_paused: false,
            fade_delay,
            pending_hide: None,
            generation: 0,
            last_applied: None,
        }
    }

    /// Hover or pause keeps the overlay up regardless of elapsed time
    pub fn is_held(&self) -> bool {
        self.is_hovered || self.is_paused
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.last_applied.unwrap_or(false)
    }

    pub fn cancel_pending_hide(&mut self) {
        if let Some(timer) = self.pending_hide.take() {
            timer.cancel();
            self.generation += 1;
        }
    }
}

impl Default for VisibilityState {
    fn default() -> Self {
        Self::new(DEFAULT_FADE_DELAY)
    }
}
