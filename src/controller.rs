use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

use crate::sink::VisibilitySink;
use crate::state::VisibilityState;
use crate::timer::HideTimer;

struct Inner<S> {
    state: VisibilityState,
    sink: S,
}

impl<S: VisibilitySink> Inner<S> {
    /// Push `visible` to the sink unless it is already applied
    fn apply(&mut self, visible: bool) {
        if self.state.last_applied == Some(visible) {
            return;
        }

        log::debug!("Overlay {}", if visible { "shown" } else { "hidden" });
        self.sink.set_visible(visible);
        self.state.last_applied = Some(visible);
    }

    fn show(&mut self) {
        self.state.cancel_pending_hide();
        self.apply(true);
    }

    /// Called from the timer task. Holds are checked now, not when the hide was scheduled.
    fn fire_hide(&mut self, generation: u64) {
        if generation != self.state.generation {
            log::trace!("Ignoring superseded hide timer (generation {})", generation);
            return;
        }

        self.state.pending_hide = None;

        if self.state.is_held() {
            log::debug!(
                "Fade-out skipped (hovered: {}, paused: {})",
                self.state.is_hovered,
                self.state.is_paused
            );
            return;
        }

        self.apply(false);
    }
}

/// Decides when the now-playing overlay is shown or faded out.
///
/// Hover and pause are holds: while either is active the overlay stays
/// visible and no hide can land. A song change shows the overlay and starts
/// a fade countdown; releasing the last hold starts a fresh countdown.
/// At most one hide timer is pending at any time.
///
/// Clones share the same state and sink.
pub struct VisibilityController<S: VisibilitySink> {
    inner: Arc<Mutex<Inner<S>>>,
    runtime: Handle,
}

impl<S: VisibilitySink> Clone for VisibilityController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            runtime: self.runtime.clone(),
        }
    }
}

impl<S: VisibilitySink> VisibilityController<S> {
    /// Create a controller writing to `sink`. Hide timers are spawned on `runtime`.
    pub fn new(sink: S, fade_delay: Duration, runtime: Handle) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                state: VisibilityState::new(fade_delay),
                sink,
            })),
            runtime,
        }
    }

    /// Pointer entered (`true`) or left (`false`) the overlay
    pub fn on_hover(&self, hovered: bool) {
        let mut inner = self.inner.lock();
        inner.state.is_hovered = hovered;
        self.update_visibility_locked(&mut inner);
    }

    /// Playback paused or resumed.
    ///
    /// Pausing always forces the overlay visible. Resuming re-evaluates the
    /// remaining hold; resuming when not paused changes nothing.
    pub fn on_pause(&self, paused: bool) {
        let mut inner = self.inner.lock();

        if paused {
            inner.state.is_paused = true;
            inner.show();
            return;
        }

        if !inner.state.is_paused {
            return;
        }

        inner.state.is_paused = false;
        self.update_visibility_locked(&mut inner);
    }

    /// A different track started: show now and restart the fade countdown
    pub fn on_song_change(&self) {
        let mut inner = self.inner.lock();
        inner.show();

        if !inner.state.is_held() {
            self.schedule_hide_locked(&mut inner);
        }
    }

    /// Show if a hold is active, otherwise start the fade countdown
    #[cfg(test)]
    pub fn update_visibility(&self) {
        let mut inner = self.inner.lock();
        self.update_visibility_locked(&mut inner);
    }

    /// Replace any pending hide with one due `fade_delay` from now
    #[cfg(test)]
    pub fn schedule_hide(&self) {
        let mut inner = self.inner.lock();
        self.schedule_hide_locked(&mut inner);
    }

    #[cfg(test)]
    pub fn is_visible(&self) -> bool {
        self.inner.lock().state.is_visible()
    }

    #[cfg(test)]
    pub fn is_hovered(&self) -> bool {
        self.inner.lock().state.is_hovered
    }

    #[cfg(test)]
    pub fn is_paused(&self) -> bool {
        self.inner.lock().state.is_paused
    }

    #[cfg(test)]
    pub fn has_pending_hide(&self) -> bool {
        self.inner.lock().state.pending_hide.is_some()
    }

    pub fn fade_delay(&self) -> Duration {
        self.inner.lock().state.fade_delay
    }

    fn update_visibility_locked(&self, inner: &mut Inner<S>) {
        if inner.state.is_held() {
            inner.show();
        } else {
            self.schedule_hide_locked(inner);
        }
    }

    fn schedule_hide_locked(&self, inner: &mut Inner<S>) {
        inner.state.cancel_pending_hide();
        inner.state.generation += 1;

        let generation = inner.state.generation;
        let weak = Arc::downgrade(&self.inner);
        let timer = HideTimer::schedule(&self.runtime, inner.state.fade_delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.lock().fire_hide(generation);
            }
        });

        log::trace!(
            "Hide scheduled in {:?} (generation {})",
            inner.state.fade_delay,
            generation
        );
        inner.state.pending_hide = Some(timer);
    }
}
