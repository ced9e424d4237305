use anyhow::Result;
use parking_lot::Mutex;
use std::io::Write;
use std::sync::Arc;
use tokio::runtime::Handle;

use crate::config::Config;
use crate::controller::VisibilityController;
use crate::playback::{PlaybackEvent, TrackWatcher};
use crate::sink::JsonLines;
use crate::types::{FeedMessage, OutputMessage};

/// Routes feed messages to the track watcher and the visibility controller,
/// and publishes the rendered view on the shared output stream.
pub struct Overlay<W: Write + Send + 'static> {
    controller: VisibilityController<JsonLines<W>>,
    watcher: Arc<Mutex<TrackWatcher>>,
    output: JsonLines<W>,
}

impl<W: Write + Send + 'static> Clone for Overlay<W> {
    fn clone(&self) -> Self {
        Self {
            controller: self.controller.clone(),
            watcher: self.watcher.clone(),
            output: self.output.clone(),
        }
    }
}

impl<W: Write + Send + 'static> Overlay<W> {
    pub fn new(output: JsonLines<W>, config: &Config, runtime: Handle) -> Self {
        Self {
            controller: VisibilityController::new(output.clone(), config.fade_delay, runtime),
            watcher: Arc::new(Mutex::new(TrackWatcher::new(
                config.title_prefix.clone(),
                config.placeholder_art.clone(),
            ))),
            output,
        }
    }

    pub fn controller(&self) -> &VisibilityController<JsonLines<W>> {
        &self.controller
    }

    pub fn handle_message(&self, message: FeedMessage) -> Result<()> {
        match message {
            FeedMessage::Hover { hovered } => self.controller.on_hover(hovered),
            FeedMessage::Pause { paused } => {
                let events = self.watcher.lock().set_pause(paused);
                self.apply(&events);
                self.publish_view()?;
            }
            FeedMessage::SongChanged => self.controller.on_song_change(),
            FeedMessage::TrackTick { progress_ms, is_playing } => {
                let events = self.watcher.lock().track_tick(progress_ms, is_playing);
                self.apply(&events);
                self.publish_view()?;
            }
            FeedMessage::NowPlaying(snapshot) => {
                let events = self.watcher.lock().observe(snapshot);
                self.apply(&events);
                self.publish_view()?;
            }
            FeedMessage::NotPlaying => {
                let events = self.watcher.lock().not_playing();
                self.apply(&events);
                self.publish_view()?;
            }
        }

        Ok(())
    }

    /// Write the current view to the output stream
    pub fn publish_view(&self) -> Result<()> {
        let view = self.watcher.lock().view();
        self.output.emit(&OutputMessage::NowPlaying(view))
    }

    fn apply(&self, events: &[PlaybackEvent]) {
        for event in events {
            match event {
                PlaybackEvent::SongChanged => self.controller.on_song_change(),
                PlaybackEvent::PauseChanged(paused) => self.controller.on_pause(*paused),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Album, Artist, PlaybackSnapshot, PlaybackState, Track};
    use std::time::Duration;
    use tokio::time::sleep;

    fn overlay() -> (Overlay<Vec<u8>>, JsonLines<Vec<u8>>) {
        let output = JsonLines::new(Vec::new());
        let overlay = Overlay::new(output.clone(), &Config::default(), Handle::current());
        (overlay, output)
    }

    fn lines(output: &JsonLines<Vec<u8>>) -> Vec<OutputMessage> {
        output.with_writer(|buf| {
            String::from_utf8_lossy(buf)
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        })
    }

    fn visibility(output: &JsonLines<Vec<u8>>) -> Vec<bool> {
        lines(output)
            .into_iter()
            .filter_map(|message| match message {
                OutputMessage::Visibility { visible } => Some(visible),
                OutputMessage::NowPlaying(_) => None,
            })
            .collect()
    }

    fn now_playing(name: &str, is_playing: bool) -> FeedMessage {
        FeedMessage::NowPlaying(PlaybackSnapshot {
            item: Track {
                name: name.to_string(),
                artists: vec![Artist { name: "Stereolab".to_string() }],
                album: Album { name: "Dots and Loops".to_string(), images: Vec::new() },
                duration_ms: 180_000,
            },
            progress_ms: 90_000,
            is_playing,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn new_track_shows_and_fades() {
        let (overlay, output) = overlay();

        overlay.handle_message(now_playing("Miss Modular", true)).unwrap();
        assert!(overlay.controller().is_visible());

        // Polling the same track does not restart the countdown
        sleep(Duration::from_millis(5_000)).await;
        overlay.handle_message(now_playing("Miss Modular", true)).unwrap();

        sleep(Duration::from_millis(5_001)).await;
        assert!(!overlay.controller().is_visible());
        assert_eq!(visibility(&output), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_track_stays_visible_until_resumed() {
        let (overlay, output) = overlay();

        overlay.handle_message(now_playing("Brakhage", false)).unwrap();
        sleep(Duration::from_secs(60)).await;
        assert!(overlay.controller().is_visible());

        overlay
            .handle_message(FeedMessage::TrackTick { progress_ms: 91_000, is_playing: true })
            .unwrap();
        sleep(Duration::from_millis(10_001)).await;
        assert!(!overlay.controller().is_visible());
        assert_eq!(visibility(&output), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_pause_is_released_by_playing_tick() {
        let (overlay, output) = overlay();

        overlay.handle_message(FeedMessage::Pause { paused: true }).unwrap();
        assert!(overlay.controller().is_paused());

        overlay
            .handle_message(FeedMessage::TrackTick { progress_ms: 1_000, is_playing: true })
            .unwrap();
        assert!(!overlay.controller().is_paused());

        sleep(Duration::from_millis(10_001)).await;
        assert!(!overlay.controller().is_visible());
        assert_eq!(visibility(&output), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_pause_is_released_by_not_playing() {
        let (overlay, _output) = overlay();

        overlay.handle_message(FeedMessage::Pause { paused: true }).unwrap();
        overlay.handle_message(FeedMessage::NotPlaying).unwrap();
        assert!(!overlay.controller().is_paused());

        sleep(Duration::from_millis(10_001)).await;
        assert!(!overlay.controller().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_resume_then_paused_poll_restores_hold() {
        let (overlay, _output) = overlay();

        overlay.handle_message(now_playing("Brakhage", false)).unwrap();
        overlay.handle_message(FeedMessage::Pause { paused: false }).unwrap();
        assert!(!overlay.controller().is_paused());

        // The next paused poll re-establishes the hold
        overlay.handle_message(now_playing("Brakhage", false)).unwrap();
        assert!(overlay.controller().is_paused());

        sleep(Duration::from_secs(60)).await;
        assert!(overlay.controller().is_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn view_follows_every_playback_message() {
        let (overlay, output) = overlay();

        overlay.handle_message(now_playing("Prisoner of Mars", false)).unwrap();
        overlay.handle_message(FeedMessage::NotPlaying).unwrap();

        let views: Vec<_> = lines(&output)
            .into_iter()
            .filter_map(|message| match message {
                OutputMessage::NowPlaying(view) => Some(view),
                OutputMessage::Visibility { .. } => None,
            })
            .collect();

        assert_eq!(views.len(), 2);
        assert_eq!(views[0].title, "Song: Prisoner of Mars");
        assert_eq!(views[0].progress, 0.5);
        assert_eq!(views[0].state, PlaybackState::Paused);
        assert_eq!(views[1].title, "Song: Not Playing");
        assert_eq!(views[1].state, PlaybackState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn hover_messages_drive_the_controller() {
        let (overlay, output) = overlay();

        overlay.handle_message(FeedMessage::Hover { hovered: true }).unwrap();
        assert!(overlay.controller().is_hovered());
        overlay.handle_message(FeedMessage::Hover { hovered: false }).unwrap();

        sleep(Duration::from_millis(10_001)).await;
        assert_eq!(visibility(&output), vec![true, false]);
    }
}
