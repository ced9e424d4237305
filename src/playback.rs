use crate::types::{NowPlayingView, PlaybackSnapshot, PlaybackState, Track};

/// Transitions the visibility controller cares about
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    SongChanged,
    PauseChanged(bool),
}

/// Tracks what is playing across polls and reports only real changes.
///
/// The producer polls the streaming service every second, so the same
/// track and play state arrive over and over; only identity changes and
/// pause flips become events.
pub struct TrackWatcher {
    track: Option<Track>,
    identity: Option<String>,
    progress_ms: u64,
    paused: bool,
    title_prefix: String,
    placeholder_art: String,
}

impl TrackWatcher {
    pub fn new(title_prefix: impl Into<String>, placeholder_art: impl Into<String>) -> Self {
        Self {
            track: None,
            identity: None,
            progress_ms: 0,
            paused: false,
            title_prefix: title_prefix.into(),
            placeholder_art: placeholder_art.into(),
        }
    }

    /// Apply a full currently-playing snapshot
    pub fn observe(&mut self, snapshot: PlaybackSnapshot) -> Vec<PlaybackEvent> {
        let mut events = Vec::new();

        let identity = snapshot.item.identity();
        if self.identity.as_deref() != Some(identity.as_str()) {
            log::info!("Now playing: {}", identity);
            self.identity = Some(identity);
            events.push(PlaybackEvent::SongChanged);
        }

        self.track = Some(snapshot.item);
        events.extend(self.track_tick(snapshot.progress_ms, snapshot.is_playing));
        events
    }

    /// Progress update for the current track
    pub fn track_tick(&mut self, progress_ms: u64, is_playing: bool) -> Vec<PlaybackEvent> {
        self.progress_ms = progress_ms;
        self.set_paused(!is_playing).into_iter().collect()
    }

    /// Explicit pause or resume from the producer
    pub fn set_pause(&mut self, paused: bool) -> Vec<PlaybackEvent> {
        self.set_paused(paused).into_iter().collect()
    }

    /// The service reports nothing playing
    pub fn not_playing(&mut self) -> Vec<PlaybackEvent> {
        if self.track.is_some() {
            log::info!("Playback stopped");
        }

        self.track = None;
        self.identity = None;
        self.progress_ms = 0;
        self.set_paused(false).into_iter().collect()
    }

    fn set_paused(&mut self, paused: bool) -> Option<PlaybackEvent> {
        if self.paused == paused {
            return None;
        }

        log::debug!("Playback {}", if paused { "paused" } else { "resumed" });
        self.paused = paused;
        Some(PlaybackEvent::PauseChanged(paused))
    }

    pub fn view(&self) -> NowPlayingView {
        let Some(track) = &self.track else {
            return NowPlayingView {
                document_title: format!("{}: Not Playing", self.title_prefix),
                title: "Song: Not Playing".to_string(),
                artist: "Artist: Not Playing".to_string(),
                album: "Album: Not Playing".to_string(),
                cover_url: self.placeholder_art.clone(),
                progress: 0.0,
                state: PlaybackState::Stopped,
            };
        };

        let artists = track.artist_line();

        // Singles usually carry the track name as album name
        let album = if track.album.name != track.name {
            format!("Album: {}", track.album.name)
        } else {
            String::new()
        };

        NowPlayingView {
            document_title: format!("{}: {} - {}", self.title_prefix, track.name, artists),
            title: format!("Song: {}", track.name),
            artist: format!("Artist: {}", artists),
            album,
            cover_url: track
                .album
                .images
                .first()
                .map(|image| image.url.clone())
                .unwrap_or_else(|| self.placeholder_art.clone()),
            progress: progress_fraction(self.progress_ms, track.duration_ms),
            state: if self.paused {
                PlaybackState::Paused
            } else {
                PlaybackState::Playing
            },
        }
    }
}

fn progress_fraction(progress_ms: u64, duration_ms: u64) -> f64 {
    if duration_ms == 0 {
        return 0.0;
    }
    (progress_ms as f64 / duration_ms as f64).clamp(0.0, 1.0)
}
