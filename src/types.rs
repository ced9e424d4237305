use serde::{Deserialize, Serialize};

/// One artist credit on a track
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlbumImage {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Album {
    pub name: String,
    #[serde(default)]
    pub images: Vec<AlbumImage>,
}

/// Track as reported by the streaming service's currently-playing payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Album,
    #[serde(default)]
    pub duration_ms: u64,
}

impl Track {
    /// Artist names joined the way they are displayed
    pub fn artist_line(&self) -> String {
        self.artists
            .iter()
            .map(|artist| artist.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Identity used to detect song changes between two polls
    pub fn identity(&self) -> String {
        format!("{} - {}", self.name, self.artist_line())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybackSnapshot {
    pub item: Track,
    #[serde(default)]
    pub progress_ms: u64,
    pub is_playing: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Playing,
    Paused,
    Stopped,
}

/// Everything the presentation layer needs to draw the overlay contents
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NowPlayingView {
    pub document_title: String,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub cover_url: String,
    /// Fraction of the track played, 0.0 to 1.0
    pub progress: f64,
    pub state: PlaybackState,
}

/// Messages emitted by the producer process, one JSON object per line
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedMessage {
    Hover { hovered: bool },
    Pause { paused: bool },
    SongChanged,
    TrackTick { progress_ms: u64, is_playing: bool },
    NowPlaying(PlaybackSnapshot),
    NotPlaying,
}

/// Lines written for the presentation layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputMessage {
    Visibility { visible: bool },
    NowPlaying(NowPlayingView),
}
