use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{FolioError, Result};

const FETCH_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub title: String,
    pub artist: String,
    #[serde(alias = "url")]
    pub source_url: String,
    /// Identifier the external player loads the track by
    #[serde(alias = "videoId", alias = "id")]
    pub external_id: String,
}

impl Track {
    /// The single built-in track played when no playlist can be loaded
    pub fn fallback() -> Self {
        Self {
            title: "lofi hip hop radio - beats to relax/study to".to_string(),
            artist: "Lofi Girl".to_string(),
            source_url: "https://www.youtube.com/watch?v=jfKfPfyJRdk".to_string(),
            external_id: "jfKfPfyJRdk".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PlaylistOrigin {
    Fetched,
    Fallback,
}

/// Ordered, never-empty list of tracks. Duplicates are allowed.
#[derive(Debug, Clone, PartialEq)]
pub struct Playlist {
    tracks: Vec<Track>,
    origin: PlaylistOrigin,
}

#[allow(clippy::len_without_is_empty)]
impl Playlist {
    pub fn new(tracks: Vec<Track>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(FolioError::EmptyPlaylist);
        }
        Ok(Self {
            tracks,
            origin: PlaylistOrigin::Fetched,
        })
    }

    pub fn fallback() -> Self {
        Self {
            tracks: vec![Track::fallback()],
            origin: PlaylistOrigin::Fallback,
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn get(&self, index: usize) -> Option<&Track> {
        self.tracks.get(index)
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn origin(&self) -> PlaylistOrigin {
        self.origin
    }

    pub fn is_fallback(&self) -> bool {
        self.origin == PlaylistOrigin::Fallback
    }
}

/// Where the track list comes from
pub trait PlaylistSource {
    fn fetch(&self) -> Result<Vec<Track>>;
    fn describe(&self) -> String;
}

/// Accepts either a bare array of tracks or `{ "tracks": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum PlaylistBody {
    Bare(Vec<Track>),
    Wrapped { tracks: Vec<Track> },
}

pub fn parse_playlist(bytes: &[u8]) -> Result<Vec<Track>> {
    let body: PlaylistBody = serde_json::from_slice(bytes)?;
    Ok(match body {
        PlaylistBody::Bare(tracks) | PlaylistBody::Wrapped { tracks } => tracks,
    })
}

#[derive(Debug, Clone)]
pub struct HttpPlaylistSource {
    url: String,
}

impl HttpPlaylistSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl PlaylistSource for HttpPlaylistSource {
    fn fetch(&self) -> Result<Vec<Track>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()?;
        let response = client
            .get(&self.url)
            .header("User-Agent", concat!("folio/", env!("CARGO_PKG_VERSION")))
            .send()?;
        if !response.status().is_success() {
            return Err(FolioError::HttpStatus(response.status().as_u16()));
        }
        let bytes = response.bytes()?;
        parse_playlist(&bytes)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone)]
pub struct FilePlaylistSource {
    path: PathBuf,
}

impl FilePlaylistSource {
    pub fn new<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl PlaylistSource for FilePlaylistSource {
    fn fetch(&self) -> Result<Vec<Track>> {
        let bytes = fs::read(&self.path)?;
        parse_playlist(&bytes)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Study playlist shipped with the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledPlaylistSource;

const BUNDLED_PLAYLIST: &str = include_str!("../assets/playlist.json");

impl PlaylistSource for BundledPlaylistSource {
    fn fetch(&self) -> Result<Vec<Track>> {
        parse_playlist(BUNDLED_PLAYLIST.as_bytes())
    }

    fn describe(&self) -> String {
        "bundled".to_string()
    }
}

/// Loads the playlist, falling back to the built-in track on any failure.
pub fn load_playlist(source: &dyn PlaylistSource) -> Playlist {
    match source.fetch().and_then(Playlist::new) {
        Ok(playlist) => {
            info!(
                source = %source.describe(),
                tracks = playlist.len(),
                "playlist loaded"
            );
            playlist
        }
        Err(e) => {
            warn!(
                source = %source.describe(),
                error = %e,
                "playlist unavailable, using fallback track"
            );
            Playlist::fallback()
        }
    }
}
