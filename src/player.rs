//! Study-session playlist controller.
//!
//! [`SessionPlayer`] owns the playlist, the current index and the capped
//! elapsed-time counter, and drives one [`ExternalPlayer`] handle. It mirrors
//! the external player's reported state rather than guessing it: toggling
//! asks the player to play or pause, and `is_playing` only changes when the
//! player reports back.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::analytics::Analytics;
use crate::playlist::{Playlist, Track};

/// Length of one focus session, in seconds of accumulated playing time
pub const SESSION_DURATION: u32 = 1800;

/// States reported by the external player
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Error,
}

/// Black-box player the controller delegates playback to
pub trait ExternalPlayer {
    fn is_ready(&self) -> bool;
    fn play(&mut self);
    fn pause(&mut self);
    fn load_track_by_id(&mut self, external_id: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub session_duration_secs: u32,
    /// Pause between a track error and skipping to the next track
    pub skip_delay: Duration,
    /// How long to wait for the external player before showing a fallback
    pub player_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_duration_secs: SESSION_DURATION,
            skip_delay: Duration::from_millis(2_000),
            player_grace: Duration::from_millis(5_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    StateChange(PlayerState),
    Tick,
    SkipAfterError { from_index: usize },
    PlayerGraceExpired,
}

/// Work the host performs on the controller's behalf
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Cancel any running tick, then start a fresh 1 s tick
    StartTick,
    StopTick,
    ScheduleSkip { after: Duration, from_index: usize },
    SchedulePlayerGrace(Duration),
    TrackChanged(usize),
    ShowError(String),
    PlayerUnavailable,
    SessionComplete,
}

#[derive(Debug)]
pub struct SessionPlayer<P> {
    playlist: Playlist,
    current_index: usize,
    is_playing: bool,
    elapsed_seconds: u32,
    session_complete: bool,
    last_error: Option<String>,
    player: Option<P>,
    /// Current track still has to be loaded once the player is ready
    pending_load: bool,
    config: SessionConfig,
    analytics: Analytics,
}

impl<P: ExternalPlayer> SessionPlayer<P> {
    /// The returned effects arm the player-readiness grace window.
    pub fn new(
        playlist: Playlist,
        config: SessionConfig,
        analytics: Analytics,
    ) -> (Self, Vec<SessionEffect>) {
        let session = Self {
            playlist,
            current_index: 0,
            is_playing: false,
            elapsed_seconds: 0,
            session_complete: false,
            last_error: None,
            player: None,
            pending_load: false,
            config,
            analytics,
        };
        (
            session,
            vec![SessionEffect::SchedulePlayerGrace(config.player_grace)],
        )
    }

    /// Takes ownership of the external player once it exists and cues the
    /// current track on it.
    pub fn attach_player(&mut self, player: P) -> Vec<SessionEffect> {
        self.player = Some(player);
        info!("external player attached");
        self.select_track(self.current_index)
    }

    pub fn handle(&mut self, event: SessionEvent) -> Vec<SessionEffect> {
        match event {
            SessionEvent::StateChange(state) => self.on_external_state_change(state),
            SessionEvent::Tick => self.on_tick(),
            SessionEvent::SkipAfterError { from_index } => self.on_skip_after_error(from_index),
            SessionEvent::PlayerGraceExpired => self.on_player_grace_expired(),
        }
    }

    /// Selects `index` (wrapped into the playlist), resets the session clock
    /// and loads the track on the external player.
    pub fn select_track(&mut self, index: usize) -> Vec<SessionEffect> {
        let index = index % self.playlist.len();
        self.current_index = index;
        self.elapsed_seconds = 0;
        self.session_complete = false;
        self.last_error = None;

        let track = self.current_track().clone();
        self.pending_load = true;
        self.load_pending();
        if self.pending_load {
            debug!(index, "player not ready, track will load once it is");
        }
        info!(index, title = %track.title, artist = %track.artist, "track selected");
        self.analytics.emit("player", "select", track.title);

        vec![SessionEffect::StopTick, SessionEffect::TrackChanged(index)]
    }

    /// Loads a track selected while the player was not ready yet
    fn load_pending(&mut self) {
        if !self.pending_load {
            return;
        }
        let Some(player) = self.player.as_mut().filter(|p| p.is_ready()) else {
            return;
        };
        let external_id = &self.playlist.tracks()[self.current_index].external_id;
        player.load_track_by_id(external_id);
        self.pending_load = false;
    }

    pub fn next_track(&mut self) -> Vec<SessionEffect> {
        let n = self.playlist.len();
        self.select_track((self.current_index + 1) % n)
    }

    pub fn previous_track(&mut self) -> Vec<SessionEffect> {
        let n = self.playlist.len();
        self.select_track((self.current_index + n - 1) % n)
    }

    /// Asks the external player to play or pause. Returns false (and does
    /// nothing) when no ready player is attached.
    pub fn toggle_play_pause(&mut self) -> bool {
        self.load_pending();
        let Some(player) = self.player.as_mut().filter(|p| p.is_ready()) else {
            warn!("play/pause requested before the external player is ready");
            return false;
        };
        if self.is_playing {
            player.pause();
            self.analytics.emit("player", "pause", self.current_track().title.clone());
        } else {
            player.play();
            self.analytics.emit("player", "play", self.current_track().title.clone());
        }
        true
    }

    pub fn on_external_state_change(&mut self, state: PlayerState) -> Vec<SessionEffect> {
        // any notification means the player is alive
        self.load_pending();
        match state {
            PlayerState::Playing => {
                self.is_playing = true;
                if self.session_complete {
                    // session is over until the next track change
                    Vec::new()
                } else {
                    vec![SessionEffect::StartTick]
                }
            }
            PlayerState::Paused => {
                self.is_playing = false;
                vec![SessionEffect::StopTick]
            }
            PlayerState::Ended => {
                self.is_playing = false;
                debug!(index = self.current_index, "track ended, advancing");
                self.next_track()
            }
            PlayerState::Error => {
                self.is_playing = false;
                let message = format!("Could not play \"{}\"", self.current_track().title);
                warn!(
                    index = self.current_index,
                    external_id = %self.current_track().external_id,
                    "external player reported an error, skipping"
                );
                self.analytics.emit("player", "error", self.current_track().title.clone());
                self.last_error = Some(message.clone());
                vec![
                    SessionEffect::StopTick,
                    SessionEffect::ShowError(message),
                    SessionEffect::ScheduleSkip {
                        after: self.config.skip_delay,
                        from_index: self.current_index,
                    },
                ]
            }
            PlayerState::Buffering | PlayerState::Cued | PlayerState::Unstarted => {
                debug!(%state, "external player state");
                Vec::new()
            }
        }
    }

    /// One second of playing time
    pub fn on_tick(&mut self) -> Vec<SessionEffect> {
        if !self.is_playing || self.session_complete {
            return vec![SessionEffect::StopTick];
        }
        let cap = self.config.session_duration_secs;
        self.elapsed_seconds = (self.elapsed_seconds + 1).min(cap);
        if self.elapsed_seconds < cap {
            return Vec::new();
        }

        self.session_complete = true;
        if let Some(player) = self.player.as_mut() {
            player.pause();
        }
        info!(elapsed_secs = self.elapsed_seconds, "focus session complete");
        self.analytics.emit("session", "complete", self.current_track().title.clone());
        vec![SessionEffect::StopTick, SessionEffect::SessionComplete]
    }

    fn on_skip_after_error(&mut self, from_index: usize) -> Vec<SessionEffect> {
        if from_index != self.current_index || self.last_error.is_none() {
            // the user already moved on
            return Vec::new();
        }
        self.next_track()
    }

    fn on_player_grace_expired(&mut self) -> Vec<SessionEffect> {
        if self.player.as_ref().is_some_and(|p| p.is_ready()) {
            return Vec::new();
        }
        warn!(
            grace_ms = self.config.player_grace.as_millis() as u64,
            "external player never became ready"
        );
        vec![SessionEffect::PlayerUnavailable]
    }

    pub fn current_track(&self) -> &Track {
        // index is always kept in range by select_track
        &self.playlist.tracks()[self.current_index]
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.elapsed_seconds
    }

    pub fn session_duration_secs(&self) -> u32 {
        self.config.session_duration_secs
    }

    /// Session progress in [0, 1]
    pub fn progress(&self) -> f64 {
        if self.config.session_duration_secs == 0 {
            return 1.0;
        }
        (self.elapsed_seconds as f64 / self.config.session_duration_secs as f64).clamp(0.0, 1.0)
    }

    pub fn is_session_complete(&self) -> bool {
        self.session_complete
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn player(&self) -> Option<&P> {
        self.player.as_ref()
    }

    pub fn player_mut(&mut self) -> Option<&mut P> {
        self.player.as_mut()
    }
}
