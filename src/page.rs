//! Page lifecycle host.
//!
//! [`Page`] owns one [`ReadinessGate`] and one [`SessionPlayer`], performs the
//! effects they return, and routes due timers back into them. Everything runs
//! on the caller's thread; `now` is always page time.

use std::time::Duration;

use tracing::debug;

use crate::analytics::Analytics;
use crate::gate::{GateConfig, GateEffect, GateEvent, ReadinessGate};
use crate::notify::{NotificationKind, Notifier};
use crate::player::{ExternalPlayer, PlayerState, SessionConfig, SessionEffect, SessionEvent, SessionPlayer};
use crate::playlist::Playlist;
use crate::timers::{TimerId, TimerQueue};
use crate::typing::Typewriter;

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PageSetup {
    pub image_count: usize,
    pub gate: GateConfig,
    pub session: SessionConfig,
    pub hero_text: String,
}

impl Default for PageSetup {
    fn default() -> Self {
        Self {
            image_count: 6,
            gate: GateConfig::default(),
            session: SessionConfig::default(),
            hero_text: "Student · Developer · Lifelong learner".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageTimer {
    GateMaxTimeout,
    GateDeferredOpen,
    OverlayRemoval,
    SessionTick,
    SkipAfterError { from_index: usize },
    PlayerGrace,
}

#[derive(Debug)]
pub struct Page<P> {
    gate: ReadinessGate,
    session: SessionPlayer<P>,
    timers: TimerQueue<PageTimer>,
    gate_timeout: Option<TimerId>,
    tick: Option<TimerId>,
    skip: Option<TimerId>,
    notifier: Notifier,
    hero: Typewriter,
    analytics: Analytics,
    listening_for_resources: bool,
    content_visible: bool,
    overlay_present: bool,
    player_unavailable: bool,
}

impl<P: ExternalPlayer> Page<P> {
    pub fn new(setup: PageSetup, playlist: Playlist, analytics: Analytics, now: Duration) -> Self {
        let (gate, gate_effects) = ReadinessGate::for_images(setup.image_count, now, setup.gate);
        let (session, session_effects) =
            SessionPlayer::new(playlist.clone(), setup.session, analytics.clone());

        let mut page = Self {
            gate,
            session,
            timers: TimerQueue::new(),
            gate_timeout: None,
            tick: None,
            skip: None,
            notifier: Notifier::new(),
            hero: Typewriter::new(setup.hero_text, now),
            analytics,
            listening_for_resources: true,
            content_visible: false,
            overlay_present: true,
            player_unavailable: false,
        };
        page.apply_gate(gate_effects, now);
        page.apply_session(session_effects, now);
        if playlist.is_fallback() {
            page.notifier.show(
                "Playlist unavailable, playing the default track.",
                NotificationKind::Info,
                now,
            );
        }
        page
    }

    pub fn attach_player(&mut self, player: P, now: Duration) {
        self.player_unavailable = false;
        let effects = self.session.attach_player(player);
        self.apply_session(effects, now);
    }

    /// A tracked resource finished loading (or failed to).
    pub fn on_resource_loaded(&mut self, ok: bool, now: Duration) {
        if !self.listening_for_resources {
            return;
        }
        if !ok {
            debug!("resource failed to load, counting it anyway");
        }
        let effects = self.gate.handle(GateEvent::ResourceLoaded, now);
        self.apply_gate(effects, now);
    }

    pub fn on_player_state(&mut self, state: PlayerState, now: Duration) {
        let effects = self.session.handle(SessionEvent::StateChange(state));
        self.apply_session(effects, now);
    }

    pub fn toggle_play_pause(&mut self) -> bool {
        self.session.toggle_play_pause()
    }

    pub fn next_track(&mut self, now: Duration) {
        let effects = self.session.next_track();
        self.apply_session(effects, now);
    }

    pub fn previous_track(&mut self, now: Duration) {
        let effects = self.session.previous_track();
        self.apply_session(effects, now);
    }

    pub fn select_track(&mut self, index: usize, now: Duration) {
        let effects = self.session.select_track(index);
        self.apply_session(effects, now);
    }

    pub fn dismiss_notification(&mut self, now: Duration) {
        self.notifier.dismiss(now);
    }

    /// Fires every timer due at `now`, in deadline order.
    pub fn advance(&mut self, now: Duration) {
        while let Some((deadline, timer)) = self.timers.pop_due(now) {
            self.fire(timer, deadline);
        }
        self.notifier.update(now);
    }

    fn fire(&mut self, timer: PageTimer, at: Duration) {
        match timer {
            PageTimer::GateMaxTimeout => {
                self.gate_timeout = None;
                let effects = self.gate.handle(GateEvent::MaxTimeout, at);
                self.apply_gate(effects, at);
            }
            PageTimer::GateDeferredOpen => {
                let effects = self.gate.handle(GateEvent::DeferredOpen, at);
                self.apply_gate(effects, at);
            }
            PageTimer::OverlayRemoval => {
                self.overlay_present = false;
            }
            PageTimer::SessionTick => {
                self.tick = None;
                let effects = self.session.handle(SessionEvent::Tick);
                self.apply_session(effects, at);
                if self.tick.is_none()
                    && self.session.is_playing()
                    && !self.session.is_session_complete()
                {
                    self.tick = Some(self.timers.schedule_at(at + TICK_INTERVAL, PageTimer::SessionTick));
                }
            }
            PageTimer::SkipAfterError { from_index } => {
                self.skip = None;
                let effects = self.session.handle(SessionEvent::SkipAfterError { from_index });
                self.apply_session(effects, at);
            }
            PageTimer::PlayerGrace => {
                let effects = self.session.handle(SessionEvent::PlayerGraceExpired);
                self.apply_session(effects, at);
            }
        }
    }

    fn apply_gate(&mut self, effects: Vec<GateEffect>, now: Duration) {
        for effect in effects {
            match effect {
                GateEffect::ScheduleMaxTimeout(after) => {
                    self.gate_timeout =
                        Some(self.timers.schedule_in(now, after, PageTimer::GateMaxTimeout));
                }
                GateEffect::ScheduleDeferredOpen(after) => {
                    self.timers.schedule_in(now, after, PageTimer::GateDeferredOpen);
                }
                GateEffect::RevealContent(reason) => {
                    self.content_visible = true;
                    self.analytics.emit("page", "ready", reason.to_string());
                }
                GateEffect::RemoveOverlay { after } => {
                    self.timers.schedule_in(now, after, PageTimer::OverlayRemoval);
                }
                GateEffect::DetachListeners => {
                    self.listening_for_resources = false;
                    if let Some(id) = self.gate_timeout.take() {
                        self.timers.cancel(id);
                    }
                }
            }
        }
    }

    fn apply_session(&mut self, effects: Vec<SessionEffect>, now: Duration) {
        for effect in effects {
            match effect {
                SessionEffect::StartTick => {
                    self.stop_tick();
                    self.tick = Some(self.timers.schedule_in(now, TICK_INTERVAL, PageTimer::SessionTick));
                }
                SessionEffect::StopTick => self.stop_tick(),
                SessionEffect::ScheduleSkip { after, from_index } => {
                    if let Some(id) = self.skip.take() {
                        self.timers.cancel(id);
                    }
                    self.skip = Some(self.timers.schedule_in(
                        now,
                        after,
                        PageTimer::SkipAfterError { from_index },
                    ));
                }
                SessionEffect::SchedulePlayerGrace(after) => {
                    self.timers.schedule_in(now, after, PageTimer::PlayerGrace);
                }
                SessionEffect::TrackChanged(index) => {
                    debug!(index, "display updated for new track");
                }
                SessionEffect::ShowError(message) => {
                    self.notifier.show(message, NotificationKind::Error, now);
                }
                SessionEffect::PlayerUnavailable => {
                    self.player_unavailable = true;
                    self.notifier.show(
                        "Music player could not be loaded.",
                        NotificationKind::Error,
                        now,
                    );
                }
                SessionEffect::SessionComplete => {
                    self.notifier.show(
                        "Focus session complete! Time for a break.",
                        NotificationKind::Success,
                        now,
                    );
                }
            }
        }
    }

    fn stop_tick(&mut self) {
        if let Some(id) = self.tick.take() {
            self.timers.cancel(id);
        }
    }

    pub fn gate(&self) -> &ReadinessGate {
        &self.gate
    }

    pub fn session(&self) -> &SessionPlayer<P> {
        &self.session
    }

    pub fn player_mut(&mut self) -> Option<&mut P> {
        self.session.player_mut()
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn hero(&self) -> &Typewriter {
        &self.hero
    }

    pub fn is_content_visible(&self) -> bool {
        self.content_visible
    }

    pub fn is_overlay_present(&self) -> bool {
        self.overlay_present
    }

    pub fn is_player_unavailable(&self) -> bool {
        self.player_unavailable
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.is_some_and(|id| self.timers.is_pending(id))
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::Track;

    #[derive(Debug, Default)]
    struct NullPlayer {
        pauses: usize,
    }

    impl ExternalPlayer for NullPlayer {
        fn is_ready(&self) -> bool {
            true
        }
        fn play(&mut self) {}
        fn pause(&mut self) {
            self.pauses += 1;
        }
        fn load_track_by_id(&mut self, _: &str) {}
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn page() -> Page<NullPlayer> {
        let tracks = (0..3)
            .map(|i| Track {
                title: format!("T{i}"),
                artist: "a".into(),
                source_url: format!("https://example.com/{i}"),
                external_id: format!("id{i}"),
            })
            .collect();
        let mut page = Page::new(
            PageSetup::default(),
            Playlist::new(tracks).unwrap(),
            Analytics::disabled(),
            Duration::ZERO,
        );
        page.attach_player(NullPlayer::default(), Duration::ZERO);
        page
    }

    #[test]
    fn overlay_is_removed_after_fade() {
        let mut page = page();
        page.advance(secs(6));
        assert!(page.is_content_visible());
        assert!(page.is_overlay_present());

        page.advance(Duration::from_millis(6_300));
        assert!(!page.is_overlay_present());
    }

    #[test]
    fn resources_after_open_are_ignored() {
        let mut page = page();
        for _ in 0..8 {
            page.on_resource_loaded(true, secs(4));
        }
        assert!(page.is_content_visible());
        let count = page.gate().loaded_count();
        page.on_resource_loaded(true, secs(5));
        assert_eq!(page.gate().loaded_count(), count);
    }

    #[test]
    fn track_change_cancels_the_tick() {
        let mut page = page();
        page.on_player_state(PlayerState::Playing, secs(0));
        assert!(page.is_ticking());

        page.next_track(Duration::from_millis(500));
        assert!(!page.is_ticking());

        page.advance(secs(10));
        assert_eq!(page.session().elapsed_seconds(), 0);
    }

    #[test]
    fn ticks_accumulate_while_playing_and_stop_when_paused() {
        let mut page = page();
        page.on_player_state(PlayerState::Playing, secs(0));
        page.advance(secs(10));
        assert_eq!(page.session().elapsed_seconds(), 10);

        page.on_player_state(PlayerState::Paused, secs(10));
        page.advance(secs(20));
        assert_eq!(page.session().elapsed_seconds(), 10);
    }

    #[test]
    fn restarting_the_tick_never_doubles_it() {
        let mut page = page();
        page.on_player_state(PlayerState::Playing, secs(0));
        page.on_player_state(PlayerState::Playing, Duration::from_millis(300));
        page.advance(secs(5));
        assert!(page.session().elapsed_seconds() <= 5);
    }

    #[test]
    fn missing_player_raises_toast_after_grace() {
        let mut page: Page<NullPlayer> = Page::new(
            PageSetup::default(),
            Playlist::fallback(),
            Analytics::disabled(),
            Duration::ZERO,
        );
        assert_eq!(
            page.notifier().visible().map(|n| n.kind),
            Some(NotificationKind::Info)
        );

        page.advance(secs(5));
        assert!(page.is_player_unavailable());
        assert_eq!(
            page.notifier().visible().map(|n| n.kind),
            Some(NotificationKind::Error)
        );
    }
}
