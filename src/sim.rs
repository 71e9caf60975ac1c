//! Stand-ins for the browser: an external player that echoes commands back as
//! state notifications, and a resource loader that completes the page's
//! images at jittered intervals.

use std::collections::{HashSet, VecDeque};
use std::ops::Range;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::player::{ExternalPlayer, PlayerState};
use crate::runtime::FolioEvent;

#[derive(Debug)]
pub struct SimulatedPlayer {
    ready: bool,
    state: PlayerState,
    loaded: Option<String>,
    played: Duration,
    track_length: Duration,
    failing_ids: HashSet<String>,
    pending: VecDeque<PlayerState>,
}

impl SimulatedPlayer {
    pub fn new(track_length: Duration) -> Self {
        Self {
            ready: true,
            state: PlayerState::Unstarted,
            loaded: None,
            played: Duration::ZERO,
            track_length,
            failing_ids: HashSet::new(),
            pending: VecDeque::new(),
        }
    }

    /// Tracks with these ids report an error when loaded
    pub fn with_failing<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.failing_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    /// Position in the current track
    pub fn position(&self) -> Duration {
        self.played
    }

    pub fn track_length(&self) -> Duration {
        self.track_length
    }

    fn report(&mut self, state: PlayerState) {
        self.state = state;
        self.pending.push_back(state);
    }

    /// Advances playback by `dt`; a track that runs out reports Ended.
    pub fn advance(&mut self, dt: Duration) {
        if self.state != PlayerState::Playing {
            return;
        }
        self.played += dt;
        if self.played >= self.track_length {
            self.played = self.track_length;
            self.report(PlayerState::Ended);
        }
    }

    /// State notifications since the last call, oldest first
    pub fn drain_state_changes(&mut self) -> Vec<PlayerState> {
        self.pending.drain(..).collect()
    }
}

impl ExternalPlayer for SimulatedPlayer {
    fn is_ready(&self) -> bool {
        self.ready
    }

    fn play(&mut self) {
        if self.loaded.is_some() && self.state != PlayerState::Error {
            self.report(PlayerState::Playing);
        }
    }

    fn pause(&mut self) {
        if self.state == PlayerState::Playing {
            self.report(PlayerState::Paused);
        }
    }

    fn load_track_by_id(&mut self, external_id: &str) {
        let keep_playing = matches!(self.state, PlayerState::Playing | PlayerState::Ended);
        self.loaded = Some(external_id.to_string());
        self.played = Duration::ZERO;
        debug!(external_id, keep_playing, "simulated player loading");

        if self.failing_ids.contains(external_id) {
            self.report(PlayerState::Error);
        } else if keep_playing {
            self.report(PlayerState::Buffering);
            self.report(PlayerState::Playing);
        } else {
            self.report(PlayerState::Cued);
        }
    }
}

/// Completes `count` resources after jittered delays, failing some of them.
#[derive(Debug, Clone)]
pub struct ResourceSimulator {
    count: usize,
    delay_ms: Range<u64>,
    failure_rate: f64,
    seed: Option<u64>,
}

impl ResourceSimulator {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            delay_ms: 150..900,
            failure_rate: 0.1,
            seed: None,
        }
    }

    pub fn delay_ms(mut self, range: Range<u64>) -> Self {
        self.delay_ms = range;
        self
    }

    pub fn failure_rate(mut self, rate: f64) -> Self {
        // gen_bool panics outside [0, 1]; NaN slips through clamp
        self.failure_rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Gap before each completion and whether it succeeds
    pub fn plan(&self) -> Vec<(Duration, bool)> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        (0..self.count)
            .map(|_| {
                let gap = if self.delay_ms.is_empty() {
                    self.delay_ms.start
                } else {
                    rng.gen_range(self.delay_ms.clone())
                };
                (Duration::from_millis(gap), !rng.gen_bool(self.failure_rate))
            })
            .collect()
    }

    pub fn spawn(self, tx: Sender<FolioEvent>) -> JoinHandle<()> {
        let plan = self.plan();
        thread::spawn(move || {
            for (gap, ok) in plan {
                thread::sleep(gap);
                if tx.send(FolioEvent::ResourceLoaded { ok }).is_err() {
                    break;
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn first_load_cues_then_play_reports_playing() {
        let mut p = SimulatedPlayer::new(Duration::from_secs(30));
        p.load_track_by_id("a");
        p.play();
        assert_eq!(
            p.drain_state_changes(),
            vec![PlayerState::Cued, PlayerState::Playing]
        );
        assert!(p.drain_state_changes().is_empty());
    }

    #[test]
    fn load_while_playing_keeps_playing() {
        let mut p = SimulatedPlayer::new(Duration::from_secs(30));
        p.load_track_by_id("a");
        p.play();
        p.drain_state_changes();

        p.load_track_by_id("b");
        assert_eq!(
            p.drain_state_changes(),
            vec![PlayerState::Buffering, PlayerState::Playing]
        );
    }

    #[test]
    fn track_runs_out_and_ends() {
        let mut p = SimulatedPlayer::new(Duration::from_secs(2));
        p.load_track_by_id("a");
        p.play();
        p.drain_state_changes();

        p.advance(Duration::from_secs(1));
        assert!(p.drain_state_changes().is_empty());
        p.advance(Duration::from_secs(1));
        assert_eq!(p.drain_state_changes(), vec![PlayerState::Ended]);

        // ended players stay put
        p.advance(Duration::from_secs(5));
        assert!(p.drain_state_changes().is_empty());
    }

    #[test]
    fn failing_ids_report_error() {
        let mut p = SimulatedPlayer::new(Duration::from_secs(2)).with_failing(["bad"]);
        p.load_track_by_id("bad");
        p.play();
        assert_eq!(p.drain_state_changes(), vec![PlayerState::Error]);
    }

    #[test]
    fn pause_only_reports_when_playing() {
        let mut p = SimulatedPlayer::new(Duration::from_secs(2));
        p.pause();
        assert!(p.drain_state_changes().is_empty());
    }

    #[test]
    fn seeded_plan_is_reproducible() {
        let a = ResourceSimulator::new(6).seed(7).failure_rate(0.5).plan();
        let b = ResourceSimulator::new(6).seed(7).failure_rate(0.5).plan();
        assert_eq!(a, b);
        assert_eq!(a.len(), 6);
        assert!(a
            .iter()
            .all(|(gap, _)| (150..900).contains(&(gap.as_millis() as u64))));
    }

    #[test]
    fn out_of_range_failure_rates_are_tamed() {
        let nan = ResourceSimulator::new(3).failure_rate(f64::NAN).seed(1).plan();
        assert!(nan.iter().all(|(_, ok)| *ok));

        let high = ResourceSimulator::new(3).failure_rate(7.0).seed(1).plan();
        assert!(high.iter().all(|(_, ok)| !*ok));

        let inf = ResourceSimulator::new(3).failure_rate(f64::NEG_INFINITY).seed(1).plan();
        assert!(inf.iter().all(|(_, ok)| *ok));
    }

    #[test]
    fn spawned_loader_sends_every_completion() {
        let (tx, rx) = mpsc::channel();
        let handle = ResourceSimulator::new(3)
            .delay_ms(0..1)
            .failure_rate(0.0)
            .spawn(tx);
        handle.join().unwrap();

        let events: Vec<FolioEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 3);
        assert!(events
            .iter()
            .all(|e| matches!(e, FolioEvent::ResourceLoaded { ok: true })));
    }
}
