//! Loading-screen readiness gate.
//!
//! The gate stays closed until the page's resources are accounted for (or a
//! "good enough" share of them, or the ceiling timeout elapses) and never opens
//! before the floor timeout. Transitions return [`GateEffect`]s for the host to
//! perform; the gate itself owns no timers.

use std::time::Duration;

use tracing::{debug, info};

/// Stylesheet and font slots counted alongside the page's images
pub const SYNTHETIC_RESOURCE_SLOTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateConfig {
    /// Floor: the overlay is never removed sooner than this after page setup
    pub min_display: Duration,
    /// Ceiling: the overlay is removed at this point whatever has loaded
    pub max_display: Duration,
    /// Loaded-resource count that is treated as "good enough"
    pub ready_threshold: usize,
    /// Cosmetic delay between revealing content and removing the overlay
    pub overlay_fade: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            min_display: Duration::from_millis(3_000),
            max_display: Duration::from_millis(6_000),
            ready_threshold: 5,
            overlay_fade: Duration::from_millis(300),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatePhase {
    Waiting,
    SatisfiedBelowMinTime,
    Open,
}

/// Which path satisfied the gate first
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum OpenReason {
    #[strum(serialize = "all-resources")]
    AllResources,
    #[strum(serialize = "threshold")]
    Threshold,
    #[strum(serialize = "timeout")]
    Timeout,
}

/// Inputs the host feeds back into the gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEvent {
    ResourceLoaded,
    DeferredOpen,
    MaxTimeout,
}

/// Work the host performs on the gate's behalf. Delays are relative to the
/// page time passed into the transition that produced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateEffect {
    ScheduleMaxTimeout(Duration),
    ScheduleDeferredOpen(Duration),
    RevealContent(OpenReason),
    RemoveOverlay { after: Duration },
    DetachListeners,
}

#[derive(Debug, Clone)]
pub struct ReadinessGate {
    resource_target: usize,
    loaded_count: usize,
    started_at: Duration,
    config: GateConfig,
    phase: GatePhase,
    opened_by: Option<OpenReason>,
}

impl ReadinessGate {
    /// Gate for a page with `image_count` images plus the synthetic slots.
    pub fn for_images(
        image_count: usize,
        now: Duration,
        config: GateConfig,
    ) -> (Self, Vec<GateEffect>) {
        Self::with_target(image_count + SYNTHETIC_RESOURCE_SLOTS, now, config)
    }

    /// Gate expecting exactly `resource_target` completions. The returned
    /// effects arm the ceiling fallback.
    pub fn with_target(
        resource_target: usize,
        now: Duration,
        config: GateConfig,
    ) -> (Self, Vec<GateEffect>) {
        let gate = Self {
            resource_target,
            loaded_count: 0,
            started_at: now,
            config,
            phase: GatePhase::Waiting,
            opened_by: None,
        };
        debug!(
            resource_target,
            max_display_ms = config.max_display.as_millis() as u64,
            "readiness gate armed"
        );
        (gate, vec![GateEffect::ScheduleMaxTimeout(config.max_display)])
    }

    pub fn handle(&mut self, event: GateEvent, now: Duration) -> Vec<GateEffect> {
        match event {
            GateEvent::ResourceLoaded => self.record_resource_loaded(now),
            GateEvent::DeferredOpen | GateEvent::MaxTimeout => self.try_open(now),
        }
    }

    /// Counts one completed resource. Load errors count the same as loads.
    pub fn record_resource_loaded(&mut self, now: Duration) -> Vec<GateEffect> {
        self.loaded_count = self.loaded_count.saturating_add(1);
        if self.phase == GatePhase::Open {
            return Vec::new();
        }
        self.try_open(now)
    }

    pub fn is_satisfied(&self, now: Duration) -> bool {
        self.satisfied_by(now).is_some()
    }

    pub fn try_open(&mut self, now: Duration) -> Vec<GateEffect> {
        if self.phase == GatePhase::Open {
            return Vec::new();
        }
        let Some(reason) = self.satisfied_by(now) else {
            return Vec::new();
        };

        let elapsed = self.elapsed(now);
        if elapsed >= self.config.min_display {
            return self.open(reason, elapsed);
        }
        if self.phase == GatePhase::SatisfiedBelowMinTime {
            // deferred open already scheduled
            return Vec::new();
        }

        let remaining = self.config.min_display - elapsed;
        debug!(
            remaining_ms = remaining.as_millis() as u64,
            "gate satisfied early, deferring open"
        );
        self.phase = GatePhase::SatisfiedBelowMinTime;
        vec![GateEffect::ScheduleDeferredOpen(remaining)]
    }

    fn open(&mut self, reason: OpenReason, elapsed: Duration) -> Vec<GateEffect> {
        self.phase = GatePhase::Open;
        self.opened_by = Some(reason);
        info!(
            %reason,
            loaded = self.loaded_count,
            target = self.resource_target,
            elapsed_ms = elapsed.as_millis() as u64,
            "page ready, revealing content"
        );
        vec![
            GateEffect::RevealContent(reason),
            GateEffect::RemoveOverlay {
                after: self.config.overlay_fade,
            },
            GateEffect::DetachListeners,
        ]
    }

    fn satisfied_by(&self, now: Duration) -> Option<OpenReason> {
        if self.loaded_count >= self.resource_target {
            Some(OpenReason::AllResources)
        } else if self.loaded_count >= self.config.ready_threshold {
            Some(OpenReason::Threshold)
        } else if self.elapsed(now) >= self.config.max_display {
            Some(OpenReason::Timeout)
        } else {
            None
        }
    }

    fn elapsed(&self, now: Duration) -> Duration {
        now.saturating_sub(self.started_at)
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn is_open(&self) -> bool {
        self.phase == GatePhase::Open
    }

    pub fn opened_by(&self) -> Option<OpenReason> {
        self.opened_by
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded_count
    }

    pub fn resource_target(&self) -> usize {
        self.resource_target
    }

    /// Share of resources accounted for, for the overlay's progress bar
    pub fn progress(&self) -> f64 {
        if self.resource_target == 0 {
            return 1.0;
        }
        (self.loaded_count as f64 / self.resource_target as f64).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn reveals(effects: &[GateEffect]) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, GateEffect::RevealContent(_)))
            .count()
    }

    #[test]
    fn start_arms_the_ceiling() {
        let (gate, effects) = ReadinessGate::for_images(4, ms(0), GateConfig::default());
        assert_eq!(gate.resource_target(), 6);
        assert_eq!(effects, vec![GateEffect::ScheduleMaxTimeout(ms(6_000))]);
        assert_eq!(gate.phase(), GatePhase::Waiting);
    }

    #[test]
    fn three_resources_satisfy_only_when_all_loaded() {
        let (mut gate, _) = ReadinessGate::with_target(3, ms(0), GateConfig::default());

        gate.record_resource_loaded(ms(10));
        assert!(!gate.is_satisfied(ms(10)));

        gate.record_resource_loaded(ms(20));
        gate.record_resource_loaded(ms(30));
        assert!(gate.is_satisfied(ms(30)));
    }

    #[test]
    fn all_loaded_after_floor_opens_exactly_once() {
        for target in 0..8 {
            let (mut gate, _) = ReadinessGate::with_target(target, ms(0), GateConfig::default());
            let mut effects = Vec::new();
            for _ in 0..target {
                effects.extend(gate.record_resource_loaded(ms(3_000)));
            }
            effects.extend(gate.try_open(ms(3_000)));
            effects.extend(gate.try_open(ms(3_500)));

            assert!(gate.is_satisfied(ms(3_000)), "target {target}");
            assert_eq!(reveals(&effects), 1, "target {target}");
            assert!(gate.is_open());
        }
    }

    #[test]
    fn opens_at_ceiling_without_any_loads() {
        let (mut gate, _) = ReadinessGate::for_images(10, ms(0), GateConfig::default());

        assert!(gate.handle(GateEvent::MaxTimeout, ms(5_999)).is_empty());
        let effects = gate.handle(GateEvent::MaxTimeout, ms(6_000));

        assert_matches!(effects[0], GateEffect::RevealContent(OpenReason::Timeout));
        assert_eq!(gate.opened_by(), Some(OpenReason::Timeout));
    }

    #[test]
    fn try_open_is_idempotent() {
        let (mut gate, _) = ReadinessGate::with_target(1, ms(0), GateConfig::default());
        let first = gate.record_resource_loaded(ms(4_000));
        let second = gate.try_open(ms(4_001));
        let third = gate.try_open(ms(9_000));

        assert_eq!(reveals(&first), 1);
        assert!(second.is_empty());
        assert!(third.is_empty());
    }

    #[test]
    fn early_satisfaction_defers_open_to_the_floor() {
        let (mut gate, _) = ReadinessGate::with_target(2, ms(0), GateConfig::default());
        gate.record_resource_loaded(ms(500));
        let effects = gate.record_resource_loaded(ms(1_000));

        assert_eq!(effects, vec![GateEffect::ScheduleDeferredOpen(ms(2_000))]);
        assert_eq!(gate.phase(), GatePhase::SatisfiedBelowMinTime);

        // a straggler must not schedule a second deferred open
        assert!(gate.record_resource_loaded(ms(1_500)).is_empty());

        let effects = gate.handle(GateEvent::DeferredOpen, ms(3_000));
        assert_eq!(
            effects,
            vec![
                GateEffect::RevealContent(OpenReason::AllResources),
                GateEffect::RemoveOverlay { after: ms(300) },
                GateEffect::DetachListeners,
            ]
        );
    }

    #[test]
    fn threshold_shortcut_opens_before_all_resources() {
        let (mut gate, _) = ReadinessGate::for_images(20, ms(0), GateConfig::default());
        let mut effects = Vec::new();
        for _ in 0..5 {
            effects.extend(gate.record_resource_loaded(ms(3_200)));
        }
        assert_matches!(effects.as_slice(), [GateEffect::RevealContent(OpenReason::Threshold), ..]);
    }

    #[test]
    fn overshoot_after_open_is_harmless() {
        let (mut gate, _) = ReadinessGate::with_target(1, ms(0), GateConfig::default());
        gate.record_resource_loaded(ms(3_000));
        assert!(gate.is_open());

        for _ in 0..10 {
            assert!(gate.record_resource_loaded(ms(3_100)).is_empty());
        }
        assert_eq!(gate.loaded_count(), 11);
        assert_eq!(gate.progress(), 1.0);
    }
}
