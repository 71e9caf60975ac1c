use std::rc::Rc;

use chrono::Local;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEvent {
    pub category: String,
    pub action: String,
    pub label: String,
}

/// Fire-and-forget destination for named events
pub trait AnalyticsSink {
    fn track(&self, event: &AnalyticsEvent);
}

/// Writes every event to the log with a local timestamp
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AnalyticsSink for TracingSink {
    fn track(&self, event: &AnalyticsEvent) {
        info!(
            target: "folio::analytics",
            at = %Local::now().to_rfc3339(),
            category = %event.category,
            action = %event.action,
            label = %event.label,
            "analytics event"
        );
    }
}

/// Optional sink injected at construction; without one, events are dropped.
/// Clones share the same sink.
#[derive(Default, Clone)]
pub struct Analytics {
    sink: Option<Rc<dyn AnalyticsSink>>,
}

impl Analytics {
    pub fn new(sink: Option<Box<dyn AnalyticsSink>>) -> Self {
        Self {
            sink: sink.map(Rc::from),
        }
    }

    pub fn disabled() -> Self {
        Self { sink: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.sink.is_some()
    }

    pub fn emit(&self, category: &str, action: &str, label: impl Into<String>) {
        if let Some(sink) = &self.sink {
            sink.track(&AnalyticsEvent {
                category: category.to_string(),
                action: action.to_string(),
                label: label.into(),
            });
        }
    }
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Recording(Rc<RefCell<Vec<AnalyticsEvent>>>);

    impl AnalyticsSink for Recording {
        fn track(&self, event: &AnalyticsEvent) {
            self.0.borrow_mut().push(event.clone());
        }
    }

    #[test]
    fn emits_to_injected_sink() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let analytics = Analytics::new(Some(Box::new(Recording(log.clone()))));

        analytics.emit("player", "select", "Track A");

        assert_eq!(
            log.borrow().as_slice(),
            &[AnalyticsEvent {
                category: "player".into(),
                action: "select".into(),
                label: "Track A".into(),
            }]
        );
    }

    #[test]
    fn missing_sink_is_tolerated() {
        let analytics = Analytics::disabled();
        assert!(!analytics.is_enabled());
        analytics.emit("page", "ready", "timeout");
    }
}
