use std::time::Duration;

const AUTO_HIDE_AFTER: Duration = Duration::from_millis(5_000);
const HIDE_FADE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
    shown_at: Duration,
    hiding_since: Option<Duration>,
}

impl Notification {
    pub fn is_hiding(&self) -> bool {
        self.hiding_since.is_some()
    }
}

/// Single-slot toast: a new notification replaces the visible one.
#[derive(Debug, Default)]
pub struct Notifier {
    current: Option<Notification>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, message: impl Into<String>, kind: NotificationKind, now: Duration) {
        self.current = Some(Notification {
            message: message.into(),
            kind,
            shown_at: now,
            hiding_since: None,
        });
    }

    pub fn dismiss(&mut self, now: Duration) {
        if let Some(n) = self.current.as_mut() {
            n.hiding_since.get_or_insert(now);
        }
    }

    /// Starts the auto-hide fade and drops the toast once the fade is done.
    pub fn update(&mut self, now: Duration) {
        let Some(n) = self.current.as_mut() else {
            return;
        };
        if n.hiding_since.is_none() && now >= n.shown_at + AUTO_HIDE_AFTER {
            n.hiding_since = Some(n.shown_at + AUTO_HIDE_AFTER);
        }
        if n.hiding_since.is_some_and(|since| now >= since + HIDE_FADE) {
            self.current = None;
        }
    }

    pub fn visible(&self) -> Option<&Notification> {
        self.current.as_ref()
    }
}
