use std::time::Duration;

const START_DELAY: Duration = Duration::from_millis(1_000);
const PER_CHAR: Duration = Duration::from_millis(100);
const CARET_LINGER: Duration = Duration::from_millis(1_000);

/// Typewriter reveal of the hero subtitle
#[derive(Debug, Clone)]
pub struct Typewriter {
    text: String,
    started_at: Duration,
}

impl Typewriter {
    pub fn new(text: impl Into<String>, now: Duration) -> Self {
        Self {
            text: text.into(),
            started_at: now,
        }
    }

    fn chars_shown(&self, now: Duration) -> usize {
        let elapsed = now.saturating_sub(self.started_at);
        let Some(typing) = elapsed.checked_sub(START_DELAY) else {
            return 0;
        };
        // first character lands as soon as the delay is over
        let typed = (typing.as_millis() / PER_CHAR.as_millis()) as usize + 1;
        typed.min(self.text.chars().count())
    }

    /// Prefix of the text visible at `now`, on a char boundary
    pub fn visible(&self, now: Duration) -> &str {
        let n = self.chars_shown(now);
        match self.text.char_indices().nth(n) {
            Some((byte_idx, _)) => &self.text[..byte_idx],
            None => &self.text,
        }
    }

    pub fn is_done(&self, now: Duration) -> bool {
        self.chars_shown(now) == self.text.chars().count() && now >= self.finished_at()
    }

    pub fn caret_visible(&self, now: Duration) -> bool {
        now < self.finished_at() + CARET_LINGER
    }

    fn finished_at(&self) -> Duration {
        let len = self.text.chars().count() as u32;
        self.started_at + START_DELAY + PER_CHAR * len.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn nothing_before_start_delay() {
        let t = Typewriter::new("Student", ms(0));
        assert_eq!(t.visible(ms(999)), "");
        assert!(t.caret_visible(ms(999)));
    }

    #[test]
    fn one_char_per_hundred_ms() {
        let t = Typewriter::new("Student", ms(0));
        assert_eq!(t.visible(ms(1_000)), "S");
        assert_eq!(t.visible(ms(1_250)), "Stu");
        assert_eq!(t.visible(ms(1_600)), "Student");
        assert_eq!(t.visible(ms(9_000)), "Student");
    }

    #[test]
    fn caret_lingers_one_second_after_done() {
        let t = Typewriter::new("ab", ms(0));
        assert!(t.is_done(ms(1_100)));
        assert!(t.caret_visible(ms(2_099)));
        assert!(!t.caret_visible(ms(2_100)));
    }

    #[test]
    fn multibyte_text_is_cut_on_char_boundaries() {
        let t = Typewriter::new("héllo", ms(0));
        assert_eq!(t.visible(ms(1_100)), "hé");
    }
}
