//! Status line shown next to the controls.

use std::time::{Duration, Instant};

/// How long a transient message stays up.
pub const TRANSIENT_STATUS_DURATION: Duration = Duration::from_secs(3);

/// One line of status text. Transient messages fall back to the last
/// persistent one once they expire.
#[derive(Debug, Clone)]
pub struct StatusLine {
    persistent: String,
    transient: Option<(String, Instant)>,
}

impl Default for StatusLine {
    fn default() -> Self {
        Self::new("Disconnected")
    }
}

impl StatusLine {
    pub fn new(initial: &str) -> Self {
        Self {
            persistent: initial.to_string(),
            transient: None,
        }
    }

    /// Replace the persistent text. Clears any transient message.
    pub fn set(&mut self, text: impl Into<String>) {
        self.persistent = text.into();
        self.transient = None;
    }

    /// Show `text` until `now + TRANSIENT_STATUS_DURATION`.
    pub fn flash(&mut self, text: impl Into<String>, now: Instant) {
        self.transient = Some((text.into(), now + TRANSIENT_STATUS_DURATION));
    }

    /// Drop an expired transient message.
    pub fn tick(&mut self, now: Instant) {
        if matches!(&self.transient, Some((_, until)) if now >= *until) {
            self.transient = None;
        }
    }

    pub fn text(&self) -> &str {
        match &self.transient {
            Some((text, _)) => text,
            None => &self.persistent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_expires() {
        let start = Instant::now();
        let mut status = StatusLine::default();
        status.set("Connected");
        status.flash("Saved airsketch.png", start);
        assert_eq!(status.text(), "Saved airsketch.png");

        status.tick(start + Duration::from_secs(1));
        assert_eq!(status.text(), "Saved airsketch.png");

        status.tick(start + TRANSIENT_STATUS_DURATION);
        assert_eq!(status.text(), "Connected");
    }

    #[test]
    fn test_set_overrides_transient() {
        let mut status = StatusLine::default();
        status.flash("Export failed", Instant::now());
        status.set("Disconnected");
        assert_eq!(status.text(), "Disconnected");
    }
}
