//! Redirect countdown shown on the confirmation page.

use serde::Serialize;
use tokio::time::Instant;
use utoipa::ToSchema;

pub const DEFAULT_REDIRECT_TARGET: &str = "index.html";
pub const DEFAULT_REDIRECT_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectSettings {
    pub target: String,
    pub seconds: u64,
}

impl Default for RedirectSettings {
    fn default() -> Self {
        Self {
            target: DEFAULT_REDIRECT_TARGET.to_string(),
            seconds: DEFAULT_REDIRECT_SECONDS,
        }
    }
}

impl RedirectSettings {
    pub fn start(&self) -> RedirectCountdown {
        RedirectCountdown::start(&self.target, self.seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectCountdown {
    target: String,
    seconds: u64,
    started: Instant,
}

impl RedirectCountdown {
    pub fn start(target: &str, seconds: u64) -> Self {
        log::info!("Countdown started");
        Self {
            target: target.to_string(),
            seconds,
            started: Instant::now(),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Whole seconds left, counting down once per elapsed second.
    pub fn remaining(&self) -> u64 {
        let elapsed = Instant::now().saturating_duration_since(self.started).as_secs();
        self.seconds.saturating_sub(elapsed)
    }

    pub fn view(&self) -> CountdownView {
        let remaining = self.remaining();
        CountdownView {
            remaining_seconds: remaining,
            target: self.target.clone(),
            redirect: remaining == 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CountdownView {
    pub remaining_seconds: u64,
    pub target: String,
    /// The client should navigate to `target` now.
    pub redirect: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_counts_down_once_per_second() {
        let countdown = RedirectSettings::default().start();
        assert_eq!(countdown.remaining(), 10);

        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(countdown.remaining(), 9);

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(countdown.remaining(), 1);
        assert!(!countdown.view().redirect);

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(countdown.remaining(), 0);
        assert_eq!(countdown.view().target, "index.html");
        assert!(countdown.view().redirect);
    }
}
