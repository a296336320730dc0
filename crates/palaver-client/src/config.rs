//! Client configuration, injected at startup.

use std::time::Duration;

use rand::Rng;

use palaver_shared::constants::{
    DEFAULT_NOTIFICATION_BUFFER, DEFAULT_RESUBSCRIBE_BASE_DELAY_MS,
    DEFAULT_RESUBSCRIBE_MAX_ATTEMPTS, DEFAULT_RESUBSCRIBE_MAX_DELAY_MS,
};
use palaver_shared::types::WalletAddress;

/// Backoff policy applied when a subscription stream drops.
#[derive(Debug, Clone)]
pub struct ResubscribePolicy {
    /// Subscribe attempts before the subscription is reported lost.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling for the exponential growth.
    pub max_delay: Duration,
}

impl Default for ResubscribePolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RESUBSCRIBE_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_RESUBSCRIBE_BASE_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_RESUBSCRIBE_MAX_DELAY_MS),
        }
    }
}

impl ResubscribePolicy {
    /// Delay before retry `attempt` (1-based): exponential, capped at
    /// `max_delay`, plus up to 50% jitter.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let base = (self.base_delay.as_millis() as u64).saturating_mul(factor);
        let capped = base.min(self.max_delay.as_millis() as u64);
        let jitter = rand::thread_rng().gen_range(0..=capped / 2);
        Duration::from_millis(capped + jitter)
    }
}

/// Configuration for a [`crate::ChatClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The single wallet address recognized as admin. Injected here so the
    /// authorization rule is swappable without touching gate logic.
    pub admin_address: WalletAddress,
    /// Capacity of the notification channel handed to the UI layer.
    pub notification_buffer: usize,
    pub resubscribe: ResubscribePolicy,
}

impl ClientConfig {
    pub fn new(admin_address: WalletAddress) -> Self {
        Self {
            admin_address,
            notification_buffer: DEFAULT_NOTIFICATION_BUFFER,
            resubscribe: ResubscribePolicy::default(),
        }
    }
}
