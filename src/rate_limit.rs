/*!
 * Free-tier quota tracking and API key rotation.
 *
 * The remote API enforces strict per-minute and per-day ceilings per key.
 * `QuotaTracker` keeps the client under those ceilings by computing a wait
 * before each request; `KeyRing` holds the ordered credential list and
 * advances to the next key when one runs out of quota.
 */

use chrono::{Local, NaiveDate};
use log::info;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::app_config::RateLimitConfig;
use crate::errors::ConfigError;

/// Environment variables scanned for API keys, in rotation order
const API_KEY_ENV_VARS: [&str; 4] = [
    "GEMINI_API_KEY",
    "GEMINI_API_KEY_2",
    "GEMINI_API_KEY_3",
    "GEMINI_API_KEY_4",
];

/// Length of the sliding request window
const WINDOW: Duration = Duration::from_secs(60);

/// Compute a short fingerprint for a credential, used as its identifier
/// in quota bookkeeping and log lines. Never log the key itself.
pub fn key_fingerprint(key: &str) -> String {
    let digest = Sha256::digest(key.as_bytes());
    let hex = format!("{:x}", digest);
    hex[..12].to_string()
}

/// Per-credential quota state and wait computation
pub struct QuotaTracker {
    /// Rate limit configuration
    config: RateLimitConfig,
    /// Sliding 60-second request window per credential
    request_times: HashMap<String, Vec<Instant>>,
    /// Requests today, keyed by (credential fingerprint, local date)
    daily_counts: HashMap<(String, NaiveDate), u32>,
    /// Time of the most recent request per credential
    last_request: HashMap<String, Instant>,
}

impl QuotaTracker {
    /// Create a new tracker with the given limits
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            request_times: HashMap::new(),
            daily_counts: HashMap::new(),
            last_request: HashMap::new(),
        }
    }

    /// Compute how long the caller must wait before the next request
    /// from this credential. Pure bookkeeping; does not sleep.
    pub fn wait_duration(&mut self, key_id: &str) -> Duration {
        let now = Instant::now();
        let today = Local::now().date_naive();

        // Daily ceiling: pause until the quota window resets at local midnight
        let daily = self
            .daily_counts
            .get(&(key_id.to_string(), today))
            .copied()
            .unwrap_or(0);
        if daily >= self.config.requests_per_day {
            return duration_until_local_midnight();
        }

        // Per-minute ceiling over the pruned sliding window
        let window = self.request_times.entry(key_id.to_string()).or_default();
        window.retain(|t| now.duration_since(*t) < WINDOW);
        if window.len() >= self.config.requests_per_minute as usize {
            return Duration::from_secs(self.config.min_delay_between_requests_secs);
        }

        // Minimum spacing since the last request from this credential
        let min_delay = Duration::from_secs(self.config.min_delay_between_requests_secs);
        if let Some(last) = self.last_request.get(key_id) {
            let elapsed = now.duration_since(*last);
            if elapsed < min_delay {
                return min_delay - elapsed;
            }
        }

        Duration::ZERO
    }

    /// Record a completed request for this credential
    pub fn record(&mut self, key_id: &str) {
        let now = Instant::now();
        let today = Local::now().date_naive();

        self.request_times
            .entry(key_id.to_string())
            .or_default()
            .push(now);
        self.last_request.insert(key_id.to_string(), now);
        *self
            .daily_counts
            .entry((key_id.to_string(), today))
            .or_insert(0) += 1;
    }

    /// Requests recorded today for this credential
    pub fn requests_today(&self, key_id: &str) -> u32 {
        let today = Local::now().date_naive();
        self.daily_counts
            .get(&(key_id.to_string(), today))
            .copied()
            .unwrap_or(0)
    }
}

/// Time remaining until the next local midnight
fn duration_until_local_midnight() -> Duration {
    let now = Local::now();
    let tomorrow = now
        .date_naive()
        .succ_opt()
        .unwrap_or(now.date_naive());
    let midnight = tomorrow.and_hms_opt(0, 0, 0).unwrap_or_default();

    (midnight - now.naive_local()).to_std().unwrap_or(Duration::ZERO)
}

/// Ordered list of API credentials with a rotating active index
pub struct KeyRing {
    /// Credential strings, in rotation order
    keys: Vec<String>,
    /// Index of the active credential
    current: usize,
    /// Number of rotations performed during this run
    rotations: u64,
}

impl KeyRing {
    /// Create a key ring from an ordered credential list.
    /// Blank entries are dropped; an empty result is a configuration error.
    pub fn new(keys: Vec<String>) -> Result<Self, ConfigError> {
        let keys: Vec<String> = keys
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        if keys.is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        Ok(Self {
            keys,
            current: 0,
            rotations: 0,
        })
    }

    /// Read credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        let keys = API_KEY_ENV_VARS
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .collect();
        Self::new(keys)
    }

    /// The active credential
    pub fn current(&self) -> &str {
        &self.keys[self.current]
    }

    /// Fingerprint of the active credential
    pub fn fingerprint(&self) -> String {
        key_fingerprint(self.current())
    }

    /// Advance to the next credential modulo the list length.
    /// Returns false (no-op) when only one key is configured.
    pub fn rotate(&mut self) -> bool {
        if self.keys.len() <= 1 {
            return false;
        }

        self.current = (self.current + 1) % self.keys.len();
        self.rotations += 1;
        info!("Rotated to API key #{}", self.current + 1);
        true
    }

    /// Number of configured credentials
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the ring holds no credentials (never true after construction)
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rotations performed so far
    pub fn rotations(&self) -> u64 {
        self.rotations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_minute: 2,
            requests_per_day: 250,
            min_delay_between_requests_secs: 30,
            retry_delay_multiplier: 2.0,
            retry_base_delay_ms: 1000,
            max_retries: 3,
        }
    }

    #[test]
    fn test_waitDuration_withNoHistory_shouldBeZero() {
        let mut tracker = QuotaTracker::new(test_config());
        assert_eq!(tracker.wait_duration("key-a"), Duration::ZERO);
    }

    #[test]
    fn test_waitDuration_afterRecord_shouldEnforceMinimumSpacing() {
        let mut tracker = QuotaTracker::new(test_config());
        tracker.record("key-a");

        let wait = tracker.wait_duration("key-a");
        assert!(wait > Duration::from_secs(29));
        assert!(wait <= Duration::from_secs(30));
    }

    #[test]
    fn test_waitDuration_withFullMinuteWindow_shouldReturnMinDelay() {
        let mut tracker = QuotaTracker::new(test_config());
        tracker.record("key-a");
        tracker.record("key-a");

        let wait = tracker.wait_duration("key-a");
        assert_eq!(wait, Duration::from_secs(30));
    }

    #[test]
    fn test_waitDuration_perCredential_shouldNotLeakAcrossKeys() {
        let mut tracker = QuotaTracker::new(test_config());
        tracker.record("key-a");
        tracker.record("key-a");

        // A different credential is unaffected
        assert_eq!(tracker.wait_duration("key-b"), Duration::ZERO);
    }

    #[test]
    fn test_waitDuration_atDailyCeiling_shouldWaitUntilMidnight() {
        let mut tracker = QuotaTracker::new(test_config());
        for _ in 0..250 {
            tracker.record("key-a");
        }

        let wait = tracker.wait_duration("key-a");
        assert!(wait < Duration::from_secs(24 * 3600));
        // Must cover the remaining time to local midnight (allow a small
        // margin for the clock advancing between the two computations)
        let to_midnight = duration_until_local_midnight();
        assert!(wait + Duration::from_secs(2) >= to_midnight);
    }

    #[test]
    fn test_requestsToday_shouldCountPerDayPerKey() {
        let mut tracker = QuotaTracker::new(test_config());
        tracker.record("key-a");
        tracker.record("key-a");
        tracker.record("key-b");

        assert_eq!(tracker.requests_today("key-a"), 2);
        assert_eq!(tracker.requests_today("key-b"), 1);
    }

    #[test]
    fn test_keyRing_withBlankKeys_shouldFilterThem() {
        let ring = KeyRing::new(vec![
            "  ".to_string(),
            "key-one".to_string(),
            String::new(),
        ])
        .expect("Ring should build with one usable key");

        assert_eq!(ring.len(), 1);
        assert_eq!(ring.current(), "key-one");
    }

    #[test]
    fn test_keyRing_withNoKeys_shouldFailFast() {
        let result = KeyRing::new(vec![String::new(), "  ".to_string()]);
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }

    #[test]
    fn test_rotate_withSingleKey_shouldBeNoOp() {
        let mut ring = KeyRing::new(vec!["only".to_string()]).unwrap();
        assert!(!ring.rotate());
        assert_eq!(ring.current(), "only");
        assert_eq!(ring.rotations(), 0);
    }

    #[test]
    fn test_rotate_withThreeKeys_shouldAdvanceModuloLength() {
        let mut ring = KeyRing::new(vec![
            "k1".to_string(),
            "k2".to_string(),
            "k3".to_string(),
        ])
        .unwrap();

        assert!(ring.rotate());
        assert_eq!(ring.current(), "k2");
        assert!(ring.rotate());
        assert_eq!(ring.current(), "k3");
        assert!(ring.rotate());
        assert_eq!(ring.current(), "k1");
        assert_eq!(ring.rotations(), 3);
    }

    #[test]
    fn test_keyFingerprint_shouldBeStableAndShort() {
        let fp1 = key_fingerprint("secret-key");
        let fp2 = key_fingerprint("secret-key");
        assert_eq!(fp1, fp2);
        assert_eq!(fp1.len(), 12);
        assert_ne!(fp1, key_fingerprint("other-key"));
    }
}
