/*!
 * Run statistics for overnight translation.
 */

use serde::{Deserialize, Serialize};

/// Counters aggregated over one overnight run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    /// Total strings requested across all languages
    pub total_requested: usize,
    /// Strings answered from the store without a model call
    pub already_cached: usize,
    /// Strings translated by the model during this run
    pub newly_translated: usize,
    /// Strings that fell back to their source text
    pub failed_translations: usize,
    /// Model calls made
    pub api_calls_made: usize,
    /// Credential rotations performed
    pub keys_rotated: u64,
    /// Target languages processed to completion
    pub languages_processed: Vec<String>,
    /// Run start timestamp (ISO 8601)
    pub started_at: String,
    /// Run end timestamp (ISO 8601), if finished
    pub finished_at: Option<String>,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStats {
    /// Create stats for a run starting now
    pub fn new() -> Self {
        Self {
            total_requested: 0,
            already_cached: 0,
            newly_translated: 0,
            failed_translations: 0,
            api_calls_made: 0,
            keys_rotated: 0,
            languages_processed: Vec::new(),
            started_at: chrono::Utc::now().to_rfc3339(),
            finished_at: None,
        }
    }

    /// Mark the run as finished now
    pub fn finish(&mut self) {
        self.finished_at = Some(chrono::Utc::now().to_rfc3339());
    }

    /// Wall-clock duration of the run in seconds, if both timestamps parse
    pub fn duration_secs(&self) -> Option<i64> {
        let start = chrono::DateTime::parse_from_rfc3339(&self.started_at).ok()?;
        let end = match &self.finished_at {
            Some(finished) => chrono::DateTime::parse_from_rfc3339(finished).ok()?,
            None => return None,
        };
        Some((end - start).num_seconds())
    }

    /// Fraction of requested strings answered from the store
    pub fn cache_hit_rate(&self) -> f64 {
        if self.total_requested == 0 {
            return 0.0;
        }
        self.already_cached as f64 / self.total_requested as f64
    }

    /// Human-readable run report
    pub fn report(&self) -> String {
        let mut report = String::from("Overnight translation report\n");
        report.push_str("============================\n");
        report.push_str(&format!("Started:           {}\n", self.started_at));
        if let Some(finished) = &self.finished_at {
            report.push_str(&format!("Finished:          {}\n", finished));
        }
        if let Some(secs) = self.duration_secs() {
            report.push_str(&format!(
                "Duration:          {}h {:02}m {:02}s\n",
                secs / 3600,
                (secs % 3600) / 60,
                secs % 60
            ));
        }
        report.push_str(&format!(
            "Languages:         {}\n",
            if self.languages_processed.is_empty() {
                "none".to_string()
            } else {
                self.languages_processed.join(", ")
            }
        ));
        report.push_str(&format!("Total requested:   {}\n", self.total_requested));
        report.push_str(&format!(
            "Already cached:    {} ({:.1}%)\n",
            self.already_cached,
            self.cache_hit_rate() * 100.0
        ));
        report.push_str(&format!("Newly translated:  {}\n", self.newly_translated));
        report.push_str(&format!("Failed:            {}\n", self.failed_translations));
        report.push_str(&format!("API calls:         {}\n", self.api_calls_made));
        report.push_str(&format!("Key rotations:     {}\n", self.keys_rotated));

        if let Some(secs) = self.duration_secs() {
            if secs > 0 && self.newly_translated > 0 {
                let per_hour = self.newly_translated as f64 * 3600.0 / secs as f64;
                report.push_str(&format!("Throughput:        {:.0} strings/hour\n", per_hour));
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheHitRate_withNoRequests_shouldBeZero() {
        let stats = RunStats::new();
        assert_eq!(stats.cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_cacheHitRate_shouldReflectCachedShare() {
        let mut stats = RunStats::new();
        stats.total_requested = 10;
        stats.already_cached = 4;

        assert!((stats.cache_hit_rate() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_report_shouldContainAllCounters() {
        let mut stats = RunStats::new();
        stats.total_requested = 20;
        stats.already_cached = 5;
        stats.newly_translated = 12;
        stats.failed_translations = 3;
        stats.api_calls_made = 7;
        stats.languages_processed = vec!["pt".to_string(), "es".to_string()];
        stats.finish();

        let report = stats.report();

        assert!(report.contains("Total requested:   20"));
        assert!(report.contains("25.0%"));
        assert!(report.contains("pt, es"));
        assert!(report.contains("API calls:         7"));
    }

    #[test]
    fn test_durationSecs_withoutFinish_shouldBeNone() {
        let stats = RunStats::new();
        assert!(stats.duration_secs().is_none());
    }
}
