//! Scrape guard.
//!
//! Rejects a scrape in which most entries failed normalization. A rejected
//! scrape counts as a failed fetch: it is never merged and the novel's history
//! stays untouched.

use crate::error::{AppError, Result};

/// Guard configuration.
#[derive(Debug, Clone)]
pub struct ScrapeGuardConfig {
    /// Maximum share of malformed entries (0-100). Default: 50%
    pub max_malformed_percent: u8,
    /// Below this many entries the ratio is not checked, unless all failed.
    pub min_sample: usize,
}

impl Default for ScrapeGuardConfig {
    fn default() -> Self {
        Self {
            max_malformed_percent: 50,
            min_sample: 4,
        }
    }
}

/// Result of a guard check.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardResult {
    /// Enough entries normalized cleanly
    Healthy { accepted: usize, malformed: usize },
    /// The listing had no entries for this feed
    Empty,
    /// Too many entries failed; treat as a fetch failure
    Tripped {
        accepted: usize,
        malformed: usize,
        malformed_percent: f64,
    },
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeGuard {
    config: ScrapeGuardConfig,
}

impl ScrapeGuard {
    pub fn new(max_malformed_percent: u8) -> Self {
        Self::with_config(ScrapeGuardConfig {
            max_malformed_percent,
            ..ScrapeGuardConfig::default()
        })
    }

    pub fn with_config(config: ScrapeGuardConfig) -> Self {
        Self { config }
    }

    pub fn check(&self, accepted: usize, malformed: usize) -> GuardResult {
        let total = accepted + malformed;
        if total == 0 {
            return GuardResult::Empty;
        }

        let malformed_percent = (malformed as f64 / total as f64) * 100.0;
        let all_failed = accepted == 0;
        let over_threshold = total >= self.config.min_sample
            && malformed_percent > self.config.max_malformed_percent as f64;

        if all_failed || over_threshold {
            GuardResult::Tripped {
                accepted,
                malformed,
                malformed_percent,
            }
        } else {
            GuardResult::Healthy {
                accepted,
                malformed,
            }
        }
    }

    /// Return Ok if the scrape may be merged, a fetch error otherwise.
    pub fn validate(&self, novel_id: &str, accepted: usize, malformed: usize) -> Result<()> {
        match self.check(accepted, malformed) {
            GuardResult::Healthy {
                accepted,
                malformed,
            } => {
                if malformed > 0 {
                    log::warn!(
                        "{}: {} entries accepted, {} malformed",
                        novel_id,
                        accepted,
                        malformed
                    );
                }
                Ok(())
            }
            GuardResult::Empty => {
                log::debug!("{}: listing has no entries", novel_id);
                Ok(())
            }
            GuardResult::Tripped {
                accepted,
                malformed,
                malformed_percent,
            } => {
                log::error!(
                    "{}: scrape rejected, {} of {} entries malformed ({:.1}% > {}%)",
                    novel_id,
                    malformed,
                    accepted + malformed,
                    malformed_percent,
                    self.config.max_malformed_percent
                );
                Err(AppError::fetch(
                    novel_id,
                    format!("{malformed} of {} entries malformed", accepted + malformed),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_scrape_is_healthy() {
        let guard = ScrapeGuard::default();
        assert_eq!(
            guard.check(10, 0),
            GuardResult::Healthy {
                accepted: 10,
                malformed: 0
            }
        );
    }

    #[test]
    fn test_some_malformed_is_tolerated() {
        let guard = ScrapeGuard::default();
        assert!(matches!(guard.check(6, 4), GuardResult::Healthy { .. }));
    }

    #[test]
    fn test_mostly_malformed_trips() {
        let guard = ScrapeGuard::default();
        assert!(matches!(guard.check(3, 7), GuardResult::Tripped { .. }));
    }

    #[test]
    fn test_small_sample_only_trips_when_all_fail() {
        let guard = ScrapeGuard::default();
        assert!(matches!(guard.check(1, 2), GuardResult::Healthy { .. }));
        assert!(matches!(guard.check(0, 2), GuardResult::Tripped { .. }));
    }

    #[test]
    fn test_empty_listing_is_not_a_failure() {
        let guard = ScrapeGuard::default();
        assert_eq!(guard.check(0, 0), GuardResult::Empty);
        assert!(guard.validate("host/novel", 0, 0).is_ok());
    }

    #[test]
    fn test_validate_returns_fetch_error() {
        let guard = ScrapeGuard::new(20);
        let err = guard.validate("host/novel", 7, 3).unwrap_err();
        assert!(matches!(err, AppError::Fetch { .. }));
    }
}
