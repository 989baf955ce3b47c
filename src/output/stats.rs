//! Run reports and seen-store statistics
//!
//! This module summarizes what a crawl pass did per source and what the seen store
//! currently holds, for the end-of-pass log and the `--stats` mode.

use crate::crawler::CrawlAttempt;
use crate::storage::{SeenStore, StoreResult};
use std::time::Duration;

/// Totals for one source over a pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub source: String,

    /// Search URLs crawled
    pub crawls: usize,

    /// Crawls cut short by a fetch failure
    pub partial: usize,

    /// Crawls aborted by a store failure
    pub failed: usize,

    pub pages: u32,
    pub extracted: usize,
    pub skipped: usize,
    pub new: usize,
    pub accepted: usize,
    pub rejected: usize,
}

/// Summary of one pass over all sources
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Per-source totals, in first-seen order
    pub sources: Vec<SourceSummary>,

    pub duration: Duration,
}

impl RunReport {
    /// Aggregates crawl attempts by source
    pub fn from_attempts(attempts: &[CrawlAttempt], duration: Duration) -> Self {
        let mut sources: Vec<SourceSummary> = Vec::new();

        for attempt in attempts {
            let index = match sources.iter().position(|s| s.source == attempt.source) {
                Some(index) => index,
                None => {
                    sources.push(SourceSummary {
                        source: attempt.source.clone(),
                        ..SourceSummary::default()
                    });
                    sources.len() - 1
                }
            };
            let summary = &mut sources[index];
            summary.crawls += 1;

            match &attempt.result {
                Ok(outcome) => {
                    if outcome.is_partial() {
                        summary.partial += 1;
                    }
                    summary.pages += outcome.stats.pages;
                    summary.extracted += outcome.stats.extracted;
                    summary.skipped += outcome.stats.skipped;
                    summary.new += outcome.stats.new;
                    summary.accepted += outcome.stats.accepted;
                    summary.rejected += outcome.stats.rejected;
                }
                Err(_) => summary.failed += 1,
            }
        }

        Self { sources, duration }
    }

    pub fn total_accepted(&self) -> usize {
        self.sources.iter().map(|s| s.accepted).sum()
    }

    pub fn has_failures(&self) -> bool {
        self.sources.iter().any(|s| s.failed > 0)
    }
}

/// Logs a pass summary, one line per source
pub fn log_report(report: &RunReport) {
    for s in &report.sources {
        tracing::info!(
            "[{}] {} crawls ({} partial, {} failed), {} pages, {} listings ({} skipped), {} new, {} accepted",
            s.source,
            s.crawls,
            s.partial,
            s.failed,
            s.pages,
            s.extracted,
            s.skipped,
            s.new,
            s.accepted
        );
    }
    tracing::info!(
        "Pass finished in {:.1}s, {} listings accepted",
        report.duration.as_secs_f64(),
        report.total_accepted()
    );
}

/// What the seen store holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Source name and number of seen listings
    pub sources: Vec<(String, usize)>,

    pub total: usize,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The store to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StoreError)` - Failed to query the store
pub fn load_statistics(store: &dyn SeenStore) -> StoreResult<StoreStatistics> {
    let mut sources = store.sources()?;
    sources.sort();
    let total = sources.iter().map(|(_, count)| count).sum();
    Ok(StoreStatistics { sources, total })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Seen Listings ===\n");

    if stats.sources.is_empty() {
        println!("  (store is empty)");
        return;
    }

    for (source, count) in &stats.sources {
        let percentage = if stats.total > 0 {
            (*count as f64 / stats.total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", source, count, percentage);
    }
    println!();
    println!("Total: {}", stats.total);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlOutcome, CrawlStats};
    use crate::storage::StoreError;
    use crate::WatchError;

    fn outcome(source: &str, accepted: usize, partial: bool) -> CrawlAttempt {
        CrawlAttempt {
            source: source.to_string(),
            url: format!("https://{}.example/search", source),
            result: Ok(CrawlOutcome {
                source: source.to_string(),
                url: String::new(),
                accepted: Vec::new(),
                stats: CrawlStats {
                    pages: 1,
                    extracted: 10,
                    new: accepted,
                    accepted,
                    ..CrawlStats::default()
                },
                fetch_error: partial.then(|| "timeout".to_string()),
            }),
        }
    }

    #[test]
    fn test_report_groups_by_source() {
        let attempts = vec![
            outcome("is24", 2, false),
            outcome("wg", 1, true),
            outcome("is24", 3, false),
            CrawlAttempt {
                source: "wg".to_string(),
                url: String::new(),
                result: Err(WatchError::Store(StoreError::Lock("poisoned".to_string()))),
            },
        ];

        let report = RunReport::from_attempts(&attempts, Duration::from_secs(3));

        assert_eq!(report.sources.len(), 2);
        assert_eq!(report.sources[0].source, "is24");
        assert_eq!(report.sources[0].crawls, 2);
        assert_eq!(report.sources[0].accepted, 5);
        assert_eq!(report.sources[1].partial, 1);
        assert_eq!(report.sources[1].failed, 1);
        assert_eq!(report.total_accepted(), 6);
        assert!(report.has_failures());
    }

    #[test]
    fn test_empty_report() {
        let report = RunReport::from_attempts(&[], Duration::ZERO);
        assert_eq!(report.total_accepted(), 0);
        assert!(!report.has_failures());
    }
}
