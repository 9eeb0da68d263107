//! Run reporting: progress records and the end-of-run summary

use std::time::Duration;

use tracing::info;

use crate::store::RunCounters;

use super::types::CrawlCounters;

/// Final report for a crawl run
#[derive(Debug, Clone)]
pub struct RunReport {
    pub counters: RunCounters,
    pub duration: Duration,
}

impl RunReport {
    /// Print the end-of-run summary.
    pub fn print_summary(&self) {
        println!("\nCrawl complete!");
        println!("===============");
        println!("URLs discovered:  {}", self.counters.discovered);
        println!("Pages crawled:    {}", self.counters.crawled);
        println!("Pages skipped:    {}", self.counters.skipped);
        println!("Redirects:        {}", self.counters.redirects);
        println!("Errors:           {}", self.counters.errors);
        println!("Duration:         {:.1}s", self.duration.as_secs_f64());
    }
}

/// Emit a progress record from the live counters.
pub(crate) fn log_progress(counters: &CrawlCounters) {
    let snapshot = counters.snapshot();
    info!(
        crawled = snapshot.crawled,
        skipped = snapshot.skipped,
        redirects = snapshot.redirects,
        errors = snapshot.errors,
        discovered = snapshot.discovered,
        "Crawl progress"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_carries_counters_and_duration() {
        let report = RunReport {
            counters: RunCounters {
                discovered: 100,
                crawled: 90,
                skipped: 5,
                redirects: 3,
                errors: 2,
            },
            duration: Duration::from_secs(42),
        };
        assert_eq!(report.counters.crawled, 90);
        assert_eq!(report.duration.as_secs(), 42);
    }
}
