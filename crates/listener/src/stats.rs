//! Frame counters and the quarter-hour health report.

use crate::router::Disposition;
use chrono::{DateTime, Timelike, Utc};

/// Counts since the last health report. A report fires once per quarter-hour
/// boundary (minutes 0, 15, 30, 45) and resets the counters.
#[derive(Debug, Default)]
pub struct Stats {
    pub processed: u64,
    pub accepted: u64,
    pub ignored: u64,
    last_report_minute: Option<u32>,
}

impl Stats {
    /// A frame survived decompression and JSON decoding.
    pub fn frame_decoded(&mut self) {
        self.processed += 1;
    }

    pub fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Accepted => self.accepted += 1,
            Disposition::Ignored => self.ignored += 1,
        }
    }

    /// Emits the health report when `now` sits on a quarter-hour that has
    /// not been reported yet.
    pub fn maybe_report(&mut self, now: DateTime<Utc>) {
        let minute = now.minute();
        if !matches!(minute, 0 | 15 | 30 | 45) || self.last_report_minute == Some(minute) {
            return;
        }

        tracing::info!(
            processed = self.processed,
            accepted = self.accepted,
            ignored = self.ignored,
            "health report (15m)"
        );
        self.processed = 0;
        self.accepted = 0;
        self.ignored = 0;
        self.last_report_minute = Some(minute);
    }
}
