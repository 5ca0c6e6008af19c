use std::time::Instant;

use docvault::{BackupProgress, Phase};
use indicatif::{ProgressBar, ProgressStyle};

/// Per-collection progress bar on stderr.
pub struct BarProgress {
    bar: ProgressBar,
    start: Instant,
}

impl BarProgress {
    pub fn new(collections: usize) -> Self {
        let bar = ProgressBar::new(collections as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
        bar.set_style(style);

        Self {
            bar,
            start: Instant::now(),
        }
    }

    pub fn as_dyn(&self) -> &dyn BackupProgress {
        self
    }
}

impl BackupProgress for BarProgress {
    fn on_collection_start(&self, phase: Phase, index: usize, total: usize, collection: &str) {
        self.bar.set_length(total as u64);
        self.bar.set_position(index as u64);
        self.bar.set_message(format!("{} {}", phase, collection));
    }

    fn on_collection_done(&self, _phase: Phase, collection: &str, records: usize) {
        self.bar.inc(1);
        self.bar
            .set_message(format!("{} ({} records)", collection, records));
    }

    fn on_complete(&self, phase: Phase, records: usize) {
        self.bar.finish_with_message(format!(
            "{} done: {} records in {:.1}s",
            phase,
            records,
            self.start.elapsed().as_secs_f64()
        ));
    }
}
