#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `crash_map` binary.
//!
//! [`JoinProgressBar`] renders the spatial join's [`ProgressCallback`]
//! updates, and [`init_logger`] routes `log` output through the same
//! [`MultiProgress`] so log lines print above the bar.

use std::sync::Arc;
use std::time::Duration;

use crash_map_spatial::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;

pub use indicatif::MultiProgress;

const INDEXING_TEMPLATE: &str = "{spinner:.green} {msg} [{elapsed}]";
const JOIN_TEMPLATE: &str =
    "{msg}\n  [{elapsed_precise}] {bar:40.green/white} {human_pos}/{human_len} incidents ({per_sec}, eta {eta})";

/// Progress bar for incident-to-region joins.
///
/// Spins while the region index is built, then switches to a counted bar
/// once the join announces its incident total.
pub struct JoinProgressBar {
    bar: ProgressBar,
    counted: ProgressStyle,
}

impl JoinProgressBar {
    /// Adds a join bar to `multi`, spinning until the join reports its
    /// incident total.
    #[must_use]
    pub fn new(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.set_style(
            ProgressStyle::with_template(INDEXING_TEMPLATE)
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message("Loading and indexing regions");
        bar.enable_steady_tick(Duration::from_millis(120));

        let counted = ProgressStyle::with_template(JOIN_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");

        Arc::new(Self { bar, counted })
    }
}

impl ProgressCallback for JoinProgressBar {
    fn set_total(&self, total: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_style(self.counted.clone());
        self.bar.reset();
        self.bar.set_length(total);
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        let elapsed = self.bar.elapsed().as_secs_f64();
        self.bar.finish_with_message(format!("{msg} in {elapsed:.1}s"));
    }
}

/// Installs a timestamped `pretty_env_logger` behind
/// `indicatif-log-bridge`.
///
/// Logs at `info` unless `RUST_LOG` says otherwise. A second call keeps the
/// first logger. Every progress bar must be added to the returned
/// [`MultiProgress`].
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let mut builder = pretty_env_logger::formatted_timed_builder();
    builder.filter_level(LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let logger = builder.build();
    let level = logger.filter();

    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}
