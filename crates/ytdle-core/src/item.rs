//! Per-URL state tracked across the attempts of a single download, owned
//! exclusively by its [`crate::driver::ItemDriver`] and never shared across
//! threads.

use std::path::PathBuf;

use crate::fetcher::ProgressStatus;
use crate::options::FormatKind;

/// Outcome an item settled into once its driver loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
	Finished { output_path: PathBuf },
	Failed { error_message: String },
	Cancelled,
	Skipped,
}

/// One URL's worth of mutable download state, reset at the start of each
/// attempt by the driver (stale progress/artifact data from a prior attempt
/// must never leak into a retry).
#[derive(Debug, Clone)]
pub struct DownloadItem {
	pub url: String,
	/// Which attempt this is, 0-indexed; used to pick the format-fallback
	/// ladder (see `fetcher::options::formats_for_attempt`).
	pub attempt: u32,
	pub retry_count: u32,
	pub percent: u8,
	pub downloaded_bytes: Option<u64>,
	pub total_bytes: Option<u64>,
	pub speed: Option<f64>,
	pub eta: Option<u64>,
	/// Final (or currently-in-progress) destination filename, once known.
	pub filename: Option<PathBuf>,
	/// Temporary/partial filename the Fetcher is currently writing to, used
	/// by the Reconciler to find leftover artifacts on failure.
	pub tmpfilename: Option<PathBuf>,
	pub title: Option<String>,
	pub format: FormatKind,
	/// Last [`ProgressStatus`] observed, used to compose a "Post-processing"
	/// status once the Fetcher reports `finished` rather than the usual
	/// speed/ETA line.
	pub last_status: ProgressStatus,
	/// Floor-rounded-to-10 percentage last reported via a log line, seeded at
	/// -10 so the very first progress event (percent 0) always logs. Carried
	/// across attempts, not reset per-attempt,
	/// since it tracks "have we logged this item at this percentage" for the
	/// item's whole life, not one attempt's.
	pub last_logged_percent: i32,
}

impl DownloadItem {
	#[must_use]
	pub fn new(url: impl Into<String>, format: FormatKind) -> Self {
		return Self {
			url: url.into(),
			attempt: 0,
			retry_count: 0,
			percent: 0,
			downloaded_bytes: None,
			total_bytes: None,
			speed: None,
			eta: None,
			filename: None,
			tmpfilename: None,
			title: None,
			format,
			last_status: ProgressStatus::Downloading,
			last_logged_percent: -10,
		};
	}

	/// Clears per-attempt progress fields before a retry, keeping the URL,
	/// format, and cumulative `retry_count`/`attempt` counters.
	pub fn reset_for_attempt(&mut self) {
		self.percent = 0;
		self.downloaded_bytes = None;
		self.total_bytes = None;
		self.speed = None;
		self.eta = None;
		self.filename = None;
		self.tmpfilename = None;
	}
}
