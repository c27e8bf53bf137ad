//! The Item Driver: drives a single URL through probe, download-with-retry,
//! and (on failure) the Artifact Reconciler.

use crate::error::ErrorKind;
use crate::fetcher::{Fetcher, FetcherOptions, ProgressEvent, ProgressStatus};
use crate::item::{DownloadItem, ItemOutcome};
use crate::options::{DownloadOptions, FormatKind};
use crate::reconciler;

/// Signals a running driver can receive between progress events, checked by
/// the callback passed down into [`Fetcher::download`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
	Continue,
	Cancel,
	SkipCurrent,
	Pause,
}

/// Video gets the full three-rung format-fallback ladder; audio extraction
/// has nothing to fall back to (`bestaudio/best` either exists or it
/// doesn't), so a `FormatNotAvailable` on the only attempt is fatal.
#[must_use]
pub fn max_attempts(format: FormatKind) -> u32 {
	return match format {
		FormatKind::Video => 3,
		FormatKind::Audio => 1,
	};
}

/// Drives one [`DownloadItem`] to completion. Owns nothing across threads;
/// constructed fresh per item by the Scheduler.
pub struct ItemDriver<'a> {
	fetcher: &'a dyn Fetcher,
	options: &'a DownloadOptions,
}

impl<'a> ItemDriver<'a> {
	#[must_use]
	pub fn new(fetcher: &'a dyn Fetcher, options: &'a DownloadOptions) -> Self {
		return Self { fetcher, options };
	}

	/// Runs the full attempt loop for `item`, polling `poll_signal` before
	/// every progress callback invocation is forwarded to the Fetcher.
	///
	/// On a retryable classification (`FormatNotAvailable` or `Network`) the
	/// item is reset and retried with the next rung of the format ladder, up
	/// to [`max_attempts`] for the item's format. Any other classification
	/// ends the item as failed immediately. The Reconciler only runs on the
	/// failure path — never after a successful finish, since that would
	/// delete the very file just produced.
	/// `on_log` carries the user-facing log lines called for (the
	/// every-10%-crossing progress line and the "Retrying with fallback
	/// format" line) — distinct from the internal `debug!`/`warn!` tracing
	/// calls scattered through this file, which go to the process's own log
	/// sink, not the Scheduler's [`crate::scheduler::EventSink`] fan-out.
	pub fn run(
		&self,
		item: &mut DownloadItem,
		mut poll_signal: impl FnMut() -> ControlSignal,
		mut on_progress: impl FnMut(&DownloadItem),
		mut on_log: impl FnMut(&DownloadItem, String),
	) -> ItemOutcome {
		let max_attempts = max_attempts(item.format);

		loop {
			item.reset_for_attempt();

			match poll_signal() {
				ControlSignal::Cancel => return ItemOutcome::Cancelled,
				ControlSignal::SkipCurrent => {
					self.cleanup(item);
					return ItemOutcome::Skipped;
				},
				ControlSignal::Pause | ControlSignal::Continue => {},
			}

			self.probe(item);

			let fetcher_options = FetcherOptions::for_attempt(self.options, item.attempt);

			let mut callback = |event: ProgressEvent| -> Result<(), crate::Error> {
				match poll_signal() {
					ControlSignal::Cancel => return Err(crate::Error::Cancelled),
					ControlSignal::SkipCurrent => return Err(crate::Error::SkipCurrent),
					ControlSignal::Pause | ControlSignal::Continue => {},
				}

				apply_progress(item, &event);
				on_progress(item);
				if crossed_ten_percent(item) {
					on_log(item, format!("{}% complete", item.percent));
				}

				return Ok(());
			};

			match self.fetcher.download(&item.url, &fetcher_options, &mut callback) {
				Ok(output_path) => {
					item.filename = Some(output_path.clone());
					return ItemOutcome::Finished { output_path };
				},
				Err(crate::Error::Cancelled) => {
					self.cleanup(item);
					return ItemOutcome::Cancelled;
				},
				Err(crate::Error::SkipCurrent) => {
					self.cleanup(item);
					return ItemOutcome::Skipped;
				},
				Err(err) => {
					let is_retryable = matches!(err.kind(), Some(ErrorKind::FormatNotAvailable | ErrorKind::Network | ErrorKind::Unknown));

					if is_retryable && item.attempt + 1 < max_attempts {
						on_log(item, format!("Retrying with fallback format (attempt {}/{max_attempts})", item.attempt + 2));
						item.attempt += 1;
						item.retry_count += 1;
						self.cleanup(item);
						continue;
					}

					self.cleanup(item);
					return ItemOutcome::Failed { error_message: err.to_string() };
				},
			}
		}
	}

	/// Runs the Fetcher's non-downloading info-probe for `item`, recording
	/// the discovered title and logging the rest. Never fatal — a provider
	/// that rejects metadata-only requests can still often serve the actual
	/// download, so a probe failure is logged and otherwise ignored.
	fn probe(&self, item: &mut DownloadItem) {
		match self.fetcher.probe(&item.url) {
			Ok(info) => {
				debug!("probed \"{}\": title={:?} extractor={} playlist_count={:?}", item.url, info.title, info.extractor, info.playlist_count);
				item.title = Some(info.title);
			},
			Err(err) => {
				debug!("info-probe for \"{}\" failed (ignored, proceeding to download): {err}", item.url);
			},
		}
	}

	/// Removes leftover partial artifacts for `item`, best-effort. Errors
	/// are logged, not propagated — a cleanup failure must never mask the
	/// real download error that triggered it.
	fn cleanup(&self, item: &DownloadItem) {
		let Some(reference) = item.tmpfilename.as_ref().or(item.filename.as_ref()) else {
			return;
		};
		let Some(stem) = stem_of(reference) else {
			return;
		};
		let dir = reference.parent().unwrap_or(self.options.directory.as_path());

		if let Err(err) = reconciler::clean_artifacts(dir, &stem) {
			warn!("artifact cleanup for \"{}\" failed: {err}", item.url);
		}
	}
}

fn stem_of(path: &std::path::Path) -> Option<String> {
	return path.file_stem().map(|s| return s.to_string_lossy().into_owned());
}

fn apply_progress(item: &mut DownloadItem, event: &ProgressEvent) {
	item.last_status = event.status;

	match event.status {
		// on finished, progress jumps to 100 regardless of whether this
		// particular event carries matching downloaded/total byte counts
		ProgressStatus::Finished => item.percent = 100,
		ProgressStatus::Downloading => {
			if let Some(percent) = event.percent() {
				item.percent = percent;
			}
		},
	}

	item.downloaded_bytes = event.downloaded_bytes;
	item.total_bytes = event.total_bytes.or(event.total_bytes_estimate);
	item.speed = event.speed;
	item.eta = event.eta;
	if event.filename.is_some() {
		item.filename = event.filename.clone();
	}
	if event.tmpfilename.is_some() {
		item.tmpfilename = event.tmpfilename.clone();
	}
}

/// Returns `true` the first time `item.percent`'s floor-rounded-to-10 value
/// exceeds the last value logged, updating `item.last_logged_percent` as a
/// side effect. A log line fires for the very first progress event (percent
/// ≥ 0, since `last_logged_percent` starts at -10) and every time the
/// percentage crosses a new multiple of 10, never on every single event.
fn crossed_ten_percent(item: &mut DownloadItem) -> bool {
	let floor10 = i32::from(item.percent) / 10 * 10;
	if floor10 > item.last_logged_percent {
		item.last_logged_percent = floor10;
		return true;
	}
	return false;
}

/// Composes the human-readable status line for `item`:
/// `"{MB/s} | ETA {H:MM:SS}"` while downloading, or a fixed post-processing
/// line once the Fetcher has reported its `finished` event.
#[must_use]
pub fn compose_status(item: &DownloadItem) -> String {
	if item.last_status == ProgressStatus::Finished {
		return "Post-processing".to_string();
	}

	let speed = item.speed.map_or_else(|| "? MB/s".to_string(), |bytes_per_sec| format!("{:.2} MB/s", bytes_per_sec / 1_000_000.0));
	let eta = item.eta.map_or_else(|| "?:??:??".to_string(), format_eta);

	return format!("{speed} | ETA {eta}");
}

fn format_eta(total_seconds: u64) -> String {
	let hours = total_seconds / 3600;
	let minutes = (total_seconds % 3600) / 60;
	let seconds = total_seconds % 60;
	return format!("{hours}:{minutes:02}:{seconds:02}");
}
