//! The Fetcher capability boundary: everything the rest of the crate knows
//! about the external extractor/downloader goes through this trait, never
//! through a hardcoded binary name.

pub mod options;
pub mod ytdlp;

use std::path::PathBuf;

pub use options::FetcherOptions;
pub use ytdlp::YtdlpFetcher;

/// Coarse status a single [`ProgressEvent`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
	Downloading,
	Finished,
}

/// One line of progress, emitted by a [`Fetcher`] while an item downloads.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
	pub status: ProgressStatus,
	pub downloaded_bytes: Option<u64>,
	pub total_bytes: Option<u64>,
	pub total_bytes_estimate: Option<u64>,
	pub speed: Option<f64>,
	pub eta: Option<u64>,
	pub filename: Option<PathBuf>,
	pub tmpfilename: Option<PathBuf>,
}

impl ProgressEvent {
	/// Percent complete, 0-100, derived from whichever of `total_bytes` /
	/// `total_bytes_estimate` is available. `None` if neither is known yet
	/// (e.g. the very first progress line for a stream of unknown length).
	#[must_use]
	pub fn percent(&self) -> Option<u8> {
		let downloaded = self.downloaded_bytes?;
		let total = self.total_bytes.or(self.total_bytes_estimate)?;
		if total == 0 {
			return None;
		}

		let pct = (downloaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
		return Some(pct as u8);
	}
}

/// Metadata about a single media entry, returned by [`Fetcher::probe`] and
/// also carried in the final [`ProgressEvent`].
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
	pub id: String,
	pub title: String,
	pub extractor: String,
	/// Count of entries in the containing playlist, if this URL is one.
	pub playlist_count: Option<usize>,
}

/// Abstracts over the external extractor/downloader binary. The shipped
/// implementation is [`YtdlpFetcher`]; tests use a scripted double instead of
/// spawning a real process.
pub trait Fetcher: Send + Sync {
	/// Cheaply inspects `url` without downloading media, used to discover
	/// playlist size and per-entry metadata up front.
	fn probe(&self, url: &str) -> Result<MediaInfo, crate::Error>;

	/// Downloads `url` per `options`, invoking `on_progress` for every
	/// progress line. `on_progress` returning `Err` (a cooperative
	/// cancel/skip signal) must abort the download and propagate that error
	/// unchanged.
	fn download(&self, url: &str, options: &FetcherOptions, on_progress: &mut dyn FnMut(ProgressEvent) -> Result<(), crate::Error>) -> Result<PathBuf, crate::Error>;
}


#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_percent_from_total_bytes() {
		let event = ProgressEvent {
			status: ProgressStatus::Downloading,
			downloaded_bytes: Some(50),
			total_bytes: Some(200),
			total_bytes_estimate: None,
			speed: None,
			eta: None,
			filename: None,
			tmpfilename: None,
		};
		assert_eq!(event.percent(), Some(25));
	}

	#[test]
	fn test_percent_falls_back_to_estimate() {
		let event = ProgressEvent {
			status: ProgressStatus::Downloading,
			downloaded_bytes: Some(10),
			total_bytes: None,
			total_bytes_estimate: Some(100),
			speed: None,
			eta: None,
			filename: None,
			tmpfilename: None,
		};
		assert_eq!(event.percent(), Some(10));
	}

	#[test]
	fn test_percent_unknown_when_total_missing() {
		let event = ProgressEvent {
			status: ProgressStatus::Downloading,
			downloaded_bytes: Some(10),
			total_bytes: None,
			total_bytes_estimate: None,
			speed: None,
			eta: None,
			filename: None,
			tmpfilename: None,
		};
		assert_eq!(event.percent(), None);
	}
}
