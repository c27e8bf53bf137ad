//! The batch-wide, immutable options a [`crate::scheduler::Scheduler`] is
//! constructed with. Built once by the CLI layer before a batch starts.

use std::path::PathBuf;

/// Where to source cookies from for sites that require an authenticated
/// session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieSpec {
	/// No cookies supplied.
	None,
	/// Pull cookies directly from an installed browser's cookie store.
	Browser {
		name: String,
		profile: Option<String>,
		keyring: Option<String>,
		container: Option<String>,
	},
	/// Load a Netscape-format cookies file from disk.
	File(PathBuf),
}

impl Default for CookieSpec {
	fn default() -> Self {
		return Self::None;
	}
}

/// Target media kind for a batch: whether to keep video or extract audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
	Video,
	Audio,
}

/// Options shared by every item in a batch. Constructed once from parsed CLI
/// args and never mutated for the lifetime of the batch, per the
/// single-writer-at-construction-time invariant.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
	pub format: FormatKind,
	/// Desired quality, e.g. "best", "1080p", a bitrate for audio.
	pub quality: String,
	/// `yt-dlp`-style output template, e.g. `%(title).150s.%(ext)s`.
	pub output_template: String,
	pub directory: PathBuf,
	pub download_playlist: bool,
	pub restrict_filenames: bool,
	pub retries: u32,
	pub fragment_retries: u32,
	pub concurrent_fragment_downloads: u32,
	pub no_check_certificate: bool,
	pub cookies: CookieSpec,
	/// Extra transcoder (ffmpeg) arguments appended after the built-in ones.
	pub transcoder_add_args: Vec<String>,
	/// Transcoder arguments that replace the built-in ones entirely.
	pub transcoder_override_args: Option<Vec<String>>,
	pub use_external_downloader: bool,
	pub max_connections: u32,
	pub max_concurrent_downloads: usize,
	pub subtitle_langs: Option<String>,
}

impl DownloadOptions {
	/// Returns the output template with a fallback applied if the caller left
	/// it empty, matching the original's `sanitize_template` default.
	#[must_use]
	pub fn effective_output_template(&self) -> &str {
		if self.output_template.trim().is_empty() {
			return "%(title).150s.%(ext)s";
		}

		return &self.output_template;
	}
}

impl Default for DownloadOptions {
	fn default() -> Self {
		return Self {
			format: FormatKind::Video,
			quality: "best".to_string(),
			output_template: String::new(),
			directory: PathBuf::from("."),
			download_playlist: false,
			restrict_filenames: false,
			retries: 10,
			fragment_retries: 10,
			concurrent_fragment_downloads: 3,
			no_check_certificate: false,
			cookies: CookieSpec::None,
			transcoder_add_args: Vec::new(),
			transcoder_override_args: None,
			use_external_downloader: false,
			max_connections: 16,
			max_concurrent_downloads: 3,
			subtitle_langs: None,
		};
	}
}
