//! Per-attempt option assembly handed to a [`crate::fetcher::Fetcher`]
//! implementation. Distinct from [`crate::options::DownloadOptions`], which
//! is batch-wide and immutable: `FetcherOptions` is derived fresh for every
//! attempt of a single item, because the format selector changes across
//! the fallback ladder (§4.F).

use std::ffi::OsString;
use std::path::PathBuf;

use crate::options::{CookieSpec, DownloadOptions, FormatKind};

/// Chainable collector for arguments destined for a subprocess spawn,
/// sidestepping `std::process::Command`'s API (which doesn't hand back a
/// plain argument list, needed here to feed `duct`).
#[derive(Debug, Default)]
pub struct ArgsHelper(Vec<OsString>);

impl ArgsHelper {
	#[must_use]
	pub fn new() -> Self {
		return Self(Vec::default());
	}

	pub fn arg<U>(&mut self, arg: U) -> &mut Self
	where
		U: Into<OsString>,
	{
		self.0.push(arg.into());
		return self;
	}

	#[must_use]
	pub fn into_inner(self) -> Vec<OsString> {
		return self.0;
	}
}

impl From<ArgsHelper> for Vec<OsString> {
	fn from(v: ArgsHelper) -> Self {
		return v.into_inner();
	}
}

/// Height cap parsed out of a quality token like `"1080p"`; `None` means
/// unrestricted (`"best"`, or any token without digits — a token with no
/// digits such as `"Best"` is treated as unrestricted rather than defaulting
/// to some height).
fn height_cap(quality: &str) -> Option<u32> {
	if quality.eq_ignore_ascii_case("best") {
		return None;
	}
	let digits: String = quality.chars().filter(char::is_ascii_digit).collect();
	return digits.parse().ok();
}

/// Audio bitrate (kbps) parsed out of a quality token like `"192k"`,
/// defaulting to 192 when the token carries no digits.
#[must_use]
pub fn audio_bitrate(quality: &str) -> u32 {
	let digits: String = quality.chars().filter(char::is_ascii_digit).collect();
	return digits.parse().unwrap_or(192);
}

/// Resolves the format selector string for `attempt`, given `format` and the
/// batch's requested `quality`. Grounded on the original's by-attempt
/// fallback ladder:
/// - attempt 0 asks for the requested quality split into separate
///   video+audio streams, falling back through a progressive stream capped
///   at the same height, then an uncapped progressive stream;
/// - attempt 1 restricts the remux target to mp4, with the same height-cap
///   fallback chain;
/// - attempt 2+ takes whatever is available at all.
#[must_use]
pub fn format_selector_for_attempt(format: FormatKind, attempt: u32, quality: &str) -> String {
	return match format {
		FormatKind::Audio => "bestaudio/best".to_string(),
		FormatKind::Video => match (attempt, height_cap(quality)) {
			(0, None) => "bestvideo*+bestaudio/best".to_string(),
			(0, Some(h)) => format!("bestvideo*[height<={h}]+bestaudio/best[height<={h}]/best[height<={h}]/best"),
			(1, None) => "best[ext=mp4]/best".to_string(),
			(1, Some(h)) => format!("best[height<={h}][ext=mp4]/best[height<={h}]/best"),
			_ => "best".to_string(),
		},
	};
}

/// Per-attempt options handed to [`crate::fetcher::Fetcher::download`].
#[derive(Debug, Clone)]
pub struct FetcherOptions {
	pub format_selector: String,
	pub audio_only: bool,
	/// Audio extraction container, e.g. "mp3"; only meaningful when `audio_only`.
	pub audio_format: String,
	/// Audio bitrate target in kbps, e.g. `192`; only meaningful when `audio_only`.
	pub audio_bitrate: u32,
	pub video_remux_format: String,
	pub output_template: String,
	pub directory: PathBuf,
	pub download_playlist: bool,
	pub restrict_filenames: bool,
	pub retries: u32,
	pub fragment_retries: u32,
	pub concurrent_fragment_downloads: u32,
	pub no_check_certificate: bool,
	pub cookies: CookieSpec,
	pub subtitle_langs: Option<String>,
	pub extra_args: Vec<String>,
	/// Hands the actual transfer off to `aria2c` instead of `yt-dlp`'s own
	/// downloader, grounded on the original's `external_downloader` wiring
	/// (`original_source/core/async_manager.py`).
	pub use_external_downloader: bool,
	/// Connections-per-server passed to `aria2c` (`-x`/`-s`) when
	/// `use_external_downloader` is set; meaningless otherwise.
	pub max_connections: u32,
}

impl FetcherOptions {
	/// Builds the options for one attempt of `batch_options`, advancing the
	/// format selector along the fallback ladder.
	#[must_use]
	pub fn for_attempt(batch_options: &DownloadOptions, attempt: u32) -> Self {
		return Self {
			format_selector: format_selector_for_attempt(batch_options.format, attempt, &batch_options.quality),
			audio_only: batch_options.format == FormatKind::Audio,
			audio_format: "mp3".to_string(),
			audio_bitrate: audio_bitrate(&batch_options.quality),
			video_remux_format: "mp4".to_string(),
			output_template: batch_options.effective_output_template().to_string(),
			directory: batch_options.directory.clone(),
			download_playlist: batch_options.download_playlist,
			restrict_filenames: batch_options.restrict_filenames,
			retries: batch_options.retries,
			fragment_retries: batch_options.fragment_retries,
			concurrent_fragment_downloads: batch_options.concurrent_fragment_downloads,
			no_check_certificate: batch_options.no_check_certificate,
			cookies: batch_options.cookies.clone(),
			subtitle_langs: batch_options.subtitle_langs.clone(),
			extra_args: resolve_transcoder_args(batch_options),
			use_external_downloader: batch_options.use_external_downloader,
			max_connections: batch_options.max_connections,
		};
	}
}

/// Resolves the final transcoder argument list: `transcoder_override_args`
/// wins outright if set, otherwise `transcoder_add_args` is appended to the
/// built-in set by the caller. Each string is tokenized by POSIX shell
/// rules, since both fields are user-supplied as a single shell-like string
/// on the CLI (`--ffmpeg-add-args "-vf scale=1280:-1"`).
fn resolve_transcoder_args(options: &DownloadOptions) -> Vec<String> {
	if let Some(override_args) = &options.transcoder_override_args {
		return override_args.clone();
	}

	return options
		.transcoder_add_args
		.iter()
		.flat_map(|raw| return shell_words::split(raw).unwrap_or_else(|_| return vec![raw.clone()]))
		.collect();
}

/// Appends `--cookies`/`--cookies-from-browser` arguments for `spec`.
pub fn add_cookie_args(args: &mut ArgsHelper, spec: &CookieSpec) {
	match spec {
		CookieSpec::None => {},
		CookieSpec::File(path) => {
			args.arg("--cookies").arg(path);
		},
		CookieSpec::Browser { name, profile, keyring, container } => {
			let mut spec_str = name.clone();
			if let Some(profile) = profile {
				spec_str.push_str(&format!(":{profile}"));
			}
			if let Some(keyring) = keyring {
				spec_str.push_str(&format!("::{keyring}"));
			}
			if let Some(container) = container {
				spec_str.push_str(&format!(":::{container}"));
			}
			args.arg("--cookies-from-browser").arg(spec_str);
		},
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_format_selector_audio_ignores_attempt() {
		assert_eq!(format_selector_for_attempt(FormatKind::Audio, 0, "best"), "bestaudio/best");
		assert_eq!(format_selector_for_attempt(FormatKind::Audio, 2, "best"), "bestaudio/best");
	}

	#[test]
	fn test_format_selector_video_ladder_progresses_on_retry() {
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 0, "best"), "bestvideo*+bestaudio/best");
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 1, "best"), "best[ext=mp4]/best");
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 2, "best"), "best");
	}

	#[test]
	fn test_format_selector_video_caps_at_last_rung_beyond_ladder() {
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 99, "best"), "best");
	}

	#[test]
	fn test_format_selector_video_honors_quality_cap_on_first_attempt() {
		assert_eq!(
			format_selector_for_attempt(FormatKind::Video, 0, "720p"),
			"bestvideo*[height<=720]+bestaudio/best[height<=720]/best[height<=720]/best"
		);
	}

	#[test]
	fn test_format_selector_video_honors_quality_cap_on_second_attempt() {
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 1, "1080p"), "best[height<=1080][ext=mp4]/best[height<=1080]/best");
	}

	#[test]
	fn test_format_selector_no_digits_quality_token_is_unrestricted() {
		// e.g. "Best" (CLI default casing) — no digits, treated like "best"
		assert_eq!(format_selector_for_attempt(FormatKind::Video, 0, "Best"), "bestvideo*+bestaudio/best");
	}

	#[test]
	fn test_audio_bitrate_parses_digits() {
		assert_eq!(audio_bitrate("192k"), 192);
		assert_eq!(audio_bitrate("320K"), 320);
	}

	#[test]
	fn test_audio_bitrate_defaults_without_digits() {
		assert_eq!(audio_bitrate("best"), 192);
	}

	#[test]
	fn test_resolve_transcoder_args_override_wins() {
		let mut options = DownloadOptions::default();
		options.transcoder_add_args = vec!["-vf scale=1280:-1".to_string()];
		options.transcoder_override_args = Some(vec!["-c:v".to_string(), "copy".to_string()]);

		assert_eq!(resolve_transcoder_args(&options), vec!["-c:v".to_string(), "copy".to_string()]);
	}

	#[test]
	fn test_resolve_transcoder_args_tokenizes_add_args() {
		let mut options = DownloadOptions::default();
		options.transcoder_add_args = vec!["-vf scale=1280:-1".to_string()];

		assert_eq!(resolve_transcoder_args(&options), vec!["-vf".to_string(), "scale=1280:-1".to_string()]);
	}

	#[test]
	fn test_add_cookie_args_browser_with_all_fields() {
		let mut args = ArgsHelper::new();
		add_cookie_args(
			&mut args,
			&CookieSpec::Browser {
				name: "firefox".to_string(),
				profile: Some("default".to_string()),
				keyring: Some("gnomekeyring".to_string()),
				container: Some("work".to_string()),
			},
		);

		let built: Vec<OsString> = args.into_inner();
		assert_eq!(built, vec![OsString::from("--cookies-from-browser"), OsString::from("firefox:default::gnomekeyring:::work")]);
	}

	#[test]
	fn test_add_cookie_args_none_adds_nothing() {
		let mut args = ArgsHelper::new();
		add_cookie_args(&mut args, &CookieSpec::None);
		assert!(args.into_inner().is_empty());
	}
}
