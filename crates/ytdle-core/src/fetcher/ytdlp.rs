//! The shipped [`Fetcher`] implementation: spawns stock `yt-dlp` via
//! `duct`, merging stderr into stdout, and decodes progress from a custom
//! `--progress-template` rather than a patched-binary line protocol.

use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use serde::Deserialize;

use super::options::{ArgsHelper, FetcherOptions, add_cookie_args};
use super::{Fetcher, MediaInfo, ProgressEvent, ProgressStatus};
use crate::spawn::ytdlp_bin::YTDLP_BIN_NAME;

/// The minimal yt-dlp version this adapter is built around. Older releases
/// may not understand `--progress-template`'s json-encoding modifier.
pub const MINIMAL_YTDLP_VERSION: NaiveDate = NaiveDate::from_ymd_opt(2023, 3, 24).unwrap();

/// Marker a line must start with for the remainder to be treated as a
/// progress JSON payload; anything else is either a plain log line or an
/// `ERROR:`/`WARNING:` line.
const PROGRESS_MARKER: &str = "YTDLE_PROGRESS ";

fn warn_minimal_version(version: NaiveDate) {
	if version < MINIMAL_YTDLP_VERSION {
		warn!("Installed yt-dlp version ({}) is older than the recommended minimal ({})", version.format("%Y.%m.%d"), MINIMAL_YTDLP_VERSION.format("%Y.%m.%d"));
	}
}

#[derive(Debug, Deserialize)]
struct RawProgress {
	status: String,
	downloaded_bytes: Option<u64>,
	total_bytes: Option<u64>,
	total_bytes_estimate: Option<f64>,
	speed: Option<f64>,
	eta: Option<f64>,
	filename: Option<String>,
	tmpfilename: Option<String>,
}

impl From<RawProgress> for ProgressEvent {
	fn from(raw: RawProgress) -> Self {
		return ProgressEvent {
			status: if raw.status == "finished" { ProgressStatus::Finished } else { ProgressStatus::Downloading },
			downloaded_bytes: raw.downloaded_bytes,
			total_bytes: raw.total_bytes,
			total_bytes_estimate: raw.total_bytes_estimate.map(|v| return v as u64),
			speed: raw.speed,
			eta: raw.eta.map(|v| return v as u64),
			filename: raw.filename.map(PathBuf::from),
			tmpfilename: raw.tmpfilename.map(PathBuf::from),
		};
	}
}

#[derive(Debug, Deserialize)]
struct RawMediaInfo {
	id: String,
	title: String,
	extractor: String,
	#[serde(default)]
	n_entries: Option<usize>,
}

/// Drives a system-installed `yt-dlp` binary.
pub struct YtdlpFetcher {
	print_command_stdout: bool,
}

impl YtdlpFetcher {
	#[must_use]
	pub fn new() -> Self {
		return Self { print_command_stdout: false };
	}

	#[must_use]
	pub fn with_stdout_logging(mut self, enabled: bool) -> Self {
		self.print_command_stdout = enabled;
		return self;
	}

	fn build_download_args(&self, url: &str, options: &FetcherOptions) -> ArgsHelper {
		let mut args = ArgsHelper::new();

		if options.audio_only {
			args.arg("-f").arg(&options.format_selector);
			args.arg("-x");
			args.arg("--audio-format").arg(&options.audio_format);
			args.arg("--audio-quality").arg(format!("{}K", options.audio_bitrate));
			// thumbnail embedding only applies to the audio-extraction path;
			// video keeps metadata embed only
			args.arg("--write-thumbnail");
			args.arg("--embed-thumbnail");
			args.arg("--convert-thumbnails").arg("webp>jpg");
		} else {
			args.arg("-f").arg(&options.format_selector);
			args.arg("--remux-video").arg(&options.video_remux_format);
		}

		args.arg("--add-metadata");

		if let Some(langs) = &options.subtitle_langs {
			args.arg("--write-subs").arg("--sub-langs").arg(langs);
		}

		if options.download_playlist {
			args.arg("--yes-playlist");
		} else {
			args.arg("--no-playlist");
		}

		if options.restrict_filenames {
			args.arg("--restrict-filenames");
		}

		if options.no_check_certificate {
			args.arg("--no-check-certificate");
		}

		args.arg("--retries").arg(options.retries.to_string());
		args.arg("--fragment-retries").arg(options.fragment_retries.to_string());
		args.arg("--concurrent-fragments").arg(options.concurrent_fragment_downloads.to_string());

		add_cookie_args(&mut args, &options.cookies);

		if options.use_external_downloader {
			args.arg("--external-downloader").arg("aria2c");
			args.arg("--external-downloader-args").arg(format!(
				"aria2c:-x {connections} -s {connections} -k 1M --file-allocation=none --optimize-concurrent-downloads=true",
				connections = options.max_connections
			));
		}

		for extra in &options.extra_args {
			args.arg(extra);
		}

		args.arg("--progress");
		args.arg("--newline");
		args.arg("--no-simulate");
		args.arg("--progress-template").arg(format!("download:{PROGRESS_MARKER}%(progress)j"));
		args.arg("--progress-template").arg(format!("postprocess:{PROGRESS_MARKER}%(progress)j"));

		args.arg("-o").arg(options.directory.join(&options.output_template));
		args.arg(url);

		return args;
	}

	fn spawn_download(&self, args: Vec<std::ffi::OsString>) -> Result<duct::ReaderHandle, crate::Error> {
		return duct::cmd(YTDLP_BIN_NAME, args)
			.stderr_to_stdout()
			.reader()
			.map_err(|err| return crate::Error::UnexpectedProcessExit(format!("failed to spawn {YTDLP_BIN_NAME}: {err}")));
	}
}

impl Default for YtdlpFetcher {
	fn default() -> Self {
		return Self::new();
	}
}

impl Fetcher for YtdlpFetcher {
	fn probe(&self, url: &str) -> Result<MediaInfo, crate::Error> {
		let output = duct::cmd(YTDLP_BIN_NAME, ["--dump-json", "--skip-download", "--no-warnings", "--flat-playlist", url])
			.stdout_capture()
			.stderr_capture()
			.unchecked()
			.run()?;

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr);
			return Err(crate::Error::classified(stderr.trim()));
		}

		let stdout = String::from_utf8_lossy(&output.stdout);
		let lines: Vec<&str> = stdout.lines().filter(|line| return !line.trim().is_empty()).collect();

		let Some(first) = lines.first() else {
			return Err(crate::Error::other("yt-dlp --dump-json produced no output"));
		};

		let raw: RawMediaInfo = serde_json::from_str(first)?;

		return Ok(MediaInfo {
			id: raw.id,
			title: raw.title,
			extractor: raw.extractor,
			playlist_count: raw.n_entries.or_else(|| {
				if lines.len() > 1 {
					return Some(lines.len());
				}
				return None;
			}),
		});
	}

	fn download(&self, url: &str, options: &FetcherOptions, on_progress: &mut dyn FnMut(ProgressEvent) -> Result<(), crate::Error>) -> Result<PathBuf, crate::Error> {
		if let Ok(version) = crate::spawn::ytdlp_bin::ytdlp_version() {
			if let Ok(parsed) = NaiveDate::parse_from_str(&version, "%Y.%m.%d") {
				warn_minimal_version(parsed);
			}
		}

		let args = self.build_download_args(url, options).into_inner();

		let child = self.spawn_download(args)?;
		let reader = BufReader::new(&child);

		let mut last_error: Option<String> = None;
		let mut last_filename: Option<PathBuf> = None;
		let mut callback_result: Result<(), crate::Error> = Ok(());

		for line in reader.lines() {
			let line = line?;

			if self.print_command_stdout {
				trace!("yt-dlp: {line}");
			}

			if let Some(payload) = line.strip_prefix(PROGRESS_MARKER) {
				match serde_json::from_str::<RawProgress>(payload) {
					Ok(raw) => {
						let event: ProgressEvent = raw.into();
						if let Some(filename) = &event.filename {
							last_filename = Some(filename.clone());
						}
						if let Err(err) = on_progress(event) {
							callback_result = Err(err);
							break;
						}
					},
					Err(err) => warn!("could not decode progress payload: {err}"),
				}
				continue;
			}

			if line.starts_with("ERROR:") {
				last_error = Some(line.clone());
			}
		}

		// the reader must be drained before checking exit status, otherwise a
		// full pipe buffer can deadlock the child on some platforms
		loop {
			match child.try_wait() {
				Ok(Some(_)) => break,
				Ok(None) => std::thread::sleep(Duration::from_millis(50)),
				Err(_) => break,
			}
		}

		callback_result?;

		if let Some(message) = last_error {
			return Err(crate::Error::classified(message));
		}

		return last_filename.ok_or_else(|| return crate::Error::other("yt-dlp exited without ever reporting a finished filename"));
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_raw_progress_maps_status() {
		let raw = RawProgress {
			status: "finished".to_string(),
			downloaded_bytes: Some(100),
			total_bytes: Some(100),
			total_bytes_estimate: None,
			speed: None,
			eta: Some(0.0),
			filename: Some("out.mp4".to_string()),
			tmpfilename: None,
		};
		let event: ProgressEvent = raw.into();
		assert_eq!(event.status, ProgressStatus::Finished);
		assert_eq!(event.filename, Some(PathBuf::from("out.mp4")));
	}

	#[test]
	fn test_build_download_args_audio_only_includes_extract_flag() {
		let fetcher = YtdlpFetcher::new();
		let mut options = FetcherOptions::for_attempt(&crate::options::DownloadOptions { format: crate::options::FormatKind::Audio, ..Default::default() }, 0);
		options.directory = PathBuf::from("/tmp/out");

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		let joined: Vec<String> = args.iter().map(|a| return a.to_string_lossy().to_string()).collect();

		assert!(joined.contains(&"-x".to_string()));
		assert!(joined.contains(&"--audio-format".to_string()));
		assert!(joined.contains(&"--audio-quality".to_string()));
		assert!(joined.contains(&"192K".to_string()));
		assert!(joined.contains(&"--write-thumbnail".to_string()));
		assert!(joined.contains(&"--embed-thumbnail".to_string()));
		assert!(joined.contains(&"--convert-thumbnails".to_string()));
		assert!(joined.contains(&"--add-metadata".to_string()));
	}

	#[test]
	fn test_build_download_args_video_only_gets_metadata_not_thumbnail() {
		// video post-processing is metadata embed only; thumbnail embedding
		// is an audio-extraction-only step
		let fetcher = YtdlpFetcher::new();
		let options = FetcherOptions::for_attempt(&crate::options::DownloadOptions { format: crate::options::FormatKind::Video, ..Default::default() }, 0);

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		let joined: Vec<String> = args.iter().map(|a| return a.to_string_lossy().to_string()).collect();

		assert!(joined.contains(&"--add-metadata".to_string()));
		assert!(!joined.contains(&"--embed-thumbnail".to_string()));
		assert!(!joined.contains(&"--write-thumbnail".to_string()));
		assert!(!joined.contains(&"--convert-thumbnails".to_string()));
	}

	#[test]
	fn test_build_download_args_always_ends_with_url() {
		let fetcher = YtdlpFetcher::new();
		let options = FetcherOptions::for_attempt(&crate::options::DownloadOptions::default(), 0);

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		assert_eq!(args.last().unwrap(), "https://example.com/v");
	}

	#[test]
	fn test_build_download_args_uses_no_playlist_by_default() {
		let fetcher = YtdlpFetcher::new();
		let options = FetcherOptions::for_attempt(&crate::options::DownloadOptions::default(), 0);

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		let joined: Vec<String> = args.iter().map(|a| return a.to_string_lossy().to_string()).collect();
		assert!(joined.contains(&"--no-playlist".to_string()));
	}

	#[test]
	fn test_build_download_args_omits_external_downloader_by_default() {
		let fetcher = YtdlpFetcher::new();
		let options = FetcherOptions::for_attempt(&crate::options::DownloadOptions::default(), 0);

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		let joined: Vec<String> = args.iter().map(|a| return a.to_string_lossy().to_string()).collect();
		assert!(!joined.contains(&"--external-downloader".to_string()));
	}

	#[test]
	fn test_build_download_args_wires_aria2c_when_requested() {
		let fetcher = YtdlpFetcher::new();
		let batch_options = crate::options::DownloadOptions { use_external_downloader: true, max_connections: 8, ..Default::default() };
		let options = FetcherOptions::for_attempt(&batch_options, 0);

		let args = fetcher.build_download_args("https://example.com/v", &options).into_inner();
		let joined: Vec<String> = args.iter().map(|a| return a.to_string_lossy().to_string()).collect();

		assert!(joined.contains(&"--external-downloader".to_string()));
		assert!(joined.contains(&"aria2c".to_string()));
		let args_idx = joined.iter().position(|a| return a == "--external-downloader-args").expect("expected --external-downloader-args");
		assert_eq!(joined[args_idx + 1], "aria2c:-x 8 -s 8 -k 1M --file-allocation=none --optimize-concurrent-downloads=true");
	}
}
