#![allow(clippy::needless_return)]
#![warn(clippy::implicit_return)]

#[macro_use]
extern crate log;

use std::io::Error as ioError;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use clap::{CommandFactory, Parser};
use colored::Colorize;
use flexi_logger::LogSpecification;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

mod clap_conf;
mod logger;
mod utils;

use clap_conf::CliDerive;
use ytdle_core::fetcher::YtdlpFetcher;
use ytdle_core::history::{HistoryStore, migrate};
use ytdle_core::network::{NetworkStatus, probe_tcp};
use ytdle_core::options::{CookieSpec, DownloadOptions, FormatKind};
use ytdle_core::scheduler::{EventSink, ItemOutcomeSummary, Scheduler, SchedulerEvent};

/// Main
fn main() -> ExitCode {
	let mut logger_handle = match logger::setup_logger() {
		Ok(handle) => handle,
		Err(err) => {
			eprintln!("Could not set up logging: {err}");
			return ExitCode::FAILURE;
		},
	};

	let cli_matches = CliDerive::parse();

	if let Some(shell) = cli_matches.completions {
		clap_complete::generate(shell, &mut CliDerive::command(), "ytdle", &mut std::io::stdout());
		return ExitCode::SUCCESS;
	}

	log::info!("CLI Verbosity is {}", cli_matches.verbosity);

	// dont do anything if "-v" is not specified (use env / default instead)
	if cli_matches.verbosity > 0 {
		logger_handle.set_new_spec(
			match cli_matches.verbosity {
				0 => unreachable!("Unreachable because it should be tested before that it is higher than 0"),
				1 => LogSpecification::parse("info"),
				2 => LogSpecification::parse("debug"),
				_ => LogSpecification::parse("trace"),
			}
			.expect("Expected LogSpecification to parse correctly"),
		);
	}

	if let Err(err) = run(&cli_matches) {
		error!("{err}");
		return ExitCode::FAILURE;
	}

	return ExitCode::SUCCESS;
}

/// Runs a single batch. Returns `Err` only for setup failures (yt-dlp
/// missing, history db unreachable, ...); per-item failures are reported via
/// the process exit code set in [`main`] after inspecting the batch tally.
fn run(cli_matches: &CliDerive) -> Result<(), ioError> {
	utils::require_ytdlp_installed()?;

	if cli_matches.format == clap_conf::FormatArg::Mp3 {
		utils::require_transcoder_installed()?;
	} else if utils::require_transcoder_installed().is_err() {
		warn!("ffmpeg could not be located (checked bundled, cwd, and PATH); downloads that need remuxing or thumbnail embedding may fail");
	}

	if probe_tcp(None) == NetworkStatus::Offline {
		warn!("network reachability probe failed, continuing anyway; downloads will fail immediately if actually offline");
	}

	let history_path = cli_matches.history_db.clone().unwrap_or_else(utils::default_history_db_path);
	if let Some(parent) = history_path.parent() {
		std::fs::create_dir_all(parent)?;
	}
	let history = HistoryStore::open(&history_path).map_err(|err| return ioError::other(format!("could not open history database \"{}\": {err}", history_path.display())))?;

	let legacy_path = utils::default_legacy_history_path();
	match migrate::migrate_from_json(&history, &legacy_path) {
		Ok(0) => {},
		Ok(count) => info!("migrated {count} legacy history record(s) from \"{}\"", legacy_path.display()),
		Err(err) => warn!("legacy history migration failed, continuing with the existing database: {err}"),
	}

	let options = build_options(cli_matches)?;

	let fetcher: Arc<dyn ytdle_core::fetcher::Fetcher> = Arc::new(YtdlpFetcher::new());
	let mut scheduler = Scheduler::new(options, fetcher).with_history(history.clone());
	scheduler.add_sink(Arc::new(CliSink::new()));
	let scheduler = Arc::new(scheduler);

	let cancelled_by_user = Arc::new(AtomicBool::new(false));
	{
		let scheduler = Arc::clone(&scheduler);
		let cancelled_by_user = Arc::clone(&cancelled_by_user);
		ctrlc::set_handler(move || {
			warn!("Ctrl-C received, cancelling after the current item");
			cancelled_by_user.store(true, Ordering::SeqCst);
			scheduler.cancel();
		})
		.map_err(|err| return ioError::other(format!("could not install Ctrl-C handler: {err}")))?;
	}

	let (success_count, fail_count) = scheduler.run(cli_matches.input.clone());

	if fail_count > 0 {
		if let Some(export_path) = &cli_matches.export_failed {
			match history.export_failed_urls_to(export_path) {
				Ok(count) => info!("wrote {count} failed URL(s) to \"{}\"", export_path.display()),
				Err(err) => warn!("could not write failure export to \"{}\": {err}", export_path.display()),
			}
		}
	}

	println!("{}", summary_line(success_count, fail_count, cancelled_by_user.load(Ordering::SeqCst)));

	if fail_count > 0 || cancelled_by_user.load(Ordering::SeqCst) {
		return Err(ioError::other("batch finished with failures"));
	}

	return Ok(());
}

/// Builds the batch-wide [`DownloadOptions`] from parsed CLI args.
fn build_options(cli_matches: &CliDerive) -> Result<DownloadOptions, ioError> {
	let format = cli_matches.format.to_format_kind();
	let quality = cli_matches.quality.clone().unwrap_or_else(|| return cli_matches.format.default_quality().to_string());

	let directory = match &cli_matches.output_directory {
		Some(dir) => ytdle_core::utils::to_absolute(dir)?,
		None => std::env::current_dir()?,
	};

	let cookies = match &cli_matches.cookies {
		Some(path) => CookieSpec::File(ytdle_core::utils::to_absolute(path)?),
		None => CookieSpec::None,
	};

	let transcoder_add_args = cli_matches.ffmpeg_add_args.clone().into_iter().collect();

	let transcoder_override_args = match &cli_matches.ffmpeg_override_args {
		Some(raw) => Some(shell_words::split(raw).map_err(|err| return ioError::new(std::io::ErrorKind::InvalidInput, format!("could not parse --ffmpeg-override-args: {err}")))?),
		None => None,
	};

	return Ok(DownloadOptions {
		format,
		quality,
		output_template: cli_matches.template.clone(),
		directory,
		download_playlist: cli_matches.playlist,
		restrict_filenames: cli_matches.restrict_filenames,
		no_check_certificate: cli_matches.no_check_certificate,
		cookies,
		transcoder_add_args,
		transcoder_override_args,
		..DownloadOptions::default()
	});
}

/// Final one-line summary printed after a batch completes.
fn summary_line(success_count: usize, fail_count: usize, cancelled: bool) -> String {
	let counts = format!("{success_count} succeeded, {fail_count} failed");
	return if cancelled {
		format!("{} {counts} (cancelled)", "ABORTED".red().bold())
	} else if fail_count > 0 {
		format!("{} {counts}", "DONE".yellow().bold())
	} else {
		format!("{} {counts}", "DONE".green().bold())
	};
}

/// [`EventSink`] that renders one progress bar per in-flight item via
/// `indicatif`, colored by outcome on completion. Sink callbacks run directly
/// on worker threads, so all state here is kept behind a `Mutex`.
struct CliSink {
	multi: MultiProgress,
	style: ProgressStyle,
	bars: Mutex<std::collections::HashMap<String, ProgressBar>>,
}

impl CliSink {
	fn new() -> Self {
		let style = ProgressStyle::default_bar()
			.template("{prefix:.dim} [{elapsed_precise}] {wide_bar:.cyan/blue} {msg}")
			.expect("Expected ProgressStyle template to be valid")
			.progress_chars("#>-");

		return Self { multi: MultiProgress::new(), style, bars: Mutex::new(std::collections::HashMap::new()) };
	}

	fn truncated(url: &str) -> String {
		const MAX_LEN: usize = 60;
		if url.chars().count() <= MAX_LEN {
			return url.to_string();
		}
		return format!("{}...", url.chars().take(MAX_LEN).collect::<String>());
	}
}

impl EventSink for CliSink {
	fn handle(&self, event: SchedulerEvent) {
		let mut bars = self.bars.lock().expect("bars mutex poisoned");

		match event {
			SchedulerEvent::ItemStarted { url } => {
				let bar = self.multi.add(ProgressBar::new(100).with_style(self.style.clone()));
				bar.set_prefix(Self::truncated(&url));
				bar.set_message("starting");
				bars.insert(url, bar);
			},
			SchedulerEvent::ItemProgress { url, percent } => {
				if let Some(bar) = bars.get(&url) {
					bar.set_position(u64::from(percent));
				}
			},
			SchedulerEvent::Status { url, text } => {
				if let Some(bar) = bars.get(&url) {
					bar.set_message(text);
				}
			},
			SchedulerEvent::Log { url, text } => {
				self.multi.println(format!("{}: {text}", Self::truncated(&url))).ok();
			},
			SchedulerEvent::Error { text, .. } => {
				self.multi.println(format!("{}: {text}", "error".red())).ok();
			},
			SchedulerEvent::ItemFinished { url, outcome } => {
				if let Some(bar) = bars.remove(&url) {
					let message = match &outcome {
						ItemOutcomeSummary::Finished => "done".green().to_string(),
						ItemOutcomeSummary::Failed(reason) => format!("{}: {reason}", "failed".red()),
						ItemOutcomeSummary::Cancelled => "cancelled".yellow().to_string(),
						ItemOutcomeSummary::Skipped => "skipped".yellow().to_string(),
					};
					bar.set_position(100);
					bar.finish_with_message(message);
				}
			},
			SchedulerEvent::AllFinished { success_count, fail_count } => {
				bars.clear();
				debug!("batch finished: {success_count} succeeded, {fail_count} failed");
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_cli_sink_truncates_long_urls() {
		let long = "https://example.com/".to_string() + &"a".repeat(100);
		let truncated = CliSink::truncated(&long);
		assert!(truncated.len() < long.len());
		assert!(truncated.ends_with("..."));
	}

	#[test]
	fn test_cli_sink_leaves_short_urls_untouched() {
		let short = "https://example.com/a".to_string();
		assert_eq!(CliSink::truncated(&short), short);
	}

	#[test]
	fn test_build_options_defaults_quality_from_format() {
		let cli_matches = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a", "-f", "mp3"]);
		let options = build_options(&cli_matches).expect("expected options to build");
		assert_eq!(options.quality, "192k");
		assert_eq!(options.format, FormatKind::Audio);
	}

	#[test]
	fn test_build_options_honors_explicit_quality() {
		let cli_matches = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a", "-q", "720p"]);
		let options = build_options(&cli_matches).expect("expected options to build");
		assert_eq!(options.quality, "720p");
	}

	#[test]
	fn test_build_options_tokenizes_ffmpeg_override_args() {
		let cli_matches = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a", "--ffmpeg-override-args", "-c:v copy"]);
		let options = build_options(&cli_matches).expect("expected options to build");
		assert_eq!(options.transcoder_override_args, Some(vec!["-c:v".to_string(), "copy".to_string()]));
	}

	#[test]
	fn test_build_options_cookies_file_resolves_to_absolute() {
		let cli_matches = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a", "--cookies", "cookies.txt"]);
		let options = build_options(&cli_matches).expect("expected options to build");
		match options.cookies {
			CookieSpec::File(path) => assert!(path.is_absolute()),
			other => panic!("expected CookieSpec::File, got {other:?}"),
		}
	}

	#[test]
	fn test_summary_line_reports_cancellation() {
		let line = summary_line(1, 0, true);
		assert!(line.contains("cancelled"));
	}
}
