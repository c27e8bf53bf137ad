//! Module for Clap related structs (derived)

#![deny(missing_docs)] // comments are used for "--help" generation, so it should always be defined

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Target media kind requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
	Mp3,
	Mp4,
}

impl FormatArg {
	#[must_use]
	pub fn to_format_kind(self) -> ytdle_core::options::FormatKind {
		return match self {
			Self::Mp3 => ytdle_core::options::FormatKind::Audio,
			Self::Mp4 => ytdle_core::options::FormatKind::Video,
		};
	}

	/// Quality default applied when `-q` is not given: `192k` for audio, `Best` for video.
	#[must_use]
	pub fn default_quality(self) -> &'static str {
		return match self {
			Self::Mp3 => "192k",
			Self::Mp4 => "Best",
		};
	}
}

#[derive(Debug, Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(bin_name("ytdle"))]
pub struct CliDerive {
	/// Input URL(s) to download, at least one is required
	#[clap(short = 'i', long = "input", required_unless_present = "completions", num_args = 1..)]
	pub input: Vec<String>,

	/// Output directory to download into (default: current working directory)
	#[clap(short = 'o', long = "output-directory", alias = "od", env = "YTDLE_OUT")]
	pub output_directory: Option<PathBuf>,

	/// Requested format kind
	#[clap(short = 'f', long = "format", value_enum, default_value_t = FormatArg::Mp3)]
	pub format: FormatArg,

	/// Quality token: a bitrate like "192k" for mp3, or a height cap like "1080p" / "Best" for mp4
	#[clap(short = 'q', long = "quality")]
	pub quality: Option<String>,

	/// Include the rest of a playlist, not just the single entry a URL points at
	#[clap(short = 'p', long = "playlist")]
	pub playlist: bool,

	/// Restrict output filenames to ASCII
	#[clap(short = 'r', long = "restrict-filenames")]
	pub restrict_filenames: bool,

	/// Output filename template (yt-dlp placeholder syntax)
	#[clap(short = 't', long = "template", default_value = "%(title).150s")]
	pub template: String,

	/// Disable TLS certificate verification
	#[clap(long)]
	pub no_check_certificate: bool,

	/// Cookie file to pass to the Fetcher, Netscape format
	#[clap(long, env = "YTDLE_COOKIES")]
	pub cookies: Option<PathBuf>,

	/// Extra ffmpeg arguments, appended after the built-in ones
	#[clap(long)]
	pub ffmpeg_add_args: Option<String>,

	/// ffmpeg arguments that replace the built-in ones entirely
	#[clap(long)]
	pub ffmpeg_override_args: Option<String>,

	/// Verbosity: repeat for more (-v info, -vv debug, -vvv trace)
	#[clap(short = 'v', action = clap::ArgAction::Count)]
	pub verbosity: u8,

	/// Override the history database path (default: `~/.ytdle/ytdle.db`)
	#[clap(long, env = "YTDLE_HISTORY_DB")]
	pub history_db: Option<PathBuf>,

	/// If any item fails, write a retry-ready failure list to this path
	#[clap(long)]
	pub export_failed: Option<PathBuf>,

	/// Print shell completions for the given shell and exit
	#[clap(long, value_enum)]
	pub completions: Option<clap_complete::Shell>,
}

#[cfg(test)]
mod test {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn test_cli_derive_satisfies_clap_invariants() {
		CliDerive::command().debug_assert();
	}

	#[test]
	fn test_format_arg_default_quality() {
		assert_eq!(FormatArg::Mp3.default_quality(), "192k");
		assert_eq!(FormatArg::Mp4.default_quality(), "Best");
	}

	#[test]
	fn test_parses_minimal_required_args() {
		let parsed = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a"]);
		assert_eq!(parsed.input, vec!["https://example.com/a".to_string()]);
		assert_eq!(parsed.format, FormatArg::Mp3);
	}

	#[test]
	fn test_parses_multiple_inputs() {
		let parsed = CliDerive::parse_from(["ytdle", "-i", "https://example.com/a", "https://example.com/b"]);
		assert_eq!(parsed.input.len(), 2);
	}

	#[test]
	fn test_completions_alone_does_not_require_input() {
		let parsed = CliDerive::parse_from(["ytdle", "--completions", "bash"]);
		assert!(parsed.input.is_empty());
	}
}
