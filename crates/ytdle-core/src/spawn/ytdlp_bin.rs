//! Module that contains all logic for spawning the `yt-dlp` binary itself
//! (version probing only — the actual download invocation lives in
//! `crate::fetcher::ytdlp`, which needs a `duct` reader rather than a plain
//! `std::process::Output`).

use std::process::{Command, Output, Stdio};
use std::sync::LazyLock;

use regex::Regex;

use super::multiplatform::spawn_command;

#[cfg(target_os = "windows")]
pub const YTDLP_BIN_NAME: &str = "yt-dlp.exe";
#[cfg(not(target_os = "windows"))]
pub const YTDLP_BIN_NAME: &str = "yt-dlp";

#[inline]
pub fn base_ytdlp() -> Command {
	return spawn_command(&YTDLP_BIN_NAME);
}

/// Regex to parse the version out of a `yt-dlp --version` output.
/// cap1: version (date, `YYYY.MM.DD[.rev]`)
static YTDLP_VERSION_REGEX: LazyLock<Regex> = LazyLock::new(|| return Regex::new(r"(?mi)^(\d{4}\.\d{1,2}\.\d{1,2}(?:\.\d+)?)").unwrap());

/// Gets the installed `yt-dlp` version, used to warn when it's older than
/// [`crate::fetcher::ytdlp::MINIMAL_YTDLP_VERSION`].
#[inline]
pub fn ytdlp_version() -> Result<String, crate::Error> {
	let mut cmd = base_ytdlp();
	cmd.arg("--version");

	let command_output: Output = cmd.stderr(Stdio::null()).stdout(Stdio::piped()).stdin(Stdio::null()).spawn()?.wait_with_output()?;

	if !command_output.status.success() {
		return Err(crate::Error::CommandNotSuccesfull("yt-dlp --version did not successfully exit!".to_string()));
	}

	let as_string = String::from_utf8(command_output.stdout)?;

	return ytdlp_parse_version(&as_string);
}

fn ytdlp_parse_version(input: &str) -> Result<String, crate::Error> {
	return Ok(YTDLP_VERSION_REGEX
		.captures_iter(input)
		.next()
		.ok_or_else(|| return crate::Error::other("yt-dlp version could not be determined"))?[1]
		.to_owned());
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_ytdlp_parse_version_invalid_input() {
		assert_eq!(ytdlp_parse_version("hello"), Err(crate::Error::other("yt-dlp version could not be determined")));
	}

	#[test]
	fn test_ytdlp_parse_version_valid_static_input() {
		assert_eq!(ytdlp_parse_version("2024.12.27"), Ok("2024.12.27".to_owned()));
	}

	#[test]
	fn test_ytdlp_parse_version_with_revision_suffix() {
		assert_eq!(ytdlp_parse_version("2024.12.27.1"), Ok("2024.12.27.1".to_owned()));
	}

	#[test]
	#[ignore = "requires a yt-dlp install on PATH"]
	fn test_ytdlp_spawn() {
		assert!(ytdlp_version().is_ok());
	}
}
