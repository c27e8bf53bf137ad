//! Utils for the `ytdle` binary

use std::io::Error as ioError;
use std::path::PathBuf;

use ytdle_core::spawn::transcoder::locate_transcoder;
use ytdle_core::spawn::ytdlp_bin::ytdlp_version;

/// Test if `yt-dlp` is installed and reachable.
pub fn require_ytdlp_installed() -> Result<(), ioError> {
	if let Err(err) = ytdlp_version() {
		log::error!("Could not start or find yt-dlp! Error: {err}");

		return Err(ioError::new(std::io::ErrorKind::NotFound, "yt-dlp version could not be determined, is it installed and reachable?"));
	}

	return Ok(());
}

/// Test if a transcoder (ffmpeg) is reachable in any of the locations the
/// Fetcher Adapter resolves against (bundled, cwd, `PATH`).
pub fn require_transcoder_installed() -> Result<(), ioError> {
	if locate_transcoder().is_none() {
		return Err(ioError::new(std::io::ErrorKind::NotFound, "ffmpeg could not be located (checked bundled, cwd, and PATH)"));
	}

	return Ok(());
}

/// Default history database path, `~/.ytdle/ytdle.db`, used when `--history-db`
/// is not given.
#[must_use]
pub fn default_history_db_path() -> PathBuf {
	return default_ytdle_dir().join("ytdle.db");
}

/// Default legacy JSON history path, `~/.ytdle/history.json`, migrated once
/// into the database and then renamed to `history.json.backup`.
#[must_use]
pub fn default_legacy_history_path() -> PathBuf {
	return default_ytdle_dir().join("history.json");
}

fn default_ytdle_dir() -> PathBuf {
	return dirs::home_dir().unwrap_or_else(|| return PathBuf::from(".")).join(".ytdle");
}
