//! Locating the `ffmpeg` transcoder binary a Fetcher post-processing step
//! hands media off to.
//!
//! Resolution order mirrors the original: a bundled copy shipped next to the
//! running executable, then the current working directory, then `PATH`.

use std::path::PathBuf;
use std::process::Command;

use super::multiplatform::spawn_command;

#[cfg(target_os = "windows")]
const FFMPEG_BIN_NAME: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
const FFMPEG_BIN_NAME: &str = "ffmpeg";

/// Create a Command with basic ffmpeg options.
#[inline]
pub fn base_ffmpeg(overwrite: bool) -> Command {
	let mut cmd = spawn_command(&FFMPEG_BIN_NAME);

	if overwrite {
		cmd.arg("-y"); // always overwrite output path
	}

	// explicitly disable interactive mode
	cmd.arg("-nostdin");

	return cmd;
}

/// Create a Command with basic ffmpeg options, with the banner hidden.
#[inline]
pub fn base_ffmpeg_hidebanner(overwrite: bool) -> Command {
	let mut cmd = base_ffmpeg(overwrite);

	cmd.arg("-hide_banner");

	return cmd;
}

/// Locates the transcoder binary, trying (in order) a copy bundled next to
/// the current executable, the current working directory, then `PATH`.
/// Returns `None` if none of the three locations have a usable binary.
#[must_use]
pub fn locate_transcoder() -> Option<PathBuf> {
	if let Ok(exe) = std::env::current_exe() {
		if let Some(dir) = exe.parent() {
			let candidate = dir.join(FFMPEG_BIN_NAME);
			if is_executable(&candidate) {
				return Some(candidate);
			}
		}
	}

	if let Ok(cwd) = std::env::current_dir() {
		let candidate = cwd.join(FFMPEG_BIN_NAME);
		if is_executable(&candidate) {
			return Some(candidate);
		}
	}

	return which_on_path(FFMPEG_BIN_NAME);
}

fn is_executable(path: &std::path::Path) -> bool {
	return path.is_file();
}

fn which_on_path(binary_name: &str) -> Option<PathBuf> {
	let path_var = std::env::var_os("PATH")?;

	for dir in std::env::split_paths(&path_var) {
		let candidate = dir.join(binary_name);
		if is_executable(&candidate) {
			return Some(candidate);
		}
	}

	return None;
}

/// Helper to consistently build an error for an unsuccessful ffmpeg exit.
pub(crate) fn unsuccessfull_command_exit(status: std::process::ExitStatus) -> crate::Error {
	return crate::Error::CommandNotSuccesfull(format!(
		"ffmpeg did not successfully exit! Exit Code: {}",
		status.code().map_or("None".to_string(), |v| return v.to_string())
	));
}
