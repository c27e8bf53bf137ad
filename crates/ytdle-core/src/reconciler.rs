//! Artifact cleanup, run only on the failure path (never on success — a
//! Reconciler pass over a completed item's own output file would delete it).

use std::path::{Path, PathBuf};

/// Suffix patterns left behind by a Fetcher/Transcoder pair that failed
/// partway through. A `*` stands for "anything", matching only within the
/// same path component (no directory traversal).
const ARTIFACT_SUFFIXES: &[&str] = &[
	".part",
	".ytdl",
	".ytdl.part",
	".tmp",
	".temp",
	"-video.*",
	"-audio.*",
	"*.m4s",
	"*.ts",
	".webp",
	".jpg",
	".png",
	".mp4",
];

/// Matches `name` against a suffix pattern that may contain a single `*`
/// wildcard, standing in for "zero or more non-separator characters".
///
/// All patterns in [`ARTIFACT_SUFFIXES`] are either a literal suffix or a
/// `prefix*suffix` shape, so a hand-rolled matcher covers every case without
/// pulling in a full glob implementation.
fn matches_pattern(name: &str, pattern: &str) -> bool {
	return match pattern.split_once('*') {
		// no wildcard: the remainder after the stem must be exactly this suffix,
		// not merely end with it, or "My Video Part 2.mp4" would match ".mp4"
		None => name == pattern,
		Some((prefix, suffix)) => {
			if !name.starts_with(prefix) {
				return false;
			}
			let rest = &name[prefix.len()..];
			return rest.ends_with(suffix) && rest.len() >= suffix.len();
		}
	};
}

/// Removes leftover partial/temporary artifacts for `stem` inside `dir`.
///
/// `stem` is the item's output filename with its final extension stripped
/// (e.g. `"My Video"` for a target of `"My Video.mp4"`). Returns the paths
/// actually removed, best-effort — a file that vanished between the
/// directory scan and the removal attempt is not an error.
pub fn clean_artifacts(dir: &Path, stem: &str) -> std::io::Result<Vec<PathBuf>> {
	let mut removed = Vec::new();

	let entries = match std::fs::read_dir(dir) {
		Ok(entries) => entries,
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(removed),
		Err(err) => return Err(err),
	};

	for entry in entries {
		let entry = entry?;
		let file_name = entry.file_name();
		let Some(name) = file_name.to_str() else {
			continue;
		};

		if !name.starts_with(stem) {
			continue;
		}
		let candidate_suffix = &name[stem.len()..];

		let is_artifact = ARTIFACT_SUFFIXES.iter().any(|pattern| matches_pattern(candidate_suffix, pattern));
		if !is_artifact {
			continue;
		}

		let path = entry.path();
		if std::fs::remove_file(&path).is_ok() {
			removed.push(path);
		}
	}

	return Ok(removed);
}
