//! One-time import of the legacy flat-file JSON history into the SQLite
//! store. Grounded on the original's `migrate_from_json`: accepts either a
//! raw JSON array of records or an object with a top-level `records` array,
//! preserves each record's original timestamp, and renames the source file
//! to `<name>.json.backup` once every record has been inserted.

use std::path::Path;

use serde::Deserialize;

use super::models::NewHistoryRecord;
use super::store::HistoryStore;

#[derive(Debug, Deserialize)]
struct LegacyRecord {
	url: String,
	title: Option<String>,
	#[serde(default = "default_format")]
	format: String,
	#[serde(default = "default_quality")]
	quality: String,
	/// RFC3339 in the legacy file; falls back to "now" if missing/unparseable
	/// rather than failing the whole migration over one bad row.
	timestamp: Option<String>,
	output_path: Option<String>,
	#[serde(default)]
	success: bool,
	error_message: Option<String>,
	#[serde(default)]
	retry_count: i32,
}

fn default_format() -> String {
	return "unknown".to_string();
}

fn default_quality() -> String {
	return "unknown".to_string();
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LegacyFile {
	Wrapped { records: Vec<LegacyRecord> },
	Raw(Vec<LegacyRecord>),
}

/// Imports `json_path` into `store`, then renames it to `<json_path>.backup`.
/// A missing file is treated as "nothing to migrate", not an error.
pub fn migrate_from_json(store: &HistoryStore, json_path: &Path) -> Result<usize, crate::Error> {
	if !json_path.exists() {
		return Ok(0);
	}

	let contents = std::fs::read_to_string(json_path)?;
	let parsed: LegacyFile = serde_json::from_str(&contents)?;

	let records = match parsed {
		LegacyFile::Wrapped { records } => records,
		LegacyFile::Raw(records) => records,
	};

	let mut imported = 0;
	for legacy in records {
		let timestamp = legacy
			.timestamp
			.as_deref()
			.and_then(|raw| return chrono::DateTime::parse_from_rfc3339(raw).ok())
			.map(|dt| return dt.naive_utc())
			.unwrap_or_else(|| return chrono::Utc::now().naive_utc());

		let record = NewHistoryRecord {
			url: legacy.url,
			title: legacy.title,
			format: legacy.format,
			quality: legacy.quality,
			timestamp,
			output_path: legacy.output_path,
			success: legacy.success,
			error_message: legacy.error_message,
			retry_count: legacy.retry_count,
			metadata: None,
		};

		store.add_record(&record)?;
		imported += 1;
	}

	let backup_path = {
		let mut backup = json_path.as_os_str().to_owned();
		backup.push(".backup");
		std::path::PathBuf::from(backup)
	};
	std::fs::rename(json_path, backup_path)?;

	return Ok(imported);
}
