//! Diesel models for the `history` and `settings` tables.

use chrono::NaiveDateTime;
use diesel::prelude::*;

use super::schema::{history, settings};

/// A row read back from the `history` table.
#[derive(Debug, Clone, PartialEq, Queryable, Identifiable)]
#[diesel(table_name = history)]
pub struct HistoryRecord {
	pub id: i64,
	pub url: String,
	pub title: Option<String>,
	pub format: String,
	pub quality: String,
	pub timestamp: NaiveDateTime,
	pub output_path: Option<String>,
	pub success: bool,
	pub error_message: Option<String>,
	pub retry_count: i32,
	/// Free-form JSON blob for fields that don't warrant their own column.
	pub metadata: Option<String>,
}

/// A new row to be inserted into `history`.
#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = history)]
pub struct NewHistoryRecord {
	pub url: String,
	pub title: Option<String>,
	pub format: String,
	pub quality: String,
	pub timestamp: NaiveDateTime,
	pub output_path: Option<String>,
	pub success: bool,
	pub error_message: Option<String>,
	pub retry_count: i32,
	pub metadata: Option<String>,
}

impl NewHistoryRecord {
	#[must_use]
	pub fn completed(url: impl Into<String>, title: Option<String>, format: impl Into<String>, quality: impl Into<String>, output_path: impl Into<String>) -> Self {
		return Self {
			url: url.into(),
			title,
			format: format.into(),
			quality: quality.into(),
			timestamp: chrono::Utc::now().naive_utc(),
			output_path: Some(output_path.into()),
			success: true,
			error_message: None,
			retry_count: 0,
			metadata: None,
		};
	}

	#[must_use]
	pub fn failed(url: impl Into<String>, title: Option<String>, format: impl Into<String>, quality: impl Into<String>, error_message: impl Into<String>, retry_count: i32) -> Self {
		return Self {
			url: url.into(),
			title,
			format: format.into(),
			quality: quality.into(),
			timestamp: chrono::Utc::now().naive_utc(),
			output_path: None,
			success: false,
			error_message: Some(error_message.into()),
			retry_count,
			metadata: None,
		};
	}
}

/// A `settings` key/value row.
#[derive(Debug, Clone, PartialEq, Queryable, Insertable)]
#[diesel(table_name = settings)]
pub struct Setting {
	pub key: String,
	pub value: String,
}
