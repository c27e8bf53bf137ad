//! The [`HistoryStore`], the only way the rest of the crate touches the
//! history database. Connection access is serialized behind a [`Mutex`]
//! rather than pooled with `r2d2`, since a batch only ever has one writer
//! at a time and the Scheduler already bounds concurrency on the Fetcher
//! side, not the database side.

use std::path::Path;
use std::sync::{Arc, Mutex};

use diesel::prelude::*;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};

use super::models::{HistoryRecord, NewHistoryRecord, Setting};
use super::schema::{history, settings};

/// All migrations from `ytdle-core/migrations` embedded into the binary.
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!();

/// Aggregate counters returned by [`HistoryStore::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
	pub total: i64,
	pub completed: i64,
	pub failed: i64,
}

impl HistoryStats {
	/// Completed fraction of `total`, or `0.0` when there's no history yet.
	#[must_use]
	pub fn success_rate(&self) -> f64 {
		if self.total == 0 {
			return 0.0;
		}
		return self.completed as f64 / self.total as f64;
	}
}

/// Fields a caller is allowed to patch via [`HistoryStore::update_by_url`].
/// Mirrors the original's allow-list so a caller can never blindly overwrite
/// the primary key or timestamp.
#[derive(Debug, Clone, Default)]
pub struct HistoryUpdate {
	pub title: Option<Option<String>>,
	pub output_path: Option<Option<String>>,
	pub success: Option<bool>,
	pub error_message: Option<Option<String>>,
	pub retry_count: Option<i32>,
}

/// Opens (creating if needed) a SQLite database at `path`, enables WAL mode,
/// and applies all pending migrations.
pub fn connect(path: impl AsRef<Path>) -> Result<SqliteConnection, crate::Error> {
	let path = path.as_ref();
	let path_str = path.to_str().ok_or_else(|| {
		return crate::Error::other(format!(
			"SQLite only accepts UTF-8 paths, and this path could not be converted losslessly: \"{}\"",
			path.to_string_lossy()
		));
	})?;

	let mut connection = SqliteConnection::establish(path_str)?;

	diesel::sql_query("PRAGMA journal_mode = WAL").execute(&mut connection)?;
	diesel::sql_query("PRAGMA synchronous = NORMAL").execute(&mut connection)?;

	let applied = connection
		.run_pending_migrations(MIGRATIONS)
		.map_err(|err| return crate::Error::SQLMigrationError(err.to_string()))?;
	debug!("Applied history migrations: {:?}", applied);

	return Ok(connection);
}

/// The durable history store. Cheap to clone (just bumps the `Arc`
/// refcount); every clone shares the same underlying connection.
#[derive(Clone)]
pub struct HistoryStore {
	connection: Arc<Mutex<SqliteConnection>>,
}

impl HistoryStore {
	pub fn open(path: impl AsRef<Path>) -> Result<Self, crate::Error> {
		return Ok(Self {
			connection: Arc::new(Mutex::new(connect(path)?)),
		});
	}

	fn lock(&self) -> std::sync::MutexGuard<'_, SqliteConnection> {
		return self.connection.lock().expect("history database connection mutex was poisoned");
	}

	pub fn add_record(&self, record: &NewHistoryRecord) -> Result<(), crate::Error> {
		diesel::insert_into(history::table).values(record).execute(&mut *self.lock())?;
		return Ok(());
	}

	pub fn get_all(&self, limit: Option<i64>) -> Result<Vec<HistoryRecord>, crate::Error> {
		let mut query = history::table.order(history::timestamp.desc()).into_boxed();
		if let Some(limit) = limit {
			query = query.limit(limit);
		}
		return Ok(query.load(&mut *self.lock())?);
	}

	pub fn get_completed(&self, limit: Option<i64>) -> Result<Vec<HistoryRecord>, crate::Error> {
		let mut query = history::table.filter(history::success.eq(true)).order(history::timestamp.desc()).into_boxed();
		if let Some(limit) = limit {
			query = query.limit(limit);
		}
		return Ok(query.load(&mut *self.lock())?);
	}

	pub fn get_failed(&self, limit: Option<i64>) -> Result<Vec<HistoryRecord>, crate::Error> {
		let mut query = history::table.filter(history::success.eq(false)).order(history::timestamp.desc()).into_boxed();
		if let Some(limit) = limit {
			query = query.limit(limit);
		}
		return Ok(query.load(&mut *self.lock())?);
	}

	/// Patches the most recent row matching `url` with the fields set in
	/// `update`. Returns the number of rows affected (0 or 1).
	pub fn update_by_url(&self, url: &str, update: &HistoryUpdate) -> Result<usize, crate::Error> {
		let mut conn = self.lock();

		let target_id: Option<i64> = history::table
			.filter(history::url.eq(url))
			.order(history::timestamp.desc())
			.select(history::id)
			.first(&mut *conn)
			.optional()?;

		let Some(target_id) = target_id else {
			return Ok(0);
		};

		let mut changed = 0;
		if let Some(title) = &update.title {
			changed += diesel::update(history::table.filter(history::id.eq(target_id))).set(history::title.eq(title)).execute(&mut *conn)?;
		}
		if let Some(output_path) = &update.output_path {
			changed += diesel::update(history::table.filter(history::id.eq(target_id)))
				.set(history::output_path.eq(output_path))
				.execute(&mut *conn)?;
		}
		if let Some(success) = update.success {
			changed += diesel::update(history::table.filter(history::id.eq(target_id))).set(history::success.eq(success)).execute(&mut *conn)?;
		}
		if let Some(error_message) = &update.error_message {
			changed += diesel::update(history::table.filter(history::id.eq(target_id)))
				.set(history::error_message.eq(error_message))
				.execute(&mut *conn)?;
		}
		if let Some(retry_count) = update.retry_count {
			changed += diesel::update(history::table.filter(history::id.eq(target_id)))
				.set(history::retry_count.eq(retry_count))
				.execute(&mut *conn)?;
		}

		return Ok(changed.min(1));
	}

	pub fn delete_record(&self, id: i64) -> Result<usize, crate::Error> {
		return Ok(diesel::delete(history::table.filter(history::id.eq(id))).execute(&mut *self.lock())?);
	}

	pub fn clear_all(&self) -> Result<usize, crate::Error> {
		return Ok(diesel::delete(history::table).execute(&mut *self.lock())?);
	}

	pub fn clear_completed(&self) -> Result<usize, crate::Error> {
		return Ok(diesel::delete(history::table.filter(history::success.eq(true))).execute(&mut *self.lock())?);
	}

	pub fn clear_failed(&self) -> Result<usize, crate::Error> {
		return Ok(diesel::delete(history::table.filter(history::success.eq(false))).execute(&mut *self.lock())?);
	}

	/// Case-insensitive substring search over `url` and `title` (SQLite's
	/// `LIKE` is case-insensitive for ASCII by default, so no `LOWER()`
	/// wrapper is needed).
	pub fn search(&self, term: &str, limit: Option<i64>) -> Result<Vec<HistoryRecord>, crate::Error> {
		let pattern = format!("%{term}%");
		let mut query = history::table
			.filter(history::url.like(&pattern).or(history::title.like(&pattern)))
			.order(history::timestamp.desc())
			.into_boxed();
		if let Some(limit) = limit {
			query = query.limit(limit);
		}
		return Ok(query.load(&mut *self.lock())?);
	}

	pub fn stats(&self) -> Result<HistoryStats, crate::Error> {
		let mut conn = self.lock();
		let total: i64 = history::table.count().get_result(&mut *conn)?;
		let completed: i64 = history::table.filter(history::success.eq(true)).count().get_result(&mut *conn)?;
		let failed: i64 = history::table.filter(history::success.eq(false)).count().get_result(&mut *conn)?;

		return Ok(HistoryStats { total, completed, failed });
	}

	/// Bare list of failed URLs, with no accompanying metadata. Useful for
	/// callers that just want a retry list in memory.
	pub fn export_failed_urls(&self) -> Result<Vec<String>, crate::Error> {
		return Ok(self.get_failed(None)?.into_iter().map(|r| return r.url).collect());
	}

	/// Writes every failed record to `path` as UTF-8 text, one block per
	/// item:
	///
	/// ```text
	/// # Failed: {errorMessage}
	/// # Retry count: {n}
	/// # Date: {iso8601}
	/// {url}
	///
	/// ```
	///
	/// The file this produces is itself a valid `-i` input list for a retry
	/// run, since every non-`#`-prefixed, non-blank line is a bare URL.
	pub fn export_failed_urls_to(&self, path: impl AsRef<Path>) -> Result<usize, crate::Error> {
		let failed = self.get_failed(None)?;

		let mut out = String::new();
		for record in &failed {
			let error_message = record.error_message.as_deref().unwrap_or("Unknown error");
			let timestamp = record.timestamp.and_utc().to_rfc3339();
			out.push_str(&format!("# Failed: {error_message}\n# Retry count: {}\n# Date: {timestamp}\n{}\n\n", record.retry_count, record.url));
		}

		std::fs::write(path, out)?;
		return Ok(failed.len());
	}

	pub fn get_setting(&self, key: &str) -> Result<Option<String>, crate::Error> {
		return Ok(settings::table.filter(settings::key.eq(key)).select(settings::value).first(&mut *self.lock()).optional()?);
	}

	pub fn set_setting(&self, key: &str, value: &str) -> Result<(), crate::Error> {
		let row = Setting { key: key.to_string(), value: value.to_string() };
		diesel::insert_into(settings::table)
			.values(&row)
			.on_conflict(settings::key)
			.do_update()
			.set(settings::value.eq(value))
			.execute(&mut *self.lock())?;
		return Ok(());
	}
}
