//! The Scheduler: runs a batch of URLs across a bounded pool of worker
//! threads, exposes a cooperative cancel/pause/skip-current control plane,
//! and reports accurate per-batch success/fail counts.
//!
//! Re-expressed with OS threads: blocking calls throughout, no async
//! runtime in the dependency stack.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

use crate::driver::{self, ControlSignal, ItemDriver};
use crate::fetcher::Fetcher;
use crate::history::{HistoryStore, NewHistoryRecord};
use crate::item::{DownloadItem, ItemOutcome};
use crate::network::{NetworkMonitor, NetworkStatus};
use crate::options::{DownloadOptions, FormatKind};

/// Events the Scheduler fans out to every registered [`EventSink`]. Workers
/// invoke these concurrently, so every sink must be `Send + Sync`.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
	ItemStarted { url: String },
	ItemProgress { url: String, percent: u8 },
	/// Human-readable status line for `url` (the driver's composed line, plus
	/// the "Paused" override while the batch is paused). Separate from
	/// `ItemProgress` since a UI typically renders it as a message next to
	/// the bar rather than driving the bar's position.
	Status { url: String, text: String },
	/// A user-facing log line for `url` — the every-10%-crossing progress
	/// line and the "Retrying with fallback format" line — distinct from
	/// the process's own internal `log` crate output.
	Log { url: String, text: String },
	/// Emitted once an item settles into `ItemOutcome::Failed`, carrying the
	/// same message that lands in `ItemFinished`'s `ItemOutcomeSummary`, so a
	/// sink that only cares about failures doesn't have to pattern-match the
	/// outcome out of every `ItemFinished` event.
	Error { url: String, text: String },
	ItemFinished { url: String, outcome: ItemOutcomeSummary },
	AllFinished { success_count: usize, fail_count: usize },
}

/// A lighter, owned summary of [`ItemOutcome`] suitable for cloning across
/// threads in a [`SchedulerEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcomeSummary {
	Finished,
	Failed(String),
	Cancelled,
	Skipped,
}

impl From<&ItemOutcome> for ItemOutcomeSummary {
	fn from(outcome: &ItemOutcome) -> Self {
		return match outcome {
			ItemOutcome::Finished { .. } => Self::Finished,
			ItemOutcome::Failed { error_message } => Self::Failed(error_message.clone()),
			ItemOutcome::Cancelled => Self::Cancelled,
			ItemOutcome::Skipped => Self::Skipped,
		};
	}
}

/// Receives [`SchedulerEvent`]s as a batch runs. Implementations must be
/// cheap and non-blocking — they are called directly on a worker thread.
pub trait EventSink: Send + Sync {
	fn handle(&self, event: SchedulerEvent);
}

/// Shared, thread-safe control state every worker consults between progress
/// callbacks. `skip_current` only affects whichever item a worker happens to
/// be on when it's set — with more than one worker running, "current" is
/// necessarily ambiguous, a tradeoff accepted in the design notes.
struct ControlState {
	cancel: AtomicBool,
	skip_current: AtomicBool,
	paused: AtomicBool,
	pause_lock: Mutex<()>,
	pause_cond: Condvar,
}

impl ControlState {
	fn new() -> Self {
		return Self {
			cancel: AtomicBool::new(false),
			skip_current: AtomicBool::new(false),
			paused: AtomicBool::new(false),
			pause_lock: Mutex::new(()),
			pause_cond: Condvar::new(),
		};
	}

	fn poll(&self) -> ControlSignal {
		if self.cancel.load(Ordering::SeqCst) {
			return ControlSignal::Cancel;
		}

		if self.paused.load(Ordering::SeqCst) {
			let guard = self.pause_lock.lock().expect("pause lock poisoned");
			let _unused = self.pause_cond.wait_while(guard, |_| return self.paused.load(Ordering::SeqCst) && !self.cancel.load(Ordering::SeqCst));

			if self.cancel.load(Ordering::SeqCst) {
				return ControlSignal::Cancel;
			}
		}

		// skip_current is consumed (cleared) by whichever worker observes it
		// first, since it's meant to affect exactly one in-flight item
		if self.skip_current.swap(false, Ordering::SeqCst) {
			return ControlSignal::SkipCurrent;
		}

		return ControlSignal::Continue;
	}

	fn resume_all(&self) {
		self.paused.store(false, Ordering::SeqCst);
		self.pause_cond.notify_all();
	}
}

/// Runs a batch of URLs to completion.
pub struct Scheduler {
	options: Arc<DownloadOptions>,
	fetcher: Arc<dyn Fetcher>,
	history: Option<HistoryStore>,
	sinks: Vec<Arc<dyn EventSink>>,
	control: Arc<ControlState>,
	success_count: Arc<AtomicUsize>,
	fail_count: Arc<AtomicUsize>,
	network: Mutex<NetworkMonitor>,
}

impl Scheduler {
	#[must_use]
	pub fn new(options: DownloadOptions, fetcher: Arc<dyn Fetcher>) -> Self {
		return Self {
			options: Arc::new(options),
			fetcher,
			history: None,
			sinks: Vec::new(),
			control: Arc::new(ControlState::new()),
			success_count: Arc::new(AtomicUsize::new(0)),
			fail_count: Arc::new(AtomicUsize::new(0)),
			network: Mutex::new(NetworkMonitor::new()),
		};
	}

	/// Records every item's outcome to `history` as it finalizes. Without a
	/// store attached, the Scheduler still runs the batch and reports
	/// accurate counts — only the durable record is skipped, used by tests
	/// that don't care about persistence.
	#[must_use]
	pub fn with_history(mut self, history: HistoryStore) -> Self {
		self.history = Some(history);
		return self;
	}

	pub fn add_sink(&mut self, sink: Arc<dyn EventSink>) {
		self.sinks.push(sink);
	}

	pub fn cancel(&self) {
		self.control.cancel.store(true, Ordering::SeqCst);
		self.control.resume_all();
	}

	pub fn pause(&self) {
		self.control.paused.store(true, Ordering::SeqCst);
	}

	pub fn resume(&self) {
		self.control.resume_all();
	}

	pub fn is_paused(&self) -> bool {
		return self.control.paused.load(Ordering::SeqCst);
	}

	pub fn skip_current(&self) {
		self.control.skip_current.store(true, Ordering::SeqCst);
	}

	/// Re-probes reachability and updates the cached status, safe to call
	/// from any concurrent context — e.g. a UI's own "check connection"
	/// action while a batch is running.
	pub fn check_network(&self) -> NetworkStatus {
		return self.network.lock().expect("network monitor mutex poisoned").check();
	}

	/// Returns the last-observed [`NetworkStatus`] without re-probing.
	#[must_use]
	pub fn network_status(&self) -> NetworkStatus {
		return self.network.lock().expect("network monitor mutex poisoned").status();
	}

	fn emit(&self, event: SchedulerEvent) {
		for sink in &self.sinks {
			sink.handle(event.clone());
		}
	}

	/// Runs every URL in `urls` to completion (or until cancelled), using up
	/// to `options.max_concurrent_downloads` worker threads. Returns
	/// `(success_count, fail_count)`, counted accurately regardless of
	/// whether an item finished, failed, was cancelled, or was skipped — only
	/// a clean `Finished` counts as a success, everything else counts as a
	/// fail.
	pub fn run(&self, urls: Vec<String>) -> (usize, usize) {
		let queue = Arc::new(Mutex::new(VecDeque::from(urls)));
		let worker_count = self.options.max_concurrent_downloads.max(1).min(queue.lock().expect("queue lock poisoned").len().max(1));

		std::thread::scope(|scope| {
			for _ in 0..worker_count {
				scope.spawn(|| self.worker_loop(&queue));
			}
		});

		let success_count = self.success_count.load(Ordering::SeqCst);
		let fail_count = self.fail_count.load(Ordering::SeqCst);
		self.emit(SchedulerEvent::AllFinished { success_count, fail_count });

		return (success_count, fail_count);
	}

	fn worker_loop(&self, queue: &Mutex<VecDeque<String>>) {
		loop {
			if self.control.cancel.load(Ordering::SeqCst) {
				return;
			}

			let url = {
				let mut guard = queue.lock().expect("queue lock poisoned");
				guard.pop_front()
			};

			let Some(url) = url else {
				return;
			};

			self.run_one(url);
		}
	}

	fn run_one(&self, url: String) {
		self.emit(SchedulerEvent::ItemStarted { url: url.clone() });

		let format = self.options.format;
		let mut item = DownloadItem::new(url.clone(), format);
		let driver = ItemDriver::new(self.fetcher.as_ref(), &self.options);

		let control = Arc::clone(&self.control);
		let outcome = driver.run(
			&mut item,
			|| {
				// Reported here rather than from `ControlState::poll` itself so
				// the "Paused" override only ever reaches sinks through the same
				// per-URL event channel as every other status line.
				if control.paused.load(Ordering::SeqCst) {
					self.emit(SchedulerEvent::Status { url: url.clone(), text: "Paused".to_string() });
				}
				return control.poll();
			},
			|item| {
				self.emit(SchedulerEvent::ItemProgress { url: url.clone(), percent: item.percent });
				self.emit(SchedulerEvent::Status { url: url.clone(), text: driver::compose_status(item) });
			},
			|_item, text| {
				self.emit(SchedulerEvent::Log { url: url.clone(), text });
			},
		);

		match &outcome {
			ItemOutcome::Finished { .. } => {
				self.success_count.fetch_add(1, Ordering::SeqCst);
			},
			ItemOutcome::Failed { error_message } => {
				self.fail_count.fetch_add(1, Ordering::SeqCst);
				self.emit(SchedulerEvent::Error { url: url.clone(), text: error_message.clone() });
			},
			// a cancelled or skipped item still counts toward the batch's
			// fail tally, even though its
			// ItemOutcomeSummary carries a distinct reason from a classified
			// Fetcher error.
			ItemOutcome::Cancelled | ItemOutcome::Skipped => {
				self.fail_count.fetch_add(1, Ordering::SeqCst);
			},
		}

		self.record_history(&item, &outcome);
		self.emit(SchedulerEvent::ItemFinished { url, outcome: ItemOutcomeSummary::from(&outcome) });
	}

	/// Appends one [`NewHistoryRecord`] per finalize — exactly one history
	/// record per item, never zero, never two. A
	/// write failure is logged, not propagated — a history write must never
	/// abort an otherwise-successful batch.
	fn record_history(&self, item: &DownloadItem, outcome: &ItemOutcome) {
		let Some(history) = &self.history else {
			return;
		};

		let format_label = match item.format {
			FormatKind::Video => "video",
			FormatKind::Audio => "audio",
		};

		let record = match outcome {
			ItemOutcome::Finished { output_path } => NewHistoryRecord::completed(&item.url, item.title.clone(), format_label, &self.options.quality, output_path.to_string_lossy()),
			ItemOutcome::Failed { error_message } => NewHistoryRecord::failed(&item.url, item.title.clone(), format_label, &self.options.quality, error_message, item.retry_count as i32),
			ItemOutcome::Cancelled => NewHistoryRecord::failed(&item.url, item.title.clone(), format_label, &self.options.quality, "Cancelled", item.retry_count as i32),
			ItemOutcome::Skipped => NewHistoryRecord::failed(&item.url, item.title.clone(), format_label, &self.options.quality, "Skipped", item.retry_count as i32),
		};

		if let Err(err) = history.add_record(&record) {
			warn!("failed to record history for \"{}\": {err}", item.url);
		}
	}
}

#[cfg(test)]
pub(crate) mod test_utils {
	use std::sync::Mutex;

	use super::*;

	/// Collects every event emitted, for ordering assertions.
	pub struct RecordingSink {
		pub events: Mutex<Vec<SchedulerEvent>>,
	}

	impl RecordingSink {
		pub fn new() -> Arc<Self> {
			return Arc::new(Self { events: Mutex::new(Vec::new()) });
		}
	}

	impl EventSink for RecordingSink {
		fn handle(&self, event: SchedulerEvent) {
			self.events.lock().unwrap().push(event);
		}
	}
}

#[cfg(test)]
mod test {
	use super::test_utils::RecordingSink;
	use super::*;
	use crate::fetcher::test_utils::{FakeFetcher, simple_script};

	fn options_with_concurrency(n: usize) -> DownloadOptions {
		return DownloadOptions { max_concurrent_downloads: n, format: FormatKind::Video, ..Default::default() };
	}

	#[test]
	fn test_run_counts_all_successes() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(2), fetcher);

		let urls = vec!["https://example.com/1".to_string(), "https://example.com/2".to_string(), "https://example.com/3".to_string()];

		let (success, fail) = scheduler.run(urls);

		assert_eq!(success, 3);
		assert_eq!(fail, 0);
	}

	#[test]
	fn test_run_counts_all_failures() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::failing("Private video. Sign in if you've been granted access"));
		let scheduler = Scheduler::new(options_with_concurrency(2), fetcher);

		let urls = vec!["https://example.com/1".to_string(), "https://example.com/2".to_string()];

		let (success, fail) = scheduler.run(urls);

		assert_eq!(success, 0);
		assert_eq!(fail, 2);
	}

	#[test]
	fn test_all_finished_event_reports_accurate_counts() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let mut scheduler = Scheduler::new(options_with_concurrency(1), fetcher);
		let sink = RecordingSink::new();
		scheduler.add_sink(sink.clone());

		scheduler.run(vec!["https://example.com/1".to_string()]);

		let events = sink.events.lock().unwrap();
		let last = events.last().expect("at least one event");
		assert!(matches!(last, SchedulerEvent::AllFinished { success_count: 1, fail_count: 0 }));
	}

	#[test]
	fn test_cancelled_item_counts_as_failed() {
		// a cancelled item still counts toward failCount
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::cancelling());
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher);

		let (success, fail) = scheduler.run(vec!["https://example.com/1".to_string()]);

		assert_eq!(success, 0);
		assert_eq!(fail, 1);
	}

	#[test]
	fn test_skipped_item_counts_as_failed_but_batch_continues() {
		// skipCurrent finalizes only the current item as failed; the rest of
		// the batch still runs
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::skipping());
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher);

		let (success, fail) = scheduler.run(vec!["https://example.com/1".to_string(), "https://example.com/2".to_string()]);

		assert_eq!(success, 0);
		assert_eq!(fail, 2);
	}

	#[test]
	fn test_cancel_before_run_processes_nothing() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher);
		scheduler.cancel();

		let (success, fail) = scheduler.run(vec!["https://example.com/1".to_string(), "https://example.com/2".to_string()]);

		assert_eq!(success, 0);
		assert_eq!(fail, 0);
	}

	#[test]
	fn test_network_status_defaults_online_before_any_check() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher);

		assert_eq!(scheduler.network_status(), crate::network::NetworkStatus::Online);
	}

	#[test]
	fn test_check_network_updates_cached_status() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher);

		let status = scheduler.check_network();
		assert_eq!(scheduler.network_status(), status);
	}

	/// A [`Fetcher`] that records the peak number of simultaneous `download`
	/// calls, used to verify the worker pool never exceeds its configured
	/// size.
	struct ConcurrencyTrackingFetcher {
		current: AtomicUsize,
		peak: AtomicUsize,
	}

	impl ConcurrencyTrackingFetcher {
		fn new() -> Self {
			return Self { current: AtomicUsize::new(0), peak: AtomicUsize::new(0) };
		}
	}

	impl Fetcher for ConcurrencyTrackingFetcher {
		fn probe(&self, _url: &str) -> Result<crate::fetcher::MediaInfo, crate::Error> {
			return Ok(crate::fetcher::MediaInfo { id: "id".to_string(), title: "title".to_string(), extractor: "fake".to_string(), playlist_count: None });
		}

		fn download(&self, _url: &str, _options: &crate::fetcher::FetcherOptions, _on_progress: &mut dyn FnMut(crate::fetcher::ProgressEvent) -> Result<(), crate::Error>) -> Result<std::path::PathBuf, crate::Error> {
			let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
			self.peak.fetch_max(now, Ordering::SeqCst);
			std::thread::sleep(std::time::Duration::from_millis(20));
			self.current.fetch_sub(1, Ordering::SeqCst);
			return Ok(std::path::PathBuf::from("/tmp/out.mp4"));
		}
	}

	#[test]
	fn test_worker_pool_never_exceeds_max_concurrent_downloads() {
		let fetcher = Arc::new(ConcurrencyTrackingFetcher::new());
		let scheduler = Scheduler::new(options_with_concurrency(4), fetcher.clone() as Arc<dyn Fetcher>);

		let urls = (0..20).map(|n| return format!("https://example.com/{n}")).collect();
		let (success, fail) = scheduler.run(urls);

		assert_eq!(success, 20);
		assert_eq!(fail, 0);
		assert!(fetcher.peak.load(Ordering::SeqCst) <= 4, "peak concurrency {} exceeded the configured limit of 4", fetcher.peak.load(Ordering::SeqCst));
	}

	#[test]
	fn test_empty_batch_reports_zero_counts() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(3), fetcher);

		let (success, fail) = scheduler.run(Vec::new());

		assert_eq!(success, 0);
		assert_eq!(fail, 0);
	}

	#[test]
	fn test_with_history_records_exactly_one_row_per_item() {
		use crate::history::store::test_utils::temp_store;

		let (history, _dir) = temp_store();
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher).with_history(history.clone());

		scheduler.run(vec!["https://example.com/1".to_string()]);

		let all = history.get_all(None).unwrap();
		assert_eq!(all.len(), 1);
		assert!(all[0].success);
		assert_eq!(all[0].output_path.as_deref(), Some("/tmp/out.mp4"));
	}

	#[test]
	fn test_failed_item_emits_error_event_with_message() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::failing("Private video. Sign in if you've been granted access"));
		let mut scheduler = Scheduler::new(options_with_concurrency(1), fetcher);
		let sink = RecordingSink::new();
		scheduler.add_sink(sink.clone());

		scheduler.run(vec!["https://example.com/1".to_string()]);

		let events = sink.events.lock().unwrap();
		let error_event = events.iter().find(|event| return matches!(event, SchedulerEvent::Error { .. })).expect("expected an Error event");
		match error_event {
			SchedulerEvent::Error { text, .. } => assert!(text.contains("Sign in")),
			_ => unreachable!(),
		}
	}

	#[test]
	fn test_successful_item_emits_status_events() {
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::new(simple_script(1000), "/tmp/out.mp4"));
		let mut scheduler = Scheduler::new(options_with_concurrency(1), fetcher);
		let sink = RecordingSink::new();
		scheduler.add_sink(sink.clone());

		scheduler.run(vec!["https://example.com/1".to_string()]);

		let events = sink.events.lock().unwrap();
		assert!(events.iter().any(|event| return matches!(event, SchedulerEvent::Status { .. })));
		assert!(events.iter().any(|event| return matches!(event, SchedulerEvent::Log { .. })));
	}

	#[test]
	fn test_with_history_records_failed_item_with_error_message() {
		use crate::history::store::test_utils::temp_store;

		let (history, _dir) = temp_store();
		let fetcher: Arc<dyn Fetcher> = Arc::new(FakeFetcher::failing("Private video. Sign in if you've been granted access"));
		let scheduler = Scheduler::new(options_with_concurrency(1), fetcher).with_history(history.clone());

		scheduler.run(vec!["https://example.com/1".to_string()]);

		let failed = history.get_failed(None).unwrap();
		assert_eq!(failed.len(), 1);
		assert!(failed[0].error_message.as_deref().unwrap().contains("Sign in"));
	}
}
