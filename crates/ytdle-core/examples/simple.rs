//! Minimal standalone usage of the Scheduler, without a CLI wrapped around
//! it: build options, attach a plain print-based event sink, run a batch.

use std::sync::Arc;

use ytdle_core::fetcher::YtdlpFetcher;
use ytdle_core::options::DownloadOptions;
use ytdle_core::scheduler::{EventSink, Scheduler, SchedulerEvent};

struct PrintSink;

impl EventSink for PrintSink {
	fn handle(&self, event: SchedulerEvent) {
		match event {
			SchedulerEvent::ItemStarted { url } => println!("started: {url}"),
			SchedulerEvent::ItemProgress { url, percent } => println!("{url}: {percent}%"),
			SchedulerEvent::Status { url, text } => println!("{url}: {text}"),
			SchedulerEvent::Log { url, text } => println!("{url}: {text}"),
			SchedulerEvent::Error { url, text } => println!("{url}: error: {text}"),
			SchedulerEvent::ItemFinished { url, outcome } => println!("finished: {url} ({outcome:?})"),
			SchedulerEvent::AllFinished { success_count, fail_count } => println!("done: {success_count} succeeded, {fail_count} failed"),
		}
	}
}

fn main() {
	let options = DownloadOptions { directory: "/tmp/download".into(), ..Default::default() };

	let fetcher: Arc<dyn ytdle_core::fetcher::Fetcher> = Arc::new(YtdlpFetcher::new());
	let mut scheduler = Scheduler::new(options, fetcher);
	scheduler.add_sink(Arc::new(PrintSink));

	let urls: Vec<String> = std::env::args().skip(1).collect();
	assert!(!urls.is_empty(), "expected at least one URL as an argument");

	let (success, fail) = scheduler.run(urls);

	println!("batch complete: {success} succeeded, {fail} failed");
}
