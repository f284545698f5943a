/*!
 * Log capture for tests
 *
 * Wraps the `env_logger` test logger and keeps every formatted message
 * together with the thread that emitted it. `#[tokio::test]` runs its
 * runtime on the test thread, so a test reads back only its own lines.
 */

use std::sync::{Mutex, Once};
use std::thread::{self, ThreadId};

use log::{LevelFilter, Log, Metadata, Record};

static INIT: Once = Once::new();
static RECORDS: Mutex<Vec<(ThreadId, String)>> = Mutex::new(Vec::new());

struct CapturingLogger {
    inner: env_logger::Logger,
}

impl Log for CapturingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if let Ok(mut records) = RECORDS.lock() {
            records.push((thread::current().id(), record.args().to_string()));
        }
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

/// Install the capturing logger once for the whole test binary
pub fn install() {
    INIT.call_once(|| {
        let inner = env_logger::builder().is_test(true).build();
        if log::set_boxed_logger(Box::new(CapturingLogger { inner })).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Messages logged so far by the calling thread
pub fn lines() -> Vec<String> {
    let current = thread::current().id();
    RECORDS
        .lock()
        .map(|records| {
            records
                .iter()
                .filter(|(id, _)| *id == current)
                .map(|(_, line)| line.clone())
                .collect()
        })
        .unwrap_or_default()
}
