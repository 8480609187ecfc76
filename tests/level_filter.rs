//! Runs in its own binary: it lowers the global `log` max level.

#![cfg(feature = "log")]

use std::sync::Mutex;

use actix_web_middleware_ddlogger::{ResponseSnapshot, classify, rust_log};
use log::{Level, LevelFilter, Log, Metadata, Record};

struct LevelRecorder(Mutex<Vec<Level>>);

impl Log for LevelRecorder {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.0.lock().unwrap().push(record.level());
    }

    fn flush(&self) {}
}

static RECORDER: LevelRecorder = LevelRecorder(Mutex::new(Vec::new()));

#[test]
fn test_records_above_max_level_are_skipped() {
    log::set_logger(&RECORDER).unwrap();
    log::set_max_level(LevelFilter::Warn);

    let location = std::panic::Location::caller();
    for (status, reason) in [(200, "OK"), (404, "Not Found"), (503, "Service Unavailable")] {
        let record = classify(None, &ResponseSnapshot::new(status, reason));
        rust_log::log("http_access", module_path!(), location, &record);
    }

    assert_eq!(*RECORDER.0.lock().unwrap(), vec![Level::Warn, Level::Error]);

    log::set_max_level(LevelFilter::Trace);
    let record = classify(None, &ResponseSnapshot::new(200, "OK"));
    rust_log::log("http_access", module_path!(), location, &record);

    assert_eq!(
        *RECORDER.0.lock().unwrap(),
        vec![Level::Warn, Level::Error, Level::Info]
    );
}
