#[cfg(feature = "log")]
pub mod rust_log {
    use crate::record::LogRecord;
    use std::panic::Location;

    /// Hands `record` to the global `log` logger, fields attached as key-values.
    pub fn log(target: &str, module_path: &'static str, loc: &'static Location, record: &LogRecord) {
        let level = log::Level::from(record.severity);
        if level > log::max_level() {
            return;
        }

        let mut kvs: Vec<(&str, log::kv::Value)> =
            vec![("http.status_code", log::kv::Value::from(record.status_code))];

        if let Some(duration) = record.duration {
            kvs.push(("duration", log::kv::Value::from(duration)));
        }

        if let Some(error) = &record.error {
            kvs.push(("error.kind", log::kv::Value::from(error.kind)));
            kvs.push(("error.message", log::kv::Value::from(error.message.as_str())));
            if let Some(stack) = &error.stack {
                kvs.push(("error.stack", log::kv::Value::from_serde(stack)));
            }
        }

        let kvs = kvs.as_slice();

        log::logger().log(
            &log::Record::builder()
                .args(format_args!("{}", record.message))
                .level(level)
                .target(target)
                .module_path_static(Some(module_path))
                .file_static(Some(loc.file()))
                .line(Some(loc.line()))
                .key_values(&kvs)
                .build(),
        );
    }
}

#[cfg(all(test, feature = "log"))]
pub(crate) mod capture {
    use std::{cell::RefCell, sync::Once};

    use log::kv::{Error, Key, Value, VisitSource};
    use log::{Level, LevelFilter, Log, Metadata, Record};
    use serde_json::Map;

    /// A record as it reached the logger.
    #[derive(Debug, Clone)]
    pub struct Captured {
        pub level: Level,
        pub target: String,
        pub message: String,
        pub file: Option<String>,
        pub line: Option<u32>,
        pub fields: Map<String, serde_json::Value>,
    }

    thread_local! {
        static RECORDS: RefCell<Vec<Captured>> = const { RefCell::new(Vec::new()) };
    }

    struct CaptureLogger;

    struct Collect<'a>(&'a mut Map<String, serde_json::Value>);

    impl<'kvs> VisitSource<'kvs> for Collect<'_> {
        fn visit_pair(&mut self, key: Key<'kvs>, value: Value<'kvs>) -> Result<(), Error> {
            let value = serde_json::to_value(&value).map_err(Error::boxed)?;
            self.0.insert(key.as_str().to_owned(), value);
            Ok(())
        }
    }

    impl Log for CaptureLogger {
        fn enabled(&self, _: &Metadata) -> bool {
            true
        }

        fn log(&self, record: &Record) {
            let mut fields = Map::new();
            record
                .key_values()
                .visit(&mut Collect(&mut fields))
                .unwrap();

            RECORDS.with(|records| {
                records.borrow_mut().push(Captured {
                    level: record.level(),
                    target: record.target().to_owned(),
                    message: record.args().to_string(),
                    file: record.file().map(str::to_owned),
                    line: record.line(),
                    fields,
                })
            });
        }

        fn flush(&self) {}
    }

    static LOGGER: CaptureLogger = CaptureLogger;
    static INIT: Once = Once::new();

    /// Installs the capturing logger once and clears this thread's records.
    pub fn start() {
        INIT.call_once(|| {
            log::set_logger(&LOGGER).unwrap();
            log::set_max_level(LevelFilter::Trace);
        });
        RECORDS.with(|records| records.borrow_mut().clear());
    }

    /// Every record emitted on this thread since [`start`].
    pub fn records() -> Vec<Captured> {
        RECORDS.with(|records| std::mem::take(&mut *records.borrow_mut()))
    }

    /// Access log records emitted on this thread since [`start`].
    pub fn access_logs() -> Vec<Captured> {
        records()
            .into_iter()
            .filter(|r| r.fields.contains_key("http.status_code"))
            .collect()
    }
}
