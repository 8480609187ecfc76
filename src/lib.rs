//! Actix-web middleware that writes one structured log record per request,
//! using Datadog's standard attribute names.
//!
//! Every finished request produces a record with the message
//! `HTTP <status> <reason>` at a level picked from the status code:
//!
//! | Status      | Level   | Fields                                                        |
//! |-------------|---------|---------------------------------------------------------------|
//! | `400..=499` | `warn`  | `http.status_code`, `error.kind`, `error.message`, `error.stack` |
//! | `500..=599` | `error` | `http.status_code`, `error.kind`, `error.message`              |
//! | other       | `info`  | `http.status_code`                                            |
//!
//! `duration` (nanoseconds) is added whenever the request carries a
//! [`RequestStartTime`]. `error.stack` is only added when the handler attached
//! an [`ErrorPayload`] holding a JSON object or array.
//!
//! # Examples:
//! ## Records go through the standard `log` crate.
//! ```bash
//! cargo add actix-web-middleware-ddlogger
//! ```
//! Example usage with `structured_logger` as the `log` backend:
//! ```rust,no_run
//! use actix_web::{web, App, HttpServer};
//! use actix_web_middleware_ddlogger::RequestLogger;
//! use structured_logger::{Builder, async_json::new_writer};
//!
//! #[actix_web::main] // or #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     Builder::new()
//!         .with_target_writer("*", new_writer(tokio::io::stdout()))
//!         .init();
//!
//!     HttpServer::new(|| {
//!         App::new()
//!             .wrap(RequestLogger::default().stamp_request_start())
//!             .route("/", web::get().to(|| async { "Hello world!" }))
//!     })
//!     .bind("127.0.0.1:8080")?
//!     .run()
//!     .await
//! }
//! ```
//! ## Attaching error details and timing markers from a handler
//! ```rust
//! use actix_web::HttpResponse;
//! use actix_web_middleware_ddlogger::{ErrorPayload, ResponseStartTime};
//! use serde_json::json;
//!
//! async fn lookup() -> HttpResponse {
//!     let mut res = HttpResponse::NotFound().finish();
//!     res.extensions_mut().insert(ResponseStartTime::now());
//!     res.extensions_mut()
//!         .insert(ErrorPayload(json!({"detail": "no such id"})));
//!     res
//! }
//! ```
//!
//! # Duration
//!
//! `duration` is `(response start - request start) * 1e9`. When the response
//! has no [`ResponseStartTime`], the time of logging stands in for it, so the
//! value then also includes whatever ran between the handler and the logger.
//!
//! # Configuration
//!
//! ```rust
//! use actix_web_middleware_ddlogger::RequestLogger;
//!
//! let logger = RequestLogger::default()
//!     .exclude("/health")
//!     .exclude_regex(r"^/assets/.*")
//!     .expect("valid regex")
//!     .log_target("http_access")
//!     .stamp_request_start();
//! ```
//!
//! # Feature Flags
//!
//! - `log` (default) - Emit records through the standard `log` crate

mod logger;
mod record;
mod wrapper;

pub use crate::logger::{LoggedHandler, LoggedResponse, RequestLogger, RequestLoggerMiddleware};
pub use crate::record::{
    ErrorDetail, ErrorPayload, LogRecord, RequestStartTime, ResponseSnapshot, ResponseStartTime,
    Severity, classify,
};
#[cfg(feature = "log")]
pub use crate::wrapper::rust_log;
