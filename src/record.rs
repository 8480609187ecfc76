//! Classification of a finished request into a single structured log record.
//!
//! Everything here is independent of the middleware plumbing: [`classify`] takes
//! the request start marker and a [`ResponseSnapshot`] and decides the severity
//! and the fields of the record.

use std::fmt;

use actix_http::{Extensions, ResponseHead};
use actix_web::HttpResponse;
use serde_json::{Map, Value};
use time::OffsetDateTime;

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Marks the moment request processing began.
///
/// Inserted into the request extensions by an upstream middleware, or by
/// [`RequestLogger::stamp_request_start`](crate::RequestLogger::stamp_request_start).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestStartTime(pub OffsetDateTime);

/// Marks the moment the response was ready.
///
/// When absent from the response extensions, the time of logging is used instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseStartTime(pub OffsetDateTime);

macro_rules! impl_marker {
    ($marker:ident) => {
        impl $marker {
            pub fn now() -> Self {
                Self(OffsetDateTime::now_utc())
            }

            /// Builds the marker from fractional seconds since the Unix epoch.
            /// Out of range values clamp to the epoch.
            pub fn from_unix_seconds(seconds: f64) -> Self {
                let nanos = (seconds * NANOS_PER_SECOND).round() as i128;
                Self(
                    OffsetDateTime::from_unix_timestamp_nanos(nanos)
                        .unwrap_or(OffsetDateTime::UNIX_EPOCH),
                )
            }
        }
    };
}

impl_marker!(RequestStartTime);
impl_marker!(ResponseStartTime);

/// Structured error detail a handler can attach to its response extensions.
///
/// Only objects and arrays are reported, and only for 4xx responses.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorPayload(pub Value);

/// Severity channel of a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    pub fn from_status(status_code: u16) -> Self {
        match status_code {
            400..=499 => Severity::Warning,
            500..=599 => Severity::Error,
            _ => Severity::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "log")]
impl From<Severity> for log::Level {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => log::Level::Info,
            Severity::Warning => log::Level::Warn,
            Severity::Error => log::Level::Error,
        }
    }
}

/// The response attributes the logger reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status_code: u16,
    pub reason_phrase: String,
    pub response_start_time: Option<OffsetDateTime>,
    pub data: Option<Value>,
}

impl ResponseSnapshot {
    pub fn new(status_code: u16, reason_phrase: impl Into<String>) -> Self {
        ResponseSnapshot {
            status_code,
            reason_phrase: reason_phrase.into(),
            response_start_time: None,
            data: None,
        }
    }

    pub fn with_start_time(mut self, start: OffsetDateTime) -> Self {
        self.response_start_time = Some(start);
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Reads status, reason phrase and the optional markers of an actix response.
    pub fn from_response<B>(res: &HttpResponse<B>) -> Self {
        Self::from_head(res.head(), &res.extensions())
    }

    pub fn from_head(head: &ResponseHead, extensions: &Extensions) -> Self {
        ResponseSnapshot {
            status_code: head.status.as_u16(),
            reason_phrase: head.reason().to_owned(),
            response_start_time: extensions.get::<ResponseStartTime>().map(|t| t.0),
            data: extensions.get::<ErrorPayload>().map(|p| p.0.clone()),
        }
    }

    fn structured_data(&self) -> Option<&Value> {
        self.data
            .as_ref()
            .filter(|data| data.is_object() || data.is_array())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDetail {
    pub kind: u16,
    pub message: String,
    pub stack: Option<Value>,
}

/// One structured log record, built per request and handed to the logger.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub severity: Severity,
    pub message: String,
    pub status_code: u16,
    /// Nanoseconds.
    pub duration: Option<f64>,
    pub error: Option<ErrorDetail>,
}

impl LogRecord {
    /// Structured fields as they are attached to the emitted record.
    pub fn fields(&self) -> Map<String, Value> {
        let mut fields = Map::new();
        fields.insert("http.status_code".to_owned(), self.status_code.into());

        if let Some(duration) = self.duration {
            fields.insert("duration".to_owned(), duration.into());
        }

        if let Some(error) = &self.error {
            fields.insert("error.kind".to_owned(), error.kind.into());
            fields.insert("error.message".to_owned(), error.message.clone().into());
            if let Some(stack) = &error.stack {
                fields.insert("error.stack".to_owned(), stack.clone());
            }
        }

        fields
    }
}

/// Builds the log record for a finished request.
///
/// A missing response start marker falls back to the current time, so in that
/// case the duration covers everything up to the moment of logging and not
/// just the handler.
pub fn classify(request_start: Option<OffsetDateTime>, response: &ResponseSnapshot) -> LogRecord {
    let duration = request_start.map(|start| {
        let end = response
            .response_start_time
            .unwrap_or_else(OffsetDateTime::now_utc);
        (end - start).as_seconds_f64() * NANOS_PER_SECOND
    });

    let severity = Severity::from_status(response.status_code);
    let error = match severity {
        Severity::Warning => Some(ErrorDetail {
            kind: response.status_code,
            message: response.reason_phrase.clone(),
            stack: response.structured_data().cloned(),
        }),
        Severity::Error => Some(ErrorDetail {
            kind: response.status_code,
            message: response.reason_phrase.clone(),
            stack: None,
        }),
        Severity::Info => None,
    };

    LogRecord {
        severity,
        message: format!("HTTP {} {}", response.status_code, response.reason_phrase),
        status_code: response.status_code,
        duration,
        error,
    }
}
