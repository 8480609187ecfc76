use std::{
    borrow::Cow,
    collections::HashSet,
    future::Future,
    marker::PhantomData,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll},
};

use futures_core::ready;
use pin_project_lite::pin_project;
use regex::Regex;

use actix_service::{Service, Transform};
use actix_utils::future::{Ready, ready};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::{Error, HttpMessage, HttpRequest, HttpResponse, Result};

use crate::record::{LogRecord, RequestStartTime, ResponseSnapshot, classify};

/// Middleware that emits one structured log record per finished request.
///
/// The record is routed by status code: 4xx to `warn`, 5xx to `error`,
/// everything else to `info`. The message reads `HTTP <status> <reason>` and
/// the fields use Datadog's standard attribute names.
///
/// # Examples
/// ```rust
/// use actix_web::App;
/// use actix_web_middleware_ddlogger::RequestLogger;
///
/// let app = App::new()
///     .wrap(RequestLogger::default().stamp_request_start());
/// ```
#[derive(Clone)]
pub struct RequestLogger(Rc<Inner>);

#[derive(Debug, Clone)]
struct Inner {
    exclude: HashSet<String>,
    exclude_regex: Vec<Regex>,
    log_target: Cow<'static, str>,
    stamp_request_start: bool,
}

impl RequestLogger {
    /// Create `RequestLogger` that logs every request.
    pub fn new() -> RequestLogger {
        RequestLogger(Rc::new(Inner {
            exclude: HashSet::new(),
            exclude_regex: Vec::new(),
            log_target: Cow::Borrowed(module_path!()),
            stamp_request_start: false,
        }))
    }

    /// Ignore and do not log specified path.
    pub fn exclude<T: Into<String>>(mut self, path: T) -> Self {
        Rc::make_mut(&mut self.0).exclude.insert(path.into());
        self
    }

    /// Ignore and do not log paths that match regex.
    pub fn exclude_regex<T: AsRef<str>>(mut self, pattern: T) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern.as_ref())?;
        Rc::make_mut(&mut self.0).exclude_regex.push(regex);
        Ok(self)
    }

    /// Sets the logging target to `target`.
    ///
    /// By default, the log target is `actix_web_middleware_ddlogger::logger`.
    pub fn log_target(mut self, target: impl Into<Cow<'static, str>>) -> Self {
        Rc::make_mut(&mut self.0).log_target = target.into();
        self
    }

    /// Insert a [`RequestStartTime`] into requests that reach the logger without one.
    ///
    /// Without it, `duration` is only reported when something upstream sets the marker.
    pub fn stamp_request_start(mut self) -> Self {
        Rc::make_mut(&mut self.0).stamp_request_start = true;
        self
    }

    pub fn is_excluded(&self, path: &str) -> bool {
        self.0.is_excluded(path)
    }

    /// Log an already produced response.
    ///
    /// The emitted record points at the caller's file and line.
    #[track_caller]
    pub fn log_response<B>(&self, req: &HttpRequest, res: &HttpResponse<B>) {
        self.0.log_response(req, res);
    }

    /// Wrap a blocking handler so every call is logged once.
    pub fn wrap_handler<F>(self, handler: F) -> LoggedHandler<F> {
        LoggedHandler {
            logger: self,
            handler,
        }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        RequestLogger::new()
    }
}

impl Inner {
    fn is_excluded(&self, path: &str) -> bool {
        self.exclude.contains(path) || self.exclude_regex.iter().any(|r| r.is_match(path))
    }

    fn stamp(&self, req: &impl HttpMessage) {
        if self.stamp_request_start {
            let mut extensions = req.extensions_mut();
            if !extensions.contains::<RequestStartTime>() {
                extensions.insert(RequestStartTime::now());
            }
        }
    }

    fn record<B>(&self, req: &HttpRequest, res: &HttpResponse<B>) -> Option<LogRecord> {
        if self.is_excluded(req.path()) {
            return None;
        }

        let request_start = req.extensions().get::<RequestStartTime>().map(|t| t.0);
        Some(classify(request_start, &ResponseSnapshot::from_response(res)))
    }

    #[track_caller]
    fn log_response<B>(&self, req: &HttpRequest, res: &HttpResponse<B>) {
        let Some(record) = self.record(req, res) else {
            return;
        };

        #[cfg(feature = "log")]
        crate::wrapper::rust_log::log(
            self.log_target.as_ref(),
            module_path!(),
            std::panic::Location::caller(),
            &record,
        );

        #[cfg(not(feature = "log"))]
        let _ = record;
    }
}

/// A blocking handler whose responses are logged by a [`RequestLogger`].
///
/// # Examples
/// ```rust
/// use actix_web::{HttpRequest, HttpResponse, test::TestRequest};
/// use actix_web_middleware_ddlogger::RequestLogger;
///
/// let handler = RequestLogger::default()
///     .wrap_handler(|_req: &HttpRequest| HttpResponse::Ok().finish());
///
/// let res = handler.call(&TestRequest::default().to_http_request());
/// assert!(res.status().is_success());
/// ```
pub struct LoggedHandler<F> {
    logger: RequestLogger,
    handler: F,
}

impl<F> LoggedHandler<F> {
    #[track_caller]
    pub fn call<B>(&self, req: &HttpRequest) -> HttpResponse<B>
    where
        F: Fn(&HttpRequest) -> HttpResponse<B>,
    {
        self.logger.0.stamp(req);
        let res = (self.handler)(req);
        self.logger.0.log_response(req, &res);
        res
    }
}

impl<S, B> Transform<S, ServiceRequest> for RequestLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = RequestLoggerMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestLoggerMiddleware {
            service,
            inner: Rc::clone(&self.0),
        }))
    }
}

/// Logger middleware service.
pub struct RequestLoggerMiddleware<S> {
    inner: Rc<Inner>,
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LoggedResponse<S, B>;

    actix_service::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        self.inner.stamp(&req);

        LoggedResponse {
            fut: self.service.call(req),
            inner: Rc::clone(&self.inner),
            _phantom: PhantomData,
        }
    }
}

pin_project! {
    pub struct LoggedResponse<S, B>
    where
        B: MessageBody,
        S: Service<ServiceRequest>,
    {
        #[pin]
        fut: S::Future,
        inner: Rc<Inner>,
        _phantom: PhantomData<B>,
    }
}

impl<S, B> Future for LoggedResponse<S, B>
where
    B: MessageBody,
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
{
    type Output = Result<ServiceResponse<B>, Error>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();

        let res = match ready!(this.fut.poll(cx)) {
            Ok(res) => res,
            Err(err) => return Poll::Ready(Err(err)),
        };

        #[cfg(feature = "log")]
        if let Some(error) = res.response().error() {
            log::debug!(target: this.inner.log_target.as_ref(), "Error in response: {:?}", error);
        }

        this.inner.log_response(res.request(), res.response());

        Poll::Ready(Ok(res))
    }
}
