//! The request dispatcher.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use bytes::Bytes;
use futures_util::FutureExt;
use hermes_config::DispatcherSettings;
use hermes_contract::{bind_request, scan_cached, EndpointDescriptor, RequestParts, ScanError};
use hermes_core::diagnostics::emit;
use hermes_core::{
    BoundArguments, CallContext, CallSide, CancellationToken, ContractError, DiagnosticEvent,
    DiagnosticsSink, ErrorKind, NoopDiagnostics, Outcome, PermissionChecker, RequestId,
    RequestValidator, REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
use hermes_router::{Params, RouteLookup, RouteTable};
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use serde_json::Value;
use tracing::Instrument;

use crate::service::{BoxedOutcome, ContractService};

type Preparer = Arc<dyn Fn(&str, BoundArguments) -> Outcome<BoxedOutcome> + Send + Sync>;

/// A routed endpoint and the service behind it.
#[derive(Clone)]
struct Mounted {
    endpoint: Arc<EndpointDescriptor>,
    prepare: Preparer,
}

/// Dispatches inbound requests to mounted contract implementations.
///
/// Built with [`Dispatcher::builder`]. Immutable once built, so one instance
/// can serve every request concurrently behind an `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// let dispatcher = Dispatcher::builder()
///     .mount(UserContractService::new(UserStore::default()))
///     .permission_checker(AllowAll)
///     .build()?;
///
/// let response = dispatcher.dispatch(request, CancellationToken::new()).await;
/// ```
pub struct Dispatcher {
    routes: RouteTable<Mounted>,
    validators: Vec<Arc<dyn RequestValidator>>,
    permission: Option<Arc<dyn PermissionChecker>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    settings: DispatcherSettings,
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("validators", &self.validators.len())
            .field("permission_checker", &self.permission.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Returns the active settings.
    #[must_use]
    pub const fn settings(&self) -> &DispatcherSettings {
        &self.settings
    }

    /// Returns the mounted endpoints in registration order.
    pub fn endpoints(&self) -> impl Iterator<Item = &EndpointDescriptor> {
        self.routes.iter().map(|route| route.target().endpoint.as_ref())
    }

    /// Handles one request.
    ///
    /// Never fails and never panics: every fault, including a panic inside
    /// the operation, becomes an error response. Every response carries
    /// `x-request-id`, taken from the request when it holds a valid id.
    /// Cancelling `cancellation` resolves the call as cancelled (499).
    pub async fn dispatch(
        &self,
        request: Request<Bytes>,
        cancellation: CancellationToken,
    ) -> Response<Bytes> {
        let (parts, body) = request.into_parts();
        let request_id = header_str(&parts.headers, REQUEST_ID_HEADER)
            .and_then(|value| value.parse::<RequestId>().ok())
            .unwrap_or_default();
        let path = parts.uri.path();

        let span = tracing::info_span!(
            "dispatch",
            request_id = %request_id,
            http.method = %parts.method,
            http.path = path
        );

        let mut response = async {
            match self.routes.lookup(&parts.method, path) {
                RouteLookup::Matched(found) => {
                    let mounted = found.target();
                    let mut ctx = CallContext::new(
                        mounted.endpoint.contract(),
                        mounted.endpoint.operation(),
                    )
                    .with_request_id(request_id)
                    .with_route(parts.method.clone(), path)
                    .with_headers(parts.headers.clone());
                    if let Some(trace_id) = header_str(&parts.headers, TRACE_ID_HEADER) {
                        ctx = ctx.with_trace_id(trace_id);
                    }
                    self.handle(mounted, found.params(), parts.uri.query(), &body, &ctx, cancellation)
                        .await
                }
                RouteLookup::MethodNotAllowed(allowed) => {
                    tracing::debug!(allowed = ?allowed, "method not allowed");
                    let error = ContractError::validation(format!(
                        "method {} is not allowed for {path}",
                        parts.method
                    ));
                    let mut response =
                        error_response(StatusCode::METHOD_NOT_ALLOWED, &error, request_id);
                    let allow = allowed
                        .iter()
                        .map(http::Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    if let Ok(value) = HeaderValue::from_str(&allow) {
                        response.headers_mut().insert(ALLOW, value);
                    }
                    response
                }
                RouteLookup::NotFound => {
                    tracing::debug!("no route matched");
                    let error =
                        ContractError::not_found(format!("no route for {} {path}", parts.method));
                    error_response(error.status_code(), &error, request_id)
                }
            }
        }
        .instrument(span)
        .await;

        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }

    async fn handle(
        &self,
        mounted: &Mounted,
        route: &Params,
        query: Option<&str>,
        body: &Bytes,
        ctx: &CallContext,
        cancellation: CancellationToken,
    ) -> Response<Bytes> {
        let sink = self.diagnostics.as_ref();
        emit(
            sink,
            &DiagnosticEvent::Started {
                side: CallSide::Server,
                ctx,
            },
        );

        let outcome = AssertUnwindSafe(self.run(mounted, route, query, body, ctx, cancellation))
            .catch_unwind()
            .await
            .unwrap_or_else(|payload| {
                let detail = panic_message(payload.as_ref());
                tracing::error!(
                    operation_id = ctx.operation(),
                    panic = detail,
                    "operation panicked"
                );
                Err(ContractError::unexpected(format!("operation panicked: {detail}")))
            });

        match outcome.and_then(|value| success_response(&value)) {
            Ok(response) => {
                emit(
                    sink,
                    &DiagnosticEvent::Completed {
                        side: CallSide::Server,
                        ctx,
                        status: response.status().as_u16(),
                        duration: ctx.elapsed(),
                    },
                );
                response
            }
            Err(error) => {
                let status = error.status_code();
                emit(
                    sink,
                    &DiagnosticEvent::Failed {
                        side: CallSide::Server,
                        ctx,
                        kind: error.kind(),
                        status: status.as_u16(),
                        message: error.message(),
                        duration: ctx.elapsed(),
                    },
                );
                let public = self.public_error(error);
                error_response(status, &public, ctx.request_id())
            }
        }
    }

    async fn run(
        &self,
        mounted: &Mounted,
        route: &Params,
        query: Option<&str>,
        body: &Bytes,
        ctx: &CallContext,
        cancellation: CancellationToken,
    ) -> Outcome<Value> {
        let endpoint = mounted.endpoint.as_ref();

        if body.len() > self.settings.max_body_bytes {
            return Err(ContractError::validation(format!(
                "request body of {} bytes exceeds the limit of {} bytes",
                body.len(),
                self.settings.max_body_bytes
            )));
        }

        let args = bind_request(
            endpoint,
            &RequestParts {
                route,
                query,
                body,
                cancellation: &cancellation,
            },
        )?;

        if endpoint.requires_validation() {
            for validator in &self.validators {
                validator.validate(ctx, &args).map_err(into_validation)?;
            }
        }

        // Typed decoding comes before authorization: a malformed argument is
        // a 400 whatever the caller's permissions.
        let call = (mounted.prepare)(endpoint.operation(), args)?;

        if endpoint.requires_authorization() {
            match &self.permission {
                Some(checker) => checker.check(ctx).into_outcome()?,
                None => {
                    return Err(ContractError::permission(format!(
                        "operation '{}' requires authorization and no permission checker is configured",
                        endpoint.operation()
                    )))
                }
            }
        }

        tokio::select! {
            biased;
            () = cancellation.cancelled() => {
                Err(ContractError::cancelled("request cancelled by the caller"))
            }
            outcome = call => outcome,
        }
    }

    fn public_error(&self, error: ContractError) -> ContractError {
        if error.kind() != ErrorKind::Unexpected || self.settings.expose_internal_errors {
            return error;
        }
        ContractError::unexpected(self.settings.internal_error_message.clone())
    }
}

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    routes: RouteTable<Mounted>,
    error: Option<ScanError>,
    validators: Vec<Arc<dyn RequestValidator>>,
    permission: Option<Arc<dyn PermissionChecker>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    settings: DispatcherSettings,
}

impl fmt::Debug for DispatcherBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherBuilder")
            .field("routes", &self.routes.len())
            .field("error", &self.error)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl Default for DispatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatcherBuilder {
    /// Creates an empty builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            routes: RouteTable::new(),
            error: None,
            validators: Vec::new(),
            permission: None,
            diagnostics: Arc::new(NoopDiagnostics),
            settings: DispatcherSettings::default(),
        }
    }

    /// Mounts a contract implementation.
    ///
    /// The contract is scanned (once per process). A scan failure is
    /// reported by [`build`](Self::build). Routes that overlap an already
    /// mounted contract are logged and never matched; the first mount wins.
    #[must_use]
    pub fn mount<S: ContractService>(self, service: S) -> Self {
        self.mount_shared(Arc::new(service))
    }

    /// Mounts a shared contract implementation.
    #[must_use]
    pub fn mount_shared<S: ContractService>(mut self, service: Arc<S>) -> Self {
        let descriptor = match scan_cached::<S::Contract>() {
            Ok(descriptor) => descriptor,
            Err(error) => {
                tracing::error!(error = %error, "contract rejected");
                self.error.get_or_insert(error);
                return self;
            }
        };

        let prepare: Preparer =
            Arc::new(move |operation: &str, args| Arc::clone(&service).prepare(operation, args));

        for endpoint in descriptor.endpoints() {
            tracing::debug!(
                contract = endpoint.contract(),
                operation_id = endpoint.operation(),
                http.method = %endpoint.method(),
                http.path = %endpoint.template(),
                "endpoint mounted"
            );
            self.routes.insert(
                endpoint.method().clone(),
                endpoint.template().clone(),
                Mounted {
                    endpoint: Arc::clone(endpoint),
                    prepare: Arc::clone(&prepare),
                },
            );
        }
        self
    }

    /// Adds a validator, run in order for endpoints that require validation.
    #[must_use]
    pub fn validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Sets the permission checker.
    ///
    /// Without one, endpoints that require authorization deny every call.
    #[must_use]
    pub fn permission_checker(mut self, checker: impl PermissionChecker + 'static) -> Self {
        self.permission = Some(Arc::new(checker));
        self
    }

    /// Sets the diagnostics sink.
    #[must_use]
    pub fn diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    /// Replaces all settings.
    #[must_use]
    pub fn settings(mut self, settings: DispatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Sets the largest accepted request body.
    #[must_use]
    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.settings.max_body_bytes = limit;
        self
    }

    /// Sends the real message of unexpected failures. Development only.
    #[must_use]
    pub fn expose_internal_errors(mut self, enabled: bool) -> Self {
        self.settings.expose_internal_errors = enabled;
        self
    }

    /// Builds the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns the first scan error met while mounting.
    pub fn build(self) -> Result<Dispatcher, ScanError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Ok(Dispatcher {
            routes: self.routes,
            validators: self.validators,
            permission: self.permission,
            diagnostics: self.diagnostics,
            settings: self.settings,
        })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

// Validators may fail with any kind; callers always see a validation error.
fn into_validation(error: ContractError) -> ContractError {
    if error.kind() == ErrorKind::Validation {
        return error;
    }
    let converted = ContractError::validation(error.message());
    match error.details() {
        Some(details) => converted.with_details(details.clone()),
        None => converted,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic payload"
    }
}

fn success_response(value: &Value) -> Outcome<Response<Bytes>> {
    if value.is_null() {
        let mut response = Response::new(Bytes::new());
        *response.status_mut() = StatusCode::NO_CONTENT;
        return Ok(response);
    }
    let body = serde_json::to_vec(value)
        .map_err(|e| ContractError::unexpected(format!("failed to serialize result: {e}")))?;
    Ok(json_response(StatusCode::OK, body))
}

fn error_response(status: StatusCode, error: &ContractError, request_id: RequestId) -> Response<Bytes> {
    let envelope = error.to_envelope(Some(&request_id.to_string()));
    match serde_json::to_vec(&envelope) {
        Ok(body) => json_response(status, body),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize error envelope");
            let mut response = Response::new(Bytes::new());
            *response.status_mut() = status;
            response
        }
    }
}

fn json_response(status: StatusCode, body: Vec<u8>) -> Response<Bytes> {
    let mut response = Response::new(Bytes::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
