//! The client invocation engine.

use std::fmt;
use std::sync::Arc;

use hermes_config::ClientSettings;
use hermes_contract::{encode_request, scan_cached, EncodedRequest, EndpointDescriptor};
use hermes_core::diagnostics::emit;
use hermes_core::{
    BoundArguments, CallContext, CallSide, CancellationToken, CircuitBreaker, Contract,
    ContractError, DiagnosticEvent, DiagnosticsSink, ErrorClass, ErrorKind, NoRetry,
    NoopDiagnostics, Outcome, RequestValidator, RetryPolicy, REQUEST_ID_HEADER, TRACE_ID_HEADER,
};
use hermes_server::Dispatcher;
use http::{HeaderMap, HeaderValue, StatusCode};
use serde::de::DeserializeOwned;
use tracing::Instrument;

use crate::decode::decode_response;
use crate::transport::{HttpTransport, LoopbackTransport, ReqwestTransport, TransportError};

/// Performs contract calls over HTTP.
///
/// Cheap to clone; clones share the transport and every collaborator.
/// Generated `<Trait>Client` types wrap one of these and forward each method
/// to [`invoke`](Self::invoke).
///
/// # Example
///
/// ```rust,ignore
/// let client = ContractClient::builder(ReqwestTransport::from_settings(&settings)?)
///     .retry_policy(settings.retry.policy())
///     .build();
///
/// let users = UserContractClient::new(client);
/// let user = users.get_user_async(123).await?;
/// ```
#[derive(Clone)]
pub struct ContractClient {
    transport: Arc<dyn HttpTransport>,
    validators: Vec<Arc<dyn RequestValidator>>,
    retry: Arc<dyn RetryPolicy>,
    breaker: Option<Arc<dyn CircuitBreaker>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    trace_id: Option<String>,
}

impl fmt::Debug for ContractClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractClient")
            .field("validators", &self.validators.len())
            .field("circuit_breaker", &self.breaker.is_some())
            .field("trace_id", &self.trace_id)
            .finish_non_exhaustive()
    }
}

impl ContractClient {
    /// Creates a builder sending requests through `transport`.
    #[must_use]
    pub fn builder(transport: impl HttpTransport + 'static) -> ContractClientBuilder {
        ContractClientBuilder::new(transport)
    }

    /// Creates a builder from client settings: a `reqwest` transport for the
    /// configured base URL and timeout, and the configured retry policy.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_settings(settings: &ClientSettings) -> Result<ContractClientBuilder, TransportError> {
        let transport = ReqwestTransport::from_settings(settings)?;
        Ok(ContractClientBuilder::new(transport).retry_policy(settings.retry.policy()))
    }

    /// Creates a builder that serves every call with an in-process dispatcher.
    #[must_use]
    pub fn loopback(dispatcher: Arc<Dispatcher>) -> ContractClientBuilder {
        ContractClientBuilder::new(LoopbackTransport::new(dispatcher))
    }

    /// Calls `operation` of contract `C`.
    ///
    /// `args` follow the declared parameter order; a cancellation token among
    /// them cancels the call, including any backoff delay. The result is
    /// always an outcome: transport faults, refusals by the circuit breaker
    /// and malformed responses all come back as failures.
    pub async fn invoke<C, T>(&self, operation: &str, args: BoundArguments) -> Outcome<T>
    where
        C: Contract,
        T: DeserializeOwned,
    {
        let descriptor = scan_cached::<C>()
            .map_err(|e| ContractError::unexpected(format!("contract rejected: {e}")))?;
        let endpoint = descriptor.endpoint(operation).ok_or_else(|| {
            ContractError::unexpected(format!(
                "operation '{operation}' is not an endpoint of '{}'",
                descriptor.name()
            ))
        })?;

        let mut ctx = CallContext::new(endpoint.contract(), endpoint.operation())
            .with_route(endpoint.method().clone(), endpoint.template().as_str());
        if let Some(trace_id) = &self.trace_id {
            ctx = ctx.with_trace_id(trace_id.clone());
        }

        let span = tracing::info_span!(
            "invoke",
            request_id = %ctx.request_id(),
            contract = ctx.contract(),
            operation_id = ctx.operation()
        );
        self.call(endpoint, args, &ctx).instrument(span).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &EndpointDescriptor,
        args: BoundArguments,
        ctx: &CallContext,
    ) -> Outcome<T> {
        let sink = self.diagnostics.as_ref();
        emit(
            sink,
            &DiagnosticEvent::Started {
                side: CallSide::Client,
                ctx,
            },
        );

        match self.run(endpoint, &args, ctx).await {
            Ok((value, status)) => {
                emit(
                    sink,
                    &DiagnosticEvent::Completed {
                        side: CallSide::Client,
                        ctx,
                        status: status.as_u16(),
                        duration: ctx.elapsed(),
                    },
                );
                Ok(value)
            }
            Err(error) => {
                emit(
                    sink,
                    &DiagnosticEvent::Failed {
                        side: CallSide::Client,
                        ctx,
                        kind: error.kind(),
                        status: error.status_code().as_u16(),
                        message: error.message(),
                        duration: ctx.elapsed(),
                    },
                );
                Err(error)
            }
        }
    }

    async fn run<T: DeserializeOwned>(
        &self,
        endpoint: &EndpointDescriptor,
        args: &BoundArguments,
        ctx: &CallContext,
    ) -> Outcome<(T, StatusCode)> {
        if endpoint.requires_validation() {
            for validator in &self.validators {
                validator.validate(ctx, args).map_err(into_validation)?;
            }
        }

        let request = encode_request(endpoint, args)?;
        let headers = self.headers(ctx);
        let cancellation = args
            .cancellation()
            .cloned()
            .unwrap_or_else(CancellationToken::new);

        let mut attempt = 1;
        loop {
            let outcome = self
                .attempt(endpoint.operation(), &request, &headers, &cancellation)
                .await;
            let error = match outcome {
                Ok(answer) => return Ok(answer),
                Err(error) => error,
            };
            if cancellation.is_cancelled() {
                return Err(error);
            }
            let Some(delay) = self.retry.next_delay(attempt, &error) else {
                return Err(error);
            };

            tracing::debug!(
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error.kind = %error.kind(),
                "retrying call"
            );
            tokio::select! {
                biased;
                () = cancellation.cancelled() => {
                    return Err(ContractError::cancelled("call cancelled during backoff"));
                }
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }

    async fn attempt<T: DeserializeOwned>(
        &self,
        operation: &str,
        request: &EncodedRequest,
        headers: &HeaderMap,
        cancellation: &CancellationToken,
    ) -> Outcome<(T, StatusCode)> {
        if let Some(breaker) = &self.breaker {
            if !breaker.allow_request(operation) {
                return Err(ContractError::circuit_breaker_open(format!(
                    "circuit breaker refused '{operation}'"
                )));
            }
        }

        let send = self.transport.send(request.clone(), headers.clone());
        let received = tokio::select! {
            biased;
            () = cancellation.cancelled() => Err(TransportError::Cancelled),
            received = send => received,
        };

        let outcome = match received {
            Ok(response) => {
                let status = response.status();
                decode_response::<T>(response).map(|value| (value, status))
            }
            Err(error) => Err(ContractError::from(error)),
        };

        if let Some(breaker) = &self.breaker {
            match &outcome {
                Err(error) if error.kind() == ErrorKind::Cancelled => {}
                Err(error) if error.class() != ErrorClass::Business => {
                    breaker.record_failure(operation, error);
                }
                _ => breaker.record_success(operation),
            }
        }
        outcome
    }

    fn headers(&self, ctx: &CallContext) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(&ctx.request_id().to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        if let Some(value) = ctx.trace_id().and_then(|id| HeaderValue::from_str(id).ok()) {
            headers.insert(TRACE_ID_HEADER, value);
        }
        headers
    }
}

/// Builder for [`ContractClient`].
pub struct ContractClientBuilder {
    transport: Arc<dyn HttpTransport>,
    validators: Vec<Arc<dyn RequestValidator>>,
    retry: Arc<dyn RetryPolicy>,
    breaker: Option<Arc<dyn CircuitBreaker>>,
    diagnostics: Arc<dyn DiagnosticsSink>,
    trace_id: Option<String>,
}

impl fmt::Debug for ContractClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractClientBuilder")
            .field("validators", &self.validators.len())
            .field("circuit_breaker", &self.breaker.is_some())
            .finish_non_exhaustive()
    }
}

impl ContractClientBuilder {
    /// Creates a builder with no retries, no breaker and no diagnostics.
    #[must_use]
    pub fn new(transport: impl HttpTransport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            validators: Vec::new(),
            retry: Arc::new(NoRetry),
            breaker: None,
            diagnostics: Arc::new(NoopDiagnostics),
            trace_id: None,
        }
    }

    /// Adds a validator, run before sending for endpoints that require
    /// validation.
    #[must_use]
    pub fn validator(mut self, validator: impl RequestValidator + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Arc::new(policy);
        self
    }

    /// Sets the circuit breaker.
    #[must_use]
    pub fn circuit_breaker(mut self, breaker: impl CircuitBreaker + 'static) -> Self {
        self.breaker = Some(Arc::new(breaker));
        self
    }

    /// Sets a shared circuit breaker.
    #[must_use]
    pub fn shared_circuit_breaker(mut self, breaker: Arc<dyn CircuitBreaker>) -> Self {
        self.breaker = Some(breaker);
        self
    }

    /// Sets the diagnostics sink.
    #[must_use]
    pub fn diagnostics(mut self, sink: impl DiagnosticsSink + 'static) -> Self {
        self.diagnostics = Arc::new(sink);
        self
    }

    /// Sends `trace_id` as `x-trace-id` on every call.
    #[must_use]
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Builds the client.
    #[must_use]
    pub fn build(self) -> ContractClient {
        ContractClient {
            transport: self.transport,
            validators: self.validators,
            retry: self.retry,
            breaker: self.breaker,
            diagnostics: self.diagnostics,
            trace_id: self.trace_id,
        }
    }
}

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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportFuture;
    use bytes::Bytes;
    use hermes_core::{
        ContractSignature, ExponentialBackoff, OperationSignature, ParameterSignature,
        PropertyShape, TypeShape, WireValue,
    };
    use hermes_server::{encode_success, BoxedOutcome, ContractService};
    use http::{Method, Response};
    use parking_lot::Mutex;
    use serde::Deserialize;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    struct InventoryApi;

    impl Contract for InventoryApi {
        fn signature() -> ContractSignature {
            ContractSignature::new("Inventory")
                .operation(
                    OperationSignature::new("get_item")
                        .param(ParameterSignature::of::<i32>("id"))
                        .returns("Item")
                        .method(Method::GET)
                        .path("items/{id}"),
                )
                .operation(
                    OperationSignature::new("reserve_item")
                        .param(ParameterSignature {
                            name: "reservation".to_string(),
                            shape: TypeShape::Structured(vec![
                                PropertyShape::of::<i32>("item_id"),
                                PropertyShape::of::<i32>("quantity"),
                            ]),
                            required: true,
                            default: None,
                        })
                        .validate(true),
                )
                .operation(
                    OperationSignature::new("find_items")
                        .param(ParameterSignature::of::<Option<String>>("name"))
                        .param(ParameterSignature::of::<CancellationToken>("ct"))
                        .returns("Vec<Item>"),
                )
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Item {
        id: i32,
        name: String,
    }

    #[derive(Default)]
    struct Inventory {
        calls: AtomicUsize,
    }

    impl ContractService for Inventory {
        type Contract = InventoryApi;

        fn invoke(self: Arc<Self>, operation: &str, mut args: BoundArguments) -> BoxedOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let operation = operation.to_string();
            Box::pin(async move {
                match operation.as_str() {
                    "get_item" => {
                        let id: i32 = args.decode(0)?;
                        match id {
                            1 => encode_success(Ok(json!({ "id": 1, "name": "bolt" }))),
                            13 => Err(ContractError::database("replica lag")),
                            _ => Err(ContractError::not_found(format!("Item {id} not found"))),
                        }
                    }
                    "reserve_item" => encode_success(Ok(())),
                    "find_items" => {
                        let name: Option<String> = args.decode(0)?;
                        encode_success(Ok(json!([{ "id": 1, "name": name.unwrap_or_default() }])))
                    }
                    other => Err(ContractError::unexpected(format!("unknown operation '{other}'"))),
                }
            })
        }
    }

    fn dispatcher(service: Arc<Inventory>) -> Arc<Dispatcher> {
        Arc::new(Dispatcher::builder().mount_shared(service).build().unwrap())
    }

    fn id_args(id: i32) -> BoundArguments {
        let mut args = BoundArguments::new();
        args.push("id", WireValue::Json(json!(id)));
        args
    }

    /// Fails with a transport error a set number of times, then delegates.
    struct Flaky {
        inner: LoopbackTransport,
        failures: AtomicUsize,
        sent: AtomicUsize,
        headers: Mutex<Vec<HeaderMap>>,
    }

    impl Flaky {
        fn new(inner: LoopbackTransport, failures: usize) -> Self {
            Self {
                inner,
                failures: AtomicUsize::new(failures),
                sent: AtomicUsize::new(0),
                headers: Mutex::new(Vec::new()),
            }
        }
    }

    impl HttpTransport for Arc<Flaky> {
        fn send(&self, request: EncodedRequest, headers: HeaderMap) -> TransportFuture<'_> {
            self.sent.fetch_add(1, Ordering::SeqCst);
            self.headers.lock().push(headers.clone());
            let remaining = self.failures.load(Ordering::SeqCst);
            if remaining > 0 {
                self.failures.store(remaining - 1, Ordering::SeqCst);
                return Box::pin(async { Err(TransportError::Connect("refused".to_string())) });
            }
            self.inner.send(request, headers)
        }
    }

    /// Never answers.
    struct Silent;

    impl HttpTransport for Silent {
        fn send(&self, _request: EncodedRequest, _headers: HeaderMap) -> TransportFuture<'_> {
            Box::pin(std::future::pending())
        }
    }

    /// Answers every request with a fixed response.
    struct Canned(u16, &'static str);

    impl HttpTransport for Canned {
        fn send(&self, _request: EncodedRequest, _headers: HeaderMap) -> TransportFuture<'_> {
            let mut response = Response::new(Bytes::from_static(self.1.as_bytes()));
            *response.status_mut() = StatusCode::from_u16(self.0).unwrap();
            Box::pin(async move { Ok(response) })
        }
    }

    #[derive(Default)]
    struct Breaker {
        open: AtomicBool,
        successes: AtomicUsize,
        failures: AtomicUsize,
    }

    struct SharedBreaker(Arc<Breaker>);

    impl CircuitBreaker for SharedBreaker {
        fn allow_request(&self, _operation: &str) -> bool {
            !self.0.open.load(Ordering::SeqCst)
        }

        fn record_success(&self, _operation: &str) {
            self.0.successes.fetch_add(1, Ordering::SeqCst);
        }

        fn record_failure(&self, _operation: &str, _error: &ContractError) {
            self.0.failures.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct Recorded(Mutex<Vec<(String, u16)>>);

    struct Recording(Arc<Recorded>);

    impl DiagnosticsSink for Recording {
        fn record(&self, event: &DiagnosticEvent<'_>) {
            let entry = match event {
                DiagnosticEvent::Started { .. } => ("started".to_string(), 0),
                DiagnosticEvent::Completed { status, .. } => ("completed".to_string(), *status),
                DiagnosticEvent::Failed { kind, status, .. } => (kind.to_string(), *status),
            };
            self.0 .0.lock().push(entry);
        }
    }

    #[tokio::test]
    async fn test_invoke_success() {
        let client = ContractClient::loopback(dispatcher(Arc::default())).build();
        let item: Item = client.invoke::<InventoryApi, _>("get_item", id_args(1)).await.unwrap();
        assert_eq!(
            item,
            Item {
                id: 1,
                name: "bolt".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_invoke_business_error() {
        let client = ContractClient::loopback(dispatcher(Arc::default())).build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.message(), "Item 2 not found");
    }

    #[tokio::test]
    async fn test_ambiguous_status_decoded_by_envelope() {
        let client = ContractClient::loopback(dispatcher(Arc::default())).build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(13))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Database);
    }

    #[tokio::test]
    async fn test_unknown_operation() {
        let client = ContractClient::loopback(dispatcher(Arc::default())).build();
        let err = client
            .invoke::<InventoryApi, Item>("drop_table", BoundArguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
        assert!(err.message().contains("drop_table"));
    }

    #[tokio::test]
    async fn test_unit_result() {
        let service = Arc::new(Inventory::default());
        let client = ContractClient::loopback(dispatcher(Arc::clone(&service))).build();
        let mut args = BoundArguments::new();
        args.push("reservation", WireValue::Json(json!({"item_id": 1, "quantity": 2})));
        client.invoke::<InventoryApi, ()>("reserve_item", args).await.unwrap();
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_client_validation_short_circuits() {
        let service = Arc::new(Inventory::default());
        let sent = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::clone(&service))), 0));
        let client = ContractClient::builder(Arc::clone(&sent))
            .validator(|_: &CallContext, args: &BoundArguments| -> Outcome {
                match args.json("reservation").and_then(|r| r["quantity"].as_i64()) {
                    Some(q) if q > 0 => Ok(()),
                    _ => Err(ContractError::conflict("quantity must be positive")),
                }
            })
            .build();

        let mut args = BoundArguments::new();
        args.push("reservation", WireValue::Json(json!({"item_id": 1, "quantity": 0})));
        let err = client
            .invoke::<InventoryApi, ()>("reserve_item", args)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.message(), "quantity must be positive");
        assert_eq!(sent.sent.load(Ordering::SeqCst), 0);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_validators_skipped_when_not_required() {
        let client = ContractClient::loopback(dispatcher(Arc::default()))
            .validator(|_: &CallContext, _: &BoundArguments| -> Outcome {
                Err(ContractError::validation("always"))
            })
            .build();
        let item: Item = client.invoke::<InventoryApi, _>("get_item", id_args(1)).await.unwrap();
        assert_eq!(item.id, 1);
    }

    #[tokio::test]
    async fn test_connection_failure_is_unavailable() {
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 1));
        let client = ContractClient::builder(Arc::clone(&flaky)).build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(flaky.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_failures() {
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 2));
        let client = ContractClient::builder(Arc::clone(&flaky))
            .retry_policy(ExponentialBackoff::new(3, Duration::from_millis(100)))
            .build();

        let item: Item = client.invoke::<InventoryApi, _>("get_item", id_args(1)).await.unwrap();
        assert_eq!(item.id, 1);
        assert_eq!(flaky.sent.load(Ordering::SeqCst), 3);

        let headers = flaky.headers.lock();
        let ids: Vec<_> = headers.iter().map(|h| h.get(REQUEST_ID_HEADER).cloned()).collect();
        assert!(ids[0].is_some());
        assert!(ids.iter().all(|id| *id == ids[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_gives_up() {
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 5));
        let client = ContractClient::builder(Arc::clone(&flaky))
            .retry_policy(ExponentialBackoff::new(2, Duration::from_millis(10)))
            .build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert_eq!(flaky.sent.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_business_errors_not_retried() {
        let service = Arc::new(Inventory::default());
        let client = ContractClient::loopback(dispatcher(Arc::clone(&service)))
            .retry_policy(ExponentialBackoff::new(5, Duration::from_millis(1)))
            .build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(2))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(service.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_breaker_refuses() {
        let state = Arc::new(Breaker::default());
        state.open.store(true, Ordering::SeqCst);
        let service = Arc::new(Inventory::default());
        let client = ContractClient::loopback(dispatcher(Arc::clone(&service)))
            .circuit_breaker(SharedBreaker(Arc::clone(&state)))
            .build();

        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CircuitBreakerOpen);
        assert_eq!(service.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_breaker_records_outcomes() {
        let state = Arc::new(Breaker::default());
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 1));
        let client = ContractClient::builder(Arc::clone(&flaky))
            .circuit_breaker(SharedBreaker(Arc::clone(&state)))
            .build();

        let _ = client.invoke::<InventoryApi, Item>("get_item", id_args(1)).await;
        let _ = client.invoke::<InventoryApi, Item>("get_item", id_args(1)).await;
        let _ = client.invoke::<InventoryApi, Item>("get_item", id_args(2)).await;

        assert_eq!(state.failures.load(Ordering::SeqCst), 1);
        assert_eq!(state.successes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_cancellation_token_cancels_send() {
        let client = ContractClient::builder(Silent).build();
        let token = CancellationToken::new();
        let mut args = BoundArguments::new();
        args.push("name", WireValue::Json(Value::Null));
        args.push("ct", WireValue::Cancellation(token.clone()));

        let call = client.invoke::<InventoryApi, Vec<Item>>("find_items", args);
        token.cancel();
        let err = call.await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_during_backoff() {
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 10));
        let client = ContractClient::builder(Arc::clone(&flaky))
            .retry_policy(ExponentialBackoff::new(10, Duration::from_secs(60)))
            .build();
        let token = CancellationToken::new();
        let mut args = BoundArguments::new();
        args.push("name", WireValue::Json(json!("bolt")));
        args.push("ct", WireValue::Cancellation(token.clone()));

        let canceller = {
            let token = token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                token.cancel();
            })
        };
        let err = client
            .invoke::<InventoryApi, Vec<Item>>("find_items", args)
            .await
            .unwrap_err();
        canceller.await.unwrap();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(flaky.sent.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_round_trip() {
        let client = ContractClient::loopback(dispatcher(Arc::default())).build();
        let mut args = BoundArguments::new();
        args.push("name", WireValue::Json(json!("wing nut")));
        args.push("ct", WireValue::Cancellation(CancellationToken::new()));
        let items: Vec<Item> = client.invoke::<InventoryApi, _>("find_items", args).await.unwrap();
        assert_eq!(items[0].name, "wing nut");
    }

    #[tokio::test]
    async fn test_malformed_success_body() {
        let client = ContractClient::builder(Canned(200, "<html>")).build();
        let err = client
            .invoke::<InventoryApi, Item>("get_item", id_args(1))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unexpected);
    }

    #[tokio::test]
    async fn test_trace_id_sent() {
        let flaky = Arc::new(Flaky::new(LoopbackTransport::new(dispatcher(Arc::default())), 0));
        let client = ContractClient::builder(Arc::clone(&flaky))
            .trace_id("trace-42")
            .build();
        let _: Item = client.invoke::<InventoryApi, _>("get_item", id_args(1)).await.unwrap();
        let headers = flaky.headers.lock();
        assert_eq!(headers[0].get(TRACE_ID_HEADER).unwrap(), "trace-42");
    }

    #[tokio::test]
    async fn test_diagnostics_events() {
        let recorded = Arc::new(Recorded::default());
        let client = ContractClient::loopback(dispatcher(Arc::default()))
            .diagnostics(Recording(Arc::clone(&recorded)))
            .build();

        let _ = client.invoke::<InventoryApi, Item>("get_item", id_args(1)).await;
        let _ = client.invoke::<InventoryApi, Item>("get_item", id_args(2)).await;

        let events = recorded.0.lock();
        assert_eq!(
            *events,
            vec![
                ("started".to_string(), 0),
                ("completed".to_string(), 200),
                ("started".to_string(), 0),
                ("not_found".to_string(), 404),
            ]
        );
    }

    #[test]
    fn test_from_settings() {
        let settings = ClientSettings {
            base_url: "http://inventory.internal".to_string(),
            ..Default::default()
        };
        let client = ContractClient::from_settings(&settings).unwrap().build();
        assert!(client.breaker.is_none());
    }
}
