//! CEP lookup client.
//!
//! # Design
//! `CepClient` holds configuration, a `Transport` and a `Scheduler`, and no
//! per-call state. The lookup is split the same way as the wire types:
//! `build_lookup` validates and produces an `HttpRequest`, `parse_lookup`
//! interprets an `HttpResponse`, and `lookup` runs the round-trip in between.
//! Every failure is logged where it is detected and then returned unchanged.
//!
//! Form writes happen only after a successful lookup, so a failed lookup
//! never leaves a half-filled form behind.

use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::ClientConfig;
use crate::error::LookupError;
use crate::form::{ErrorElement, FormBinding, FormHandle};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Transport};
use crate::postal::{self, PostalCode};
use crate::schedule::{Scheduler, ThreadScheduler};
use crate::types::{AddressField, AddressRecord, FieldBinding};

/// Optional handlers invoked by `CepClient::lookup_and_apply`.
#[derive(Default)]
pub struct LookupCallbacks<'a> {
    on_success: Option<Box<dyn FnMut(&AddressRecord) + 'a>>,
    on_failure: Option<Box<dyn FnMut(&LookupError) + 'a>>,
}

impl<'a> LookupCallbacks<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnMut(&AddressRecord) + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    /// When set, failures go here instead of the inline error element.
    pub fn on_failure(mut self, f: impl FnMut(&LookupError) + 'a) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

/// Stateless client for a CEP lookup service.
pub struct CepClient<T> {
    config: ClientConfig,
    transport: T,
    scheduler: Arc<dyn Scheduler>,
}

#[cfg(feature = "ureq")]
impl CepClient<crate::http::UreqTransport> {
    /// Client over a blocking `ureq` agent honouring `config.timeout_ms`.
    pub fn new(config: ClientConfig) -> Self {
        let transport = crate::http::UreqTransport::new(config.timeout());
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> CepClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            scheduler: Arc::new(ThreadScheduler),
        }
    }

    /// Replace the scheduler used for the error auto-hide.
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn validate(&self, raw: &str) -> bool {
        postal::validate(raw)
    }

    pub fn format(&self, raw: &str) -> String {
        postal::format(raw)
    }

    pub fn build_lookup(&self, raw: &str) -> Result<HttpRequest, LookupError> {
        let code = PostalCode::parse(raw).inspect_err(|e| warn!(input = raw, "{e}"))?;
        Ok(HttpRequest {
            method: HttpMethod::Get,
            url: format!("{}/{}", self.config.base_url(), code.digits()),
            headers: vec![("accept".to_string(), "application/json".to_string())],
        })
    }

    pub fn parse_lookup(&self, response: HttpResponse) -> Result<AddressRecord, LookupError> {
        check_status(response).and_then(|body| {
            serde_json::from_str(&body).map_err(|e| {
                error!(error = %e, "undecodable address body");
                LookupError::Deserialization(e.to_string())
            })
        })
    }

    /// Validate, fetch and decode the address for `raw`.
    pub fn lookup(&self, raw: &str) -> Result<AddressRecord, LookupError> {
        let request = self.build_lookup(raw)?;
        debug!(method = request.method.as_str(), url = %request.url, "looking up CEP");
        let response = self.transport.execute(&request).map_err(|e| {
            error!(url = %request.url, error = %e, "CEP request failed");
            LookupError::Transport(e)
        })?;
        self.parse_lookup(response)
    }

    /// Write every bound field present in `record` into `form`. Missing
    /// inputs and missing values are skipped.
    pub fn apply_to_form<F: FormBinding>(
        &self,
        form: &FormHandle<F>,
        record: &AddressRecord,
        binding: &FieldBinding,
    ) {
        form.with(|form| {
            for (field, target) in binding.resolved() {
                if form.get_field(target).is_none() {
                    continue;
                }
                if let Some(value) = record.field(field, &self.config.schema) {
                    debug!(field = field.as_str(), element = target, "filling form field");
                    form.set_field(target, &value);
                }
            }
        });
    }

    /// `lookup` followed by `apply_to_form`, routing the outcome through
    /// `callbacks`. Without a failure callback the error is shown inline.
    /// The error is returned to the caller in both cases.
    pub fn lookup_and_apply<F>(
        &self,
        form: &FormHandle<F>,
        raw: &str,
        binding: &FieldBinding,
        mut callbacks: LookupCallbacks<'_>,
    ) -> Result<AddressRecord, LookupError>
    where
        F: FormBinding + Send + 'static,
    {
        match self.lookup(raw) {
            Ok(record) => {
                self.apply_to_form(form, &record, binding);
                if let Some(on_success) = callbacks.on_success.as_mut() {
                    on_success(&record);
                }
                Ok(record)
            }
            Err(err) => {
                match callbacks.on_failure.as_mut() {
                    Some(on_failure) => on_failure(&err),
                    None => {
                        // A rebound CEP input moves the error element with it.
                        let anchor = binding
                            .get(AddressField::Cep)
                            .unwrap_or(self.config.error_display.anchor_id.as_str());
                        self.show_error_at(form, anchor, &err.to_string())
                    }
                }
                Err(err)
            }
        }
    }

    /// Show `message` in the inline error element, creating it after the CEP
    /// input if needed, and schedule it to hide.
    pub fn show_error<F>(&self, form: &FormHandle<F>, message: &str)
    where
        F: FormBinding + Send + 'static,
    {
        self.show_error_at(form, &self.config.error_display.anchor_id, message);
    }

    fn show_error_at<F>(&self, form: &FormHandle<F>, anchor: &str, message: &str)
    where
        F: FormBinding + Send + 'static,
    {
        let ui = &self.config.error_display;
        let shown = form.with(|form| {
            if form.element_mut(&ui.element_id).is_none() {
                let element = ErrorElement::new(&ui.element_id, &ui.css_class);
                if !form.insert_after(anchor, element) {
                    return false;
                }
            }
            match form.element_mut(&ui.element_id) {
                Some(element) => {
                    element.text = message.to_string();
                    element.visible = true;
                    true
                }
                None => false,
            }
        });
        if !shown {
            warn!(anchor, "no CEP input to attach the error to");
            return;
        }

        let form = form.clone();
        let element_id = ui.element_id.clone();
        self.scheduler.schedule_once(
            ui.hide_after(),
            Box::new(move || form.with(|form| hide(form, &element_id))),
        );
    }

    pub fn hide_error<F: FormBinding>(&self, form: &FormHandle<F>) {
        form.with(|form| hide(form, &self.config.error_display.element_id));
    }
}

fn hide<F: FormBinding>(form: &mut F, element_id: &str) {
    if let Some(element) = form.element_mut(element_id) {
        element.visible = false;
    }
}

/// Map non-success statuses to the matching `LookupError`, yielding the body
/// of a 2xx response.
fn check_status(response: HttpResponse) -> Result<String, LookupError> {
    if response.is_success() {
        return Ok(response.body);
    }
    if response.status == 404 {
        warn!("CEP not found");
        return Err(LookupError::NotFound);
    }
    warn!(status = response.status, "CEP service error");
    Err(LookupError::Service {
        status: response.status,
        body: response.body,
    })
}

#[cfg(feature = "ureq")]
/// Process-wide client with default configuration, built on first use.
pub fn default_client() -> &'static CepClient<crate::http::UreqTransport> {
    static CLIENT: std::sync::OnceLock<CepClient<crate::http::UreqTransport>> =
        std::sync::OnceLock::new();
    CLIENT.get_or_init(|| CepClient::new(ClientConfig::default()))
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    use super::*;
    use crate::error::TransportError;
    use crate::form::MemoryForm;
    use crate::schedule::QueuedScheduler;

    const PAULISTA: &str = r#"{"cep":"01310-100","state":"SP","city":"São Paulo","neighborhood":"Bela Vista","street":"Avenida Paulista"}"#;

    /// Replays one canned outcome and records every request it sees.
    struct FakeTransport {
        outcome: Result<(u16, &'static str), &'static str>,
        seen: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        fn status(status: u16, body: &'static str) -> Self {
            Self {
                outcome: Ok((status, body)),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                outcome: Err("connection refused"),
                seen: RefCell::new(Vec::new()),
            }
        }

        fn calls(&self) -> usize {
            self.seen.borrow().len()
        }
    }

    impl Transport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.borrow_mut().push(request.clone());
            match self.outcome {
                Ok((status, body)) => Ok(HttpResponse {
                    status,
                    headers: Vec::new(),
                    body: body.to_string(),
                }),
                Err(msg) => Err(TransportError::with_source(
                    "GET",
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, msg),
                )),
            }
        }
    }

    fn client(transport: FakeTransport) -> (CepClient<FakeTransport>, Arc<QueuedScheduler>) {
        let scheduler = Arc::new(QueuedScheduler::new());
        let client = CepClient::with_transport(ClientConfig::default(), transport)
            .with_scheduler(scheduler.clone());
        (client, scheduler)
    }

    fn address_form() -> FormHandle<MemoryForm> {
        FormHandle::new(MemoryForm::with_inputs([
            "cep", "rua", "bairro", "cidade", "estado",
        ]))
    }

    fn field(form: &FormHandle<MemoryForm>, id: &str) -> Option<String> {
        form.with(|form| form.get_field(id))
    }

    fn error_element(form: &FormHandle<MemoryForm>) -> Option<ErrorElement> {
        form.with(|form| form.element("cep-error").cloned())
    }

    #[test]
    fn build_lookup_uses_cleaned_digits() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let req = client.build_lookup("01310-100").unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "https://brasilapi.com.br/api/cep/v1/01310100");
        assert_eq!(
            req.headers,
            vec![("accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn lookup_decodes_success_body_verbatim() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let record = client.lookup("01310100").unwrap();
        let expected: AddressRecord = serde_json::from_str(PAULISTA).unwrap();
        assert_eq!(record, expected);
        assert_eq!(client.transport().calls(), 1);
    }

    #[test]
    fn lookup_maps_404_to_not_found() {
        let (client, _) = client(FakeTransport::status(404, r#"{"type":"service_error"}"#));
        let err = client.lookup("00000000").unwrap_err();
        assert!(matches!(err, LookupError::NotFound));
    }

    #[test]
    fn lookup_maps_other_statuses_to_service_error() {
        let (client, _) = client(FakeTransport::status(500, "upstream down"));
        let err = client.lookup("01310100").unwrap_err();
        match err {
            LookupError::Service { status, body } => {
                assert_eq!(status, 500);
                assert_eq!(body, "upstream down");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn lookup_rejects_invalid_code_without_network() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let err = client.lookup("123").unwrap_err();
        assert!(matches!(err, LookupError::Validation { .. }));
        assert_eq!(client.transport().calls(), 0);
    }

    #[test]
    fn lookup_wraps_transport_failures() {
        let (client, _) = client(FakeTransport::unreachable());
        let err = client.lookup("01310100").unwrap_err();
        let LookupError::Transport(inner) = err else {
            panic!("expected transport error");
        };
        let cause = std::error::Error::source(&inner).unwrap();
        assert_eq!(cause.to_string(), "connection refused");
    }

    #[test]
    fn lookup_rejects_non_object_body() {
        let (client, _) = client(FakeTransport::status(200, "[1,2,3]"));
        let err = client.lookup("01310100").unwrap_err();
        assert!(matches!(err, LookupError::Deserialization(_)));
    }

    #[test]
    fn apply_to_form_uses_binding_target() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let form = FormHandle::new(MemoryForm::with_inputs(["city-input"]));
        let record = AddressRecord::new().with("cidade", "São Paulo");
        let binding = FieldBinding::new().bind(AddressField::Cidade, "city-input");

        client.apply_to_form(&form, &record, &binding);

        assert_eq!(field(&form, "city-input").as_deref(), Some("São Paulo"));
    }

    #[test]
    fn apply_to_form_skips_missing_elements_and_values() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let form = FormHandle::new(MemoryForm::with_inputs(["rua", "estado"]));
        let record = AddressRecord::new()
            .with("cidade", "São Paulo")
            .with("street", serde_json::Value::Null)
            .with("state", "SP");

        client.apply_to_form(&form, &record, &FieldBinding::new());

        assert_eq!(field(&form, "rua").as_deref(), Some(""));
        assert_eq!(field(&form, "estado").as_deref(), Some("SP"));
        assert_eq!(field(&form, "cidade"), None);
    }

    #[test]
    fn lookup_and_apply_fills_form_and_calls_on_success() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();
        let successes = Cell::new(0);

        let record = client
            .lookup_and_apply(
                &form,
                "01310-100",
                &FieldBinding::new(),
                LookupCallbacks::new().on_success(|record| {
                    assert_eq!(record.text("city").as_deref(), Some("São Paulo"));
                    successes.set(successes.get() + 1);
                }),
            )
            .unwrap();

        assert_eq!(successes.get(), 1);
        assert_eq!(record.text("street").as_deref(), Some("Avenida Paulista"));
        assert_eq!(field(&form, "rua").as_deref(), Some("Avenida Paulista"));
        assert_eq!(field(&form, "bairro").as_deref(), Some("Bela Vista"));
        assert_eq!(field(&form, "cidade").as_deref(), Some("São Paulo"));
        assert_eq!(field(&form, "estado").as_deref(), Some("SP"));
        assert_eq!(field(&form, "cep").as_deref(), Some("01310-100"));
    }

    #[test]
    fn lookup_and_apply_routes_failure_to_callback_only() {
        let (client, scheduler) = client(FakeTransport::status(404, ""));
        let form = address_form();
        let failures = RefCell::new(Vec::new());

        let err = client
            .lookup_and_apply(
                &form,
                "00000000",
                &FieldBinding::new(),
                LookupCallbacks::new().on_failure(|err| failures.borrow_mut().push(err.to_string())),
            )
            .unwrap_err();

        assert!(matches!(err, LookupError::NotFound));
        assert_eq!(*failures.borrow(), vec!["CEP not found".to_string()]);
        assert!(error_element(&form).is_none());
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(field(&form, "rua").as_deref(), Some(""));
    }

    #[test]
    fn lookup_and_apply_shows_inline_error_without_callback() {
        let (client, scheduler) = client(FakeTransport::status(500, ""));
        let form = address_form();

        let err = client
            .lookup_and_apply(&form, "01310100", &FieldBinding::new(), LookupCallbacks::new())
            .unwrap_err();

        let element = error_element(&form).unwrap();
        assert_eq!(element.text, err.to_string());
        assert_eq!(element.class, "cep-error");
        assert!(element.visible);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn inline_error_follows_rebound_cep_input() {
        let (client, scheduler) = client(FakeTransport::status(404, ""));
        let form = FormHandle::new(MemoryForm::with_inputs(["postal-code", "rua", "cidade"]));
        let binding = FieldBinding::new().bind(AddressField::Cep, "postal-code");

        client
            .lookup_and_apply(&form, "00000000", &binding, LookupCallbacks::new())
            .unwrap_err();

        let ids = form.with(|form| form.ids().iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(ids, vec!["postal-code", "cep-error", "rua", "cidade"]);
        let element = error_element(&form).unwrap();
        assert!(element.visible);
        assert_eq!(element.text, "CEP not found");
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn show_error_inserts_after_cep_input_once() {
        let (client, scheduler) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();

        client.show_error(&form, "first");
        client.show_error(&form, "second");

        let ids = form.with(|form| form.ids().iter().map(|s| s.to_string()).collect::<Vec<_>>());
        assert_eq!(ids, vec!["cep", "cep-error", "rua", "bairro", "cidade", "estado"]);
        assert_eq!(error_element(&form).unwrap().text, "second");
        assert_eq!(scheduler.delays(), vec![Duration::from_secs(5); 2]);
    }

    #[test]
    fn show_error_auto_hides_when_timer_fires() {
        let (client, scheduler) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();

        client.show_error(&form, "CEP not found");
        assert!(error_element(&form).unwrap().visible);

        scheduler.run_all();
        let element = error_element(&form).unwrap();
        assert!(!element.visible);
        assert_eq!(element.text, "CEP not found");
    }

    #[test]
    fn stale_timer_hides_a_reshown_error() {
        let (client, scheduler) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();

        client.show_error(&form, "first");
        client.hide_error(&form);
        client.show_error(&form, "second");
        assert!(error_element(&form).unwrap().visible);

        scheduler.run_all();
        assert!(!error_element(&form).unwrap().visible);
    }

    #[test]
    fn show_error_without_cep_input_does_nothing() {
        let (client, scheduler) = client(FakeTransport::status(200, PAULISTA));
        let form = FormHandle::new(MemoryForm::with_inputs(["rua"]));

        client.show_error(&form, "oops");

        assert!(error_element(&form).is_none());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn hide_error_is_a_no_op_without_element() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();
        client.hide_error(&form);
        assert!(error_element(&form).is_none());
    }

    /// Counts WARN and ERROR events emitted while installed.
    struct FailureEvents(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for FailureEvents {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let level = *event.metadata().level();
            if level == Level::WARN || level == Level::ERROR {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn failure_events(f: impl FnOnce()) -> usize {
        let count = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(FailureEvents(count.clone()));
        tracing::subscriber::with_default(subscriber, f);
        count.load(Ordering::SeqCst)
    }

    #[test]
    fn every_failure_kind_is_logged_once() {
        let cases: Vec<(&str, FakeTransport, &str)> = vec![
            ("validation", FakeTransport::status(200, PAULISTA), "123"),
            ("not found", FakeTransport::status(404, ""), "00000000"),
            ("service", FakeTransport::status(500, "down"), "01310100"),
            ("transport", FakeTransport::unreachable(), "01310100"),
            ("decode", FakeTransport::status(200, "[1,2,3]"), "01310100"),
        ];
        for (kind, transport, input) in cases {
            let (client, _) = client(transport);
            let logged = failure_events(|| {
                client.lookup(input).unwrap_err();
            });
            assert_eq!(logged, 1, "{kind} failure");
        }
    }

    #[test]
    fn successful_lookup_logs_no_failure() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let logged = failure_events(|| {
            client.lookup("01310100").unwrap();
        });
        assert_eq!(logged, 0);
    }

    #[cfg(feature = "ureq")]
    #[test]
    fn default_client_is_shared_and_targets_brasilapi() {
        let first = default_client();
        assert!(std::ptr::eq(first, default_client()));
        assert_eq!(first.config().base_url(), crate::config::DEFAULT_BASE_URL);
        assert!(first.validate("01310-100"));
        assert_eq!(first.format("01310100"), "01310-100");
    }

    #[test]
    fn hide_error_hides_immediately() {
        let (client, _) = client(FakeTransport::status(200, PAULISTA));
        let form = address_form();
        client.show_error(&form, "oops");
        client.hide_error(&form);
        assert!(!error_element(&form).unwrap().visible);
    }
}
