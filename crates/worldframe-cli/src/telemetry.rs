//! Logging for the `worldframe` binary.
//!
//! Logs go to stderr, filtered by `RUST_LOG` (default `info`), as JSON when
//! `WORLDFRAME_LOG_FORMAT=json`.  With `OTEL_EXPORTER_OTLP_ENDPOINT` set,
//! spans are also exported over OTLP/HTTP.

use std::sync::{Arc, Mutex, PoisonError};

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// What the environment asks of the log pipeline.
#[derive(Debug, Default, PartialEq)]
struct LogSettings {
    json: bool,
    endpoint: Option<String>,
}

impl LogSettings {
    fn from_env() -> Self {
        Self::from_vars(
            std::env::var("WORLDFRAME_LOG_FORMAT").ok().as_deref(),
            std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT").ok(),
        )
    }

    fn from_vars(format: Option<&str>, endpoint: Option<String>) -> Self {
        Self {
            json: format.is_some_and(|f| f.eq_ignore_ascii_case("json")),
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        }
    }
}

/// Install the global subscriber.  Hold the guard until the process exits.
pub fn init_tracing(service_name: &str) -> TelemetryGuard {
    let settings = LogSettings::from_env();
    let provider = settings
        .endpoint
        .as_deref()
        .and_then(|endpoint| otlp_provider(service_name, endpoint));

    let otel = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer("worldframe")));
    let json = settings
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let compact = (!settings.json).then(|| fmt::layer().compact().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(otel)
        .with(json)
        .with(compact)
        .init();

    TelemetryGuard {
        provider: Arc::new(Mutex::new(provider)),
    }
}

/// Flushes and shuts down the span exporter when dropped.
pub struct TelemetryGuard {
    provider: Arc<Mutex<Option<SdkTracerProvider>>>,
}

impl TelemetryGuard {
    /// A callback doing the same as dropping the guard, for code paths that
    /// leave through `std::process::exit`.  Only the first flush does work.
    pub fn flusher(&self) -> impl Fn() + Send + 'static {
        let provider = Arc::clone(&self.provider);
        move || shutdown(&provider)
    }
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        shutdown(&self.provider);
    }
}

fn shutdown(slot: &Mutex<Option<SdkTracerProvider>>) {
    let provider = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(provider) = provider
        && let Err(e) = provider.shutdown()
    {
        eprintln!("[worldframe] OpenTelemetry provider shutdown error: {e}");
    }
}

/// `None` when the exporter fails to build; the error goes to stderr
/// because the subscriber is not installed yet.
fn otlp_provider(service_name: &str, endpoint: &str) -> Option<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .map_err(|e| eprintln!("[worldframe] OTLP exporter init failed: {e}"))
        .ok()?;

    Some(
        SdkTracerProvider::builder()
            .with_resource(Resource::builder().with_service_name(service_name.to_string()).build())
            // No async runtime exists in this binary.
            .with_simple_exporter(exporter)
            .build(),
    )
}
