//! Tracing subscriber initialization.
//!
//! Installs structured logging for the whole process and, when asked,
//! bridges spans into OpenTelemetry with a stdout exporter (swap for OTLP
//! in a real deployment). `RUST_LOG` overrides the default `info` filter.

use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Held so the exporter can be flushed at process exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// Logging defaults to `info` and follows `RUST_LOG` when set. With
/// `enable_otel`, a span bridge to OpenTelemetry is layered on top.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_tracing(enable_otel: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_span_events(fmt::format::FmtSpan::CLOSE);

    let otel_layer = enable_otel.then(|| {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("suasion");

        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);

        tracing_opentelemetry::layer().with_tracer(tracer).boxed()
    });

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .with(otel_layer)
        .try_init()?;

    Ok(())
}

/// Flush and shut down the OTel tracer provider, if one was installed.
///
/// Safe to call when OTel was never enabled.
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        let _ = provider.shutdown();
    }
}
