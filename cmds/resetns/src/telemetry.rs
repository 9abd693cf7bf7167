//! Tracing and logging setup.

use std::io::IsTerminal;

use anyhow::Result;
use clap::ValueEnum;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Environment variable for service name (not exported by opentelemetry_sdk).
const OTEL_SERVICE_NAME: &str = "OTEL_SERVICE_NAME";

const SERVICE_NAME: &str = "resetns";

/// How log lines are written to stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
	/// Pretty on a terminal, JSON otherwise.
	#[default]
	Auto,
	Pretty,
	Json,
}

impl LogFormat {
	fn is_pretty(self) -> bool {
		match self {
			LogFormat::Auto => std::io::stderr().is_terminal(),
			LogFormat::Pretty => true,
			LogFormat::Json => false,
		}
	}
}

/// Flushes exported spans when dropped. Keep it alive until the process exits.
pub struct TelemetryGuard {
	_inner: Option<OtelGuard>,
}

/// Shuts the tracer provider down on drop, exporting whatever is still batched.
struct OtelGuard {
	tracer_provider: SdkTracerProvider,
}

impl Drop for OtelGuard {
	fn drop(&mut self) {
		if let Err(e) = self.tracer_provider.shutdown() {
			eprintln!("Failed to shutdown tracer provider: {e}");
		}
	}
}

/// OTLP export is opt-in through the standard endpoint variables.
fn otel_export_enabled() -> bool {
	std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_ENDPOINT).is_ok()
		|| std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_TRACES_ENDPOINT).is_ok()
}

/// Initialize tracing.
///
/// The level comes from `--log-level`, then `RUST_LOG`, then defaults to info.
/// Logs go to stderr in `format`, so stdout only carries the report. Spans are
/// exported over OTLP when an `OTEL_EXPORTER_OTLP_*ENDPOINT` variable is set.
///
/// Must be called inside a tokio runtime context.
pub fn init(log_level: Option<Level>, format: LogFormat) -> Result<TelemetryGuard> {
	let filter_layer = match log_level {
		Some(level) => EnvFilter::new(level.as_str()),
		None => EnvFilter::builder()
			.with_default_directive(Level::INFO.into())
			.from_env_lossy(),
	};

	// Logs stay on stderr whatever the format: stdout is the report
	let fmt_layer = if format.is_pretty() {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.pretty()
			.boxed()
	} else {
		tracing_subscriber::fmt::layer()
			.with_writer(std::io::stderr)
			.json()
			.flatten_event(true)
			.with_current_span(true)
			.boxed()
	};

	// The OTLP layer is only stacked when an endpoint is configured
	if otel_export_enabled() {
		let (otel_layer, guard) = init_otel()?;

		tracing_subscriber::registry()
			.with(filter_layer)
			.with(fmt_layer)
			.with(otel_layer)
			.init();

		return Ok(TelemetryGuard {
			_inner: Some(guard),
		});
	}

	tracing_subscriber::registry()
		.with(filter_layer)
		.with(fmt_layer)
		.init();

	Ok(TelemetryGuard { _inner: None })
}

/// Span exporter transport, from `OTEL_EXPORTER_OTLP_PROTOCOL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OtlpTransport {
	Grpc,
	/// `http/protobuf` and `http/json`
	Http,
}

impl OtlpTransport {
	fn from_protocol(protocol: &str) -> Self {
		match protocol {
			"grpc" => OtlpTransport::Grpc,
			_ => OtlpTransport::Http,
		}
	}

	fn from_env() -> Self {
		Self::from_protocol(
			std::env::var(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL)
				.as_deref()
				.unwrap_or(opentelemetry_otlp::OTEL_EXPORTER_OTLP_PROTOCOL_DEFAULT),
		)
	}
}

fn init_otel<S>() -> Result<(impl Layer<S>, OtelGuard)>
where
	S: tracing::Subscriber + for<'span> tracing_subscriber::registry::LookupSpan<'span>,
{
	use opentelemetry_sdk::Resource;

	// The builder already reads OTEL_SERVICE_NAME and OTEL_RESOURCE_ATTRIBUTES,
	// `resetns` is only the fallback name
	let mut resource_builder = Resource::builder();
	if std::env::var(OTEL_SERVICE_NAME).is_err() {
		resource_builder = resource_builder.with_service_name(SERVICE_NAME);
	}
	let resource = resource_builder.build();

	let exporter = match OtlpTransport::from_env() {
		OtlpTransport::Grpc => opentelemetry_otlp::SpanExporter::builder()
			.with_tonic()
			.build()?,
		OtlpTransport::Http => opentelemetry_otlp::SpanExporter::builder()
			.with_http()
			.build()?,
	};

	let tracer_provider = SdkTracerProvider::builder()
		.with_resource(resource)
		.with_batch_exporter(exporter)
		.build();

	let layer = tracing_opentelemetry::layer()
		.with_error_records_to_exceptions(true)
		.with_tracer(tracer_provider.tracer(SERVICE_NAME));

	// Also shut down through OtelGuard
	opentelemetry::global::set_tracer_provider(tracer_provider.clone());

	Ok((layer, OtelGuard { tracer_provider }))
}
