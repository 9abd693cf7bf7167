//! Command-line entry point.

use std::{io::Write, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, instrument};

use crate::{
	config::{
		parse_namespace_name, RecoverTarget, StoreConfig, TlsFiles, DEFAULT_KEY_PREFIX,
	},
	recover::{recover, Mode},
	report::OutputFormat,
	store::{self, Deadline},
	telemetry::LogFormat,
};

const ABOUT: &str = "Reset the Terminating Namespace back to Active status.";

const LONG_ABOUT: &str = "Reset the Terminating Namespace back to Active status.

Reads the namespace record straight from etcd, clears its deletion timestamp, \
grace period and status conditions, sets the phase to Active and writes it back \
under the same key.

The write does not check the record's revision. Any change the API server makes \
to the namespace between the read and the write is lost, so stop whatever is \
updating it first.";

#[derive(Debug, Parser)]
#[command(name = "resetns", version, about = ABOUT, long_about = LONG_ABOUT)]
pub struct ResetArgs {
	/// Name of the Terminating namespace
	#[arg(value_name = "NAMESPACE", value_parser = parse_namespace_name)]
	pub namespace: String,

	/// CA Certificate used by etcd
	#[arg(long, default_value = "ca.crt")]
	pub etcd_ca: PathBuf,

	/// Public key used by etcd
	#[arg(long, default_value = "etcd.crt")]
	pub etcd_cert: PathBuf,

	/// Private key used by etcd
	#[arg(long, default_value = "etcd.key")]
	pub etcd_key: PathBuf,

	/// The etcd domain name or IP
	#[arg(long, default_value = "localhost")]
	pub etcd_host: String,

	/// The etcd port number
	#[arg(long, default_value_t = crate::config::DEFAULT_ETCD_PORT)]
	pub etcd_port: u16,

	/// Name to verify the etcd server certificate against. Defaults to --etcd-host
	#[arg(long)]
	pub etcd_server_name: Option<String>,

	/// The etcd key prefix for kubernetes resources.
	#[arg(long, default_value = DEFAULT_KEY_PREFIX)]
	pub k8s_key_prefix: String,

	/// Seconds to wait for the etcd connection
	#[arg(long, value_name = "SECONDS", default_value_t = 2)]
	pub dial_timeout: u64,

	/// Seconds the read and write together may take
	#[arg(long, value_name = "SECONDS", default_value_t = 5)]
	pub timeout: u64,

	/// Read, check and re-encode the namespace without writing it back
	#[arg(long)]
	pub dry_run: bool,

	/// Report format
	#[arg(short = 'o', long, value_enum, default_value_t = OutputFormat::Text)]
	pub output: OutputFormat,

	/// Log level (possible values: error, warn, info, debug, trace). Overrides RUST_LOG
	#[arg(long)]
	pub log_level: Option<tracing::Level>,

	/// Log line format on stderr
	#[arg(long, value_enum, default_value = "auto")]
	pub log_format: LogFormat,
}

impl ResetArgs {
	pub fn store_config(&self) -> StoreConfig {
		StoreConfig::builder()
			.host(self.etcd_host.clone())
			.port(self.etcd_port)
			.tls(TlsFiles {
				ca: self.etcd_ca.clone(),
				cert: self.etcd_cert.clone(),
				key: self.etcd_key.clone(),
			})
			.maybe_server_name(self.etcd_server_name.clone())
			.dial_timeout(Duration::from_secs(self.dial_timeout))
			.build()
	}

	pub fn target(&self) -> RecoverTarget {
		RecoverTarget::new(self.namespace.clone(), &self.k8s_key_prefix)
	}

	pub fn mode(&self) -> Mode {
		if self.dry_run {
			Mode::DryRun
		} else {
			Mode::Write
		}
	}

	pub fn operation_timeout(&self) -> Duration {
		Duration::from_secs(self.timeout)
	}
}

/// Connect, recover the namespace, and print the report to `writer`.
///
/// The connection is closed whether or not recovery succeeded.
#[instrument(skip_all, fields(namespace = %args.namespace))]
pub async fn run<W: Write>(args: ResetArgs, writer: W) -> Result<()> {
	let config = args.store_config();
	let target = args.target();

	let mut client = store::connect(&config)
		.await
		.context("cannot connect to etcd")?;

	let deadline = Deadline::after(args.operation_timeout());
	let outcome = recover(&mut client, &target, &deadline, args.mode()).await;
	client.close().await;

	let report = outcome?;
	debug!(remaining = ?deadline.remaining(), "recovery finished");
	report.render(args.output, writer).context("writing report")
}
