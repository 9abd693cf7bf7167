//! Explicit configuration values for connecting to etcd and locating a namespace.
//!
//! Everything here is built from parsed CLI arguments and handed to
//! [`crate::store::connect`] and [`crate::recover::recover`]; nothing reads
//! process-wide state.

use std::{
	fmt, fs, io,
	path::{Path, PathBuf},
	time::Duration,
};

use bon::Builder;
use k8s_proto::Kind;
use thiserror::Error;

pub const DEFAULT_KEY_PREFIX: &str = "registry";
pub const DEFAULT_ETCD_PORT: u16 = 2379;
pub const DEFAULT_DIAL_TIMEOUT: Duration = Duration::from_secs(2);
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum TlsLoadError {
	#[error("reading {what} from {path}")]
	Read {
		what: &'static str,
		path: PathBuf,
		#[source]
		source: io::Error,
	},

	#[error("{what} at {path} is not PEM encoded")]
	NotPem { what: &'static str, path: PathBuf },
}

/// Paths to the client TLS material etcd requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsFiles {
	pub ca: PathBuf,
	pub cert: PathBuf,
	pub key: PathBuf,
}

impl TlsFiles {
	/// Read all three files. Called once, before dialing.
	pub fn load(&self) -> Result<TlsMaterial, TlsLoadError> {
		Ok(TlsMaterial {
			ca: read_pem("CA certificate", &self.ca)?,
			cert: read_pem("client certificate", &self.cert)?,
			key: read_pem("client key", &self.key)?,
		})
	}
}

fn read_pem(what: &'static str, path: &Path) -> Result<Vec<u8>, TlsLoadError> {
	let pem = fs::read(path).map_err(|source| TlsLoadError::Read {
		what,
		path: path.to_path_buf(),
		source,
	})?;
	// Only to name the offending file; tonic parses the contents when dialing.
	if !pem.windows(b"-----BEGIN".len()).any(|w| w == b"-----BEGIN") {
		return Err(TlsLoadError::NotPem {
			what,
			path: path.to_path_buf(),
		});
	}
	Ok(pem)
}

/// PEM contents of [`TlsFiles`].
#[derive(Clone)]
pub struct TlsMaterial {
	pub ca: Vec<u8>,
	pub cert: Vec<u8>,
	pub key: Vec<u8>,
}

impl fmt::Debug for TlsMaterial {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TlsMaterial")
			.field("ca", &format_args!("{} bytes", self.ca.len()))
			.field("cert", &format_args!("{} bytes", self.cert.len()))
			.finish_non_exhaustive()
	}
}

/// How to reach etcd.
#[derive(Debug, Clone, Builder)]
pub struct StoreConfig {
	#[builder(into)]
	pub host: String,
	#[builder(default = DEFAULT_ETCD_PORT)]
	pub port: u16,
	pub tls: TlsFiles,
	/// Name to verify the server certificate against. Defaults to `host`.
	#[builder(into)]
	pub server_name: Option<String>,
	#[builder(default = DEFAULT_DIAL_TIMEOUT)]
	pub dial_timeout: Duration,
}

impl StoreConfig {
	pub fn endpoint(&self) -> String {
		// Bare IPv6 addresses need brackets in a URI
		if self.host.contains(':') && !self.host.starts_with('[') {
			format!("https://[{}]:{}", self.host, self.port)
		} else {
			format!("https://{}:{}", self.host, self.port)
		}
	}

	pub fn tls_server_name(&self) -> &str {
		self.server_name
			.as_deref()
			.unwrap_or_else(|| self.host.trim_start_matches('[').trim_end_matches(']'))
	}
}

/// The namespace to recover and where its record lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoverTarget {
	name: String,
	key_prefix: String,
}

impl RecoverTarget {
	/// `key_prefix` may be given with or without surrounding slashes.
	pub fn new(name: impl Into<String>, key_prefix: &str) -> Self {
		Self {
			name: name.into(),
			key_prefix: key_prefix.trim_matches('/').to_string(),
		}
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// `/<prefix>/namespaces/<name>`
	pub fn key(&self) -> String {
		storage_key(&self.key_prefix, Kind::Namespace, &self.name)
	}
}

/// Key the API server stores a cluster-scoped object of `kind` under.
pub fn storage_key(prefix: &str, kind: Kind, name: &str) -> String {
	format!("/{}/{}/{}", prefix, kind.resource(), name)
}

/// Validate a namespace name given on the command line.
///
/// Anything that could change the shape of the storage key is rejected.
pub fn parse_namespace_name(name: &str) -> Result<String, String> {
	if name.is_empty() {
		return Err("namespace name must not be empty".to_string());
	}
	if name.contains('/') {
		return Err(format!("namespace name {name:?} must not contain '/'"));
	}
	if name.chars().any(char::is_whitespace) {
		return Err(format!("namespace name {name:?} must not contain whitespace"));
	}
	Ok(name.to_string())
}
