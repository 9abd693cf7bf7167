//! etcd v3 backend.

use etcd_client::{Certificate, Client, ConnectOptions, Identity, TlsOptions};
use thiserror::Error;
use tracing::{debug, instrument};

use super::{BackendError, KvStore, PutAck, StoreClient, StoredValue};
use crate::config::{StoreConfig, TlsLoadError, TlsMaterial};

/// Errors that can occur before a store connection is available.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("loading etcd TLS credentials")]
	Tls(#[from] TlsLoadError),

	#[error("no connection to etcd at {endpoint} within {timeout:?}")]
	DialTimeout {
		endpoint: String,
		timeout: std::time::Duration,
	},

	#[error("connecting to etcd at {endpoint}")]
	Connect {
		endpoint: String,
		#[source]
		source: Box<etcd_client::Error>,
	},
}

pub struct EtcdStore {
	client: Client,
}

/// Open an authenticated connection to the etcd described by `config`.
///
/// TLS files are read before anything touches the network. The client dials
/// lazily, so one status call is made to prove the endpoint answers. Dialing,
/// the TLS handshake and that call share the dial timeout.
#[instrument(skip_all, fields(endpoint = %config.endpoint()))]
pub async fn connect(config: &StoreConfig) -> Result<StoreClient<EtcdStore>, ConnectionError> {
	let material = config.tls.load()?;
	let endpoint = config.endpoint();

	let options = ConnectOptions::new()
		.with_connect_timeout(config.dial_timeout)
		.with_tls(tls_options(&material, config.tls_server_name()));

	let dial = async {
		let mut client = Client::connect([endpoint.as_str()], Some(options)).await?;
		let status = client.status().await?;
		debug!(version = status.version(), "etcd answered");
		Ok::<_, etcd_client::Error>(client)
	};

	let client = tokio::time::timeout(config.dial_timeout, dial)
		.await
		.map_err(|_| ConnectionError::DialTimeout {
			endpoint: endpoint.clone(),
			timeout: config.dial_timeout,
		})?
		.map_err(|source| ConnectionError::Connect {
			endpoint: endpoint.clone(),
			source: Box::new(source),
		})?;

	Ok(StoreClient::new(EtcdStore { client }, endpoint))
}

fn tls_options(material: &TlsMaterial, server_name: &str) -> TlsOptions {
	TlsOptions::new()
		.domain_name(server_name)
		.ca_certificate(Certificate::from_pem(&material.ca))
		.identity(Identity::from_pem(&material.cert, &material.key))
}

impl KvStore for EtcdStore {
	async fn get(&mut self, key: &str) -> Result<Option<StoredValue>, BackendError> {
		let resp = self.client.get(key, None).await?;
		Ok(resp.kvs().first().map(|kv| StoredValue {
			value: kv.value().to_vec(),
			mod_revision: kv.mod_revision(),
		}))
	}

	async fn put(&mut self, key: &str, value: Vec<u8>) -> Result<Option<PutAck>, BackendError> {
		let resp = self.client.put(key, value, None).await?;
		Ok(resp.header().map(|header| PutAck {
			revision: header.revision(),
		}))
	}

	async fn close(self) {
		// Dropping the client closes its channel
		drop(self.client);
	}
}

#[cfg(test)]
mod tests {
	use std::{net::TcpListener, path::Path, time::Duration};

	use assert_matches::assert_matches;

	use super::*;
	use crate::config::TlsFiles;

	fn testdata_tls() -> TlsFiles {
		let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/testdata/tls");
		TlsFiles {
			ca: dir.join("ca.crt"),
			cert: dir.join("etcd.crt"),
			key: dir.join("etcd.key"),
		}
	}

	/// A local port nothing listens on.
	fn closed_port() -> u16 {
		let listener = TcpListener::bind("127.0.0.1:0").unwrap();
		listener.local_addr().unwrap().port()
	}

	#[tokio::test]
	async fn test_connect_fails_on_missing_tls_files_before_dialing() {
		let config = StoreConfig::builder()
			// Unroutable, would hang if dialed
			.host("10.255.255.1")
			.dial_timeout(Duration::from_secs(60))
			.tls(TlsFiles {
				ca: "/nonexistent/ca.crt".into(),
				cert: "/nonexistent/etcd.crt".into(),
				key: "/nonexistent/etcd.key".into(),
			})
			.build();

		let result = tokio::time::timeout(Duration::from_secs(5), connect(&config))
			.await
			.expect("connect must fail fast");
		assert_matches!(
			result,
			Err(ConnectionError::Tls(TlsLoadError::Read { what: "CA certificate", .. }))
		);
	}

	#[tokio::test]
	async fn test_connect_fails_when_nothing_listens() {
		let config = StoreConfig::builder()
			.host("127.0.0.1")
			.port(closed_port())
			.server_name("localhost")
			.dial_timeout(Duration::from_secs(2))
			.tls(testdata_tls())
			.build();

		let result = tokio::time::timeout(Duration::from_secs(10), connect(&config))
			.await
			.expect("connect must give up at its dial timeout");
		let err = result.unwrap_err();
		assert_matches!(
			&err,
			ConnectionError::Connect { endpoint, .. } | ConnectionError::DialTimeout { endpoint, .. }
				if endpoint.starts_with("https://127.0.0.1:")
		);
	}

	#[tokio::test]
	async fn test_connect_gives_up_at_dial_timeout() {
		let config = StoreConfig::builder()
			// Unroutable, packets are dropped
			.host("10.255.255.1")
			.server_name("localhost")
			.dial_timeout(Duration::from_millis(300))
			.tls(testdata_tls())
			.build();

		let result = tokio::time::timeout(Duration::from_secs(10), connect(&config))
			.await
			.expect("connect must give up at its dial timeout");
		assert_matches!(
			result,
			Err(ConnectionError::DialTimeout { .. } | ConnectionError::Connect { .. })
		);
	}
}
