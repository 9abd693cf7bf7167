//! Deadline-bounded access to the key-value store holding Kubernetes objects.
//!
//! [`KvStore`] is the raw backend contract (etcd, or the in-memory store tests use).
//! [`StoreClient`] wraps a backend and turns its answers into the errors callers act
//! on: missing keys, elapsed deadlines, unacknowledged writes.

use std::{fmt, future::Future, time::Duration};

use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, instrument};

pub mod etcd;
pub mod memory;

pub use etcd::{connect, ConnectionError, EtcdStore};
pub use memory::MemoryStore;

/// Store call kinds, used in errors and fault injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOp {
	Get,
	Put,
}

impl fmt::Display for StoreOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreOp::Get => write!(f, "get"),
			StoreOp::Put => write!(f, "put"),
		}
	}
}

/// A value read from the store along with the revision that last modified it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredValue {
	pub value: Vec<u8>,
	pub mod_revision: i64,
}

/// Store revision a write landed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutAck {
	pub revision: i64,
}

/// Failures reported by a backend itself.
#[derive(Debug, Error)]
pub enum BackendError {
	#[error(transparent)]
	Etcd(#[from] etcd_client::Error),

	#[error("store unavailable: {0}")]
	Unavailable(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
	#[error("key {key} not found")]
	NotFound { key: String },

	#[error("{op} {key}: no response within {timeout:?}")]
	Timeout {
		op: StoreOp,
		key: String,
		timeout: Duration,
	},

	#[error("{op} {key}")]
	Backend {
		op: StoreOp,
		key: String,
		#[source]
		source: BackendError,
	},

	#[error("put {key}: the store answered without acknowledging the write")]
	Unacknowledged { key: String },
}

impl StoreError {
	pub fn is_timeout(&self) -> bool {
		matches!(self, StoreError::Timeout { .. })
	}
}

/// Raw key-value backend.
pub trait KvStore {
	/// Current value for `key`, `None` if there is no entry.
	async fn get(&mut self, key: &str) -> Result<Option<StoredValue>, BackendError>;

	/// Unconditionally overwrite `key`. `None` means the store replied without an
	/// acknowledgment header.
	async fn put(&mut self, key: &str, value: Vec<u8>) -> Result<Option<PutAck>, BackendError>;

	/// Release the connection.
	async fn close(self)
	where
		Self: Sized;
}

/// Single upper bound shared by every store call of one operation.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
	at: Instant,
	budget: Duration,
}

impl Deadline {
	pub fn after(budget: Duration) -> Self {
		Self {
			at: Instant::now() + budget,
			budget,
		}
	}

	/// The total time this deadline allowed when created.
	pub fn budget(&self) -> Duration {
		self.budget
	}

	pub fn remaining(&self) -> Duration {
		self.at.saturating_duration_since(Instant::now())
	}

	/// Run `fut` until it completes or the deadline passes, whichever is first.
	async fn bound<F: Future>(&self, fut: F) -> Option<F::Output> {
		tokio::time::timeout_at(self.at, fut).await.ok()
	}
}

/// A connected store, scoped to one invocation.
pub struct StoreClient<S> {
	store: S,
	endpoint: String,
}

impl<S> fmt::Debug for StoreClient<S> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("StoreClient")
			.field("endpoint", &self.endpoint)
			.finish_non_exhaustive()
	}
}

impl<S: KvStore> StoreClient<S> {
	pub fn new(store: S, endpoint: impl Into<String>) -> Self {
		Self {
			store,
			endpoint: endpoint.into(),
		}
	}

	/// Fetch the current value for `key`.
	#[instrument(skip(self, deadline), fields(endpoint = %self.endpoint))]
	pub async fn get(&mut self, key: &str, deadline: &Deadline) -> Result<StoredValue, StoreError> {
		let result = deadline
			.bound(self.store.get(key))
			.await
			.ok_or_else(|| StoreError::Timeout {
				op: StoreOp::Get,
				key: key.to_string(),
				timeout: deadline.budget(),
			})?;

		let found = result.map_err(|source| StoreError::Backend {
			op: StoreOp::Get,
			key: key.to_string(),
			source,
		})?;

		let value = found.ok_or_else(|| StoreError::NotFound {
			key: key.to_string(),
		})?;
		debug!(
			revision = value.mod_revision,
			bytes = value.value.len(),
			"read value"
		);
		Ok(value)
	}

	/// Overwrite `key` with `value`. Succeeds only once the store acknowledged it.
	#[instrument(skip(self, value, deadline), fields(endpoint = %self.endpoint, bytes = value.len()))]
	pub async fn put(
		&mut self,
		key: &str,
		value: Vec<u8>,
		deadline: &Deadline,
	) -> Result<PutAck, StoreError> {
		let result = deadline
			.bound(self.store.put(key, value))
			.await
			.ok_or_else(|| StoreError::Timeout {
				op: StoreOp::Put,
				key: key.to_string(),
				timeout: deadline.budget(),
			})?;

		let ack = result
			.map_err(|source| StoreError::Backend {
				op: StoreOp::Put,
				key: key.to_string(),
				source,
			})?
			.ok_or_else(|| StoreError::Unacknowledged {
				key: key.to_string(),
			})?;
		debug!(revision = ack.revision, "write acknowledged");
		Ok(ack)
	}

	pub async fn close(self) {
		debug!(endpoint = %self.endpoint, "closing store connection");
		self.store.close().await;
	}
}
