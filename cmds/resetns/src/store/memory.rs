//! In-memory [`KvStore`] with etcd-like revisions and injectable faults.

use std::{
	collections::BTreeMap,
	sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use super::{BackendError, KvStore, PutAck, StoreOp, StoredValue};

/// Cloning shares the underlying state, so a test can hand one clone to the
/// code under test and inspect the other afterwards.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	state: Arc<Mutex<State>>,
}

#[derive(Debug, Default)]
struct State {
	entries: BTreeMap<String, StoredValue>,
	revision: i64,
	put_attempts: usize,
	closed: bool,
	stall: Option<StoreOp>,
	fail: Option<(StoreOp, String)>,
	drop_acks: bool,
}

impl State {
	fn write(&mut self, key: &str, value: Vec<u8>) -> i64 {
		self.revision += 1;
		self.entries.insert(
			key.to_string(),
			StoredValue {
				value,
				mod_revision: self.revision,
			},
		);
		self.revision
	}

	fn fault(&self, op: StoreOp) -> Fault {
		if self.stall == Some(op) {
			return Fault::Stall;
		}
		match &self.fail {
			Some((failing, message)) if *failing == op => Fault::Fail(message.clone()),
			_ => Fault::None,
		}
	}
}

enum Fault {
	None,
	Stall,
	Fail(String),
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Builder-style method to seed an entry.
	pub fn with_entry(self, key: impl AsRef<str>, value: Vec<u8>) -> Self {
		self.insert(key, value);
		self
	}

	/// Write `value` directly, bypassing fault injection. Returns the new revision.
	pub fn insert(&self, key: impl AsRef<str>, value: Vec<u8>) -> i64 {
		self.lock().write(key.as_ref(), value)
	}

	pub fn value(&self, key: &str) -> Option<Vec<u8>> {
		self.lock().entries.get(key).map(|v| v.value.clone())
	}

	pub fn revision(&self) -> i64 {
		self.lock().revision
	}

	/// Number of `put` calls received, including ones that failed or stalled.
	pub fn put_attempts(&self) -> usize {
		self.lock().put_attempts
	}

	pub fn is_closed(&self) -> bool {
		self.lock().closed
	}

	/// Never answer calls of kind `op`.
	pub fn stall_on(self, op: StoreOp) -> Self {
		self.lock().stall = Some(op);
		self
	}

	/// Fail calls of kind `op` with `message`.
	pub fn fail_on(self, op: StoreOp, message: impl Into<String>) -> Self {
		self.lock().fail = Some((op, message.into()));
		self
	}

	/// Apply writes but answer them without an acknowledgment.
	pub fn drop_acks(self) -> Self {
		self.lock().drop_acks = true;
		self
	}
}

impl KvStore for MemoryStore {
	async fn get(&mut self, key: &str) -> Result<Option<StoredValue>, BackendError> {
		let fault = self.lock().fault(StoreOp::Get);
		match fault {
			Fault::Stall => std::future::pending().await,
			Fault::Fail(message) => Err(BackendError::Unavailable(message)),
			Fault::None => Ok(self.lock().entries.get(key).cloned()),
		}
	}

	async fn put(&mut self, key: &str, value: Vec<u8>) -> Result<Option<PutAck>, BackendError> {
		let fault = {
			let mut state = self.lock();
			state.put_attempts += 1;
			state.fault(StoreOp::Put)
		};
		match fault {
			Fault::Stall => std::future::pending().await,
			Fault::Fail(message) => Err(BackendError::Unavailable(message)),
			Fault::None => {
				let mut state = self.lock();
				let revision = state.write(key, value);
				Ok((!state.drop_acks).then_some(PutAck { revision }))
			}
		}
	}

	async fn close(self) {
		self.lock().closed = true;
	}
}
