//! Reset a Terminating namespace back to Active by rewriting its stored record.
//!
//! The sequence is read, decode, check, mutate a copy, encode, write. Every step
//! either succeeds or aborts the whole operation; nothing is retried.
//!
//! The write is an unconditional overwrite. If the API server updates the same key
//! between the read and the write, that update is lost. The revision observed at
//! read time is reported so an operator can tell whether that happened.

use k8s_proto::{
	core::{Namespace, NamespacePhase, NamespaceStatus},
	DecodeError, EncodeError,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::{
	config::RecoverTarget,
	report::RecoveryReport,
	store::{Deadline, KvStore, StoreClient, StoreError},
};

#[derive(Debug, Error)]
pub enum RecoverError {
	#[error(
		"cannot find namespace [{name}] in etcd with key [{key}]\n\
		 please check the k8s-key-prefix and the namespace name are set correctly"
	)]
	NotFound { name: String, key: String },

	#[error("namespace [{name}] is not in terminating status")]
	NotTerminating {
		name: String,
		phase: Option<String>,
	},

	#[error("decoding namespace [{name}] stored at [{key}]")]
	Decode {
		name: String,
		key: String,
		#[source]
		source: DecodeError,
	},

	#[error("encoding recovered namespace [{name}]")]
	Encode {
		name: String,
		#[source]
		source: EncodeError,
	},

	#[error("reading namespace [{name}] from etcd, the record was not modified")]
	Read {
		name: String,
		#[source]
		source: StoreError,
	},

	#[error(
		"writing namespace [{name}] to etcd, the outcome is unknown: \
		 check the namespace status before running again"
	)]
	Write {
		name: String,
		#[source]
		source: StoreError,
	},
}

/// Whether the recovered record is written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
	#[default]
	Write,
	/// Run every step except the final write.
	DryRun,
}

/// Produce the Active form of a Terminating namespace.
///
/// Returns `None` when `ns` has no deletion timestamp. Only the deletion
/// timestamp, grace period, phase and conditions differ in the result.
pub fn reactivate(ns: &Namespace) -> Option<Namespace> {
	if !ns.is_terminating() {
		return None;
	}

	let mut recovered = ns.clone();
	if let Some(meta) = recovered.metadata.as_mut() {
		meta.deletion_timestamp = None;
		meta.deletion_grace_period_seconds = None;
	}
	let status = recovered.status.get_or_insert_with(NamespaceStatus::default);
	status.phase = Some(NamespacePhase::Active.as_str().to_string());
	status.conditions.clear();
	Some(recovered)
}

/// Reset the namespace named by `target` to Active.
///
/// Both store calls are bounded by `deadline`.
#[instrument(skip(client, target, deadline), fields(namespace = %target.name(), key = %target.key()))]
pub async fn recover<S: KvStore>(
	client: &mut StoreClient<S>,
	target: &RecoverTarget,
	deadline: &Deadline,
	mode: Mode,
) -> Result<RecoveryReport, RecoverError> {
	let name = target.name();
	let key = target.key();

	let stored = client.get(&key, deadline).await.map_err(|e| match e {
		StoreError::NotFound { key } => RecoverError::NotFound {
			name: name.to_string(),
			key,
		},
		source => RecoverError::Read {
			name: name.to_string(),
			source,
		},
	})?;

	let original: Namespace =
		k8s_proto::decode(&stored.value).map_err(|source| RecoverError::Decode {
			name: name.to_string(),
			key: key.clone(),
			source,
		})?;

	let recovered = reactivate(&original).ok_or_else(|| RecoverError::NotTerminating {
		name: name.to_string(),
		phase: original.phase_str().map(str::to_string),
	})?;

	let encoded = k8s_proto::encode(&recovered).map_err(|source| RecoverError::Encode {
		name: name.to_string(),
		source,
	})?;

	let mut report = RecoveryReport::new(target, &original, stored.mod_revision);

	match mode {
		Mode::DryRun => {
			info!(
				revision = stored.mod_revision,
				bytes = encoded.len(),
				"dry run, not writing"
			);
			report.dry_run = true;
		}
		Mode::Write => {
			warn!(
				revision = stored.mod_revision,
				"overwriting record without a revision check"
			);
			let ack = client
				.put(&key, encoded, deadline)
				.await
				.map_err(|source| RecoverError::Write {
					name: name.to_string(),
					source,
				})?;
			info!(revision = ack.revision, "namespace reset to Active");
			report.written_revision = Some(ack.revision);
		}
	}

	Ok(report)
}
