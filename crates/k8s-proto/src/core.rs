//! `k8s.io/api/core/v1` messages.

use std::fmt;

use crate::{
	kind::{Kind, Resource},
	meta::{ObjectMeta, Time},
};

#[derive(Clone, PartialEq, prost::Message)]
pub struct Namespace {
	#[prost(message, optional, tag = "1")]
	pub metadata: Option<ObjectMeta>,
	#[prost(message, optional, tag = "2")]
	pub spec: Option<NamespaceSpec>,
	#[prost(message, optional, tag = "3")]
	pub status: Option<NamespaceStatus>,
}

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct NamespaceSpec {
	#[prost(string, repeated, tag = "1")]
	pub finalizers: Vec<String>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NamespaceStatus {
	#[prost(string, optional, tag = "1")]
	pub phase: Option<String>,
	#[prost(message, repeated, tag = "2")]
	pub conditions: Vec<NamespaceCondition>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NamespaceCondition {
	#[prost(string, optional, tag = "1")]
	pub r#type: Option<String>,
	#[prost(string, optional, tag = "2")]
	pub status: Option<String>,
	#[prost(message, optional, tag = "4")]
	pub last_transition_time: Option<Time>,
	#[prost(string, optional, tag = "5")]
	pub reason: Option<String>,
	#[prost(string, optional, tag = "6")]
	pub message: Option<String>,
}

/// Lifecycle phase stored in `status.phase`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespacePhase {
	Active,
	Terminating,
}

impl NamespacePhase {
	pub const fn as_str(self) -> &'static str {
		match self {
			NamespacePhase::Active => "Active",
			NamespacePhase::Terminating => "Terminating",
		}
	}

	pub fn parse(phase: &str) -> Option<Self> {
		match phase {
			"Active" => Some(NamespacePhase::Active),
			"Terminating" => Some(NamespacePhase::Terminating),
			_ => None,
		}
	}
}

impl fmt::Display for NamespacePhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl Namespace {
	/// Deletion was requested and finalizers have not completed yet.
	pub fn is_terminating(&self) -> bool {
		self.metadata
			.as_ref()
			.is_some_and(|meta| meta.deletion_timestamp.is_some())
	}

	/// Raw `status.phase` value, if any was stored.
	pub fn phase_str(&self) -> Option<&str> {
		self.status.as_ref().and_then(|s| s.phase.as_deref())
	}

	pub fn lifecycle_phase(&self) -> Option<NamespacePhase> {
		self.phase_str().and_then(NamespacePhase::parse)
	}
}

impl Resource for Namespace {
	const KIND: Kind = Kind::Namespace;

	fn metadata(&self) -> Option<&ObjectMeta> {
		self.metadata.as_ref()
	}
}
