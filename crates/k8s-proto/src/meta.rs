//! `k8s.io/apimachinery/pkg/apis/meta/v1` messages.

use std::collections::BTreeMap;

/// A wall-clock instant with nanosecond precision.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Time {
	#[prost(int64, optional, tag = "1")]
	pub seconds: Option<i64>,
	#[prost(int32, optional, tag = "2")]
	pub nanos: Option<i32>,
}

impl Time {
	pub fn from_unix(seconds: i64, nanos: i32) -> Self {
		Self {
			seconds: Some(seconds),
			nanos: Some(nanos),
		}
	}
}

/// Metadata every persisted resource carries.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ObjectMeta {
	#[prost(string, optional, tag = "1")]
	pub name: Option<String>,
	#[prost(string, optional, tag = "2")]
	pub generate_name: Option<String>,
	#[prost(string, optional, tag = "3")]
	pub namespace: Option<String>,
	#[prost(string, optional, tag = "4")]
	pub self_link: Option<String>,
	#[prost(string, optional, tag = "5")]
	pub uid: Option<String>,
	#[prost(string, optional, tag = "6")]
	pub resource_version: Option<String>,
	#[prost(int64, optional, tag = "7")]
	pub generation: Option<i64>,
	#[prost(message, optional, tag = "8")]
	pub creation_timestamp: Option<Time>,
	/// Set by the API server when deletion was requested. Presence means the
	/// object is waiting on its finalizers.
	#[prost(message, optional, tag = "9")]
	pub deletion_timestamp: Option<Time>,
	#[prost(int64, optional, tag = "10")]
	pub deletion_grace_period_seconds: Option<i64>,
	#[prost(btree_map = "string, string", tag = "11")]
	pub labels: BTreeMap<String, String>,
	#[prost(btree_map = "string, string", tag = "12")]
	pub annotations: BTreeMap<String, String>,
	#[prost(message, repeated, tag = "13")]
	pub owner_references: Vec<OwnerReference>,
	#[prost(string, repeated, tag = "14")]
	pub finalizers: Vec<String>,
	#[prost(message, repeated, tag = "17")]
	pub managed_fields: Vec<ManagedFieldsEntry>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct OwnerReference {
	#[prost(string, optional, tag = "1")]
	pub kind: Option<String>,
	#[prost(string, optional, tag = "3")]
	pub name: Option<String>,
	#[prost(string, optional, tag = "4")]
	pub uid: Option<String>,
	#[prost(string, optional, tag = "5")]
	pub api_version: Option<String>,
	#[prost(bool, optional, tag = "6")]
	pub controller: Option<bool>,
	#[prost(bool, optional, tag = "7")]
	pub block_owner_deletion: Option<bool>,
}

/// Server-side apply bookkeeping for one field manager.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ManagedFieldsEntry {
	#[prost(string, optional, tag = "1")]
	pub manager: Option<String>,
	#[prost(string, optional, tag = "2")]
	pub operation: Option<String>,
	#[prost(string, optional, tag = "3")]
	pub api_version: Option<String>,
	#[prost(message, optional, tag = "4")]
	pub time: Option<Time>,
	#[prost(string, optional, tag = "6")]
	pub fields_type: Option<String>,
	#[prost(message, optional, tag = "7")]
	pub fields_v1: Option<FieldsV1>,
	#[prost(string, optional, tag = "8")]
	pub subresource: Option<String>,
}

/// Opaque JSON field set, kept as raw bytes.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct FieldsV1 {
	#[prost(bytes = "vec", optional, tag = "1")]
	pub raw: Option<Vec<u8>>,
}
