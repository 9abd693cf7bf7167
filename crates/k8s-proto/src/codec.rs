//! Conversion between stored bytes and typed resources.

use prost::Message;
use thiserror::Error;

use crate::{
	kind::{GroupVersionKind, Kind, Resource},
	runtime::Unknown,
};

/// Prefix the API server puts in front of every protobuf-encoded object.
pub const MAGIC: [u8; 4] = *b"k8s\0";

#[derive(Debug, Error)]
pub enum DecodeError {
	#[error("value does not start with the Kubernetes protobuf prefix (is the API server storing JSON?)")]
	MissingMagic,

	#[error("decoding runtime.Unknown envelope")]
	Envelope(#[source] prost::DecodeError),

	#[error("expected {expected}, found apiVersion {api_version:?} kind {kind:?}")]
	KindMismatch {
		expected: GroupVersionKind,
		api_version: String,
		kind: String,
	},

	#[error("unsupported content encoding {0:?}")]
	ContentEncoding(String),

	#[error("envelope for {0} carries no object payload")]
	MissingPayload(Kind),

	#[error("decoding {kind} payload")]
	Payload {
		kind: Kind,
		#[source]
		source: prost::DecodeError,
	},
}

#[derive(Debug, Error)]
pub enum EncodeError {
	#[error("{0} has no metadata.name")]
	MissingName(Kind),

	#[error("encoding {kind} payload")]
	Payload {
		kind: Kind,
		#[source]
		source: prost::EncodeError,
	},

	#[error("encoding runtime.Unknown envelope")]
	Envelope(#[source] prost::EncodeError),
}

/// Decode a stored value as `R`.
///
/// The envelope must name exactly `R::KIND`; anything else is rejected rather than
/// decoded into the wrong message.
pub fn decode<R: Resource>(bytes: &[u8]) -> Result<R, DecodeError> {
	let kind = R::KIND;
	let body = bytes
		.strip_prefix(MAGIC.as_slice())
		.ok_or(DecodeError::MissingMagic)?;
	let envelope = Unknown::decode(body).map_err(DecodeError::Envelope)?;

	let type_meta = envelope.type_meta.unwrap_or_default();
	if !kind.matches(&type_meta) {
		return Err(DecodeError::KindMismatch {
			expected: kind.gvk(),
			api_version: type_meta.api_version.unwrap_or_default(),
			kind: type_meta.kind.unwrap_or_default(),
		});
	}

	match envelope.content_encoding.as_deref() {
		None | Some("") => {}
		Some(other) => return Err(DecodeError::ContentEncoding(other.to_string())),
	}

	let raw = envelope.raw.ok_or(DecodeError::MissingPayload(kind))?;
	R::decode(raw.as_slice()).map_err(|source| DecodeError::Payload { kind, source })
}

/// Encode `resource` the way the API server writes it to storage.
pub fn encode<R: Resource>(resource: &R) -> Result<Vec<u8>, EncodeError> {
	let kind = R::KIND;
	if resource.name().is_none_or(str::is_empty) {
		return Err(EncodeError::MissingName(kind));
	}

	let mut raw = Vec::with_capacity(resource.encoded_len());
	resource
		.encode(&mut raw)
		.map_err(|source| EncodeError::Payload { kind, source })?;

	// The API server always writes both content fields, even when empty.
	let envelope = Unknown {
		type_meta: Some(kind.type_meta()),
		raw: Some(raw),
		content_encoding: Some(String::new()),
		content_type: Some(String::new()),
	};

	let mut out = Vec::with_capacity(MAGIC.len() + envelope.encoded_len());
	out.extend_from_slice(&MAGIC);
	envelope.encode(&mut out).map_err(EncodeError::Envelope)?;
	Ok(out)
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeMap;

	use assert_matches::assert_matches;
	use rstest::rstest;

	use super::*;
	use crate::{
		core::{Namespace, NamespaceCondition, NamespaceSpec, NamespaceStatus},
		meta::{FieldsV1, ManagedFieldsEntry, ObjectMeta, OwnerReference, Time},
		runtime::TypeMeta,
	};

	fn named(name: &str) -> Namespace {
		Namespace {
			metadata: Some(ObjectMeta {
				name: Some(name.to_string()),
				..ObjectMeta::default()
			}),
			..Namespace::default()
		}
	}

	/// A namespace shaped like what the API server persists mid-deletion.
	fn terminating_namespace() -> Namespace {
		Namespace {
			metadata: Some(ObjectMeta {
				name: Some("foo".to_string()),
				generate_name: Some(String::new()),
				namespace: Some(String::new()),
				self_link: Some(String::new()),
				uid: Some("8c5a0e4f-3f7e-4d37-9a53-2f1f2d6f1b11".to_string()),
				resource_version: Some(String::new()),
				generation: Some(0),
				creation_timestamp: Some(Time::from_unix(1_590_000_000, 0)),
				deletion_timestamp: Some(Time::from_unix(1_600_000_000, 0)),
				deletion_grace_period_seconds: Some(0),
				labels: BTreeMap::from([(
					"kubernetes.io/metadata.name".to_string(),
					"foo".to_string(),
				)]),
				annotations: BTreeMap::from([("team".to_string(), "infra".to_string())]),
				owner_references: vec![OwnerReference {
					kind: Some("Project".to_string()),
					name: Some("foo".to_string()),
					uid: Some("1234".to_string()),
					api_version: Some("example.com/v1".to_string()),
					controller: Some(true),
					block_owner_deletion: Some(false),
				}],
				finalizers: vec![],
				managed_fields: vec![ManagedFieldsEntry {
					manager: Some("kubectl-create".to_string()),
					operation: Some("Update".to_string()),
					api_version: Some("v1".to_string()),
					time: Some(Time::from_unix(1_590_000_000, 0)),
					fields_type: Some("FieldsV1".to_string()),
					fields_v1: Some(FieldsV1 {
						raw: Some(br#"{"f:status":{"f:phase":{}}}"#.to_vec()),
					}),
					subresource: Some(String::new()),
				}],
			}),
			spec: Some(NamespaceSpec {
				finalizers: vec!["kubernetes".to_string()],
			}),
			status: Some(NamespaceStatus {
				phase: Some("Terminating".to_string()),
				conditions: vec![NamespaceCondition {
					r#type: Some("NamespaceContentRemaining".to_string()),
					status: Some("True".to_string()),
					last_transition_time: Some(Time::from_unix(1_600_000_001, 0)),
					reason: Some("SomeResourcesRemain".to_string()),
					message: Some("Some resources are remaining: pods. has 1 resource instances".to_string()),
				}],
			}),
		}
	}

	#[test]
	fn test_encode_matches_api_server_layout() {
		let bytes = encode(&named("foo")).unwrap();

		let mut expected = b"k8s\0".to_vec();
		// typeMeta { apiVersion: "v1", kind: "Namespace" }
		expected.extend_from_slice(&[0x0a, 0x0f, 0x0a, 0x02]);
		expected.extend_from_slice(b"v1");
		expected.extend_from_slice(&[0x12, 0x09]);
		expected.extend_from_slice(b"Namespace");
		// raw: Namespace { metadata { name: "foo" } }
		expected.extend_from_slice(&[0x12, 0x07, 0x0a, 0x05, 0x0a, 0x03]);
		expected.extend_from_slice(b"foo");
		// contentEncoding "", contentType ""
		expected.extend_from_slice(&[0x1a, 0x00, 0x22, 0x00]);

		assert_eq!(bytes, expected);
	}

	/// Layout of a terminating namespace as the API server marshals it: every
	/// scalar and string field of a set message is written, empty or not, in field
	/// number order.
	#[rustfmt::skip]
	fn api_server_terminating_payload() -> Vec<u8> {
		let parts: &[&[u8]] = &[
			&[0x0a, 0x4e], // metadata
				&[0x0a, 0x03], // name: "foo"
				b"foo",
				&[0x12, 0x00], // generateName
				&[0x1a, 0x00], // namespace
				&[0x22, 0x00], // selfLink
				&[0x2a, 0x03], // uid: "u-1"
				b"u-1",
				&[0x32, 0x00], // resourceVersion
				&[0x38, 0x00], // generation
				&[0x42, 0x08], // creationTimestamp
					&[0x08, 0x80, 0xf3, 0x95, 0xf6, 0x05], // seconds
					&[0x10, 0x00], // nanos
				&[0x4a, 0x08], // deletionTimestamp
					&[0x08, 0x80, 0xa0, 0xf8, 0xfa, 0x05], // seconds
					&[0x10, 0x00], // nanos
				&[0x50, 0x00], // deletionGracePeriodSeconds
				&[0x5a, 0x22], // labels entry
					&[0x0a, 0x1b], // key: "kubernetes.io/metadata.name"
					b"kubernetes.io/metadata.name",
					&[0x12, 0x03], // value: "foo"
					b"foo",
			&[0x12, 0x0c], // spec
				&[0x0a, 0x0a], // finalizers: "kubernetes"
				b"kubernetes",
			&[0x1a, 0x51], // status
				&[0x0a, 0x0b], // phase: "Terminating"
				b"Terminating",
				&[0x12, 0x42], // conditions
					&[0x0a, 0x19], // type: "NamespaceContentRemaining"
					b"NamespaceContentRemaining",
					&[0x12, 0x04], // status: "True"
					b"True",
					&[0x22, 0x08], // lastTransitionTime
						&[0x08, 0x81, 0xa0, 0xf8, 0xfa, 0x05], // seconds
						&[0x10, 0x00], // nanos
					&[0x2a, 0x13], // reason: "SomeResourcesRemain"
					b"SomeResourcesRemain",
					&[0x32, 0x00], // message
		];
		parts.concat()
	}

	#[test]
	fn test_terminating_namespace_matches_api_server_bytes() {
		let ns = Namespace {
			metadata: Some(ObjectMeta {
				name: Some("foo".to_string()),
				generate_name: Some(String::new()),
				namespace: Some(String::new()),
				self_link: Some(String::new()),
				uid: Some("u-1".to_string()),
				resource_version: Some(String::new()),
				generation: Some(0),
				creation_timestamp: Some(Time::from_unix(1_590_000_000, 0)),
				deletion_timestamp: Some(Time::from_unix(1_600_000_000, 0)),
				deletion_grace_period_seconds: Some(0),
				labels: BTreeMap::from([(
					"kubernetes.io/metadata.name".to_string(),
					"foo".to_string(),
				)]),
				..ObjectMeta::default()
			}),
			spec: Some(NamespaceSpec {
				finalizers: vec!["kubernetes".to_string()],
			}),
			status: Some(NamespaceStatus {
				phase: Some("Terminating".to_string()),
				conditions: vec![NamespaceCondition {
					r#type: Some("NamespaceContentRemaining".to_string()),
					status: Some("True".to_string()),
					last_transition_time: Some(Time::from_unix(1_600_000_001, 0)),
					reason: Some("SomeResourcesRemain".to_string()),
					message: Some(String::new()),
				}],
			}),
		};

		let raw = api_server_terminating_payload();
		assert_eq!(raw.len(), 177);
		assert_eq!(ns.encode_to_vec(), raw);

		let mut stored = b"k8s\0".to_vec();
		stored.extend_from_slice(&[0x0a, 0x0f, 0x0a, 0x02]);
		stored.extend_from_slice(b"v1");
		stored.extend_from_slice(&[0x12, 0x09]);
		stored.extend_from_slice(b"Namespace");
		// raw, length 177 as a two byte varint
		stored.extend_from_slice(&[0x12, 0xb1, 0x01]);
		stored.extend_from_slice(&raw);
		stored.extend_from_slice(&[0x1a, 0x00, 0x22, 0x00]);

		assert_eq!(decode::<Namespace>(&stored).unwrap(), ns);
		assert_eq!(encode(&ns).unwrap(), stored);
	}

	#[test]
	fn test_round_trip_preserves_every_field() {
		let original = terminating_namespace();
		let decoded: Namespace = decode(&encode(&original).unwrap()).unwrap();
		assert_eq!(decoded, original);
	}

	#[test]
	fn test_reencode_is_byte_stable() {
		let first = encode(&terminating_namespace()).unwrap();
		let decoded: Namespace = decode(&first).unwrap();
		assert_eq!(encode(&decoded).unwrap(), first);
	}

	#[test]
	fn test_decode_rejects_json_value() {
		let json = br#"{"kind":"Namespace","apiVersion":"v1"}"#;
		assert_matches!(decode::<Namespace>(json), Err(DecodeError::MissingMagic));
	}

	#[rstest]
	#[case::wrong_kind("v1", "ConfigMap")]
	#[case::wrong_version("v1beta1", "Namespace")]
	#[case::empty("", "")]
	fn test_decode_rejects_other_kinds(#[case] api_version: &str, #[case] kind: &str) {
		let envelope = Unknown {
			type_meta: Some(TypeMeta {
				api_version: Some(api_version.to_string()),
				kind: Some(kind.to_string()),
			}),
			raw: Some(named("foo").encode_to_vec()),
			content_encoding: Some(String::new()),
			content_type: Some(String::new()),
		};
		let mut bytes = MAGIC.to_vec();
		bytes.extend(envelope.encode_to_vec());

		assert_matches!(
			decode::<Namespace>(&bytes),
			Err(DecodeError::KindMismatch { api_version: a, kind: k, .. })
				if a == api_version && k == kind
		);
	}

	#[test]
	fn test_decode_rejects_missing_payload() {
		let envelope = Unknown {
			type_meta: Some(Kind::Namespace.type_meta()),
			..Unknown::default()
		};
		let mut bytes = MAGIC.to_vec();
		bytes.extend(envelope.encode_to_vec());

		assert_matches!(
			decode::<Namespace>(&bytes),
			Err(DecodeError::MissingPayload(Kind::Namespace))
		);
	}

	#[test]
	fn test_decode_rejects_compressed_payload() {
		let envelope = Unknown {
			type_meta: Some(Kind::Namespace.type_meta()),
			raw: Some(named("foo").encode_to_vec()),
			content_encoding: Some("gzip".to_string()),
			content_type: Some(String::new()),
		};
		let mut bytes = MAGIC.to_vec();
		bytes.extend(envelope.encode_to_vec());

		assert_matches!(
			decode::<Namespace>(&bytes),
			Err(DecodeError::ContentEncoding(enc)) if enc == "gzip"
		);
	}

	#[test]
	fn test_decode_rejects_truncated_value() {
		let bytes = encode(&terminating_namespace()).unwrap();
		let truncated = &bytes[..bytes.len() / 2];
		assert_matches!(
			decode::<Namespace>(truncated),
			Err(DecodeError::Envelope(_) | DecodeError::Payload { .. })
		);
	}

	#[rstest]
	#[case::no_metadata(Namespace::default())]
	#[case::empty_name(named(""))]
	fn test_encode_requires_name(#[case] ns: Namespace) {
		assert_matches!(encode(&ns), Err(EncodeError::MissingName(Kind::Namespace)));
	}
}
