//! `k8s.io/apimachinery/pkg/runtime` envelope messages.

#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct TypeMeta {
	#[prost(string, optional, tag = "1")]
	pub api_version: Option<String>,
	#[prost(string, optional, tag = "2")]
	pub kind: Option<String>,
}

/// Wrapper the API server writes around every protobuf-encoded object.
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Unknown {
	#[prost(message, optional, tag = "1")]
	pub type_meta: Option<TypeMeta>,
	/// The object's own protobuf encoding.
	#[prost(bytes = "vec", optional, tag = "2")]
	pub raw: Option<Vec<u8>>,
	#[prost(string, optional, tag = "3")]
	pub content_encoding: Option<String>,
	#[prost(string, optional, tag = "4")]
	pub content_type: Option<String>,
}
