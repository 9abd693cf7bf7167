//! Kubernetes protobuf storage encoding.
//!
//! The API server stores objects in etcd as a 4-byte magic prefix followed by a
//! `runtime.Unknown` envelope, whose `raw` field holds the object's own protobuf
//! message. This crate models the subset of the `k8s.io/api` schema resetns needs
//! (the full `v1/Namespace` message) and converts between that envelope and typed
//! resources.
//!
//! Every field of the modelled messages is declared, so an object decoded from the
//! store and encoded again carries the same data other readers of that key expect.

pub mod codec;
pub mod core;
pub mod kind;
pub mod meta;
pub mod runtime;

pub use codec::{decode, encode, DecodeError, EncodeError, MAGIC};
pub use kind::{GroupVersionKind, Kind, Resource};
