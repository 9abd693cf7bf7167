//! Static mapping from the resource types this crate knows to their
//! group/version/kind and storage layout.

use std::fmt;

use crate::{meta::ObjectMeta, runtime::TypeMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupVersionKind {
	pub group: &'static str,
	pub version: &'static str,
	pub kind: &'static str,
}

impl GroupVersionKind {
	/// `version` for the core group, `group/version` otherwise.
	pub fn api_version(&self) -> String {
		if self.group.is_empty() {
			self.version.to_string()
		} else {
			format!("{}/{}", self.group, self.version)
		}
	}
}

impl fmt::Display for GroupVersionKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}", self.api_version(), self.kind)
	}
}

/// Resource kinds with a codec in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
	Namespace,
}

impl Kind {
	pub const fn gvk(self) -> GroupVersionKind {
		match self {
			Kind::Namespace => GroupVersionKind {
				group: "",
				version: "v1",
				kind: "Namespace",
			},
		}
	}

	/// Path segment under the registry prefix where objects of this kind live.
	pub const fn resource(self) -> &'static str {
		match self {
			Kind::Namespace => "namespaces",
		}
	}

	pub fn type_meta(self) -> TypeMeta {
		let gvk = self.gvk();
		TypeMeta {
			api_version: Some(gvk.api_version()),
			kind: Some(gvk.kind.to_string()),
		}
	}

	pub(crate) fn matches(self, type_meta: &TypeMeta) -> bool {
		let gvk = self.gvk();
		type_meta.api_version.as_deref() == Some(gvk.api_version().as_str())
			&& type_meta.kind.as_deref() == Some(gvk.kind)
	}
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.gvk().kind)
	}
}

/// A typed resource with a fixed kind.
pub trait Resource: prost::Message + Default {
	const KIND: Kind;

	fn metadata(&self) -> Option<&ObjectMeta>;

	fn name(&self) -> Option<&str> {
		self.metadata().and_then(|meta| meta.name.as_deref())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_core_group_api_version() {
		assert_eq!(Kind::Namespace.gvk().api_version(), "v1");
		assert_eq!(Kind::Namespace.gvk().to_string(), "v1/Namespace");
	}

	#[test]
	fn test_named_group_api_version() {
		let gvk = GroupVersionKind {
			group: "apps",
			version: "v1",
			kind: "Deployment",
		};
		assert_eq!(gvk.api_version(), "apps/v1");
	}

	#[test]
	fn test_matches_type_meta() {
		assert!(Kind::Namespace.matches(&Kind::Namespace.type_meta()));
		assert!(!Kind::Namespace.matches(&TypeMeta {
			api_version: Some("v1".to_string()),
			kind: Some("ConfigMap".to_string()),
		}));
		assert!(!Kind::Namespace.matches(&TypeMeta::default()));
	}
}
