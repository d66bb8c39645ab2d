//! Hierarchical, namespace-scoped configuration registry.
//!
//! Components ask the [`Registry`] for a scope by dot-delimited name
//! (`svc.sub.leaf`) and get a [`ScopeNode`]: a key/value view that inherits
//! unset keys from ancestor scopes. Scopes may be requested in any order;
//! when an ancestor shows up after its descendants, they are rewired to it.
//!
//! Values are typed ([`Value`], [`ValueKind`]). Text and path kinds hold
//! templates that are interpolated against the scope they are read from,
//! leaving unknown fields in place (see [`template`]).

pub mod error;
pub mod name;
pub mod node;
pub mod registry;
pub mod template;
pub mod value;

use std::sync::LazyLock;

pub use error::{Error, Result};
pub use name::{ROOT_NAME, ScopeName, validate_key};
pub use node::ScopeNode;
pub use registry::{Placement, Registry};
pub use template::{Fields, MAX_RECURSION_DEPTH};
pub use value::{AccessMode, Scalar, Value, ValueKind};

static GLOBAL: LazyLock<Registry> = LazyLock::new(Registry::new);

/// The process-wide registry, created on first use.
pub fn global() -> &'static Registry {
    &GLOBAL
}
