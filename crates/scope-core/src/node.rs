//! Scope nodes
//!
//! A [`ScopeNode`] is a read-mostly key/value view. Keys it does not define
//! locally are looked up through its parent chain, which always ends at the
//! root scope. Parent links are back-references for lookup only and are
//! rewritten by the registry as closer ancestors materialize.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::name::{ScopeName, validate_key};
use crate::template::Fields;
use crate::value::{Scalar, Value, ValueKind};
use crate::{Error, Result};

/// A named configuration scope.
pub struct ScopeNode {
    name: ScopeName,
    parent: RwLock<Option<Arc<ScopeNode>>>,
    items: RwLock<BTreeMap<String, Value>>,
}

impl ScopeNode {
    pub(crate) fn new(name: ScopeName) -> Self {
        Self {
            name,
            parent: RwLock::new(None),
            items: RwLock::new(BTreeMap::new()),
        }
    }

    pub(crate) fn new_root() -> Self {
        Self::new(ScopeName::root())
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn scope_name(&self) -> &ScopeName {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.name.is_root()
    }

    /// The node inherited lookups go to; `None` only for the root.
    pub fn parent(&self) -> Option<Arc<ScopeNode>> {
        self.parent.read().clone()
    }

    pub(crate) fn set_parent(&self, parent: Arc<ScopeNode>) {
        *self.parent.write() = Some(parent);
    }

    /// Find the nearest definition of `key`, walking up the parent chain.
    pub fn lookup(&self, key: &str) -> Result<Value> {
        if let Some(value) = self.items.read().get(key) {
            return Ok(value.clone());
        }
        let mut current = self.parent();
        while let Some(node) = current {
            if let Some(value) = node.items.read().get(key) {
                tracing::trace!(scope = %self.name, key, from = %node.name, "Inherited lookup");
                return Ok(value.clone());
            }
            current = node.parent();
        }
        Err(Error::key_not_found(self.name.as_str(), key))
    }

    /// Look up `key` and resolve it against this node.
    ///
    /// Templates inherited from an ancestor are filled from this node's view,
    /// so a child's own keys take part in the interpolation. An unset value is
    /// reported as a missing key.
    pub fn resolved_lookup(&self, key: &str) -> Result<Scalar> {
        self.lookup(key)?
            .resolve(self)?
            .ok_or_else(|| Error::key_not_found(self.name.as_str(), key))
    }

    /// Like [`resolved_lookup`](Self::resolved_lookup), with `extra` fields
    /// taking precedence over the node's keys during interpolation.
    pub fn resolved_lookup_with(&self, key: &str, extra: &BTreeMap<String, Scalar>) -> Result<Scalar> {
        let overlay = Overlay { extra, node: self };
        self.lookup(key)?
            .resolve(&overlay)?
            .ok_or_else(|| Error::key_not_found(self.name.as_str(), key))
    }

    /// Resolve a path template that will be read from.
    pub fn input_path(&self, key: &str, extra: &BTreeMap<String, Scalar>) -> Result<PathBuf> {
        self.path(key, extra, "reading")
    }

    /// Resolve a path template that will be written to.
    pub fn output_path(&self, key: &str, extra: &BTreeMap<String, Scalar>) -> Result<PathBuf> {
        self.path(key, extra, "writing")
    }

    fn path(&self, key: &str, extra: &BTreeMap<String, Scalar>, requested: &str) -> Result<PathBuf> {
        let value = self.lookup(key)?;
        let ValueKind::PathTemplate { mode } = value.kind() else {
            return Err(Error::type_mismatch(
                "path",
                format!("{key} ({})", value.kind().name()),
            ));
        };
        let permitted = match requested {
            "reading" => mode.can_read(),
            _ => mode.can_write(),
        };
        if !permitted {
            return Err(Error::AccessMode {
                scope: self.name.to_string(),
                key: key.to_string(),
                mode: mode.to_string(),
                requested: requested.to_string(),
            });
        }
        let resolved = self.resolved_lookup_with(key, extra)?;
        Ok(PathBuf::from(resolved.to_string()))
    }

    /// Reassign existing local keys.
    ///
    /// Every key must already be defined on this node; an inherited
    /// definition is not enough. Either all keys are applied or none are.
    pub fn update<I, K, V>(&self, partial: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Scalar>,
    {
        let mut items = self.items.write();
        let mut staged = Vec::new();
        for (key, raw) in partial {
            let key = key.as_ref();
            let Some(current) = items.get(key) else {
                return Err(Error::key_not_found(self.name.as_str(), key));
            };
            let mut next = current.clone();
            next.reassign(raw)?;
            staged.push((key.to_string(), next));
        }
        for (key, value) in staged {
            tracing::debug!(scope = %self.name, key = %key, raw = ?value.raw(), "Updated setting");
            items.insert(key, value);
        }
        Ok(())
    }

    /// Define local keys, replacing any existing definitions of the same keys.
    ///
    /// This is the only way new keys come into existence on a node. Every
    /// key must pass [`validate_key`]; otherwise nothing is defined.
    pub fn initialize<I, K, V>(&self, defaults: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let defaults: Vec<(String, Value)> = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for (key, _) in &defaults {
            validate_key(key)?;
        }
        let mut items = self.items.write();
        items.extend(defaults);
        tracing::debug!(scope = %self.name, keys = items.len(), "Initialized scope");
        Ok(())
    }

    /// Number of locally defined keys.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn contains_local(&self, key: &str) -> bool {
        self.items.read().contains_key(key)
    }

    /// Whether `key` is defined here or on any ancestor.
    pub fn contains_key(&self, key: &str) -> bool {
        self.lookup(key).is_ok()
    }

    /// Every visible key, each once, nearest definition first.
    pub fn keys(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut keys = Vec::new();
        self.walk(|node| {
            for key in node.items.read().keys() {
                if seen.insert(key.clone()) {
                    keys.push(key.clone());
                }
            }
        });
        keys
    }

    /// Locally defined keys whose values are tracked.
    pub fn tracked_items(&self) -> Vec<(String, Value)> {
        self.items
            .read()
            .iter()
            .filter(|(_, value)| value.is_tracked())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// All locally defined keys and values.
    pub fn local_items(&self) -> Vec<(String, Value)> {
        self.items
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// The effective resolved view: every visible key with a value set.
    pub fn snapshot(&self) -> Result<BTreeMap<String, Scalar>> {
        let mut resolved = BTreeMap::new();
        for key in self.keys() {
            match self.resolved_lookup(&key) {
                Ok(value) => {
                    resolved.insert(key, value);
                }
                Err(e) if e.is_key_not_found() => {}
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }

    fn walk(&self, mut visit: impl FnMut(&ScopeNode)) {
        visit(self);
        let mut current = self.parent();
        while let Some(node) = current {
            visit(&node);
            current = node.parent();
        }
    }
}

impl Fields for ScopeNode {
    fn field(&self, name: &str, depth: usize) -> Result<Option<Scalar>> {
        match self.lookup(name) {
            Ok(value) => value.resolve_at(self, depth),
            Err(e) if e.is_key_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

struct Overlay<'a> {
    extra: &'a BTreeMap<String, Scalar>,
    node: &'a ScopeNode,
}

impl Fields for Overlay<'_> {
    fn field(&self, name: &str, depth: usize) -> Result<Option<Scalar>> {
        if let Some(value) = self.extra.get(name) {
            return Ok(Some(value.clone()));
        }
        match self.node.lookup(name) {
            Ok(value) => value.resolve_at(self, depth),
            Err(e) if e.is_key_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

impl PartialEq for ScopeNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ScopeNode {}

impl fmt::Debug for ScopeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parent = self.parent().map(|p| p.name().to_string());
        f.debug_struct("ScopeNode")
            .field("name", &self.name.as_str())
            .field("parent", &parent)
            .field("keys", &self.items.read().keys().collect::<Vec<_>>())
            .finish()
    }
}
