//! The scope registry
//!
//! The registry maps scope names to materialized nodes or to unresolved
//! markers. Scopes may be requested in any order: a descendant requested
//! before its ancestors is attached to the nearest ancestor that exists, and
//! markers are left at the missing ancestor names. When one of those names is
//! later requested, the waiting descendants are rewired to the new node.
//!
//! # Example
//!
//! ```
//! use scope_core::{Registry, Scalar};
//!
//! let registry = Registry::new();
//! let leaf = registry.get_or_create("a.b.c").unwrap();
//! assert!(leaf.parent().unwrap().is_root());
//!
//! registry.get_or_create_with("a", [("x", 5)]).unwrap();
//! assert_eq!(leaf.parent().unwrap().name(), "a");
//! assert_eq!(leaf.resolved_lookup("x").unwrap(), Scalar::Integer(5));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::name::{ROOT_NAME, ScopeName, validate_key};
use crate::node::ScopeNode;
use crate::value::Value;
use crate::Result;

/// Placeholder for an ancestor name that descendants needed before it
/// was requested itself.
#[derive(Debug)]
struct Marker {
    waiting: Vec<Arc<ScopeNode>>,
}

impl Marker {
    fn new(node: Arc<ScopeNode>) -> Self {
        Self {
            waiting: vec![node],
        }
    }

    fn wait(&mut self, node: Arc<ScopeNode>) {
        if !self.waiting.iter().any(|w| w.name() == node.name()) {
            self.waiting.push(node);
        }
    }
}

#[derive(Debug)]
enum Entry {
    Node(Arc<ScopeNode>),
    Marker(Marker),
}

/// How a name currently sits in the registry, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// A materialized scope and the name of its parent (`None` for root)
    Node { parent: Option<String> },
    /// An unresolved marker and the names of the descendants waiting on it
    Marker { waiting: Vec<String> },
}

/// Process-lifetime directory of scopes.
///
/// All topology changes happen inside one critical section, so concurrent
/// callers requesting overlapping names never observe a half-rewired
/// hierarchy. Reads on a node never take the registry lock.
#[derive(Debug)]
pub struct Registry {
    root: Arc<ScopeNode>,
    entries: Mutex<BTreeMap<String, Entry>>,
}

impl Registry {
    /// Create a registry holding only the root scope.
    pub fn new() -> Self {
        let root = Arc::new(ScopeNode::new_root());
        let mut entries = BTreeMap::new();
        entries.insert(ROOT_NAME.to_string(), Entry::Node(root.clone()));
        Self {
            root,
            entries: Mutex::new(entries),
        }
    }

    pub fn root(&self) -> Arc<ScopeNode> {
        self.root.clone()
    }

    /// Return the scope called `name`, creating it if needed.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<ScopeNode>> {
        self.acquire(name, None)
    }

    /// Return the scope called `name`, creating it if needed and seeding it
    /// with `defaults` when it has no keys yet.
    ///
    /// Defaults are first-writer-wins: a scope that already holds keys keeps
    /// them and the new defaults are ignored. Use
    /// [`ScopeNode::update`] to change existing keys.
    pub fn get_or_create_with<I, K, V>(&self, name: &str, defaults: I) -> Result<Arc<ScopeNode>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let defaults: BTreeMap<String, Value> = defaults
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        for key in defaults.keys() {
            validate_key(key)?;
        }
        self.acquire(name, Some(defaults))
    }

    fn acquire(
        &self,
        name: &str,
        defaults: Option<BTreeMap<String, Value>>,
    ) -> Result<Arc<ScopeNode>> {
        let name = ScopeName::parse(name)?;
        let mut entries = self.entries.lock();

        let node = match entries.remove(name.as_str()) {
            Some(Entry::Node(node)) => {
                entries.insert(name.to_string(), Entry::Node(node.clone()));
                node
            }
            Some(Entry::Marker(marker)) => {
                let node = Arc::new(ScopeNode::new(name.clone()));
                tracing::debug!(
                    scope = %name,
                    waiting = marker.waiting.len(),
                    "Promoting marker to scope"
                );
                Self::adopt_waiting(&node, marker);
                self.attach(&mut entries, &node);
                entries.insert(name.to_string(), Entry::Node(node.clone()));
                node
            }
            None => {
                let node = Arc::new(ScopeNode::new(name.clone()));
                self.attach(&mut entries, &node);
                tracing::debug!(
                    scope = %name,
                    parent = ?node.parent().map(|p| p.name().to_string()),
                    "Created scope"
                );
                entries.insert(name.to_string(), Entry::Node(node.clone()));
                node
            }
        };

        if let Some(defaults) = defaults {
            if node.is_empty() {
                node.initialize(defaults)?;
            } else if !defaults.is_empty() {
                tracing::debug!(scope = %name, "Scope already initialized, ignoring defaults");
            }
        }
        Ok(node)
    }

    /// Rewire descendants that waited on a marker to the node replacing it,
    /// unless they already sit under a closer ancestor.
    fn adopt_waiting(node: &Arc<ScopeNode>, marker: Marker) {
        for waiting in marker.waiting {
            let closer = waiting
                .parent()
                .is_some_and(|current| node.scope_name().is_ancestor_of(current.name()));
            if !closer {
                tracing::debug!(scope = %waiting.name(), parent = %node.name(), "Reparenting scope");
                waiting.set_parent(node.clone());
            }
        }
    }

    /// Point `node` at its nearest materialized ancestor, leaving markers at
    /// the missing names in between.
    fn attach(&self, entries: &mut BTreeMap<String, Entry>, node: &Arc<ScopeNode>) {
        let mut parent = None;
        for ancestor in node.scope_name().ancestors() {
            match entries.get_mut(ancestor) {
                Some(Entry::Node(found)) => {
                    parent = Some(found.clone());
                    break;
                }
                Some(Entry::Marker(marker)) => marker.wait(node.clone()),
                None => {
                    entries.insert(ancestor.to_string(), Entry::Marker(Marker::new(node.clone())));
                }
            }
        }
        node.set_parent(parent.unwrap_or_else(|| self.root.clone()));
    }

    /// The materialized scope called `name`, without creating it.
    pub fn get(&self, name: &str) -> Option<Arc<ScopeNode>> {
        match self.entries.lock().get(name) {
            Some(Entry::Node(node)) => Some(node.clone()),
            _ => None,
        }
    }

    /// The scope `suffix` below `node`.
    pub fn child(&self, node: &ScopeNode, suffix: &str) -> Result<Arc<ScopeNode>> {
        if node.is_root() {
            return self.get_or_create(suffix);
        }
        let name = node.scope_name().join(suffix)?;
        self.get_or_create(name.as_str())
    }

    /// Every materialized scope, root included, ordered by name.
    pub fn scopes(&self) -> Vec<Arc<ScopeNode>> {
        self.entries
            .lock()
            .values()
            .filter_map(|entry| match entry {
                Entry::Node(node) => Some(node.clone()),
                Entry::Marker(_) => None,
            })
            .collect()
    }

    pub fn scope_names(&self) -> Vec<String> {
        self.scopes().iter().map(|n| n.name().to_string()).collect()
    }

    /// Names that are only markers so far.
    pub fn marker_names(&self) -> Vec<String> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| matches!(entry, Entry::Marker(_)))
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Snapshot of every known name and how it is placed.
    pub fn topology(&self) -> BTreeMap<String, Placement> {
        self.entries
            .lock()
            .iter()
            .map(|(name, entry)| {
                let placement = match entry {
                    Entry::Node(node) => Placement::Node {
                        parent: node.parent().map(|p| p.name().to_string()),
                    },
                    Entry::Marker(marker) => Placement::Marker {
                        waiting: marker.waiting.iter().map(|w| w.name().to_string()).collect(),
                    },
                };
                (name.clone(), placement)
            })
            .collect()
    }

    /// Number of materialized scopes, root included.
    pub fn len(&self) -> usize {
        self.scopes().len()
    }

    /// True when only the root scope exists.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;
    use crate::Error;
    use pretty_assertions::assert_eq;

    fn parent_of(registry: &Registry, name: &str) -> String {
        registry
            .get(name)
            .and_then(|n| n.parent())
            .map(|p| p.name().to_string())
            .unwrap()
    }

    #[test]
    fn test_new_registry_has_only_root() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.scope_names(), vec!["root"]);
        assert!(registry.root().parent().is_none());
    }

    #[test]
    fn test_get_or_create_is_idempotent() {
        let registry = Registry::new();
        let first = registry.get_or_create("svc.sub").unwrap();
        let second = registry.get_or_create("svc.sub").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_invalid_name() {
        let registry = Registry::new();
        for bad in ["", "a..b", ".a", "a b"] {
            let err = registry.get_or_create(bad).unwrap_err();
            assert!(matches!(err, Error::InvalidName { .. }), "{bad}: {err}");
        }
        assert_eq!(registry.scope_names(), vec!["root"]);
    }

    #[test]
    fn test_dotted_default_key_is_rejected_before_creation() {
        let registry = Registry::new();
        let err = registry.get_or_create_with("a", [("b.c", 1)]).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }), "{err}");
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_root_name_returns_root() {
        let registry = Registry::new();
        let root = registry.get_or_create_with("root", [("level", "info")]).unwrap();
        assert!(Arc::ptr_eq(&root, &registry.root()));
        assert_eq!(root.resolved_lookup("level").unwrap(), Scalar::from("info"));

        let child = registry.get_or_create("root.sub").unwrap();
        assert_eq!(child.parent().unwrap().name(), "root");
    }

    #[test]
    fn test_descendant_first_leaves_markers() {
        let registry = Registry::new();
        registry.get_or_create("a.b.c").unwrap();

        assert_eq!(parent_of(&registry, "a.b.c"), "root");
        assert_eq!(registry.marker_names(), vec!["a", "a.b"]);
        assert_eq!(
            registry.topology()["a"],
            Placement::Marker {
                waiting: vec!["a.b.c".to_string()]
            }
        );
    }

    #[test]
    fn test_reparenting_on_ancestor_materialization() {
        let registry = Registry::new();
        let leaf = registry.get_or_create("a.b.c").unwrap();
        registry.get_or_create_with("a", [("x", 5)]).unwrap();

        assert_eq!(parent_of(&registry, "a.b.c"), "a");
        assert_eq!(leaf.resolved_lookup("x").unwrap(), Scalar::Integer(5));
        assert_eq!(registry.marker_names(), vec!["a.b"]);
    }

    #[test]
    fn test_farther_ancestor_does_not_steal_closer_parent() {
        let registry = Registry::new();
        registry.get_or_create("a.b.c.d").unwrap();
        registry.get_or_create("a.b").unwrap();
        assert_eq!(parent_of(&registry, "a.b.c.d"), "a.b");

        registry.get_or_create("a").unwrap();
        assert_eq!(parent_of(&registry, "a.b.c.d"), "a.b");
        assert_eq!(parent_of(&registry, "a.b"), "a");

        registry.get_or_create("a.b.c").unwrap();
        assert_eq!(parent_of(&registry, "a.b.c.d"), "a.b.c");
        assert_eq!(parent_of(&registry, "a.b.c"), "a.b");
        assert!(registry.marker_names().is_empty());
    }

    #[test]
    fn test_similar_prefix_is_not_an_ancestor() {
        let registry = Registry::new();
        registry.get_or_create("a.bc.d").unwrap();
        registry.get_or_create("a.b").unwrap();
        assert_eq!(parent_of(&registry, "a.bc.d"), "root");
        assert_eq!(registry.marker_names(), vec!["a", "a.bc"]);
    }

    #[test]
    fn test_defaults_first_writer_wins() {
        let registry = Registry::new();
        let node = registry.get_or_create_with("m", [("draws", 1000)]).unwrap();
        registry.get_or_create_with("m", [("draws", 5)]).unwrap();
        assert_eq!(node.resolved_lookup("draws").unwrap(), Scalar::Integer(1000));

        let bare = registry.get_or_create("late").unwrap();
        registry.get_or_create_with("late", [("k", true)]).unwrap();
        assert_eq!(bare.resolved_lookup("k").unwrap(), Scalar::Boolean(true));
    }

    #[test]
    fn test_child_joins_names() {
        let registry = Registry::new();
        let parent = registry.get_or_create("svc").unwrap();
        let child = registry.child(&parent, "worker").unwrap();
        assert_eq!(child.name(), "svc.worker");
        assert_eq!(child.parent().unwrap().name(), "svc");

        let top = registry.child(&registry.root(), "top").unwrap();
        assert_eq!(top.name(), "top");
    }
}
