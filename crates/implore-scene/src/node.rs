//! Scene nodes
//!
//! A [`SceneNode`] is a cheap-to-clone handle. Clones share the same
//! attribute bag, children and geometry, and compare equal by identity, so a
//! node can sit in several collections (and provenance references) at once.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use crate::geometry::Mesh;
use crate::value::{AttrValue, Attributes};

/// Stable node identity (UUID v4).
pub type NodeId = Uuid;

/// Shared handle to a node in the scene hierarchy.
#[derive(Clone)]
pub struct SceneNode {
    inner: Arc<NodeInner>,
}

struct NodeInner {
    id: NodeId,
    name: String,
    attributes: RwLock<Attributes>,
    children: RwLock<Vec<SceneNode>>,
    geometry: RwLock<Option<Arc<Mesh>>>,
}

// A panicked writer cannot leave an attribute map half-updated, so poisoned
// locks are read through.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), name)
    }

    pub fn with_id(id: NodeId, name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(NodeInner {
                id,
                name: name.into(),
                attributes: RwLock::new(Attributes::new()),
                children: RwLock::new(Vec::new()),
                geometry: RwLock::new(None),
            }),
        }
    }

    /// Builder-style attribute assignment
    pub fn with_attribute(self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// Builder-style geometry assignment
    pub fn with_geometry(self, mesh: Mesh) -> Self {
        self.set_geometry(mesh);
        self
    }

    /// Builder-style child attachment
    pub fn with_child(self, child: SceneNode) -> Self {
        self.add_child(child);
        self
    }

    pub fn id(&self) -> NodeId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn attribute(&self, key: &str) -> Option<AttrValue> {
        read(&self.inner.attributes).get(key).cloned()
    }

    /// Set a top-level attribute, returning the previous value
    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<AttrValue>) -> Option<AttrValue> {
        write(&self.inner.attributes).insert(key.into(), value.into())
    }

    /// Snapshot of the attribute bag
    pub fn attributes(&self) -> Attributes {
        read(&self.inner.attributes).clone()
    }

    pub fn children(&self) -> Vec<SceneNode> {
        read(&self.inner.children).clone()
    }

    pub fn add_child(&self, child: SceneNode) {
        write(&self.inner.children).push(child);
    }

    pub fn geometry(&self) -> Option<Arc<Mesh>> {
        read(&self.inner.geometry).clone()
    }

    pub fn set_geometry(&self, mesh: Mesh) {
        *write(&self.inner.geometry) = Some(Arc::new(mesh));
    }

    /// Depth-first, pre-order walk starting with this node.
    ///
    /// A node reachable through several parents is visited once.
    pub fn traverse(&self) -> Vec<SceneNode> {
        let mut visited = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![self.clone()];

        while let Some(node) = stack.pop() {
            if !visited.insert(node.id()) {
                continue;
            }
            let children = node.children();
            stack.extend(children.into_iter().rev());
            order.push(node);
        }

        order
    }
}

impl PartialEq for SceneNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for SceneNode {}

impl Hash for SceneNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for SceneNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneNode")
            .field("id", &self.inner.id)
            .field("name", &self.inner.name)
            .finish()
    }
}
