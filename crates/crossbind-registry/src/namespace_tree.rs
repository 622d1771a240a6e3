//! NamespaceTree - lazy package tree exposing native types by dotted path.
//!
//! Each [`NamespaceNode`] caches the children resolved under it so far. A
//! segment that is not cached yet is classified by its spelling:
//!
//! - **Upper-case leading**: a type in the current package. If no such type
//!   exists, the segment may still name a package when upper-case packages are
//!   allowed (always at the top level).
//! - **Lower-case leading**: a package if the provider knows one by that name,
//!   otherwise a lower-case type. Primitive names can't be packages: below the
//!   top level they are rejected, at the top level they name primitive types.
//!
//! Segments after a type name nested types (`Outer.Inner` → `Outer$Inner`).
//!
//! Only successful resolutions are cached, and the first cached child wins.
//! Package nodes are created under the parent's lock, so concurrent resolutions
//! of one path create each intermediate node exactly once.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use crossbind_core::{BindingError, NamespaceError, PrimitiveKind};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

use crate::proxy_registry::{BindingObserver, ProxyRegistry};
use crate::proxy_type::{ProxyKind, ProxyType};

/// A cached child of a namespace node.
#[derive(Debug, Clone)]
pub enum NamespaceChild {
    Package(Arc<NamespaceNode>),
    Type(Arc<ProxyType>),
}

/// One package in the tree.
pub struct NamespaceNode {
    name: String,
    /// Dotted package prefix; empty at the root.
    full_name: String,
    parent: Weak<NamespaceNode>,
    children: Mutex<FxHashMap<String, NamespaceChild>>,
}

impl NamespaceNode {
    fn root() -> Self {
        Self {
            name: String::new(),
            full_name: String::new(),
            parent: Weak::new(),
            children: Mutex::new(FxHashMap::default()),
        }
    }

    fn child_of(parent: &Arc<NamespaceNode>, name: &str) -> Self {
        Self {
            name: name.to_string(),
            full_name: parent.qualify(name),
            parent: Arc::downgrade(parent),
            children: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &str {
        &self.full_name
    }

    pub fn is_root(&self) -> bool {
        self.full_name.is_empty()
    }

    pub fn parent(&self) -> Option<Arc<NamespaceNode>> {
        self.parent.upgrade()
    }

    /// Cached child named `name`.
    pub fn child(&self, name: &str) -> Option<NamespaceChild> {
        self.children.lock().get(name).cloned()
    }

    /// Dotted name of `segment` inside this package.
    pub fn qualify(&self, segment: &str) -> String {
        if self.full_name.is_empty() {
            segment.to_string()
        } else {
            format!("{}.{}", self.full_name, segment)
        }
    }
}

impl fmt::Debug for NamespaceNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceNode")
            .field("full_name", &self.full_name)
            .field("children", &self.children.lock().len())
            .finish()
    }
}

/// Outcome of resolving a path.
#[derive(Debug, Clone)]
pub enum Resolution {
    Package(Arc<NamespaceNode>),
    Type(Arc<ProxyType>),
    NotFound,
}

impl Resolution {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Resolution::NotFound)
    }

    pub fn as_type(&self) -> Option<&Arc<ProxyType>> {
        match self {
            Resolution::Type(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_package(&self) -> Option<&Arc<NamespaceNode>> {
        match self {
            Resolution::Package(n) => Some(n),
            _ => None,
        }
    }
}

impl From<NamespaceChild> for Resolution {
    fn from(child: NamespaceChild) -> Self {
        match child {
            NamespaceChild::Package(node) => Resolution::Package(node),
            NamespaceChild::Type(proxy) => Resolution::Type(proxy),
        }
    }
}

/// Engine-scoped package tree.
pub struct NamespaceTree {
    root: Arc<NamespaceNode>,
    registry: Arc<ProxyRegistry>,
    allow_uppercase_packages: bool,
    packages_created: AtomicUsize,
}

impl NamespaceTree {
    /// Create a tree over `registry` and subscribe it to newly bound types.
    pub fn new(registry: Arc<ProxyRegistry>, allow_uppercase_packages: bool) -> Arc<Self> {
        let tree = Arc::new(Self {
            root: Arc::new(NamespaceNode::root()),
            registry: Arc::clone(&registry),
            allow_uppercase_packages,
            packages_created: AtomicUsize::new(0),
        });
        let observer: Weak<NamespaceTree> = Arc::downgrade(&tree);
        let observer: Weak<dyn BindingObserver> = observer;
        registry.set_observer(observer);
        tree
    }

    pub fn root(&self) -> &Arc<NamespaceNode> {
        &self.root
    }

    /// Number of package nodes created so far.
    pub fn package_count(&self) -> usize {
        self.packages_created.load(Ordering::Acquire)
    }

    /// Resolve a dotted path to a package, a type, or nothing.
    pub fn resolve(&self, path: &str) -> Result<Resolution, NamespaceError> {
        if path.is_empty() || path.split('.').any(str::is_empty) {
            return Err(NamespaceError::EmptySegment {
                path: path.to_string(),
            });
        }

        let mut current = NamespaceChild::Package(Arc::clone(&self.root));
        for (depth, segment) in path.split('.').enumerate() {
            let next = match &current {
                NamespaceChild::Package(node) => self.resolve_child(node, segment, depth == 0)?,
                NamespaceChild::Type(outer) => self.resolve_nested(outer, segment)?,
            };
            match next {
                Some(child) => current = child,
                None => {
                    trace!(path, segment, "namespace path not found");
                    return Ok(Resolution::NotFound);
                }
            }
        }
        Ok(current.into())
    }

    fn resolve_child(
        &self,
        node: &Arc<NamespaceNode>,
        segment: &str,
        top_level: bool,
    ) -> Result<Option<NamespaceChild>, NamespaceError> {
        if let Some(child) = node.child(segment) {
            return Ok(Some(child));
        }

        let full = node.qualify(segment);
        if is_upper(segment) {
            if let Some(proxy) = self.find_type(&full)? {
                return Ok(Some(self.attach_type(node, segment, proxy)));
            }
            if self.allow_uppercase_packages && self.registry.provider().package_exists(&full) {
                return Ok(Some(self.package(node, segment)));
            }
            return Ok(None);
        }

        if let Some(kind) = PrimitiveKind::from_name(segment) {
            if !top_level {
                return Err(NamespaceError::ReservedNameConflict {
                    name: segment.to_string(),
                    package: node.full_name().to_string(),
                });
            }
            let proxy = self.registry.primitive(kind)?;
            return Ok(Some(self.attach_type(node, segment, proxy)));
        }

        if self.registry.provider().package_exists(&full) {
            return Ok(Some(self.package(node, segment)));
        }
        Ok(self
            .find_type(&full)?
            .map(|proxy| self.attach_type(node, segment, proxy)))
    }

    fn resolve_nested(
        &self,
        outer: &Arc<ProxyType>,
        segment: &str,
    ) -> Result<Option<NamespaceChild>, NamespaceError> {
        let name = format!("{}${}", outer.name(), segment);
        Ok(self.find_type(&name)?.map(NamespaceChild::Type))
    }

    /// Bind `name`, treating a missing type as a negative result.
    fn find_type(&self, name: &str) -> Result<Option<Arc<ProxyType>>, BindingError> {
        match self.registry.get_or_create_by_name(name) {
            Ok(proxy) => Ok(Some(proxy)),
            Err(err) if err.is_not_found() && err.type_name() == name => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn attach_type(&self, node: &Arc<NamespaceNode>, segment: &str, proxy: Arc<ProxyType>) -> NamespaceChild {
        node.children
            .lock()
            .entry(segment.to_string())
            .or_insert(NamespaceChild::Type(proxy))
            .clone()
    }

    /// Child package `segment` of `node`, created on first request.
    fn package(&self, node: &Arc<NamespaceNode>, segment: &str) -> NamespaceChild {
        node.children
            .lock()
            .entry(segment.to_string())
            .or_insert_with(|| {
                self.packages_created.fetch_add(1, Ordering::AcqRel);
                let child = NamespaceNode::child_of(node, segment);
                debug!(package = %child.full_name, "created package node");
                NamespaceChild::Package(Arc::new(child))
            })
            .clone()
    }
}

fn is_upper(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

impl BindingObserver for NamespaceTree {
    /// Attach public top-level types to their package as soon as they're bound.
    fn published(&self, proxy: &Arc<ProxyType>) {
        let native = proxy.native();
        if !native.is_public()
            || native.is_nested()
            || matches!(proxy.kind(), ProxyKind::Array | ProxyKind::Primitive)
        {
            return;
        }

        let mut node = Arc::clone(&self.root);
        for segment in native.name.package() {
            if PrimitiveKind::is_reserved(segment) {
                return;
            }
            // Reachable only through the resolver's gate.
            if is_upper(segment) && !self.allow_uppercase_packages {
                return;
            }
            match self.package(&node, segment) {
                NamespaceChild::Package(next) => node = next,
                // A type already owns this name.
                NamespaceChild::Type(_) => return,
            }
        }
        self.attach_type(&node, native.name.simple_name(), Arc::clone(proxy));
    }
}

impl fmt::Debug for NamespaceTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespaceTree")
            .field("packages", &self.package_count())
            .field("allow_uppercase_packages", &self.allow_uppercase_packages)
            .finish()
    }
}
