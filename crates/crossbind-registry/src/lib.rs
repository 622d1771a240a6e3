//! Proxy type registry for crossbind.
//!
//! - [`ProxyRegistry`]: builds one [`ProxyType`] per native type, on demand and
//!   safely under concurrency
//! - [`NamespaceTree`]: resolves dotted paths to packages and proxy types
//! - [`ObjectProxyCache`]: preserves proxy identity across repeated wraps
//! - [`TypeGraph`]: supertype index answering assignability queries
//! - [`SubclassPlan`]: validated managed subclass declarations

mod binder;
mod hierarchy;
mod identity_cache;
mod namespace_tree;
mod naming;
mod proxy_registry;
mod proxy_type;
mod subclass;

#[cfg(test)]
mod test_support;

pub use binder::bind_members;
pub use hierarchy::{SuperEdge, TypeGraph};
pub use identity_cache::{CacheMode, ObjectProxyCache, SWEEP_INTERVAL};
pub use namespace_tree::{NamespaceChild, NamespaceNode, NamespaceTree, Resolution};
pub use naming::{managed_aliases, to_snake_case};
pub use proxy_registry::{ARRAY_PROXY, BindingObserver, CONCRETE_PROXY, PROXY_BASE, ProxyRegistry};
pub use proxy_type::{MemberTable, ProxyKind, ProxySuper, ProxyType, RootKind};
pub use subclass::{OverrideBinding, SubclassGenerator, SubclassPlan};
