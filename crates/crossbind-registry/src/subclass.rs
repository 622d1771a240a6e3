//! Managed subclasses of native types.
//!
//! Declaring a managed subclass happens in two steps. [`ProxyRegistry::plan_subclass`]
//! checks that the parent can be extended and matches the managed method names
//! against overridable native methods. A [`SubclassGenerator`] then turns the
//! plan into a native type that delegates those methods to managed code, which
//! [`ProxyRegistry::realize_subclass`] binds like any other type.

use std::sync::Arc;

use crossbind_core::{BindingError, Callable, NativeType, ProviderError, ROOT_OBJECT};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};

use crate::proxy_registry::ProxyRegistry;
use crate::proxy_type::{ProxyKind, ProxyType};

/// A native method that a managed subclass overrides.
#[derive(Debug, Clone)]
pub struct OverrideBinding {
    /// Name the managed subclass defines.
    pub managed_name: String,
    pub callable: Arc<Callable>,
}

/// A validated managed subclass declaration.
#[derive(Debug, Clone)]
pub struct SubclassPlan {
    pub name: String,
    pub parent: Arc<ProxyType>,
    pub interfaces: Vec<Arc<ProxyType>>,
    pub overrides: Vec<OverrideBinding>,
}

impl SubclassPlan {
    pub fn overrides(&self, native_name: &str) -> bool {
        self.overrides.iter().any(|o| o.callable.name == native_name)
    }
}

/// Generates native types backed by managed code.
pub trait SubclassGenerator: Send + Sync {
    fn generate(&self, plan: &SubclassPlan) -> Result<Arc<NativeType>, ProviderError>;
}

impl ProxyRegistry {
    /// Validate a managed subclass of `parent` named `name`.
    ///
    /// An interface parent is implemented rather than extended: the plan's
    /// parent becomes the root object. Managed method names that match no
    /// overridable native method are left out of the plan.
    pub fn plan_subclass(
        &self,
        parent: &Arc<ProxyType>,
        name: &str,
        overrides: &[&str],
        interfaces: &[Arc<ProxyType>],
    ) -> Result<SubclassPlan, BindingError> {
        if !parent.is_extensible() {
            debug!(type_name = parent.name(), subclass = name, "rejected final type extension");
            return Err(BindingError::FinalTypeExtension {
                type_name: parent.name().to_string(),
                subclass: name.to_string(),
            });
        }

        let mut implemented: Vec<Arc<ProxyType>> = Vec::new();
        let parent = if parent.kind() == ProxyKind::Interface {
            implemented.push(Arc::clone(parent));
            self.get_or_create_by_name(ROOT_OBJECT)?
        } else {
            Arc::clone(parent)
        };
        for iface in interfaces {
            if iface.kind() != ProxyKind::Interface {
                return Err(BindingError::LinkError {
                    type_name: iface.name().to_string(),
                    operation: "subclass",
                    detail: format!("'{}' is not an interface", iface.name()),
                });
            }
            if !implemented.iter().any(|i| Arc::ptr_eq(i, iface)) {
                implemented.push(Arc::clone(iface));
            }
        }

        let mut seen = FxHashSet::default();
        let mut bindings = Vec::new();
        for &managed_name in overrides {
            let sets = std::iter::once(&parent)
                .chain(implemented.iter())
                .filter_map(|p| p.find_method(managed_name));
            for set in sets {
                for callable in &set.group().callables {
                    if callable.is_static || callable.is_final || !seen.insert(callable.id) {
                        continue;
                    }
                    bindings.push(OverrideBinding {
                        managed_name: managed_name.to_string(),
                        callable: Arc::clone(callable),
                    });
                }
            }
        }

        trace!(
            type_name = parent.name(),
            subclass = name,
            overrides = bindings.len(),
            "planned subclass"
        );
        Ok(SubclassPlan {
            name: name.to_string(),
            parent,
            interfaces: implemented,
            overrides: bindings,
        })
    }

    /// Generate the native type for `plan` and bind its proxy.
    ///
    /// Instances of generated types always go through the identity cache so a
    /// native callback reaches the same managed object.
    pub fn realize_subclass(
        &self,
        plan: &SubclassPlan,
        generator: &dyn SubclassGenerator,
    ) -> Result<Arc<ProxyType>, BindingError> {
        let native = generator
            .generate(plan)
            .map_err(|err| BindingError::from_provider(err, &plan.name, "generate"))?;
        let proxy = self.get_or_create(&native)?;
        proxy.set_cache_proxy(true);
        debug!(type_name = proxy.name(), parent = plan.parent.name(), "realized subclass");
        Ok(proxy)
    }
}
