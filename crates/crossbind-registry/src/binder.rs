//! Builds a proxy type's [`MemberTable`] from reflected native members.

use std::sync::Arc;

use crossbind_core::{Callable, CallableGroup, NativeMembers, NativeType};
use crossbind_dispatch::OverloadSet;
use rustc_hash::FxHashMap;
use tracing::trace;

use crate::naming::managed_aliases;
use crate::proxy_type::MemberTable;

/// Bind `members` of `native`, inheriting instance methods from `supers`.
///
/// `supers` lists the superclass table first, then included interfaces in
/// declaration order. An inherited callable is dropped when an earlier table
/// already declares the same parameters, so own methods beat the superclass and
/// the superclass beats interface defaults.
///
/// A native name always wins over an alias, and the first alias registered for
/// a name wins over later ones.
pub fn bind_members(native: &NativeType, members: NativeMembers, supers: &[&MemberTable]) -> MemberTable {
    let owner = native.full_name.as_str();
    let mut table = MemberTable::empty();

    if !members.constructors.is_empty() && !native.is_abstract() {
        let group = members
            .constructors
            .into_iter()
            .fold(CallableGroup::new(owner, "new"), |g, c| g.with(c));
        table.constructors = Some(Arc::new(OverloadSet::new(group)));
    }

    let (statics, instance): (Vec<Callable>, Vec<Callable>) =
        members.methods.into_iter().partition(|c| c.is_static);

    let mut instance_groups = group_by_name(owner, instance);
    for parent in supers {
        inherit_methods(&mut instance_groups, owner, parent);
    }
    let static_groups = group_by_name(owner, statics);

    table.instance_aliases = aliases_for(&instance_groups);
    table.static_aliases = aliases_for(&static_groups);
    for parent in supers {
        for (alias, target) in &parent.instance_aliases {
            if !instance_groups.contains_key(alias) && instance_groups.contains_key(target) {
                table
                    .instance_aliases
                    .entry(alias.clone())
                    .or_insert_with(|| target.clone());
            }
        }
    }

    table.instance_methods = into_sets(instance_groups);
    table.static_methods = into_sets(static_groups);

    for field in members.fields {
        let fields = if field.is_static {
            &mut table.static_fields
        } else {
            &mut table.instance_fields
        };
        fields.entry(field.name.clone()).or_insert(field);
    }

    trace!(
        type_name = owner,
        instance = table.instance_methods.len(),
        statics = table.static_methods.len(),
        "bound members"
    );
    table
}

fn group_by_name(owner: &str, callables: Vec<Callable>) -> FxHashMap<String, CallableGroup> {
    let mut groups: FxHashMap<String, CallableGroup> = FxHashMap::default();
    for callable in callables {
        groups
            .entry(callable.name.clone())
            .or_insert_with(|| CallableGroup::new(owner, callable.name.clone()))
            .push(Arc::new(callable));
    }
    groups
}

/// Merge the parent's instance methods; callables already present override same-signature ones.
fn inherit_methods(groups: &mut FxHashMap<String, CallableGroup>, owner: &str, parent: &MemberTable) {
    for (name, set) in &parent.instance_methods {
        let group = groups
            .entry(name.clone())
            .or_insert_with(|| CallableGroup::new(owner, name.clone()));
        for inherited in &set.group().callables {
            let overridden = group.callables.iter().any(|own| own.params == inherited.params);
            if !overridden {
                group.push(Arc::clone(inherited));
            }
        }
    }
}

fn aliases_for(groups: &FxHashMap<String, CallableGroup>) -> FxHashMap<String, String> {
    // Sort for a deterministic "first alias wins".
    let mut names: Vec<&String> = groups.keys().collect();
    names.sort();

    let mut aliases = FxHashMap::default();
    for name in names {
        for callable in &groups[name].callables {
            for alias in managed_aliases(callable) {
                if !groups.contains_key(&alias) {
                    aliases.entry(alias).or_insert_with(|| name.clone());
                }
            }
        }
    }
    aliases
}

fn into_sets(groups: FxHashMap<String, CallableGroup>) -> FxHashMap<String, Arc<OverloadSet>> {
    groups
        .into_iter()
        .map(|(name, group)| (name, Arc::new(OverloadSet::new(group))))
        .collect()
}
