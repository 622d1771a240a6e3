//! Overload resolution for native callables.
//!
//! Selects the callable in a [`CallableGroup`] that best fits a list of managed
//! arguments.
//!
//! ## Algorithm
//!
//! 1. Filter candidates by arity: `N == A`, or varargs with `N - 1 <= A`
//! 2. Check each argument's compatibility with its parameter
//! 3. Score viable candidates by worst tier, then summed preference
//! 4. Prefer fixed arity over varargs on equal score
//! 5. Report ambiguity when candidates still tie
//!
//! Selections are memoized per group by argument-shape code; see
//! [`SignatureCache`].

mod ranking;
mod signature_cache;

pub use ranking::find_best_match;
pub use signature_cache::SignatureCache;

use std::sync::Arc;

use crossbind_core::{Callable, CallableGroup, ManagedValue, ResolutionError, TypeHierarchy};
use tracing::{debug, trace};

use crate::conversion::{MatchTier, find_compatibility};
use crate::shape::{ArgShape, shape_code, shapes_of};

/// A viable candidate with its score.
#[derive(Debug, Clone)]
pub struct OverloadMatch {
    pub callable: Arc<Callable>,
    /// Worst tier over all arguments.
    pub worst_tier: MatchTier,
    /// Summed per-argument preference.
    pub preference: u32,
}

/// Inputs to resolution that don't come from the call site.
#[derive(Clone, Copy)]
pub struct ResolveContext<'a> {
    pub hierarchy: &'a dyn TypeHierarchy,
    /// Whether managed callables/objects may be adapted to interfaces.
    pub allow_duck: bool,
}

impl<'a> ResolveContext<'a> {
    pub fn new(hierarchy: &'a dyn TypeHierarchy) -> Self {
        Self {
            hierarchy,
            allow_duck: false,
        }
    }

    pub fn with_duck_typing(mut self, allow: bool) -> Self {
        self.allow_duck = allow;
        self
    }
}

/// A callable group together with its resolved-signature cache.
#[derive(Debug)]
pub struct OverloadSet {
    group: CallableGroup,
    cache: SignatureCache,
}

impl OverloadSet {
    pub fn new(group: CallableGroup) -> Self {
        Self {
            group,
            cache: SignatureCache::new(),
        }
    }

    pub fn group(&self) -> &CallableGroup {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.group.name
    }

    pub fn cache(&self) -> &SignatureCache {
        &self.cache
    }

    /// Resolve the callable for `args`, consulting the cache first.
    pub fn resolve(
        &self,
        args: &[ManagedValue],
        ctx: ResolveContext<'_>,
    ) -> Result<Arc<Callable>, ResolutionError> {
        self.resolve_shapes(&shapes_of(args), ctx)
    }

    pub fn resolve_shapes(
        &self,
        shapes: &[ArgShape],
        ctx: ResolveContext<'_>,
    ) -> Result<Arc<Callable>, ResolutionError> {
        let code = shape_code(shapes);
        if let Some(hit) = self.cache.get(code) {
            trace!(member = %self.group.name, "signature cache hit");
            return Ok(hit);
        }

        let selected = resolve_overload(&self.group, shapes, ctx)?;
        self.cache.insert(code, Arc::clone(&selected.callable));
        Ok(selected.callable)
    }
}

/// Resolve an overloaded call without caching.
///
/// # Returns
///
/// * `Ok(OverloadMatch)` - The best matching callable with its score
/// * `Err(ResolutionError)` - Wrong arity, no match, or ambiguous overloads
pub fn resolve_overload(
    group: &CallableGroup,
    shapes: &[ArgShape],
    ctx: ResolveContext<'_>,
) -> Result<OverloadMatch, ResolutionError> {
    let by_arity: Vec<&Arc<Callable>> = group
        .callables
        .iter()
        .filter(|c| c.accepts_arg_count(shapes.len()))
        .collect();

    if by_arity.is_empty() {
        return Err(ResolutionError::ArityMismatch {
            type_name: group.declaring_type.clone(),
            member: group.name.clone(),
            given: shapes.len(),
            expected: group.arities(),
        });
    }

    let viable: Vec<OverloadMatch> = by_arity
        .into_iter()
        .filter_map(|callable| try_match_candidate(callable, shapes, ctx))
        .collect();

    if viable.is_empty() {
        return Err(no_matching_overload_error(group, shapes));
    }

    let best = find_best_match(viable, group)?;
    debug!(
        type_name = %group.declaring_type,
        member = %group.name,
        arity = shapes.len(),
        selected = %best.callable.signature(),
        "resolved overload"
    );
    Ok(best)
}

/// Score one candidate, or `None` if some argument doesn't fit.
fn try_match_candidate(
    callable: &Arc<Callable>,
    shapes: &[ArgShape],
    ctx: ResolveContext<'_>,
) -> Option<OverloadMatch> {
    // An array in the varargs slot with exact arity is passed through as the array.
    let pass_array = callable.is_varargs
        && shapes.len() == callable.arity()
        && shapes.last().is_some_and(|s| s.is_array_like());

    let mut worst_tier = MatchTier::Exact;
    let mut preference = 0u32;
    for (position, shape) in shapes.iter().enumerate() {
        let param = callable.param_for(position, pass_array)?;
        let compat = find_compatibility(*shape, param, ctx.hierarchy, ctx.allow_duck)?;
        worst_tier = worst_tier.min(compat.tier);
        preference += compat.preference;
    }

    Some(OverloadMatch {
        callable: Arc::clone(callable),
        worst_tier,
        preference,
    })
}

fn no_matching_overload_error(group: &CallableGroup, shapes: &[ArgShape]) -> ResolutionError {
    let arguments = shapes
        .iter()
        .map(|s| s.describe())
        .collect::<Vec<_>>()
        .join(", ");
    ResolutionError::NoMatch {
        type_name: group.declaring_type.clone(),
        member: group.name.clone(),
        arguments,
    }
}
