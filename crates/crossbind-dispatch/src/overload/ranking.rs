//! Score-based ranking of viable overload candidates.

use std::cmp::Ordering;

use crossbind_core::{CallableGroup, ResolutionError};
use tracing::warn;

use super::OverloadMatch;

/// Find the best match from viable candidates.
///
/// Candidates are ordered by worst per-argument tier, then by summed
/// preference, then fixed-arity over varargs. A tie on all three is ambiguous.
///
/// # Returns
///
/// * `Ok(OverloadMatch)` - The best matching candidate
/// * `Err(ResolutionError::Ambiguous)` - Two or more candidates tie
pub fn find_best_match(
    viable: Vec<OverloadMatch>,
    group: &CallableGroup,
) -> Result<OverloadMatch, ResolutionError> {
    let mut sorted = viable;
    sorted.sort_by(|a, b| compare(b, a));

    let mut iter = sorted.into_iter();
    let Some(best) = iter.next() else {
        return Err(ResolutionError::NoMatch {
            type_name: group.declaring_type.clone(),
            member: group.name.clone(),
            arguments: String::new(),
        });
    };

    let tied: Vec<OverloadMatch> = iter
        .take_while(|other| compare(&best, other) == Ordering::Equal)
        .collect();

    if tied.is_empty() {
        return Ok(best);
    }

    let candidates = std::iter::once(&best)
        .chain(tied.iter())
        .map(|m| m.callable.signature())
        .collect::<Vec<_>>()
        .join(" and ");
    warn!(
        type_name = %group.declaring_type,
        member = %group.name,
        %candidates,
        "ambiguous overload"
    );
    Err(ResolutionError::Ambiguous {
        type_name: group.declaring_type.clone(),
        member: group.name.clone(),
        candidates,
    })
}

/// Order two candidates, greater is better.
fn compare(a: &OverloadMatch, b: &OverloadMatch) -> Ordering {
    a.worst_tier
        .cmp(&b.worst_tier)
        .then(a.preference.cmp(&b.preference))
        .then(break_tie(a, b))
}

/// Prefer the fixed-arity candidate over a varargs one.
fn break_tie(a: &OverloadMatch, b: &OverloadMatch) -> Ordering {
    match (a.callable.is_varargs, b.callable.is_varargs) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        _ => Ordering::Equal,
    }
}
