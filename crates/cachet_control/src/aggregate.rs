//! Overall policy computation.

use crate::hint::{CacheHint, CacheScope, Hint, OverallCachePolicy};

/// Folds hints into the overall policy of a response.
///
/// Axes set on `policy_override` are used verbatim. Otherwise `maxAge` is the
/// smallest one present, or `default_max_age` if none is, and the scope is
/// `PRIVATE` if any hint is private, `PUBLIC` if any is public, and unset
/// otherwise. The result does not depend on hint order or repetition.
pub fn reduce<'a, I>(hints: I, policy_override: CacheHint, default_max_age: u32) -> OverallCachePolicy
where
    I: IntoIterator<Item = &'a CacheHint>,
{
    let mut max_age: Option<u32> = None;
    let mut scope: Option<CacheScope> = None;

    if policy_override.max_age.is_none() || policy_override.scope.is_none() {
        for hint in hints {
            if let Some(age) = hint.max_age {
                max_age = Some(max_age.map_or(age, |current| current.min(age)));
            }
            if let Some(s) = hint.scope {
                scope = Some(scope.map_or(s, |current| current.restrict(s)));
            }
        }
    }

    OverallCachePolicy {
        max_age: policy_override
            .max_age
            .or(max_age)
            .unwrap_or(default_max_age),
        scope: policy_override.scope.or(scope),
    }
}

/// [`reduce`] over recorded hints.
pub fn reduce_hints(hints: &[Hint], policy_override: CacheHint, default_max_age: u32) -> OverallCachePolicy {
    reduce(hints.iter().map(|h| &h.hint), policy_override, default_max_age)
}
