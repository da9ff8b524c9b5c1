//! Effective hint resolution for one field instance.

use crate::error::{CacheControlError, CacheControlResult};
use crate::hint::CacheHint;
use cachet_runtime::{DisplayPath, PathSegment, ResolverInfo};
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;

/// What a field returns, as far as hint resolution is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Scalar, enum, or a list of them.
    Leaf,
    /// Object, interface or union, possibly in a list. `type_hint` is the
    /// declaration on the named return type, if it is an object or interface.
    Composite { type_hint: Option<CacheHint> },
}

/// The static facts about a field instance that hint resolution needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSite {
    pub field_hint: Option<CacheHint>,
    pub return_kind: ReturnKind,
    pub is_root: bool,
}

impl FieldSite {
    /// Returns true if the field returns a leaf type.
    pub fn is_leaf(&self) -> bool {
        self.return_kind == ReturnKind::Leaf
    }
}

/// Computes the effective hint of a field instance.
///
/// Each axis is taken from the first source that sets it: the dynamic hint,
/// then the field declaration, then the return type declaration. Root leaf
/// fields left without a `maxAge` fall back to `default_max_age`.
pub fn effective_hint(
    site: &FieldSite,
    dynamic: Option<CacheHint>,
    default_max_age: u32,
) -> Option<CacheHint> {
    let mut hint = dynamic.unwrap_or_default();
    if let Some(field_hint) = site.field_hint {
        hint = hint.or(field_hint);
    }
    if let ReturnKind::Composite {
        type_hint: Some(type_hint),
    } = site.return_kind
    {
        hint = hint.or(type_hint);
    }
    if site.is_root && site.is_leaf() && hint.max_age.is_none() {
        hint.max_age = Some(default_max_age);
    }

    (!hint.is_empty()).then_some(hint)
}

#[derive(Debug)]
enum Slot {
    Open(Option<CacheHint>),
    Consumed,
}

/// A per-field handle resolvers use to override the declared hint.
///
/// One is placed in the [`ResolverInfo::extensions`] of every field while the
/// cache control plugin is installed. Its value is read once, when the field
/// finishes resolving.
#[derive(Debug, Clone)]
pub struct DynamicHint {
    path: Arc<[PathSegment]>,
    slot: Arc<Mutex<Slot>>,
}

impl DynamicHint {
    /// Creates an empty handle for the field at `path`.
    pub fn new(path: &[PathSegment]) -> Self {
        Self {
            path: Arc::from(path),
            slot: Arc::new(Mutex::new(Slot::Open(None))),
        }
    }

    /// Sets the axes `hint` carries, keeping those it leaves unset.
    pub fn set_cache_hint(&self, hint: CacheHint) -> CacheControlResult<()> {
        let mut slot = self.slot.lock();
        match &mut *slot {
            Slot::Open(current) => {
                *current = Some(hint.or(current.unwrap_or_default()));
                Ok(())
            }
            Slot::Consumed => Err(CacheControlError::HintConsumed {
                path: DisplayPath(&self.path).to_string(),
            }),
        }
    }

    /// Sets a hint from `@cacheControl` style arguments, e.g. ones received
    /// as JSON.
    pub fn set_from_arguments(&self, arguments: &IndexMap<String, Value>) -> CacheControlResult<()> {
        let location = format!("dynamic hint for {}", DisplayPath(&self.path));
        let hint = CacheHint::from_arguments(arguments, &location)?;
        self.set_cache_hint(hint)
    }

    /// Returns the hint set so far.
    pub fn get(&self) -> Option<CacheHint> {
        match &*self.slot.lock() {
            Slot::Open(hint) => *hint,
            Slot::Consumed => None,
        }
    }

    /// Takes the hint, rejecting any later set.
    pub(crate) fn consume(&self) -> Option<CacheHint> {
        match std::mem::replace(&mut *self.slot.lock(), Slot::Consumed) {
            Slot::Open(hint) => hint,
            Slot::Consumed => None,
        }
    }
}

/// Access to the dynamic hint of the field being resolved.
pub trait CacheControlExt {
    /// Returns the field's hint handle, if cache control is installed.
    fn cache_control(&self) -> Option<&DynamicHint>;

    /// Overrides the declared hint of the field being resolved.
    ///
    /// Does nothing when cache control is not installed.
    fn set_cache_hint(&self, hint: CacheHint) -> CacheControlResult<()> {
        match self.cache_control() {
            Some(dynamic) => dynamic.set_cache_hint(hint),
            None => Ok(()),
        }
    }
}

impl CacheControlExt for ResolverInfo {
    fn cache_control(&self) -> Option<&DynamicHint> {
        self.extensions.get::<DynamicHint>()
    }
}
