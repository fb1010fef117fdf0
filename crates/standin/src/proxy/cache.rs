//! Generated proxy types and their process-wide cache.
//!
//! Entries are append-only and never invalidated: a mockable type's members
//! cannot change while the process runs. Tests that need isolation construct
//! their own [`ProxyTypeCache`] or call [`ProxyTypeCache::clear`].

use super::descriptor::{MemberInfo, TypeDescriptor, TypeKind};
use super::Mockable;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Flattened interception table for one mockable type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyType {
    name: String,
    kind: TypeKind,
    members: Vec<MemberInfo>,
}

impl ProxyType {
    /// Build the interception table for a descriptor, base members included
    #[must_use]
    pub fn generate(descriptor: &TypeDescriptor) -> Self {
        Self {
            name: descriptor.name.clone(),
            kind: descriptor.kind,
            members: descriptor.flatten(),
        }
    }

    /// Mocked type name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Construction kind
    #[must_use]
    pub const fn kind(&self) -> TypeKind {
        self.kind
    }

    /// Every member, own first
    #[must_use]
    pub fn members(&self) -> &[MemberInfo] {
        &self.members
    }

    /// Members named `name` that registrations can target.
    ///
    /// Variadic-only signatures are left out.
    pub fn visible<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a MemberInfo> + 'a {
        let name = name.to_string();
        self.members
            .iter()
            .filter(move |m| m.name == name && !m.is_variadic_only())
    }

    /// The member a raw call with `count` arguments dispatches to
    #[must_use]
    pub fn resolve_call(&self, name: &str, count: usize) -> Option<&MemberInfo> {
        let named = || self.members.iter().filter(move |m| m.name == name);
        named()
            .find(|m| !m.is_variadic() && m.params.len() == count)
            .or_else(|| named().find(|m| m.accepts_call_arity(count)))
    }
}

/// Cache of generated proxy types keyed by the proxy's `TypeId`
#[derive(Debug, Clone, Default)]
pub struct ProxyTypeCache {
    entries: Arc<RwLock<HashMap<TypeId, Arc<ProxyType>>>>,
}

impl ProxyTypeCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide default cache
    #[must_use]
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ProxyTypeCache> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Fetch the proxy type for `M`, generating it on first use
    pub fn get_or_generate<M: Mockable>(&self) -> Arc<ProxyType> {
        let key = TypeId::of::<M>();
        if let Some(existing) = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(existing);
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(entries.entry(key).or_insert_with(|| {
            let descriptor = M::descriptor();
            tracing::debug!(
                type_name = %descriptor.name,
                members = descriptor.members.len(),
                "generated proxy type"
            );
            Arc::new(ProxyType::generate(&descriptor))
        }))
    }

    /// Whether `M` already has a proxy type
    #[must_use]
    pub fn contains<M: Mockable>(&self) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&TypeId::of::<M>())
    }

    /// Number of generated proxy types
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been generated yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
