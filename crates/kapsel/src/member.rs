//! Per-object member storage.
//!
//! Each live object owns one [`MemberTable`]: the overlay for ordinary
//! (undeclared) attributes, plus one partition per visibility level for
//! declared members. A name lives in at most one of the four maps at any
//! time. The table performs no authorization itself; the decision engine
//! is the only caller allowed to touch the protected and private
//! partitions.

use rustc_hash::FxHashMap;

use crate::class::ClassId;
use crate::value::Value;

/// Member visibility levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Accessible from any calling context
    Public,
    /// Accessible from the declaring class and its hierarchy
    Protected,
    /// Accessible from the declaring class only
    Private,
}

/// One declared attribute on one object instance.
#[derive(Debug, Clone)]
pub struct Member {
    pub(crate) value: Value,
    pub(crate) level: Visibility,
    pub(crate) is_final: bool,
    pub(crate) declared_by: ClassId,
}

impl Member {
    /// Current payload
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Visibility level the member was declared with
    pub fn level(&self) -> Visibility {
        self.level
    }

    /// Whether the member is write-once
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// The class whose method body declared this member
    pub fn declared_by(&self) -> ClassId {
        self.declared_by
    }
}

/// Storage for one object's attributes.
#[derive(Debug, Default)]
pub struct MemberTable {
    overlay: FxHashMap<String, Value>,
    public: FxHashMap<String, Member>,
    protected: FxHashMap<String, Member>,
    private: FxHashMap<String, Member>,
}

impl MemberTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a member.
    ///
    /// If `name` was previously set through ordinary assignment, the
    /// overlay value is migrated into the new member and the passed
    /// `value` is ignored. Re-declaring an existing member replaces it
    /// wherever it previously lived; the last declaration wins.
    pub fn declare(
        &mut self,
        name: &str,
        value: Value,
        level: Visibility,
        is_final: bool,
        declared_by: ClassId,
    ) {
        let value = match self.overlay.remove(name) {
            Some(existing) => existing,
            None => value,
        };
        self.public.remove(name);
        self.protected.remove(name);
        self.private.remove(name);
        self.partition_mut(level).insert(
            name.to_string(),
            Member {
                value,
                level,
                is_final,
                declared_by,
            },
        );
    }

    /// Look up a declared member in any partition
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.public
            .get(name)
            .or_else(|| self.protected.get(name))
            .or_else(|| self.private.get(name))
    }

    pub(crate) fn member_mut(&mut self, name: &str) -> Option<&mut Member> {
        if self.public.contains_key(name) {
            return self.public.get_mut(name);
        }
        if self.protected.contains_key(name) {
            return self.protected.get_mut(name);
        }
        self.private.get_mut(name)
    }

    /// Check whether a name is present in the overlay or any partition
    pub fn contains(&self, name: &str) -> bool {
        self.overlay.contains_key(name) || self.member(name).is_some()
    }

    /// Read an overlay attribute
    pub fn overlay_get(&self, name: &str) -> Option<&Value> {
        self.overlay.get(name)
    }

    /// Check for an overlay attribute
    pub fn overlay_contains(&self, name: &str) -> bool {
        self.overlay.contains_key(name)
    }

    /// Write an overlay attribute (ordinary assignment path)
    pub fn overlay_insert(&mut self, name: &str, value: Value) {
        self.overlay.insert(name.to_string(), value);
    }

    /// Number of overlay attributes
    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }

    /// Delete an attribute, overlay only.
    ///
    /// Declared members are permanent for the object's life; attempting
    /// to remove one returns `false`.
    pub fn remove(&mut self, name: &str) -> bool {
        self.overlay.remove(name).is_some()
    }

    /// Empty the overlay, leaving declared members untouched
    pub fn clear(&mut self) {
        self.overlay.clear();
    }

    fn partition_mut(&mut self, level: Visibility) -> &mut FxHashMap<String, Member> {
        match level {
            Visibility::Public => &mut self.public,
            Visibility::Protected => &mut self.protected,
            Visibility::Private => &mut self.private,
        }
    }
}
