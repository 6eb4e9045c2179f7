//! Class metadata and the hierarchy index.
//!
//! Classes are registered once and never mutated afterwards; every query
//! here is a pure read over that metadata. Identity is carried by stable
//! tokens ([`ClassId`], [`DeclId`]) assigned at definition time — names
//! are display-only and may collide across unrelated classes.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::guard::{self, MethodBody, MethodScope, PropertySpec, StaticBody, StaticScope};
use crate::member::Visibility;
use crate::value::Value;
use crate::AccessResult;

/// Reserved declaration name for constructors.
pub const CONSTRUCTOR: &str = "constructor";

static NEXT_CLASS_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_DECL_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a class.
///
/// Assigned when the [`ClassDef`] is created and never recycled. Two
/// classes sharing a name still have distinct ids, so identity checks
/// never go through strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassId(u64);

impl ClassId {
    pub(crate) fn next() -> Self {
        ClassId(NEXT_CLASS_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "class#{}", self.0)
    }
}

/// Stable identity of a single declaration: a constructor, method,
/// static method, class-level method, or property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeclId(u64);

impl DeclId {
    pub(crate) fn next() -> Self {
        DeclId(NEXT_DECL_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone)]
pub(crate) struct MethodDecl {
    pub(crate) id: DeclId,
    pub(crate) name: Arc<str>,
    pub(crate) visibility: Visibility,
    pub(crate) body: MethodBody,
}

#[derive(Clone)]
pub(crate) struct StaticDecl {
    pub(crate) id: DeclId,
    pub(crate) name: Arc<str>,
    pub(crate) visibility: Visibility,
    pub(crate) body: StaticBody,
}

#[derive(Clone)]
pub(crate) struct PropertyDecl {
    pub(crate) id: DeclId,
    pub(crate) name: Arc<str>,
    pub(crate) visibility: Visibility,
    pub(crate) spec: PropertySpec,
}

/// A declaration resolved against a concrete class: the declaration
/// itself plus the class that declared it.
pub(crate) struct Resolved<T> {
    pub(crate) decl: T,
    pub(crate) declared_by: ClassId,
}

/// Definition of one class: its parent link and its declarations.
///
/// Built mutably, then handed to [`ClassRegistry::register`]. One
/// declaration per name per class; registering two callables under the
/// same name (regardless of kind) replaces the earlier one.
pub struct ClassDef {
    id: ClassId,
    name: String,
    parent: Option<ClassId>,
    methods: FxHashMap<String, MethodDecl>,
    statics: FxHashMap<String, StaticDecl>,
    class_methods: FxHashMap<String, StaticDecl>,
    properties: FxHashMap<String, PropertyDecl>,
}

impl ClassDef {
    /// Create a root class definition
    pub fn new(name: &str) -> Self {
        Self {
            id: ClassId::next(),
            name: name.to_string(),
            parent: None,
            methods: FxHashMap::default(),
            statics: FxHashMap::default(),
            class_methods: FxHashMap::default(),
            properties: FxHashMap::default(),
        }
    }

    /// Create a class definition with a parent
    pub fn with_parent(name: &str, parent: ClassId) -> Self {
        let mut def = Self::new(name);
        def.parent = Some(parent);
        def
    }

    /// This class's identity token
    pub fn id(&self) -> ClassId {
        self.id
    }

    /// Class name (display only, not identity)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent class, if any
    pub fn parent(&self) -> Option<ClassId> {
        self.parent
    }

    /// Register the constructor body (always public).
    pub fn set_constructor<F>(&mut self, body: F)
    where
        F: Fn(&MethodScope<'_>, &[Value]) -> AccessResult<Value> + Send + Sync + 'static,
    {
        self.add_method(CONSTRUCTOR, Visibility::Public, body);
    }

    /// Register an instance method
    pub fn add_method<F>(&mut self, name: &str, visibility: Visibility, body: F)
    where
        F: Fn(&MethodScope<'_>, &[Value]) -> AccessResult<Value> + Send + Sync + 'static,
    {
        self.remove_decl(name);
        self.methods.insert(
            name.to_string(),
            MethodDecl {
                id: DeclId::next(),
                name: Arc::from(name),
                visibility,
                body: Arc::new(body),
            },
        );
    }

    /// Register a static method
    pub fn add_static_method<F>(&mut self, name: &str, visibility: Visibility, body: F)
    where
        F: Fn(&StaticScope, &[Value]) -> AccessResult<Value> + Send + Sync + 'static,
    {
        self.remove_decl(name);
        self.statics.insert(
            name.to_string(),
            StaticDecl {
                id: DeclId::next(),
                name: Arc::from(name),
                visibility,
                body: Arc::new(body),
            },
        );
    }

    /// Register a class-level method.
    ///
    /// Like a static method, but conventionally receives the class it was
    /// invoked through (available as [`StaticScope::owner`]).
    pub fn add_class_method<F>(&mut self, name: &str, visibility: Visibility, body: F)
    where
        F: Fn(&StaticScope, &[Value]) -> AccessResult<Value> + Send + Sync + 'static,
    {
        self.remove_decl(name);
        self.class_methods.insert(
            name.to_string(),
            StaticDecl {
                id: DeclId::next(),
                name: Arc::from(name),
                visibility,
                body: Arc::new(body),
            },
        );
    }

    /// Register a computed property
    pub fn add_property(&mut self, name: &str, visibility: Visibility, spec: PropertySpec) {
        self.remove_decl(name);
        self.properties.insert(
            name.to_string(),
            PropertyDecl {
                id: DeclId::next(),
                name: Arc::from(name),
                visibility,
                spec,
            },
        );
    }

    /// True iff this class itself (not an ancestor) declares a callable
    /// by this exact name.
    pub fn declares(&self, name: &str) -> bool {
        self.declared_id(name).is_some()
    }

    pub(crate) fn declared_id(&self, name: &str) -> Option<DeclId> {
        if let Some(m) = self.methods.get(name) {
            return Some(m.id);
        }
        if let Some(p) = self.properties.get(name) {
            return Some(p.id);
        }
        if let Some(s) = self.statics.get(name) {
            return Some(s.id);
        }
        self.class_methods.get(name).map(|c| c.id)
    }

    fn remove_decl(&mut self, name: &str) {
        self.methods.remove(name);
        self.statics.remove(name);
        self.class_methods.remove(name);
        self.properties.remove(name);
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("parent", &self.parent)
            .field("methods", &self.methods.len())
            .field("statics", &self.statics.len())
            .field("class_methods", &self.class_methods.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Registry of class definitions, shared by every object it spawns.
#[derive(Debug, Default)]
pub struct ClassRegistry {
    classes: RwLock<FxHashMap<ClassId, Arc<ClassDef>>>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a class definition, returning its identity token
    pub fn register(&self, def: ClassDef) -> ClassId {
        let id = def.id;
        self.classes.write().insert(id, Arc::new(def));
        id
    }

    /// Get a class definition by id
    pub fn get(&self, class: ClassId) -> Option<Arc<ClassDef>> {
        self.classes.read().get(&class).cloned()
    }

    /// Find a class by name.
    ///
    /// Names are not identity; if several registered classes share the
    /// name, which one is returned is unspecified.
    pub fn get_by_name(&self, name: &str) -> Option<Arc<ClassDef>> {
        self.classes
            .read()
            .values()
            .find(|def| def.name == name)
            .cloned()
    }

    /// Parent of a class, if any
    pub fn parent_of(&self, class: ClassId) -> Option<ClassId> {
        self.get(class).and_then(|def| def.parent)
    }

    /// Check an inheritance relationship (reflexive)
    pub fn is_subclass_of(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = Some(sub);
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// The inheritance chain from `class` up to its root, inclusive
    pub fn class_hierarchy(&self, class: ClassId) -> Vec<ClassId> {
        let mut chain = Vec::new();
        let mut current = Some(class);
        while let Some(id) = current {
            if self.get(id).is_none() {
                break;
            }
            chain.push(id);
            current = self.parent_of(id);
        }
        chain
    }

    /// Walk the strict ancestors of `class` from nearest to root and
    /// return the first one satisfying the predicate.
    pub fn nearest_ancestor_satisfying<P>(&self, class: ClassId, predicate: P) -> Option<ClassId>
    where
        P: Fn(&ClassDef) -> bool,
    {
        let mut current = self.parent_of(class);
        while let Some(id) = current {
            let def = self.get(id)?;
            if predicate(&def) {
                return Some(id);
            }
            current = def.parent;
        }
        None
    }

    /// The nearest strict ancestor participating in the framework's base
    /// contract — the inheritance boundary for relaxed protected/private
    /// access.
    ///
    /// Registration is the only way into the hierarchy and inheritance is
    /// single-parent, so every ancestor participates and this resolves to
    /// the direct parent (`None` for root classes).
    pub fn nearest_root_ancestor(&self, class: ClassId) -> Option<ClassId> {
        self.nearest_ancestor_satisfying(class, |_| true)
    }

    /// True iff `class` itself (not an ancestor) declares a callable by
    /// this exact name.
    pub fn declares_literally(&self, class: ClassId, name: &str) -> bool {
        self.get(class).is_some_and(|def| def.declares(name))
    }

    /// Resolve the declaration `name` refers to from `class`: the class
    /// itself if it declares the name, otherwise the nearest ancestor
    /// that does. Returns the declaration id and its declaring class.
    pub fn resolve_callable(&self, class: ClassId, name: &str) -> Option<(DeclId, ClassId)> {
        self.walk(class, |def| def.declared_id(name).map(|id| (id, def.id)))
    }

    pub(crate) fn resolve_method(&self, class: ClassId, name: &str) -> Option<Resolved<MethodDecl>> {
        self.walk(class, |def| {
            def.methods.get(name).map(|decl| Resolved {
                decl: decl.clone(),
                declared_by: def.id,
            })
        })
    }

    pub(crate) fn resolve_static(&self, class: ClassId, name: &str) -> Option<Resolved<StaticDecl>> {
        self.walk(class, |def| {
            def.statics.get(name).map(|decl| Resolved {
                decl: decl.clone(),
                declared_by: def.id,
            })
        })
    }

    pub(crate) fn resolve_class_method(
        &self,
        class: ClassId,
        name: &str,
    ) -> Option<Resolved<StaticDecl>> {
        self.walk(class, |def| {
            def.class_methods.get(name).map(|decl| Resolved {
                decl: decl.clone(),
                declared_by: def.id,
            })
        })
    }

    pub(crate) fn resolve_property(
        &self,
        class: ClassId,
        name: &str,
    ) -> Option<Resolved<PropertyDecl>> {
        self.walk(class, |def| {
            def.properties.get(name).map(|decl| Resolved {
                decl: decl.clone(),
                declared_by: def.id,
            })
        })
    }

    /// Invoke a static method through `owner` from outside any method
    /// body (public statics only).
    pub fn call_static(
        self: &Arc<Self>,
        owner: ClassId,
        name: &str,
        args: &[Value],
    ) -> AccessResult<Value> {
        guard::invoke_static(self, owner, None, name, args)
    }

    /// Invoke a class-level method through `owner` from outside any
    /// method body (public class methods only).
    pub fn call_class_method(
        self: &Arc<Self>,
        owner: ClassId,
        name: &str,
        args: &[Value],
    ) -> AccessResult<Value> {
        guard::invoke_class_method(self, owner, None, name, args)
    }

    fn walk<T>(&self, from: ClassId, f: impl Fn(&ClassDef) -> Option<T>) -> Option<T> {
        let mut current = Some(from);
        while let Some(id) = current {
            let def = self.get(id)?;
            if let Some(found) = f(&def) {
                return Some(found);
            }
            current = def.parent;
        }
        None
    }
}
