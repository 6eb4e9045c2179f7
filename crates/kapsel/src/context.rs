//! Caller identity resolution.
//!
//! Instead of inspecting a live call stack, the dispatcher resolves a
//! [`CallerContext`] once per invocation and threads it into the body
//! through its scope. The context classifies the executing declaration
//! relative to the accessed object's concrete class; the decision engine
//! consumes that classification and nothing else.

use std::sync::Arc;

use crate::class::{ClassId, ClassRegistry, DeclId};

/// Identity of the code currently executing, resolved fresh per access
/// target.
///
/// Unforgeable: only the dispatcher constructs these. Bodies receive a
/// borrowed context through their scope and cannot alter it.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub(crate) method_name: Arc<str>,
    pub(crate) method: DeclId,
    pub(crate) declared_by: ClassId,
    pub(crate) is_literal: bool,
    pub(crate) in_hierarchy: bool,
    pub(crate) nearest_root: Option<ClassId>,
    pub(crate) concrete: ClassId,
    pub(crate) instance: Option<u64>,
}

impl CallerContext {
    /// Resolve the executing declaration against a target.
    ///
    /// `is_literal` asks: does `method_name`, resolved from the target's
    /// concrete class through the parent chain, land on exactly the
    /// executing declaration? An override reached through a different
    /// dispatch path (or an unrelated declaration that merely shares the
    /// name) resolves elsewhere and is not literal.
    pub(crate) fn resolve(
        registry: &ClassRegistry,
        method: DeclId,
        method_name: &Arc<str>,
        declared_by: ClassId,
        concrete: ClassId,
        instance: Option<u64>,
    ) -> Self {
        let is_literal = registry
            .resolve_callable(concrete, method_name)
            .map(|(id, _)| id)
            == Some(method);
        CallerContext {
            method_name: Arc::clone(method_name),
            method,
            declared_by,
            is_literal,
            in_hierarchy: registry.is_subclass_of(concrete, declared_by),
            nearest_root: registry.nearest_root_ancestor(concrete),
            concrete,
            instance,
        }
    }

    /// Re-resolve this context against a different target.
    ///
    /// A scope's context is bound to the object it was dispatched on;
    /// touching another object re-runs the classification with the same
    /// executing declaration. Same target, same context.
    pub(crate) fn rebind(
        &self,
        registry: &ClassRegistry,
        concrete: ClassId,
        instance: Option<u64>,
    ) -> CallerContext {
        if self.concrete == concrete && self.instance == instance {
            return self.clone();
        }
        Self::resolve(
            registry,
            self.method,
            &self.method_name,
            self.declared_by,
            concrete,
            instance,
        )
    }

    /// Name of the declaration currently executing
    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    /// The class whose definition registered the executing declaration
    pub fn declared_by(&self) -> ClassId {
        self.declared_by
    }

    /// Whether the executing code is the literal declaration the
    /// accessed object's concrete class exposes under this name
    pub fn is_literal_declaration(&self) -> bool {
        self.is_literal
    }

    /// Whether the executing declaration belongs to the accessed
    /// object's class hierarchy
    pub fn in_target_hierarchy(&self) -> bool {
        self.in_hierarchy
    }

    /// The inheritance boundary for relaxed protected/private access
    pub fn nearest_root_ancestor(&self) -> Option<ClassId> {
        self.nearest_root
    }
}
