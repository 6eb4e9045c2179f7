//! Callable guards and the scopes handed to executing bodies.
//!
//! Every invocation path — instance method, constructor chain, static
//! method, class-level method, property accessor — performs one
//! authorization with the caller's context, then resolves a fresh
//! context for the callee and wraps it in a scope. The scope is the
//! only way a body can reach members or other callables, which makes
//! the caller identity unforgeable.

use std::sync::Arc;

use crate::access::authorize;
use crate::class::{ClassId, ClassRegistry, MethodDecl, PropertyDecl, Resolved, StaticDecl};
use crate::context::CallerContext;
use crate::member::Visibility;
use crate::object::Object;
use crate::value::Value;
use crate::{AccessError, AccessResult};

/// Body of an instance method or constructor.
pub type MethodBody =
    Arc<dyn Fn(&MethodScope<'_>, &[Value]) -> AccessResult<Value> + Send + Sync>;

/// Body of a static or class-level method.
pub type StaticBody = Arc<dyn Fn(&StaticScope, &[Value]) -> AccessResult<Value> + Send + Sync>;

/// Property getter body.
pub type PropertyGetBody = Arc<dyn Fn(&MethodScope<'_>) -> AccessResult<Value> + Send + Sync>;

/// Property setter body.
pub type PropertySetBody =
    Arc<dyn Fn(&MethodScope<'_>, Value) -> AccessResult<()> + Send + Sync>;

/// Property deleter body.
pub type PropertyDeleteBody = Arc<dyn Fn(&MethodScope<'_>) -> AccessResult<()> + Send + Sync>;

/// Accessors of a computed property. Absent slots reject the
/// corresponding operation.
#[derive(Clone, Default)]
pub struct PropertySpec {
    /// Getter, if the property is readable
    pub get: Option<PropertyGetBody>,
    /// Setter, if the property is writable
    pub set: Option<PropertySetBody>,
    /// Deleter, if the property supports deletion
    pub delete: Option<PropertyDeleteBody>,
}

impl PropertySpec {
    /// Create a property with no accessors
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a getter
    pub fn getter<F>(mut self, body: F) -> Self
    where
        F: Fn(&MethodScope<'_>) -> AccessResult<Value> + Send + Sync + 'static,
    {
        self.get = Some(Arc::new(body));
        self
    }

    /// Attach a setter
    pub fn setter<F>(mut self, body: F) -> Self
    where
        F: Fn(&MethodScope<'_>, Value) -> AccessResult<()> + Send + Sync + 'static,
    {
        self.set = Some(Arc::new(body));
        self
    }

    /// Attach a deleter
    pub fn deleter<F>(mut self, body: F) -> Self
    where
        F: Fn(&MethodScope<'_>) -> AccessResult<()> + Send + Sync + 'static,
    {
        self.delete = Some(Arc::new(body));
        self
    }
}

/// Execution scope of an instance method, constructor, or property
/// accessor: the object it was dispatched on plus the resolved caller
/// context. Threaded into bodies by the dispatcher; bodies use it for
/// every member access, declaration, and further call.
pub struct MethodScope<'a> {
    object: &'a Object,
    ctx: CallerContext,
}

impl<'a> MethodScope<'a> {
    pub(crate) fn new(object: &'a Object, ctx: CallerContext) -> Self {
        Self { object, ctx }
    }

    /// The object this body was dispatched on
    pub fn object(&self) -> &Object {
        self.object
    }

    /// Identity of the executing declaration
    pub fn context(&self) -> &CallerContext {
        &self.ctx
    }

    /// Declare a member on the dispatch object.
    ///
    /// The declaring class is taken from the executing declaration, not
    /// from the caller. Ordinary assignments made earlier under the same
    /// name keep their value.
    pub fn declare(&self, name: &str, level: Visibility, value: Value, is_final: bool) {
        self.object
            .declare_member(name, value, level, is_final, self.ctx.declared_by);
    }

    /// Declare a public member
    pub fn declare_public(&self, name: &str, value: Value, is_final: bool) {
        self.declare(name, Visibility::Public, value, is_final);
    }

    /// Declare a protected member
    pub fn declare_protected(&self, name: &str, value: Value, is_final: bool) {
        self.declare(name, Visibility::Protected, value, is_final);
    }

    /// Declare a private member
    pub fn declare_private(&self, name: &str, value: Value, is_final: bool) {
        self.declare(name, Visibility::Private, value, is_final);
    }

    /// Read an attribute of the dispatch object with this scope's
    /// authority
    pub fn get(&self, name: &str) -> AccessResult<Value> {
        self.object.get_inner(Some(&self.ctx), name)
    }

    /// Write an attribute of the dispatch object with this scope's
    /// authority
    pub fn set(&self, name: &str, value: Value) -> AccessResult<()> {
        self.object.set_inner(Some(&self.ctx), name, value)
    }

    /// Delete an attribute of the dispatch object (overlay entries and
    /// property deleters only; declared members are permanent)
    pub fn delete(&self, name: &str) -> AccessResult<bool> {
        self.object.delete_inner(Some(&self.ctx), name)
    }

    /// Read an attribute of another object; the context is re-resolved
    /// against that object's class
    pub fn get_from(&self, target: &Object, name: &str) -> AccessResult<Value> {
        target.get_inner(Some(&self.ctx), name)
    }

    /// Write an attribute of another object
    pub fn set_on(&self, target: &Object, name: &str, value: Value) -> AccessResult<()> {
        target.set_inner(Some(&self.ctx), name, value)
    }

    /// Invoke a method on the dispatch object
    pub fn call(&self, name: &str, args: &[Value]) -> AccessResult<Value> {
        invoke_method(self.object, Some(&self.ctx), name, args)
    }

    /// Invoke a method on another object
    pub fn call_on(&self, target: &Object, name: &str, args: &[Value]) -> AccessResult<Value> {
        invoke_method(target, Some(&self.ctx), name, args)
    }

    /// Invoke the parent class's declaration of the currently executing
    /// method on the same object.
    ///
    /// The chain starts at the parent of the executing declaration's
    /// class, so repeated `call_super` walks one level per frame the way
    /// chained constructors do.
    pub fn call_super(&self, args: &[Value]) -> AccessResult<Value> {
        let registry = self.object.registry();
        let name = &self.ctx.method_name;
        let parent = registry
            .parent_of(self.ctx.declared_by)
            .ok_or_else(|| AccessError::Undefined(name.to_string()))?;
        let resolved = registry
            .resolve_method(parent, name)
            .ok_or_else(|| AccessError::Undefined(name.to_string()))?;
        authorize(
            name,
            resolved.decl.visibility,
            resolved.declared_by,
            Some(&self.ctx),
            self.object.class_id(),
        )?;
        run_method(self.object, &resolved, args)
    }

    /// Invoke a static method through `owner` with this scope's
    /// authority
    pub fn call_static(&self, owner: ClassId, name: &str, args: &[Value]) -> AccessResult<Value> {
        invoke_static(self.object.registry(), owner, Some(&self.ctx), name, args)
    }

    /// Invoke a class-level method through `owner` with this scope's
    /// authority
    pub fn call_class_method(
        &self,
        owner: ClassId,
        name: &str,
        args: &[Value],
    ) -> AccessResult<Value> {
        invoke_class_method(self.object.registry(), owner, Some(&self.ctx), name, args)
    }
}

/// Execution scope of a static or class-level method. No instance
/// exists; the owning class identity is captured instead.
pub struct StaticScope {
    registry: Arc<ClassRegistry>,
    owner: ClassId,
    ctx: CallerContext,
}

impl StaticScope {
    /// The class this body was invoked through
    pub fn owner(&self) -> ClassId {
        self.owner
    }

    /// The registry the owning class lives in
    pub fn registry(&self) -> &Arc<ClassRegistry> {
        &self.registry
    }

    /// Identity of the executing declaration
    pub fn context(&self) -> &CallerContext {
        &self.ctx
    }

    /// Construct an instance, running its constructor chain
    pub fn build(&self, class: ClassId, args: &[Value]) -> AccessResult<Object> {
        Object::build(&self.registry, class, args)
    }

    /// Invoke a static method with this scope's authority
    pub fn call_static(&self, owner: ClassId, name: &str, args: &[Value]) -> AccessResult<Value> {
        invoke_static(&self.registry, owner, Some(&self.ctx), name, args)
    }

    /// Invoke a class-level method with this scope's authority
    pub fn call_class_method(
        &self,
        owner: ClassId,
        name: &str,
        args: &[Value],
    ) -> AccessResult<Value> {
        invoke_class_method(&self.registry, owner, Some(&self.ctx), name, args)
    }

    /// Read an attribute of an object with this scope's authority
    pub fn get_from(&self, target: &Object, name: &str) -> AccessResult<Value> {
        target.get_inner(Some(&self.ctx), name)
    }

    /// Write an attribute of an object with this scope's authority
    pub fn set_on(&self, target: &Object, name: &str, value: Value) -> AccessResult<()> {
        target.set_inner(Some(&self.ctx), name, value)
    }

    /// Invoke a method on an object with this scope's authority
    pub fn call_on(&self, target: &Object, name: &str, args: &[Value]) -> AccessResult<Value> {
        invoke_method(target, Some(&self.ctx), name, args)
    }
}

// ============================================================================
// Guarded invocation
// ============================================================================

pub(crate) fn invoke_method(
    object: &Object,
    caller: Option<&CallerContext>,
    name: &str,
    args: &[Value],
) -> AccessResult<Value> {
    let registry = object.registry();
    let concrete = object.class_id();
    let resolved = registry
        .resolve_method(concrete, name)
        .ok_or_else(|| AccessError::Undefined(name.to_string()))?;
    let rebound = caller.map(|cx| cx.rebind(registry, concrete, Some(object.instance_id())));
    authorize(
        name,
        resolved.decl.visibility,
        resolved.declared_by,
        rebound.as_ref(),
        concrete,
    )?;
    run_method(object, &resolved, args)
}

/// Run a resolved method body with a freshly resolved callee context.
/// Authorization must already have happened.
pub(crate) fn run_method(
    object: &Object,
    resolved: &Resolved<MethodDecl>,
    args: &[Value],
) -> AccessResult<Value> {
    let cx = CallerContext::resolve(
        object.registry(),
        resolved.decl.id,
        &resolved.decl.name,
        resolved.declared_by,
        object.class_id(),
        Some(object.instance_id()),
    );
    let scope = MethodScope::new(object, cx);
    (resolved.decl.body)(&scope, args)
}

pub(crate) fn invoke_static(
    registry: &Arc<ClassRegistry>,
    owner: ClassId,
    caller: Option<&CallerContext>,
    name: &str,
    args: &[Value],
) -> AccessResult<Value> {
    let resolved = registry
        .resolve_static(owner, name)
        .ok_or_else(|| AccessError::Undefined(name.to_string()))?;
    run_static(registry, owner, caller, &resolved, args)
}

pub(crate) fn invoke_class_method(
    registry: &Arc<ClassRegistry>,
    owner: ClassId,
    caller: Option<&CallerContext>,
    name: &str,
    args: &[Value],
) -> AccessResult<Value> {
    let resolved = registry
        .resolve_class_method(owner, name)
        .ok_or_else(|| AccessError::Undefined(name.to_string()))?;
    run_static(registry, owner, caller, &resolved, args)
}

fn run_static(
    registry: &Arc<ClassRegistry>,
    owner: ClassId,
    caller: Option<&CallerContext>,
    resolved: &Resolved<StaticDecl>,
    args: &[Value],
) -> AccessResult<Value> {
    let rebound = caller.map(|cx| cx.rebind(registry, owner, None));
    authorize(
        &resolved.decl.name,
        resolved.decl.visibility,
        resolved.declared_by,
        rebound.as_ref(),
        owner,
    )?;
    let cx = CallerContext::resolve(
        registry,
        resolved.decl.id,
        &resolved.decl.name,
        resolved.declared_by,
        owner,
        None,
    );
    let scope = StaticScope {
        registry: Arc::clone(registry),
        owner,
        ctx: cx,
    };
    (resolved.decl.body)(&scope, args)
}

pub(crate) fn property_get(
    object: &Object,
    caller: Option<&CallerContext>,
    prop: &Resolved<PropertyDecl>,
) -> AccessResult<Value> {
    let body = prop
        .decl
        .spec
        .get
        .clone()
        .ok_or_else(|| AccessError::Undefined(prop.decl.name.to_string()))?;
    let scope = property_scope(object, caller, prop)?;
    body(&scope)
}

pub(crate) fn property_set(
    object: &Object,
    caller: Option<&CallerContext>,
    prop: &Resolved<PropertyDecl>,
    value: Value,
) -> AccessResult<()> {
    let body = prop
        .decl
        .spec
        .set
        .clone()
        .ok_or_else(|| AccessError::Undefined(prop.decl.name.to_string()))?;
    let scope = property_scope(object, caller, prop)?;
    body(&scope, value)
}

pub(crate) fn property_delete(
    object: &Object,
    caller: Option<&CallerContext>,
    prop: &Resolved<PropertyDecl>,
) -> AccessResult<()> {
    let body = prop
        .decl
        .spec
        .delete
        .clone()
        .ok_or_else(|| AccessError::Undefined(prop.decl.name.to_string()))?;
    let scope = property_scope(object, caller, prop)?;
    body(&scope)
}

/// Authorize a property access and build the accessor's scope. Each of
/// get/set/delete authorizes independently.
fn property_scope<'a>(
    object: &'a Object,
    caller: Option<&CallerContext>,
    prop: &Resolved<PropertyDecl>,
) -> AccessResult<MethodScope<'a>> {
    let registry = object.registry();
    let concrete = object.class_id();
    let rebound = caller.map(|cx| cx.rebind(registry, concrete, Some(object.instance_id())));
    authorize(
        &prop.decl.name,
        prop.decl.visibility,
        prop.declared_by,
        rebound.as_ref(),
        concrete,
    )?;
    let cx = CallerContext::resolve(
        registry,
        prop.decl.id,
        &prop.decl.name,
        prop.declared_by,
        concrete,
        Some(object.instance_id()),
    );
    Ok(MethodScope::new(object, cx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassDef;
    use crate::AccessKind;

    #[test]
    fn test_public_method_dispatch() {
        let registry = Arc::new(ClassRegistry::new());
        let mut def = ClassDef::new("Greeter");
        def.add_method("greet", Visibility::Public, |_, _| Ok(Value::str("hi")));
        let class = registry.register(def);

        let obj = Object::build(&registry, class, &[]).unwrap();
        assert_eq!(obj.call("greet", &[]).unwrap(), Value::str("hi"));
    }

    #[test]
    fn test_guarded_method_denied_externally() {
        let registry = Arc::new(ClassRegistry::new());
        let mut def = ClassDef::new("Vault");
        def.add_method("open", Visibility::Private, |_, _| Ok(Value::null()));
        let class = registry.register(def);

        let obj = Object::build(&registry, class, &[]).unwrap();
        let err = obj.call("open", &[]).unwrap_err();
        assert_eq!(err.kind(), AccessKind::Private);
    }

    #[test]
    fn test_unknown_method_is_undefined() {
        let registry = Arc::new(ClassRegistry::new());
        let class = registry.register(ClassDef::new("Empty"));
        let obj = Object::build(&registry, class, &[]).unwrap();
        let err = obj.call("missing", &[]).unwrap_err();
        assert_eq!(err.kind(), AccessKind::None);
    }

    #[test]
    fn test_static_guard_captures_owner() {
        let registry = Arc::new(ClassRegistry::new());
        let mut def = ClassDef::new("Counter");
        def.add_static_method("owner_name", Visibility::Public, |scope, _| {
            let name = scope
                .registry()
                .get(scope.owner())
                .map(|d| d.name().to_string())
                .unwrap_or_default();
            Ok(Value::str(name))
        });
        let class = registry.register(def);

        assert_eq!(
            registry.call_static(class, "owner_name", &[]).unwrap(),
            Value::str("Counter")
        );
    }

    #[test]
    fn test_property_without_setter_rejects_writes() {
        let registry = Arc::new(ClassRegistry::new());
        let mut def = ClassDef::new("ReadOnly");
        def.add_property(
            "answer",
            Visibility::Public,
            PropertySpec::new().getter(|_| Ok(Value::int(42))),
        );
        let class = registry.register(def);

        let obj = Object::build(&registry, class, &[]).unwrap();
        assert_eq!(obj.get("answer").unwrap(), Value::int(42));
        let err = obj.set("answer", Value::int(1)).unwrap_err();
        assert_eq!(err.kind(), AccessKind::None);
    }
}
