//! Public attribute access.
//!
//! Public members are readable and writable from any calling context;
//! the only thing that can reject a public write is finality.

use std::sync::Arc;

use kapsel::{AccessKind, ClassDef, ClassId, ClassRegistry, Object, Value, Visibility};

fn new_registry() -> Arc<ClassRegistry> {
    Arc::new(ClassRegistry::new())
}

/// Class declaring `public = "[public value]"` in its constructor.
fn public_class(registry: &Arc<ClassRegistry>) -> ClassId {
    let mut a = ClassDef::new("A");
    a.set_constructor(|scope, _| {
        scope.declare_public("public", Value::str("[public value]"), false);
        Ok(Value::null())
    });
    registry.register(a)
}

// ============================================================================
// From inside the declaring class
// ============================================================================

#[test]
fn test_get_public_from_inside() {
    let registry = new_registry();
    let mut a = ClassDef::new("A");
    a.set_constructor(|scope, _| {
        scope.declare_public("public", Value::str("[public value]"), false);
        assert_eq!(scope.get("public")?, Value::str("[public value]"));
        Ok(Value::null())
    });
    let a = registry.register(a);
    Object::build(&registry, a, &[]).unwrap();
}

#[test]
fn test_set_public_from_inside() {
    let registry = new_registry();
    let mut a = ClassDef::new("A");
    a.set_constructor(|scope, _| {
        scope.declare_public("public", Value::str("[public value]"), false);
        scope.set("public", Value::str("[public value changed]"))?;
        assert_eq!(scope.get("public")?, Value::str("[public value changed]"));
        Ok(Value::null())
    });
    let a = registry.register(a);
    Object::build(&registry, a, &[]).unwrap();
}

// ============================================================================
// From inside a subclass
// ============================================================================

#[test]
fn test_get_public_from_inside_with_child() {
    let registry = new_registry();
    let a = public_class(&registry);

    let mut b = ClassDef::with_parent("B", a);
    b.set_constructor(|scope, _| {
        scope.call_super(&[])?;
        assert_eq!(scope.get("public")?, Value::str("[public value]"));
        Ok(Value::null())
    });
    let b = registry.register(b);
    Object::build(&registry, b, &[]).unwrap();
}

#[test]
fn test_set_public_from_inside_with_child() {
    let registry = new_registry();
    let a = public_class(&registry);

    let mut b = ClassDef::with_parent("B", a);
    b.set_constructor(|scope, _| {
        scope.call_super(&[])?;
        scope.set("public", Value::str("[public value changed]"))?;
        assert_eq!(scope.get("public")?, Value::str("[public value changed]"));
        Ok(Value::null())
    });
    let b = registry.register(b);
    Object::build(&registry, b, &[]).unwrap();
}

// ============================================================================
// From outside any class body
// ============================================================================

#[test]
fn test_get_public_from_outside() {
    let registry = new_registry();
    let a = public_class(&registry);
    let obj = Object::build(&registry, a, &[]).unwrap();
    assert_eq!(obj.get("public").unwrap(), Value::str("[public value]"));
}

#[test]
fn test_set_public_from_outside() {
    let registry = new_registry();
    let a = public_class(&registry);
    let obj = Object::build(&registry, a, &[]).unwrap();

    obj.set("public", Value::str("[public value changed]")).unwrap();
    assert_eq!(obj.get("public").unwrap(), Value::str("[public value changed]"));
}

// ============================================================================
// From an unrelated class holding a reference
// ============================================================================

#[test]
fn test_public_from_unrelated_class_context() {
    let registry = new_registry();
    let a = public_class(&registry);

    let mut holder = ClassDef::new("Holder");
    let shared = Arc::clone(&registry);
    holder.set_constructor(move |scope, _| {
        let target = Object::build(&shared, a, &[])?;
        assert_eq!(scope.get_from(&target, "public")?, Value::str("[public value]"));
        scope.set_on(&target, "public", Value::str("[public value changed]"))?;
        assert_eq!(
            scope.get_from(&target, "public")?,
            Value::str("[public value changed]")
        );
        Ok(Value::null())
    });
    let holder = registry.register(holder);
    Object::build(&registry, holder, &[]).unwrap();
}

// ============================================================================
// Public methods
// ============================================================================

#[test]
fn test_public_method_from_inside_and_outside() {
    let registry = new_registry();
    let mut a = ClassDef::new("A");
    a.set_constructor(|scope, _| {
        assert_eq!(scope.call("describe", &[])?, Value::str("[public value]"));
        Ok(Value::null())
    });
    a.add_method("describe", Visibility::Public, |scope, _| {
        assert!(scope.context().is_literal_declaration());
        assert_eq!(scope.context().method_name(), "describe");
        Ok(Value::str("[public value]"))
    });
    let a = registry.register(a);

    let obj = Object::build(&registry, a, &[]).unwrap();
    assert_eq!(obj.call("describe", &[]).unwrap(), Value::str("[public value]"));
}

// ============================================================================
// Overlay interplay
// ============================================================================

#[test]
fn test_declaring_over_ordinary_assignment_preserves_value() {
    let registry = new_registry();
    let mut a = ClassDef::new("A");
    a.add_method("adopt", Visibility::Public, |scope, _| {
        scope.declare_public("x", Value::str("ignored default"), false);
        Ok(Value::null())
    });
    let a = registry.register(a);

    let obj = Object::build(&registry, a, &[]).unwrap();
    obj.set("x", Value::str("pre-existing")).unwrap();

    obj.call("adopt", &[]).unwrap();
    assert_eq!(obj.get("x").unwrap(), Value::str("pre-existing"));
}

#[test]
fn test_unknown_attribute_reports_undefined() {
    let registry = new_registry();
    let a = public_class(&registry);
    let obj = Object::build(&registry, a, &[]).unwrap();

    let err = obj.get("missing").unwrap_err();
    assert_eq!(err.kind(), AccessKind::None);
    assert_eq!(err.to_string(), "'missing' is not defined");
}

#[test]
fn test_repeated_reads_are_stable() {
    let registry = new_registry();
    let a = public_class(&registry);
    let obj = Object::build(&registry, a, &[]).unwrap();

    let first = obj.get("public").unwrap();
    let second = obj.get("public").unwrap();
    assert_eq!(first, second);
}
