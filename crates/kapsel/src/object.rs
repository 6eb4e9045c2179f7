//! Object instances and the attribute surface.
//!
//! An [`Object`] is a cloneable handle to one live instance: its class
//! identity, and the member record it owns. The record lives inside the
//! handle and drops with the last clone — there is no external registry
//! of instances and nothing to prune on destruction. Every attribute
//! access locks the record for one atomic read-modify sequence; user
//! bodies never run under the lock.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::access;
use crate::class::{ClassId, ClassRegistry, CONSTRUCTOR};
use crate::context::CallerContext;
use crate::guard;
use crate::member::{MemberTable, Visibility};
use crate::value::Value;
use crate::{AccessError, AccessResult};

/// Global counter for instance ids
static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a live object instance.
///
/// Cloning the handle shares the instance; the member record is released
/// exactly once, when the last handle drops.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    instance_id: u64,
    class_id: ClassId,
    registry: Arc<ClassRegistry>,
    record: Mutex<MemberTable>,
}

impl Object {
    /// Construct an instance of `class`, running its constructor.
    ///
    /// The constructor is resolved from the concrete class upward;
    /// parent constructors run only when the resolved body chains to
    /// them via [`crate::MethodScope::call_super`].
    pub fn build(
        registry: &Arc<ClassRegistry>,
        class: ClassId,
        args: &[Value],
    ) -> AccessResult<Object> {
        if registry.get(class).is_none() {
            return Err(AccessError::Undefined(class.to_string()));
        }
        let object = Object {
            inner: Arc::new(ObjectInner {
                instance_id: NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed),
                class_id: class,
                registry: Arc::clone(registry),
                record: Mutex::new(MemberTable::new()),
            }),
        };
        if let Some(resolved) = registry.resolve_method(class, CONSTRUCTOR) {
            guard::run_method(&object, &resolved, args)?;
        }
        Ok(object)
    }

    /// Unique id of this instance
    pub fn instance_id(&self) -> u64 {
        self.inner.instance_id
    }

    /// Concrete class of this instance
    pub fn class_id(&self) -> ClassId {
        self.inner.class_id
    }

    pub(crate) fn registry(&self) -> &Arc<ClassRegistry> {
        &self.inner.registry
    }

    /// Whether two handles refer to the same instance
    pub fn same_instance(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read an attribute from outside any method body.
    ///
    /// Overlay and public members are always readable; protected and
    /// private members are denied. Falls through to property getters
    /// after a member-table miss.
    pub fn get(&self, name: &str) -> AccessResult<Value> {
        self.get_inner(None, name)
    }

    /// Write an attribute from outside any method body.
    ///
    /// Undeclared names become overlay attributes (ordinary
    /// assignment); declared members go through the decision engine.
    pub fn set(&self, name: &str, value: Value) -> AccessResult<()> {
        self.set_inner(None, name, value)
    }

    /// Delete an attribute from outside any method body.
    ///
    /// Removes overlay entries or runs a property deleter. Declared
    /// members are permanent and report `false`.
    pub fn delete(&self, name: &str) -> AccessResult<bool> {
        self.delete_inner(None, name)
    }

    /// Drop all overlay attributes, leaving declared members intact
    pub fn clear_overlay(&self) {
        self.inner.record.lock().clear();
    }

    /// Invoke a method from outside any method body (public methods
    /// only)
    pub fn call(&self, name: &str, args: &[Value]) -> AccessResult<Value> {
        guard::invoke_method(self, None, name, args)
    }

    pub(crate) fn declare_member(
        &self,
        name: &str,
        value: Value,
        level: Visibility,
        is_final: bool,
        declared_by: ClassId,
    ) {
        self.inner
            .record
            .lock()
            .declare(name, value, level, is_final, declared_by);
    }

    pub(crate) fn get_inner(
        &self,
        caller: Option<&CallerContext>,
        name: &str,
    ) -> AccessResult<Value> {
        let rebound = self.rebind(caller);
        let prop = self.registry().resolve_property(self.class_id(), name);
        {
            let record = self.inner.record.lock();
            if let Some(value) =
                access::read_member(&record, name, rebound.as_ref(), self.class_id())?
            {
                return Ok(value);
            }
        }
        match prop {
            Some(prop) => guard::property_get(self, rebound.as_ref(), &prop),
            None => Err(AccessError::Undefined(name.to_string())),
        }
    }

    pub(crate) fn set_inner(
        &self,
        caller: Option<&CallerContext>,
        name: &str,
        value: Value,
    ) -> AccessResult<()> {
        let rebound = self.rebind(caller);
        let prop = self.registry().resolve_property(self.class_id(), name);
        match prop {
            Some(prop) => {
                let written = {
                    let mut record = self.inner.record.lock();
                    access::write_member(
                        &mut record,
                        name,
                        &value,
                        rebound.as_ref(),
                        self.class_id(),
                    )?
                };
                if written {
                    return Ok(());
                }
                guard::property_set(self, rebound.as_ref(), &prop, value)
            }
            None => {
                let mut record = self.inner.record.lock();
                if access::write_member(&mut record, name, &value, rebound.as_ref(), self.class_id())?
                {
                    return Ok(());
                }
                // ordinary assignment
                record.overlay_insert(name, value);
                Ok(())
            }
        }
    }

    pub(crate) fn delete_inner(
        &self,
        caller: Option<&CallerContext>,
        name: &str,
    ) -> AccessResult<bool> {
        let rebound = self.rebind(caller);
        let prop = self.registry().resolve_property(self.class_id(), name);
        {
            let mut record = self.inner.record.lock();
            if record.remove(name) {
                return Ok(true);
            }
            if record.member(name).is_some() {
                return Ok(false);
            }
        }
        match prop {
            Some(prop) => {
                guard::property_delete(self, rebound.as_ref(), &prop)?;
                Ok(true)
            }
            None => Err(AccessError::Undefined(name.to_string())),
        }
    }

    fn rebind(&self, caller: Option<&CallerContext>) -> Option<CallerContext> {
        caller.map(|cx| cx.rebind(self.registry(), self.class_id(), Some(self.instance_id())))
    }
}

impl PartialEq for Object {
    /// Instance identity, not structural equality
    fn eq(&self, other: &Self) -> bool {
        self.same_instance(other)
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("instance_id", &self.inner.instance_id)
            .field("class_id", &self.inner.class_id)
            .finish()
    }
}
