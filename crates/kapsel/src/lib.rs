//! Kapsel — member visibility and finality for dynamic objects
//!
//! Kapsel gives plain data objects C++/Java-style member access control
//! inside an object model that otherwise exposes all state uniformly:
//! - Public, protected, and private attributes, partitioned per object
//! - Final (write-once) attributes, locked at declaration time
//! - Guarded callables: methods, static methods, class-level methods,
//!   and computed properties, all checked through one decision engine
//!
//! The core is the access resolution pipeline: every access runs
//! caller → [`CallerContext`] resolution → decision engine → member table.
//! The identity of the executing code is never inferred from the call
//! stack; it is an explicit capability ([`MethodScope`] / [`StaticScope`])
//! constructed by the dispatcher and threaded into method bodies.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod access;
mod class;
mod context;
mod guard;
mod member;
mod object;
mod value;

pub use class::{ClassDef, ClassId, ClassRegistry, DeclId, CONSTRUCTOR};
pub use context::CallerContext;
pub use guard::{
    MethodBody, MethodScope, PropertyDeleteBody, PropertyGetBody, PropertySetBody, PropertySpec,
    StaticBody, StaticScope,
};
pub use member::{Member, MemberTable, Visibility};
pub use object::Object;
pub use value::Value;

/// Access violation raised by the decision engine.
///
/// One error type covers the whole surface; consumers branch on
/// [`AccessError::kind`] rather than matching variants directly.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    /// The name resolves to nothing on the object or its class chain
    #[error("'{0}' is not defined")]
    Undefined(String),

    /// Visibility violation on a protected member or callable
    #[error("'{0}' is protected")]
    Protected(String),

    /// Visibility violation on a private member or callable
    #[error("'{0}' is private")]
    Private(String),

    /// Write attempted on a final member
    #[error("'{0}' is final")]
    Final(String),
}

/// Error taxonomy carried by [`AccessError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Not an access violation (name resolution failure)
    None,
    /// Protected member violation
    Protected,
    /// Private member violation
    Private,
    /// Final member violation
    Final,
}

impl AccessError {
    /// The violated access level, `AccessKind::None` for plain
    /// resolution failures.
    pub fn kind(&self) -> AccessKind {
        match self {
            AccessError::Undefined(_) => AccessKind::None,
            AccessError::Protected(_) => AccessKind::Protected,
            AccessError::Private(_) => AccessKind::Private,
            AccessError::Final(_) => AccessKind::Final,
        }
    }

    /// The member or callable name the failed access targeted.
    pub fn name(&self) -> &str {
        match self {
            AccessError::Undefined(name)
            | AccessError::Protected(name)
            | AccessError::Private(name)
            | AccessError::Final(name) => name,
        }
    }
}

/// Result of an access attempt.
pub type AccessResult<T> = Result<T, AccessError>;
