//! The access decision engine.
//!
//! One rule table decides every access — attribute reads and writes,
//! method invocations, static and class-level dispatch, property
//! accessors. Callers hand in the member's level and declaring class,
//! the caller's resolved context (or `None` for code outside any
//! dispatched body), and the accessed object's concrete class.

use crate::class::ClassId;
use crate::context::CallerContext;
use crate::member::{MemberTable, Visibility};
use crate::value::Value;
use crate::{AccessError, AccessResult};

/// Decide whether the caller may touch a declaration.
///
/// Literal execution — code running as the exact declaration the
/// concrete class exposes under its name — may always touch protected
/// state, and private state when the declaring class is the concrete
/// class itself. The non-literal branch covers polymorphic dispatch: an
/// inherited declaration executing on behalf of a more-derived instance
/// still reaches members owned by the nearest root ancestor, provided
/// the executing declaration belongs to the target's own hierarchy.
pub(crate) fn authorize(
    name: &str,
    level: Visibility,
    declared_by: ClassId,
    caller: Option<&CallerContext>,
    concrete: ClassId,
) -> AccessResult<()> {
    match level {
        Visibility::Public => Ok(()),
        Visibility::Protected => {
            let granted = caller.is_some_and(|cx| {
                cx.is_literal
                    || (cx.in_hierarchy
                        && declared_by != concrete
                        && Some(declared_by) == cx.nearest_root)
            });
            if granted {
                Ok(())
            } else {
                Err(AccessError::Protected(name.to_string()))
            }
        }
        Visibility::Private => {
            let granted = caller.is_some_and(|cx| {
                (cx.is_literal && declared_by == concrete)
                    || (!cx.is_literal
                        && cx.in_hierarchy
                        && declared_by != concrete
                        && Some(declared_by) == cx.nearest_root)
            });
            if granted {
                Ok(())
            } else {
                Err(AccessError::Private(name.to_string()))
            }
        }
    }
}

/// Read a member out of the table.
///
/// Lookup order: overlay (always visible), then declared members with an
/// authorization check. `Ok(None)` means the name is not present at all
/// and the caller should fall through to normal attribute resolution.
pub(crate) fn read_member(
    table: &MemberTable,
    name: &str,
    caller: Option<&CallerContext>,
    concrete: ClassId,
) -> AccessResult<Option<Value>> {
    if let Some(value) = table.overlay_get(name) {
        return Ok(Some(value.clone()));
    }
    match table.member(name) {
        Some(member) => {
            authorize(name, member.level, member.declared_by, caller, concrete)?;
            Ok(Some(member.value.clone()))
        }
        None => Ok(None),
    }
}

/// Write a member in the table.
///
/// Overlay writes always succeed. Declared members authorize first, then
/// check finality — a final member rejects every write after the one
/// performed at declaration time, regardless of level. `Ok(false)` means
/// the name is not declared and ordinary assignment should proceed.
pub(crate) fn write_member(
    table: &mut MemberTable,
    name: &str,
    value: &Value,
    caller: Option<&CallerContext>,
    concrete: ClassId,
) -> AccessResult<bool> {
    if table.overlay_contains(name) {
        table.overlay_insert(name, value.clone());
        return Ok(true);
    }
    let (level, declared_by, is_final) = match table.member(name) {
        Some(member) => (member.level, member.declared_by, member.is_final),
        None => return Ok(false),
    };
    authorize(name, level, declared_by, caller, concrete)?;
    if is_final {
        return Err(AccessError::Final(name.to_string()));
    }
    if let Some(member) = table.member_mut(name) {
        member.value = value.clone();
    }
    Ok(true)
}
