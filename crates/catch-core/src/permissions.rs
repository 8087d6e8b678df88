//! Per-record permission checks.

use std::fmt;

use crate::claims::{OverrideFlag, OverrideSet};
use crate::defaults::CATCH_ADMIN_GROUP_ID;
use crate::models::Annotation;

/// Operation guarded by an ACL list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Update,
    Delete,
    Admin,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::Admin => "admin",
        }
    }

    /// Operation implied by an HTTP method. POST is create and has no ACL.
    pub fn for_method(method: &str) -> Option<Self> {
        match method.to_ascii_uppercase().as_str() {
            "GET" | "HEAD" => Some(Operation::Read),
            "PUT" => Some(Operation::Update),
            "DELETE" => Some(Operation::Delete),
            _ => None,
        }
    }

    /// Token flag that bypasses the ACL for this operation.
    pub fn override_flag(&self) -> OverrideFlag {
        match self {
            Operation::Read => OverrideFlag::CanRead,
            Operation::Update => OverrideFlag::CanUpdate,
            Operation::Delete => OverrideFlag::CanDelete,
            Operation::Admin => OverrideFlag::CanAdmin,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `actor_id` may perform `op` on `record`.
///
/// The admin identity always passes. Otherwise the actor must be listed in
/// the ACL for `op`, hold the matching override flag, or (for reads) the
/// record must be world-readable.
pub fn has_permission(
    op: Operation,
    actor_id: &str,
    record: &Annotation,
    overrides: &OverrideSet,
) -> bool {
    if actor_id == CATCH_ADMIN_GROUP_ID {
        return true;
    }
    let acl = record.permissions.list_for(op);
    if op == Operation::Read && acl.is_empty() {
        return true;
    }
    acl.iter().any(|u| u == actor_id) || overrides.contains(op.override_flag())
}
