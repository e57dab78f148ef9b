//! Single-target permission decisions
//!
//! A permission holds when the viewer's resolved role set intersects the
//! roles granted that permission by the target's materialized mapping.
//! The system principal bypasses resolution entirely. Ownership
//! short-circuits edit/delete only; visibility always flows through the
//! mapping.

use heed::RoTxn;

use crate::constants::SYSTEM_ID;
use crate::db::{read, Dbs};
use crate::error::{err, Error, Result};
use crate::mapping::granted_roles;
use crate::model::AccountId;
use crate::resolver::{resolve_in, Target};
use crate::roles::Role;
use crate::templates::Permission;

/// Check whether `viewer` holds `perm` on `target`
pub fn has_permission(
    viewer: Option<AccountId>,
    target: &Target,
    perm: Permission,
) -> Result<bool> {
    if viewer == Some(SYSTEM_ID) {
        return Ok(true);
    }
    read(|d, tx| has_permission_in(tx, d, viewer, target, perm))
}

pub(crate) fn has_permission_in(
    tx: &RoTxn,
    d: &Dbs,
    viewer: Option<AccountId>,
    target: &Target,
    perm: Permission,
) -> Result<bool> {
    if viewer == Some(SYSTEM_ID) {
        return Ok(true);
    }

    // A target with no persisted row has no mapping to check
    let persisted = match target {
        Target::Account(a) => {
            a.id != 0 && d.accounts.get(tx, &a.id.to_be_bytes()).map_err(err)?.is_some()
        }
        Target::Content(c) => {
            c.id != 0 && d.contents.get(tx, &c.id.to_be_bytes()).map_err(err)?.is_some()
        }
    };
    if !persisted {
        return Err(Error::InvalidState(
            "permission check against an unsaved or deleted target",
        ));
    }

    let roles = resolve_in(tx, d, viewer, target)?;

    // Ownership always allows edit/delete, whatever the template says
    if roles.contains(Role::Owner)
        && matches!(perm, Permission::CanEdit | Permission::CanDelete)
    {
        return Ok(true);
    }

    let db = match target {
        Target::Account(_) => &d.acct_map,
        Target::Content(_) => &d.content_map,
    };
    let granted = granted_roles(tx, db, target.id(), perm)?;
    Ok(roles.intersects(granted))
}

/// Error unless `actor` holds `perm` on `target`
pub(crate) fn require_in(
    tx: &RoTxn,
    d: &Dbs,
    actor: AccountId,
    target: &Target,
    perm: Permission,
) -> Result<()> {
    if has_permission_in(tx, d, Some(actor), target, perm)? {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{} lacks {} on {} {}",
            actor,
            perm.name(),
            target.kind_name(),
            target.id()
        )))
    }
}

pub fn can_view(viewer: Option<AccountId>, target: &Target) -> Result<bool> {
    has_permission(viewer, target, Permission::CanView)
}

pub fn can_edit(viewer: Option<AccountId>, target: &Target) -> Result<bool> {
    has_permission(viewer, target, Permission::CanEdit)
}

pub fn can_delete(viewer: Option<AccountId>, target: &Target) -> Result<bool> {
    has_permission(viewer, target, Permission::CanDelete)
}

pub fn can_publish(viewer: Option<AccountId>, publisher: &Target) -> Result<bool> {
    has_permission(viewer, publisher, Permission::CanPublish)
}
