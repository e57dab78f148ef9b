//! Materialized permission mappings
//!
//! One row per (target, permission, role) grant pair, derived from the
//! target's template. Rows are rebuilt inside the owning save's write
//! transaction, so concurrent readers see either the fully-old or the
//! fully-new mapping, never a partial one. Rows are never hand-edited.

use heed::{RoTxn, RwTxn};
use tracing::debug;

use crate::db::{read, write, Db, Dbs};
use crate::error::{err, Error, Result};
use crate::model::{Account, AccountId, Content, ContentId};
use crate::roles::{Role, RoleSet};
use crate::templates::{account_templates, content_templates, Permission};

/// Mapping row key: [target id | permission tag | role tag]
#[inline]
fn map_key(id: u64, perm: Permission, role: Role) -> [u8; 10] {
    let mut k = [0u8; 10];
    k[..8].copy_from_slice(&id.to_be_bytes());
    k[8] = perm.tag();
    k[9] = role.tag();
    k
}

/// Delete every mapping row for a target
pub(crate) fn clear_rows(txn: &mut RwTxn, db: &Db, id: u64) -> Result<()> {
    let keys: Vec<Vec<u8>> = {
        let mut keys = Vec::new();
        for item in db.prefix_iter(txn, &id.to_be_bytes()).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            keys.push(k.to_vec());
        }
        keys
    };
    for k in keys {
        db.delete(txn, &k).map_err(err)?;
    }
    Ok(())
}

fn rebuild_rows(
    txn: &mut RwTxn,
    db: &Db,
    id: u64,
    grants: &[(Role, Permission)],
) -> Result<()> {
    clear_rows(txn, db, id)?;
    for (role, perm) in grants {
        db.put(txn, &map_key(id, *perm, *role), &1).map_err(err)?;
    }
    Ok(())
}

/// Recompute an account's mapping rows from its current template
pub(crate) fn rebuild_account_in(txn: &mut RwTxn, d: &Dbs, account: &Account) -> Result<()> {
    let tpl = account_templates()
        .get(&account.template)
        .map_err(|e| rebuild_failure("account", account.id, e))?;
    rebuild_rows(txn, &d.acct_map, account.id, tpl.grants())?;
    debug!(id = account.id, template = tpl.name(), "account mapping rebuilt");
    Ok(())
}

/// Recompute a content row's mapping from its current template
pub(crate) fn rebuild_content_in(txn: &mut RwTxn, d: &Dbs, content: &Content) -> Result<()> {
    let tpl = content_templates()
        .get(&content.template)
        .map_err(|e| rebuild_failure("content", content.id, e))?;
    rebuild_rows(txn, &d.content_map, content.id, tpl.grants())?;
    debug!(id = content.id, template = tpl.name(), "content mapping rebuilt");
    Ok(())
}

fn rebuild_failure(kind: &'static str, id: u64, source: Error) -> Error {
    Error::MappingRebuild {
        kind,
        id,
        source: Box::new(source),
    }
}

/// Rebuild the mapping for a persisted account
pub fn rebuild_account_mapping(id: AccountId) -> Result<()> {
    write(|d, txn| {
        let account = d
            .accounts
            .get(txn, &id.to_be_bytes())
            .map_err(err)?
            .ok_or(Error::NotFound { kind: "account", id })?;
        rebuild_account_in(txn, d, &account)
    })
}

/// Rebuild the mapping for a persisted content row
pub fn rebuild_content_mapping(id: ContentId) -> Result<()> {
    write(|d, txn| {
        let content = d
            .contents
            .get(txn, &id.to_be_bytes())
            .map_err(err)?
            .ok_or(Error::NotFound { kind: "content", id })?;
        rebuild_content_in(txn, d, &content)
    })
}

/// Roles granted `perm` by a target's materialized mapping
pub(crate) fn granted_roles(tx: &RoTxn, db: &Db, id: u64, perm: Permission) -> Result<RoleSet> {
    let mut pfx = [0u8; 9];
    pfx[..8].copy_from_slice(&id.to_be_bytes());
    pfx[8] = perm.tag();
    let mut set = RoleSet::empty();
    for item in db.prefix_iter(tx, &pfx).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if k.len() == 10 {
            set.insert(Role::from_tag(k[9])?);
        }
    }
    Ok(set)
}

fn list_rows(tx: &RoTxn, db: &Db, id: u64) -> Result<Vec<(Permission, Role)>> {
    let mut rows = Vec::new();
    for item in db.prefix_iter(tx, &id.to_be_bytes()).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if k.len() == 10 {
            rows.push((Permission::from_tag(k[8])?, Role::from_tag(k[9])?));
        }
    }
    Ok(rows)
}

/// List an account's mapping rows (queryable-by-target layout)
pub fn account_mapping(id: AccountId) -> Result<Vec<(Permission, Role)>> {
    read(|d, tx| list_rows(tx, &d.acct_map, id))
}

/// List a content row's mapping rows
pub fn content_mapping(id: ContentId) -> Result<Vec<(Permission, Role)>> {
    read(|d, tx| list_rows(tx, &d.content_map, id))
}
