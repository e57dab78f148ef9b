//! Role resolution: which roles does a viewer hold against a target?

use heed::RoTxn;

use crate::constants::{MANAGER, MEMBER, SYSTEM_ID};
use crate::db::{key, read, Dbs};
use crate::error::{err, Result};
use crate::model::{Account, AccountId, Content};
use crate::roles::{implied, Role, RoleSet};

/// A permission-check target: an account or a content row
#[derive(Clone, Copy, Debug)]
pub enum Target<'a> {
    Account(&'a Account),
    Content(&'a Content),
}

impl Target<'_> {
    #[inline]
    pub fn id(&self) -> u64 {
        match self {
            Target::Account(a) => a.id,
            Target::Content(c) => c.id,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Target::Account(_) => "account",
            Target::Content(_) => "content",
        }
    }
}

/// Compute the closure-expanded role set a viewer holds against a target.
/// `None` is the anonymous viewer; the system principal holds every role.
pub fn resolve(viewer: Option<AccountId>, target: &Target) -> Result<RoleSet> {
    read(|d, tx| resolve_in(tx, d, viewer, target))
}

pub(crate) fn resolve_in(
    tx: &RoTxn,
    d: &Dbs,
    viewer: Option<AccountId>,
    target: &Target,
) -> Result<RoleSet> {
    let Some(v) = viewer else {
        return Ok(implied(Role::Anonymous));
    };
    if v == SYSTEM_ID {
        return Ok(RoleSet::all());
    }

    let mut roles = RoleSet::empty().with(Role::Authenticated);
    match target {
        Target::Account(a) => {
            if a.id == v {
                roles.insert(Role::Owner);
            }
            if in_network(tx, d, v, a.id)? {
                roles.insert(Role::Network);
            }
            if a.kind.is_community() {
                add_membership_roles(tx, d, v, a.id, &mut roles)?;
            }
        }
        Target::Content(c) => {
            if c.author == v {
                roles.insert(Role::Owner);
            }
            // Roles against content flow through its publisher
            if let Some(publisher) = d.accounts.get(tx, &c.publisher.to_be_bytes()).map_err(err)? {
                if publisher.kind.is_community() {
                    add_membership_roles(tx, d, v, publisher.id, &mut roles)?;
                } else if in_network(tx, d, v, publisher.id)? {
                    roles.insert(Role::Network);
                }
            }
        }
    }
    Ok(roles.implied())
}

#[inline]
fn in_network(tx: &RoTxn, d: &Dbs, a: AccountId, b: AccountId) -> Result<bool> {
    Ok(d.network.get(tx, &key(a, b)).map_err(err)?.is_some())
}

fn add_membership_roles(
    tx: &RoTxn,
    d: &Dbs,
    viewer: AccountId,
    community: AccountId,
    roles: &mut RoleSet,
) -> Result<()> {
    let flags = d.members.get(tx, viewer, community)?;
    if flags & MEMBER != 0 {
        roles.insert(Role::CommunityMember);
    }
    if flags & MANAGER != 0 {
        roles.insert(Role::CommunityManager);
    }
    Ok(())
}
