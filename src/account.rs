//! Account write paths: lifecycle, membership, network, follows
//!
//! Every operation takes the acting account explicitly as its first
//! parameter; there is no ambient current-principal state. Writes that
//! touch a mapping rebuild run it inside the same transaction as the row
//! write.

use heed::RoTxn;
use tracing::{debug, info};

use crate::constants::{
    ADMIN_COMMUNITY_ID, GLOBAL_COMMUNITY_ID, MANAGER, MEMBER, SYSTEM_ID,
};
use crate::db::{alloc_id, key, list_pfx, read, write, Dbs};
use crate::error::{err, Error, Result};
use crate::mapping::{clear_rows, rebuild_account_in};
use crate::model::{validate_slug, Account, AccountId, AccountKind};
use crate::perm::require_in;
use crate::resolver::Target;
use crate::store::account_in;
use crate::templates::{account_templates, Permission};

/// Fields for a new account
#[derive(Clone, Debug)]
pub struct NewAccount {
    pub slug: String,
    pub kind: AccountKind,
    pub template: String,
    pub superuser: bool,
}

/// True when `actor` may administer accounts (system, or a manager of
/// the admin community)
pub(crate) fn is_admin(tx: &RoTxn, d: &Dbs, actor: AccountId) -> Result<bool> {
    if actor == SYSTEM_ID {
        return Ok(true);
    }
    Ok(d.members.get(tx, actor, ADMIN_COMMUNITY_ID)? & MANAGER != 0)
}

fn require_admin(tx: &RoTxn, d: &Dbs, actor: AccountId) -> Result<()> {
    if is_admin(tx, d, actor)? {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "{} may not administer accounts",
            actor
        )))
    }
}

/// Create a new user or community account. The account joins the global
/// community and gets its permission mapping in the same transaction.
pub fn create_account(actor: AccountId, new: NewAccount) -> Result<AccountId> {
    write(|d, txn| {
        require_admin(txn, d, actor)?;
        if new.kind.is_reserved() {
            return Err(Error::InvalidState(
                "reserved account kinds are created by bootstrap only",
            ));
        }
        validate_slug(&new.slug)?;
        if d.slugs.get(txn, &new.slug).map_err(err)?.is_some() {
            return Err(Error::InvalidState("slug already in use"));
        }
        account_templates().get(&new.template)?;

        let id = alloc_id(txn, d)?;
        let account = Account {
            id,
            slug: new.slug,
            kind: new.kind,
            template: new.template,
            superuser: new.superuser,
        };
        d.accounts.put(txn, &id.to_be_bytes(), &account).map_err(err)?;
        d.slugs.put(txn, &account.slug, &id).map_err(err)?;
        d.members.put_or(txn, id, GLOBAL_COMMUNITY_ID, MEMBER)?;
        rebuild_account_in(txn, d, &account)?;
        info!(id, slug = %account.slug, kind = ?account.kind, "account created");
        Ok(id)
    })
}

/// Save changes to an existing account. Editing requires `can_edit`
/// against the current persisted state; a template change rebuilds the
/// mapping atomically with the row write.
pub fn save_account(actor: AccountId, account: &Account) -> Result<()> {
    write(|d, txn| {
        let current = account_in(txn, d, account.id)?.ok_or(Error::NotFound {
            kind: "account",
            id: account.id,
        })?;
        require_in(txn, d, actor, &Target::Account(&current), Permission::CanEdit)?;
        if account.kind != current.kind {
            return Err(Error::InvalidState("account kind cannot change"));
        }
        if account.superuser != current.superuser && actor != SYSTEM_ID {
            return Err(Error::PermissionDenied(format!(
                "{} may not change the superuser flag",
                actor
            )));
        }
        account_templates().get(&account.template)?;
        if account.slug != current.slug {
            validate_slug(&account.slug)?;
            if d.slugs.get(txn, &account.slug).map_err(err)?.is_some() {
                return Err(Error::InvalidState("slug already in use"));
            }
            d.slugs.delete(txn, &current.slug).map_err(err)?;
            d.slugs.put(txn, &account.slug, &account.id).map_err(err)?;
        }
        d.accounts
            .put(txn, &account.id.to_be_bytes(), account)
            .map_err(err)?;
        rebuild_account_in(txn, d, account)
    })
}

/// Delete an account, cascading its mapping rows, memberships, network
/// edges, follows, and the content it published or authored.
pub fn delete_account(actor: AccountId, id: AccountId) -> Result<()> {
    write(|d, txn| {
        if id == SYSTEM_ID || id == GLOBAL_COMMUNITY_ID || id == ADMIN_COMMUNITY_ID {
            return Err(Error::InvalidState("reserved accounts cannot be deleted"));
        }
        let current = account_in(txn, d, id)?.ok_or(Error::NotFound { kind: "account", id })?;
        require_in(txn, d, actor, &Target::Account(&current), Permission::CanDelete)?;

        let doomed: Vec<u64> = {
            let mut doomed = Vec::new();
            for item in d.contents.iter(txn).map_err(err)? {
                let (_, c) = item.map_err(err)?;
                if c.publisher == id || c.author == id {
                    doomed.push(c.id);
                }
            }
            doomed
        };
        for cid in doomed {
            d.contents.delete(txn, &cid.to_be_bytes()).map_err(err)?;
            clear_rows(txn, &d.content_map, cid)?;
        }

        for (community, _) in d.members.list_fwd(txn, id)? {
            d.members.del(txn, id, community)?;
        }
        if current.kind.is_community() {
            for (member, _) in d.members.list_rev(txn, id)? {
                d.members.del(txn, member, id)?;
            }
        }
        for (peer, _) in list_pfx(txn, &d.network, id)? {
            d.network.delete(txn, &key(id, peer)).map_err(err)?;
            d.network.delete(txn, &key(peer, id)).map_err(err)?;
        }
        for (followed, _) in d.follows.list_fwd(txn, id)? {
            d.follows.del(txn, id, followed)?;
        }
        for (follower, _) in d.follows.list_rev(txn, id)? {
            d.follows.del(txn, follower, id)?;
        }

        clear_rows(txn, &d.acct_map, id)?;
        d.slugs.delete(txn, &current.slug).map_err(err)?;
        d.accounts.delete(txn, &id.to_be_bytes()).map_err(err)?;
        info!(id, slug = %current.slug, "account deleted");
        Ok(())
    })
}

/// Add `member` to `community`, optionally as a manager. Mediated by the
/// community's managers or the system principal. Re-joining upgrades
/// flags, never downgrades.
pub fn join(
    actor: AccountId,
    community: AccountId,
    member: AccountId,
    as_manager: bool,
) -> Result<()> {
    write(|d, txn| {
        let target = account_in(txn, d, community)?.ok_or(Error::NotFound {
            kind: "account",
            id: community,
        })?;
        if !target.kind.is_community() {
            return Err(Error::InvalidState("join target is not a community"));
        }
        account_in(txn, d, member)?.ok_or(Error::NotFound { kind: "account", id: member })?;
        if member == SYSTEM_ID {
            return Err(Error::InvalidState("the system account joins nothing"));
        }
        let manages = d.members.get(txn, actor, community)? & MANAGER != 0;
        if actor != SYSTEM_ID && !manages && !is_admin(txn, d, actor)? {
            return Err(Error::PermissionDenied(format!(
                "{} may not manage membership of community {}",
                actor, community
            )));
        }
        let flags = if as_manager { MEMBER | MANAGER } else { MEMBER };
        d.members.put_or(txn, member, community, flags)?;
        debug!(member, community, as_manager, "membership added");
        Ok(())
    })
}

/// Remove `member` from `community`. Members may leave on their own;
/// managers and the system principal may remove anyone. Nobody leaves
/// the global community.
pub fn leave(actor: AccountId, community: AccountId, member: AccountId) -> Result<()> {
    write(|d, txn| {
        if community == GLOBAL_COMMUNITY_ID {
            return Err(Error::PermissionDenied(
                "the global community cannot be left".into(),
            ));
        }
        let manages = d.members.get(txn, actor, community)? & MANAGER != 0;
        if actor != member && actor != SYSTEM_ID && !manages {
            return Err(Error::PermissionDenied(format!(
                "{} may not manage membership of community {}",
                actor, community
            )));
        }
        d.members.del(txn, member, community)?;
        debug!(member, community, "membership removed");
        Ok(())
    })
}

/// Approve a symmetric network relation between two accounts. Both
/// directions are written in one transaction; one-sided rows cannot
/// exist.
pub fn connect(actor: AccountId, a: AccountId, b: AccountId) -> Result<()> {
    write(|d, txn| {
        if a == b {
            return Err(Error::InvalidState("an account cannot network with itself"));
        }
        if actor != a && actor != b && actor != SYSTEM_ID {
            return Err(Error::PermissionDenied(format!(
                "{} is not an endpoint of the relation",
                actor
            )));
        }
        account_in(txn, d, a)?.ok_or(Error::NotFound { kind: "account", id: a })?;
        account_in(txn, d, b)?.ok_or(Error::NotFound { kind: "account", id: b })?;
        d.network.put(txn, &key(a, b), &1).map_err(err)?;
        d.network.put(txn, &key(b, a), &1).map_err(err)?;
        debug!(a, b, "network relation approved");
        Ok(())
    })
}

/// Remove a network relation, both directions at once
pub fn disconnect(actor: AccountId, a: AccountId, b: AccountId) -> Result<()> {
    write(|d, txn| {
        if actor != a && actor != b && actor != SYSTEM_ID {
            return Err(Error::PermissionDenied(format!(
                "{} is not an endpoint of the relation",
                actor
            )));
        }
        d.network.delete(txn, &key(a, b)).map_err(err)?;
        d.network.delete(txn, &key(b, a)).map_err(err)?;
        Ok(())
    })
}

/// Start following an account or community
pub fn follow(actor: AccountId, followed: AccountId) -> Result<()> {
    write(|d, txn| {
        account_in(txn, d, followed)?.ok_or(Error::NotFound {
            kind: "account",
            id: followed,
        })?;
        d.follows.put(txn, actor, followed, 1)
    })
}

pub fn unfollow(actor: AccountId, followed: AccountId) -> Result<()> {
    write(|d, txn| {
        d.follows.del(txn, actor, followed)?;
        Ok(())
    })
}

/// Accounts in `id`'s approved network
pub fn network_of(id: AccountId) -> Result<Vec<AccountId>> {
    read(|d, tx| Ok(list_pfx(tx, &d.network, id)?.into_iter().map(|(p, _)| p).collect()))
}

/// Communities `id` belongs to
pub fn communities_of(id: AccountId) -> Result<Vec<AccountId>> {
    read(|d, tx| {
        Ok(d.members
            .list_fwd(tx, id)?
            .into_iter()
            .filter(|(_, flags)| flags & MEMBER != 0)
            .map(|(c, _)| c)
            .collect())
    })
}

/// Communities `id` manages
pub fn managed_by(id: AccountId) -> Result<Vec<AccountId>> {
    read(|d, tx| {
        Ok(d.members
            .list_fwd(tx, id)?
            .into_iter()
            .filter(|(_, flags)| flags & MANAGER != 0)
            .map(|(c, _)| c)
            .collect())
    })
}

/// Members of a community, with their manager flag
pub fn members_of(community: AccountId) -> Result<Vec<(AccountId, bool)>> {
    read(|d, tx| {
        Ok(d.members
            .list_rev(tx, community)?
            .into_iter()
            .map(|(m, flags)| (m, flags & MANAGER != 0))
            .collect())
    })
}

/// Accounts `id` follows
pub fn follows_of(id: AccountId) -> Result<Vec<AccountId>> {
    read(|d, tx| Ok(d.follows.list_fwd(tx, id)?.into_iter().map(|(f, _)| f).collect()))
}
