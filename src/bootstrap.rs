//! Bootstrap and consistency repair
//!
//! `bootstrap` seeds the reserved principals and is safe to call at
//! every startup. `repair` re-derives everything derivable — admin
//! membership for superusers, global membership for everyone, and every
//! permission mapping — skipping (and logging) objects it cannot fix.

use tracing::{error, info, warn};

use crate::constants::{
    ADMIN_COMMUNITY_ID, ADMIN_COMMUNITY_SLUG, FIRST_FREE_ID, GLOBAL_COMMUNITY_ID,
    GLOBAL_COMMUNITY_SLUG, MANAGER, MEMBER, SYSTEM_ID, SYSTEM_SLUG,
};
use crate::db::{read, write};
use crate::error::{err, Error, Result};
use crate::mapping::{rebuild_account_in, rebuild_content_in};
use crate::model::{Account, AccountKind};
use crate::store::{account_in, content_in, list_account_ids, list_content_ids};

/// True once bootstrap has committed
pub fn is_bootstrapped() -> Result<bool> {
    read(|d, tx| Ok(d.meta.get(tx, "boot").map_err(err)?.is_some()))
}

/// Seed the reserved principals if they are missing. Idempotent; never
/// destroys existing data. Call at every startup.
pub fn bootstrap() -> Result<()> {
    bootstrap_inner().map_err(|e| {
        error!(error = %e, "bootstrap failed; the system is in an unstable state, fix and re-run");
        Error::Bootstrap(e.to_string())
    })
}

fn bootstrap_inner() -> Result<()> {
    write(|d, txn| {
        let mut seed = |account: &Account| -> Result<()> {
            if account_in(txn, d, account.id)?.is_some() {
                return Ok(());
            }
            d.accounts
                .put(txn, &account.id.to_be_bytes(), account)
                .map_err(err)?;
            d.slugs.put(txn, &account.slug, &account.id).map_err(err)?;
            rebuild_account_in(txn, d, account)?;
            info!(id = account.id, slug = %account.slug, "reserved account created");
            Ok(())
        };

        seed(&Account {
            id: SYSTEM_ID,
            slug: SYSTEM_SLUG.to_string(),
            kind: AccountKind::System,
            template: "listed".to_string(),
            superuser: false,
        })?;
        seed(&Account {
            id: GLOBAL_COMMUNITY_ID,
            slug: GLOBAL_COMMUNITY_SLUG.to_string(),
            kind: AccountKind::GlobalCommunity,
            template: "intranet".to_string(),
            superuser: false,
        })?;
        seed(&Account {
            id: ADMIN_COMMUNITY_ID,
            slug: ADMIN_COMMUNITY_SLUG.to_string(),
            kind: AccountKind::AdminCommunity,
            template: "workgroup".to_string(),
            superuser: false,
        })?;

        let next: u64 = d
            .meta
            .get(txn, "next_id")
            .map_err(err)?
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        if next < FIRST_FREE_ID {
            d.meta
                .put(txn, "next_id", &FIRST_FREE_ID.to_string())
                .map_err(err)?;
        }
        d.meta.put(txn, "boot", "1").map_err(err)
    })
}

/// Repair a possibly damaged database: re-assert derived invariants and
/// rebuild every permission mapping from its current template. Slow on a
/// large system. Per-object failures are logged and skipped; repair
/// never aborts the batch and never destroys data it doesn't understand.
pub fn repair() -> Result<()> {
    if !is_bootstrapped()? {
        return Err(Error::Bootstrap("repair requires a bootstrapped store".into()));
    }

    let account_ids = list_account_ids()?;

    // Superusers belong to the admin community, as managers
    for &id in &account_ids {
        let Some(account) = read(|d, tx| account_in(tx, d, id))? else {
            continue;
        };
        if account.superuser {
            let joined = write(|d, txn| {
                let flags = d.members.get(txn, id, ADMIN_COMMUNITY_ID)?;
                if flags & MANAGER != 0 {
                    return Ok(false);
                }
                d.members.put_or(txn, id, ADMIN_COMMUNITY_ID, MEMBER | MANAGER)?;
                Ok(true)
            })?;
            if joined {
                info!(id, "superuser joined admin community as manager");
            }
        }
    }

    // Every account belongs to the global community
    for &id in &account_ids {
        if id == SYSTEM_ID || id == GLOBAL_COMMUNITY_ID {
            continue;
        }
        write(|d, txn| {
            if d.members.get(txn, id, GLOBAL_COMMUNITY_ID)? & MEMBER == 0 {
                info!(id, "account joined global community");
                d.members.put_or(txn, id, GLOBAL_COMMUNITY_ID, MEMBER)?;
            }
            Ok(())
        })?;
    }

    // Re-derive every mapping; one transaction per object so a long
    // repair never blocks normal traffic behind a giant transaction
    for id in list_content_ids()? {
        let outcome = write(|d, txn| match content_in(txn, d, id)? {
            Some(content) => rebuild_content_in(txn, d, &content),
            None => Ok(()),
        });
        if let Err(e) = outcome {
            warn!(id, error = %e, "content mapping rebuild failed, prior mapping left in place");
        }
    }
    for &id in &account_ids {
        let outcome = write(|d, txn| match account_in(txn, d, id)? {
            Some(account) => rebuild_account_in(txn, d, &account),
            None => Ok(()),
        });
        if let Err(e) = outcome {
            warn!(id, error = %e, "account mapping rebuild failed, prior mapping left in place");
        }
    }
    Ok(())
}
