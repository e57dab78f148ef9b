//! Query gateway: predicate execution and row access
//!
//! The engine compiles predicates (`filter`); this module is the bulk
//! store that executes them. One scan per query, OR-of-AND clause
//! composition, each row considered exactly once.

use heed::RoTxn;

use crate::db::{read, Dbs};
use crate::error::{err, Error, Result};
use crate::filter::{Clause, Predicate};
use crate::mapping::granted_roles;
use crate::model::{Account, AccountId, Content, ContentId, ContentKind};
use crate::templates::Permission;

/// Fetch an account row
pub fn get_account(id: AccountId) -> Result<Account> {
    read(|d, tx| {
        account_in(tx, d, id)?.ok_or(Error::NotFound { kind: "account", id })
    })
}

pub(crate) fn account_in(tx: &RoTxn, d: &Dbs, id: AccountId) -> Result<Option<Account>> {
    d.accounts.get(tx, &id.to_be_bytes()).map_err(err)
}

/// Look up an account by slug
pub fn get_account_by_slug(slug: &str) -> Result<Option<Account>> {
    read(|d, tx| {
        let Some(id) = d.slugs.get(tx, slug).map_err(err)? else {
            return Ok(None);
        };
        account_in(tx, d, id)
    })
}

pub(crate) fn content_in(tx: &RoTxn, d: &Dbs, id: ContentId) -> Result<Option<Content>> {
    d.contents.get(tx, &id.to_be_bytes()).map_err(err)
}

/// List every account id (unfiltered; maintenance use)
pub fn list_account_ids() -> Result<Vec<AccountId>> {
    read(|d, tx| {
        let mut ids = Vec::new();
        for item in d.accounts.iter(tx).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            if k.len() == 8 {
                ids.push(u64::from_be_bytes(k.try_into().unwrap()));
            }
        }
        Ok(ids)
    })
}

/// List every content id (unfiltered; maintenance use)
pub fn list_content_ids() -> Result<Vec<ContentId>> {
    read(|d, tx| {
        let mut ids = Vec::new();
        for item in d.contents.iter(tx).map_err(err)? {
            let (k, _) = item.map_err(err)?;
            if k.len() == 8 {
                ids.push(u64::from_be_bytes(k.try_into().unwrap()));
            }
        }
        Ok(ids)
    })
}

/// Execute a compiled predicate over the content set in one scan
pub fn query(pred: &Predicate) -> Result<Vec<Content>> {
    read(|d, tx| {
        let mut out = Vec::new();
        if pred.is_match_none() {
            return Ok(out);
        }
        for item in d.contents.iter(tx).map_err(err)? {
            let (_, content) = item.map_err(err)?;
            if matches(tx, d, pred, &content)? {
                out.push(content);
            }
        }
        Ok(out)
    })
}

fn matches(tx: &RoTxn, d: &Dbs, pred: &Predicate, content: &Content) -> Result<bool> {
    let visible = if pred.match_all {
        true
    } else {
        any_clause(tx, d, &pred.clauses, content)?
    };
    if !visible {
        return Ok(false);
    }
    if pred.scope.is_empty() {
        return Ok(true);
    }
    any_clause(tx, d, &pred.scope, content)
}

fn any_clause(tx: &RoTxn, d: &Dbs, clauses: &[Clause], content: &Content) -> Result<bool> {
    for clause in clauses {
        if clause_matches(tx, d, clause, content)? {
            return Ok(true);
        }
    }
    Ok(false)
}

fn clause_matches(tx: &RoTxn, d: &Dbs, clause: &Clause, content: &Content) -> Result<bool> {
    if let Some(p) = clause.publisher {
        if content.publisher != p {
            return Ok(false);
        }
    }
    if let Some(set) = &clause.publisher_in {
        if !set.contains(&content.publisher) {
            return Ok(false);
        }
    }
    if let Some(a) = clause.author {
        if content.author != a {
            return Ok(false);
        }
    }
    if let Some(n) = clause.notified {
        match &content.kind {
            ContentKind::Notification { who, on_who, .. } if *who == n || *on_who == n => {}
            _ => return Ok(false),
        }
    }
    if !clause.content_roles.is_empty() {
        let granted = granted_roles(tx, &d.content_map, content.id, Permission::CanView)?;
        if !granted.intersects(clause.content_roles) {
            return Ok(false);
        }
    }
    if !clause.publisher_roles.is_empty() {
        let granted = granted_roles(tx, &d.acct_map, content.publisher, Permission::CanView)?;
        if !granted.intersects(clause.publisher_roles) {
            return Ok(false);
        }
    }
    Ok(true)
}
