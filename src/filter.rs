//! Visibility filter compiler
//!
//! Turns "everything this viewer may see" into a declarative predicate:
//! a union of clauses, each an AND of publisher-reachability and
//! mapping-membership conditions. The store executes the predicate in a
//! single scan (see `store::query`); a row is returned once even when
//! several clauses match.

use crate::constants::{GLOBAL_COMMUNITY_ID, MANAGER, MEMBER, SYSTEM_ID};
use crate::db::{list_pfx, read};
use crate::error::Result;
use crate::mapping::granted_roles;
use crate::model::AccountId;
use crate::roles::{implied, Role, RoleSet};
use crate::templates::Permission;

/// One AND-clause of the compiled predicate. Unset fields don't constrain.
#[derive(Clone, Debug, Default)]
pub struct Clause {
    /// Content's publisher must be this account
    pub publisher: Option<AccountId>,
    /// Content's publisher must be one of these accounts
    pub publisher_in: Option<Vec<AccountId>>,
    /// Content's author must be this account
    pub author: Option<AccountId>,
    /// Content must be a notification naming this account
    pub notified: Option<AccountId>,
    /// Content's mapping must grant `can_view` to a role in this set
    pub content_roles: RoleSet,
    /// Publisher's mapping must grant `can_view` to a role in this set
    pub publisher_roles: RoleSet,
}

impl Clause {
    fn reach(publisher_in: Option<Vec<AccountId>>, content: RoleSet, publisher: RoleSet) -> Self {
        Clause {
            publisher_in,
            content_roles: content,
            publisher_roles: publisher,
            ..Clause::default()
        }
    }
}

/// A compiled visibility predicate: OR of clauses, optionally intersected
/// with an OR-of-clauses scope (used by feed and follow queries).
#[derive(Clone, Debug)]
pub struct Predicate {
    pub(crate) match_all: bool,
    pub(crate) clauses: Vec<Clause>,
    pub(crate) scope: Vec<Clause>,
}

impl Predicate {
    /// Matches every row; clause evaluation is skipped entirely
    pub fn all() -> Self {
        Predicate { match_all: true, clauses: Vec::new(), scope: Vec::new() }
    }

    /// Deliberately unsatisfiable: matches no row
    pub fn none() -> Self {
        Predicate { match_all: false, clauses: Vec::new(), scope: Vec::new() }
    }

    pub fn is_match_all(&self) -> bool {
        self.match_all && self.scope.is_empty()
    }

    pub fn is_match_none(&self) -> bool {
        !self.match_all && self.clauses.is_empty()
    }

    /// Restrict the predicate: a row must also satisfy one scope clause
    pub fn scoped(mut self, scope: Vec<Clause>) -> Self {
        self.scope = scope;
        self
    }
}

/// Compile the visibility predicate for a viewer over the content set
pub fn compile_filter(viewer: Option<AccountId>) -> Result<Predicate> {
    let Some(v) = viewer else {
        return read(|d, tx| {
            // Anonymous reach exists only if the global community itself
            // is listable by anonymous
            let listed = granted_roles(tx, &d.acct_map, GLOBAL_COMMUNITY_ID, Permission::CanList)?;
            if !listed.contains(Role::Anonymous) {
                return Ok(Predicate::none());
            }
            Ok(Predicate {
                match_all: false,
                clauses: vec![Clause::reach(
                    None,
                    implied(Role::Anonymous),
                    implied(Role::Anonymous),
                )],
                scope: Vec::new(),
            })
        });
    };
    if v == SYSTEM_ID {
        return Ok(Predicate::all());
    }

    read(|d, tx| {
        let network: Vec<AccountId> = list_pfx(tx, &d.network, v)?
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        let memberships = d.members.list_fwd(tx, v)?;
        let communities: Vec<AccountId> = memberships
            .iter()
            .filter(|(_, flags)| flags & MEMBER != 0)
            .map(|(id, _)| *id)
            .collect();
        let managed: Vec<AccountId> = memberships
            .iter()
            .filter(|(_, flags)| flags & MANAGER != 0)
            .map(|(id, _)| *id)
            .collect();

        let mut clauses = vec![
            // Public stuff, visible whenever the publisher is
            Clause::reach(None, implied(Role::Anonymous), implied(Role::Authenticated)),
            // What I wrote
            Clause { author: Some(v), ..Clause::default() },
        ];
        if !network.is_empty() {
            clauses.push(Clause::reach(
                Some(network),
                implied(Role::Network),
                implied(Role::Network),
            ));
        }
        if !communities.is_empty() {
            clauses.push(Clause::reach(
                Some(communities),
                implied(Role::CommunityMember),
                implied(Role::CommunityMember),
            ));
        }
        if !managed.is_empty() {
            clauses.push(Clause::reach(
                Some(managed),
                implied(Role::CommunityManager),
                implied(Role::CommunityManager),
            ));
        }
        Ok(Predicate { match_all: false, clauses, scope: Vec::new() })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_none_has_no_clauses() {
        let p = Predicate::none();
        assert!(p.is_match_none());
        assert!(!p.is_match_all());
    }

    #[test]
    fn scoping_keeps_clauses() {
        let p = Predicate::all().scoped(vec![Clause { author: Some(7), ..Clause::default() }]);
        assert!(!p.is_match_all());
        assert!(p.match_all);
        assert_eq!(p.scope.len(), 1);
    }
}
