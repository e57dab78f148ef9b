//! rolemap - content visibility and role-based permission resolution
//!
//! Named permission templates are materialized into per-target
//! (role, permission) grant rows on every save. A role resolver computes
//! which roles a viewer holds against a target; single-item decisions
//! intersect those roles with the target's materialized mapping, and
//! bulk listings compile the same rules into one predicate executed by
//! the store in a single scan.

mod account;
mod bootstrap;
mod constants;
mod content;
mod db;
mod error;
mod filter;
mod mapping;
mod model;
mod perm;
mod resolver;
mod roles;
mod store;
mod templates;

pub use account::{
    communities_of, connect, create_account, delete_account, disconnect, follow, follows_of,
    join, leave, managed_by, members_of, network_of, save_account, unfollow, NewAccount,
};
pub use bootstrap::{bootstrap, is_bootstrapped, repair};
pub use constants::{
    ADMIN_COMMUNITY_ID, ADMIN_COMMUNITY_SLUG, GLOBAL_COMMUNITY_ID, GLOBAL_COMMUNITY_SLUG,
    MANAGER, MEMBER, SYSTEM_ID, SYSTEM_SLUG,
};
pub use content::{
    create_content, delete_content, feed_for, followed_by, get_content, save_content, visible,
    NewContent,
};
pub use db::{clear_all, init, test_lock};
pub use error::{Error, Result};
pub use filter::{compile_filter, Clause, Predicate};
pub use mapping::{
    account_mapping, content_mapping, rebuild_account_mapping, rebuild_content_mapping,
};
pub use model::{
    validate_slug, Account, AccountId, AccountKind, Content, ContentId, ContentKind,
};
pub use perm::{can_delete, can_edit, can_publish, can_view, has_permission};
pub use resolver::{resolve, Target};
pub use roles::{implied, Role, RoleSet};
pub use store::{
    get_account, get_account_by_slug, list_account_ids, list_content_ids, query,
};
pub use templates::{account_templates, content_templates, Permission, Registry, Template};
