//! Permission template registries
//!
//! A template is a named, immutable bundle of (role, permission) grants.
//! Two catalogs exist: one for Account targets, one for Content targets,
//! because the meaningful roles differ by target kind. Changing a target's
//! security means selecting a different template name, never mutating a
//! template.

use crate::error::{Error, Result};
use crate::roles::{Role, RoleSet};

/// Atomic permissions granted by templates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Permission {
    /// Appear in listings (account targets)
    CanList = 0,
    /// Read the target
    CanView = 1,
    CanEdit = 2,
    CanDelete = 3,
    /// Publish content through the target (account targets)
    CanPublish = 4,
}

impl Permission {
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Permission> {
        match tag {
            0 => Ok(Permission::CanList),
            1 => Ok(Permission::CanView),
            2 => Ok(Permission::CanEdit),
            3 => Ok(Permission::CanDelete),
            4 => Ok(Permission::CanPublish),
            _ => Err(Error::InvalidRole(tag)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Permission::CanList => "can_list",
            Permission::CanView => "can_view",
            Permission::CanEdit => "can_edit",
            Permission::CanDelete => "can_delete",
            Permission::CanPublish => "can_publish",
        }
    }
}

/// A named, immutable set of (role, permission) grant pairs
#[derive(Debug)]
pub struct Template {
    name: &'static str,
    grants: &'static [(Role, Permission)],
}

impl Template {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn grants(&self) -> &'static [(Role, Permission)] {
        self.grants
    }

    /// Roles granted `perm` by this template
    pub fn granted_roles(&self, perm: Permission) -> RoleSet {
        self.grants
            .iter()
            .filter(|(_, p)| *p == perm)
            .fold(RoleSet::empty(), |s, (r, _)| s.with(*r))
    }
}

/// One of the two process-wide template catalogs
#[derive(Debug)]
pub struct Registry {
    templates: &'static [Template],
    default: &'static str,
}

impl Registry {
    pub fn get(&self, name: &str) -> Result<&'static Template> {
        self.templates
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.templates.iter().map(|t| t.name)
    }

    pub fn default_name(&self) -> &'static str {
        self.default
    }
}

use Permission::*;
use Role::*;

const ACCOUNT_TEMPLATES: &[Template] = &[
    Template {
        name: "public",
        grants: &[
            (Anonymous, CanList),
            (Anonymous, CanView),
            (Owner, CanPublish),
            (CommunityMember, CanPublish),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        // Name listed to anyone, profile restricted to logged-in accounts
        name: "listed",
        grants: &[
            (Anonymous, CanList),
            (Authenticated, CanView),
            (Owner, CanPublish),
            (CommunityMember, CanPublish),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        name: "intranet",
        grants: &[
            (Authenticated, CanList),
            (Authenticated, CanView),
            (Owner, CanPublish),
            (CommunityManager, CanPublish),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        name: "private",
        grants: &[
            (Owner, CanList),
            (Owner, CanView),
            (Owner, CanPublish),
            (Owner, CanEdit),
            (Owner, CanDelete),
        ],
    },
    Template {
        // Members-only community: content and roster visible to members,
        // any member may publish, managers administer
        name: "workgroup",
        grants: &[
            (Authenticated, CanList),
            (CommunityMember, CanView),
            (Owner, CanView),
            (CommunityMember, CanPublish),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
];

const CONTENT_TEMPLATES: &[Template] = &[
    Template {
        name: "public",
        grants: &[
            (Anonymous, CanView),
            (Owner, CanView),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        // Visible to the publisher's approved network
        name: "network",
        grants: &[
            (Network, CanView),
            (Owner, CanView),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        // Visible to members of the publisher community. Published to the
        // global community this means every authenticated account.
        name: "intranet",
        grants: &[
            (CommunityMember, CanView),
            (Owner, CanView),
            (Owner, CanEdit),
            (Owner, CanDelete),
            (CommunityManager, CanEdit),
            (CommunityManager, CanDelete),
        ],
    },
    Template {
        name: "private",
        grants: &[
            (Owner, CanView),
            (Owner, CanEdit),
            (Owner, CanDelete),
        ],
    },
];

static ACCOUNT_REGISTRY: Registry = Registry {
    templates: ACCOUNT_TEMPLATES,
    default: "intranet",
};

static CONTENT_REGISTRY: Registry = Registry {
    templates: CONTENT_TEMPLATES,
    default: "public",
};

/// Template catalog for Account (and Community) targets
pub fn account_templates() -> &'static Registry {
    &ACCOUNT_REGISTRY
}

/// Template catalog for Content targets
pub fn content_templates() -> &'static Registry {
    &CONTENT_REGISTRY
}
