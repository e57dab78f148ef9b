//! Role catalog: atomic roles and their fixed implication lattice
//!
//! Roles form an implication lattice: holding a stronger role implies
//! holding every weaker role it is built from. The lattice is defined
//! once here and never mutated at runtime.

use crate::error::{Error, Result};

/// Atomic role tags resolved for a viewer against a target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Role {
    /// No authenticated account
    Anonymous = 0,
    /// Any logged-in account
    Authenticated = 1,
    /// Viewer shares an approved network relation with the target's owner
    Network = 2,
    /// Viewer is a member of the target community (or the publisher community)
    CommunityMember = 3,
    /// Viewer manages the target community (or the publisher community)
    CommunityManager = 4,
    /// Viewer is the target's author, or the target account itself
    Owner = 5,
    /// The omniscient system principal
    System = 6,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Anonymous,
        Role::Authenticated,
        Role::Network,
        Role::CommunityMember,
        Role::CommunityManager,
        Role::Owner,
        Role::System,
    ];

    #[inline]
    pub fn bit(self) -> u16 {
        1 << (self as u16)
    }

    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Decode a stored role tag. A tag outside the catalog is a contract
    /// violation, not a recoverable data error.
    pub fn from_tag(tag: u8) -> Result<Role> {
        match tag {
            0 => Ok(Role::Anonymous),
            1 => Ok(Role::Authenticated),
            2 => Ok(Role::Network),
            3 => Ok(Role::CommunityMember),
            4 => Ok(Role::CommunityManager),
            5 => Ok(Role::Owner),
            6 => Ok(Role::System),
            _ => Err(Error::InvalidRole(tag)),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Authenticated => "authenticated",
            Role::Network => "network",
            Role::CommunityMember => "community_member",
            Role::CommunityManager => "community_manager",
            Role::Owner => "owner",
            Role::System => "system",
        }
    }
}

/// A set of roles as a bitmask
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RoleSet(u16);

impl RoleSet {
    pub const fn empty() -> Self {
        RoleSet(0)
    }

    pub fn all() -> Self {
        Role::ALL.iter().fold(RoleSet(0), |s, r| s.with(*r))
    }

    pub fn from_roles(roles: &[Role]) -> Self {
        roles.iter().fold(RoleSet(0), |s, r| s.with(*r))
    }

    #[inline]
    pub fn with(self, role: Role) -> Self {
        RoleSet(self.0 | role.bit())
    }

    #[inline]
    pub fn insert(&mut self, role: Role) {
        self.0 |= role.bit();
    }

    #[inline]
    pub fn contains(self, role: Role) -> bool {
        self.0 & role.bit() != 0
    }

    #[inline]
    pub fn union(self, other: RoleSet) -> RoleSet {
        RoleSet(self.0 | other.0)
    }

    #[inline]
    pub fn intersects(self, other: RoleSet) -> bool {
        self.0 & other.0 != 0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }

    /// Expand every member through the implication lattice
    pub fn implied(self) -> RoleSet {
        self.iter().fold(RoleSet::empty(), |s, r| s.union(implied(r)))
    }
}

/// Reflexive-transitive closure of roles implied by `role`
pub fn implied(role: Role) -> RoleSet {
    use Role::*;
    match role {
        Anonymous => RoleSet::from_roles(&[Anonymous]),
        Authenticated => RoleSet::from_roles(&[Authenticated, Anonymous]),
        Network => RoleSet::from_roles(&[Network, Authenticated, Anonymous]),
        CommunityMember => RoleSet::from_roles(&[CommunityMember, Authenticated, Anonymous]),
        CommunityManager => {
            RoleSet::from_roles(&[CommunityManager, CommunityMember, Authenticated, Anonymous])
        }
        Owner => RoleSet::from_roles(&[Owner, Authenticated, Anonymous]),
        System => RoleSet::all(),
    }
}
