//! Reserved identifiers and fixed limits

// Reserved account IDs (bootstrap always creates these)
pub const SYSTEM_ID: u64 = 1;
pub const GLOBAL_COMMUNITY_ID: u64 = 2;
pub const ADMIN_COMMUNITY_ID: u64 = 3;

// First ID handed out to ordinary accounts and content
pub const FIRST_FREE_ID: u64 = 4;

// Membership flags (stored as a bitmask per (member, community) edge)
pub const MEMBER: u64 = 1;
pub const MANAGER: u64 = 1 << 1;

// Reserved slugs used by bootstrap
pub const SYSTEM_SLUG: &str = "system";
pub const GLOBAL_COMMUNITY_SLUG: &str = "all_members";
pub const ADMIN_COMMUNITY_SLUG: &str = "administrators";

// Slug limits
pub const MAX_SLUG_LEN: usize = 64;

// Derived display text limits
pub const MAX_HEADLINE_LEN: usize = 140;
pub const MAX_SUMMARY_LEN: usize = 1024;
