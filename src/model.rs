//! Account and Content rows
//!
//! Content carries a tagged `ContentKind` enum of concrete variants; the
//! variant drives display derivation at save time. Raw "untyped" content
//! cannot be expressed, so it can never be persisted.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_HEADLINE_LEN, MAX_SLUG_LEN, MAX_SUMMARY_LEN};
use crate::error::{Error, Result};

pub type AccountId = u64;
pub type ContentId = u64;

/// Concrete account variants
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccountKind {
    User,
    Community,
    GlobalCommunity,
    AdminCommunity,
    System,
}

impl AccountKind {
    #[inline]
    pub fn is_community(self) -> bool {
        matches!(
            self,
            AccountKind::Community | AccountKind::GlobalCommunity | AccountKind::AdminCommunity
        )
    }

    /// Reserved kinds are created by bootstrap only
    #[inline]
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            AccountKind::System | AccountKind::GlobalCommunity | AccountKind::AdminCommunity
        )
    }
}

/// A principal: human user, community, or the system pseudo-account
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub slug: String,
    pub kind: AccountKind,
    /// Name of the account-catalog permission template in force
    pub template: String,
    /// Operator flag; repair() forces superusers into the admin community
    pub superuser: bool,
}

/// Concrete content variants. The variant tag is the single source of
/// truth for per-type behavior (display derivation, feed matching).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ContentKind {
    Status { text: String },
    Document { title: String, text: String },
    Notification { who: AccountId, on_who: AccountId, text: String },
}

impl ContentKind {
    pub fn label(&self) -> &'static str {
        match self {
            ContentKind::Status { .. } => "status",
            ContentKind::Document { .. } => "document",
            ContentKind::Notification { .. } => "notification",
        }
    }

    /// Raw text the headline is derived from
    fn headline_source(&self) -> &str {
        match self {
            ContentKind::Status { text } => text,
            ContentKind::Document { title, .. } => title,
            ContentKind::Notification { text, .. } => text,
        }
    }

    /// Raw text the summary is derived from
    fn summary_source(&self) -> &str {
        match self {
            ContentKind::Status { text } => text,
            ContentKind::Document { text, .. } => text,
            ContentKind::Notification { text, .. } => text,
        }
    }
}

/// An item published through a publisher account, written by an author
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub id: ContentId,
    /// The account this content is published for (its visibility scope)
    pub publisher: AccountId,
    /// The originating account, not necessarily the publisher
    pub author: AccountId,
    /// Name of the content-catalog permission template in force
    pub template: String,
    pub kind: ContentKind,
    /// Derived at save time, never client-supplied
    pub text_headline: String,
    pub text_summary: String,
    pub created_at: u64,
}

impl Content {
    /// Recompute the cached display fields from the variant.
    /// The summary is blanked when it would just repeat the headline.
    pub(crate) fn derive_display(&mut self) {
        self.text_headline = truncate(self.kind.headline_source(), MAX_HEADLINE_LEN);
        let summary = truncate(self.kind.summary_source(), MAX_SUMMARY_LEN);
        self.text_summary = if summary == self.text_headline {
            String::new()
        } else {
            summary
        };
    }
}

/// Truncate on a char boundary, marking elided text
fn truncate(text: &str, max: usize) -> String {
    let marker = " [...]";
    if text.chars().count() <= max {
        return text.to_string();
    }
    let keep = max - marker.chars().count();
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(marker);
    out
}

/// Validate an account slug: non-empty, bounded, `[a-z0-9_-]` only
pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() {
        return Err(Error::InvalidState("slug cannot be empty"));
    }
    if slug.len() > MAX_SLUG_LEN {
        return Err(Error::InvalidState("slug too long"));
    }
    if !slug
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-')
    {
        return Err(Error::InvalidState(
            "slug may only contain a-z, 0-9, '_' and '-'",
        ));
    }
    Ok(())
}
