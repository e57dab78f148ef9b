//! Content write paths and viewer queries
//!
//! Publishing is an explicit pipeline: resolve publisher defaults,
//! check publish rights, derive display fields, persist, rebuild the
//! mapping — all stages composed here, inside one transaction.

use tracing::{debug, info};

use crate::db::{alloc_id, write};
use crate::error::{err, Error, Result};
use crate::filter::{compile_filter, Clause};
use crate::mapping::{clear_rows, rebuild_content_in};
use crate::model::{AccountId, Content, ContentId, ContentKind};
use crate::perm::{can_view, require_in};
use crate::resolver::Target;
use crate::store::{self, account_in, content_in};
use crate::templates::{content_templates, Permission};

/// Fields for a new content item. Unset publisher defaults to the
/// author; unset author defaults to the acting account. Setting an
/// author other than the acting account is forbidden on create.
#[derive(Clone, Debug)]
pub struct NewContent {
    pub publisher: Option<AccountId>,
    pub author: Option<AccountId>,
    pub template: Option<String>,
    pub kind: ContentKind,
    pub created_at: u64,
}

/// Publish a new content item
pub fn create_content(actor: AccountId, new: NewContent) -> Result<ContentId> {
    write(|d, txn| {
        account_in(txn, d, actor)?.ok_or(Error::NotFound { kind: "account", id: actor })?;

        let author = match new.author {
            None => actor,
            Some(a) if a == actor => actor,
            Some(_) => {
                return Err(Error::PermissionDenied(
                    "the author cannot be set on create".into(),
                ))
            }
        };
        let publisher_id = new.publisher.unwrap_or(author);
        let publisher = account_in(txn, d, publisher_id)?.ok_or(Error::NotFound {
            kind: "account",
            id: publisher_id,
        })?;
        require_in(txn, d, actor, &Target::Account(&publisher), Permission::CanPublish)?;

        let template = new
            .template
            .unwrap_or_else(|| content_templates().default_name().to_string());
        content_templates().get(&template)?;

        let id = alloc_id(txn, d)?;
        let mut content = Content {
            id,
            publisher: publisher_id,
            author,
            template,
            kind: new.kind,
            text_headline: String::new(),
            text_summary: String::new(),
            created_at: new.created_at,
        };
        content.derive_display();
        d.contents.put(txn, &id.to_be_bytes(), &content).map_err(err)?;
        rebuild_content_in(txn, d, &content)?;
        info!(id, publisher = publisher_id, author, kind = content.kind.label(), "content published");
        Ok(id)
    })
}

/// Save changes to existing content. Editing requires `can_edit` against
/// the current persisted state; the author is immutable; moving to a new
/// publisher requires `can_publish` there.
pub fn save_content(actor: AccountId, content: &Content) -> Result<()> {
    write(|d, txn| {
        let current = content_in(txn, d, content.id)?.ok_or(Error::NotFound {
            kind: "content",
            id: content.id,
        })?;
        require_in(txn, d, actor, &Target::Content(&current), Permission::CanEdit)?;
        if content.author != current.author {
            return Err(Error::PermissionDenied(
                "the author of existing content cannot be changed".into(),
            ));
        }
        if content.publisher != current.publisher {
            let publisher = account_in(txn, d, content.publisher)?.ok_or(Error::NotFound {
                kind: "account",
                id: content.publisher,
            })?;
            require_in(txn, d, actor, &Target::Account(&publisher), Permission::CanPublish)?;
        }
        content_templates().get(&content.template)?;

        let mut row = content.clone();
        row.derive_display();
        d.contents.put(txn, &row.id.to_be_bytes(), &row).map_err(err)?;
        rebuild_content_in(txn, d, &row)?;
        debug!(id = row.id, "content saved");
        Ok(())
    })
}

/// Delete a content item and its mapping rows
pub fn delete_content(actor: AccountId, id: ContentId) -> Result<()> {
    write(|d, txn| {
        let current = content_in(txn, d, id)?.ok_or(Error::NotFound { kind: "content", id })?;
        require_in(txn, d, actor, &Target::Content(&current), Permission::CanDelete)?;
        d.contents.delete(txn, &id.to_be_bytes()).map_err(err)?;
        clear_rows(txn, &d.content_map, id)?;
        info!(id, "content deleted");
        Ok(())
    })
}

/// Fetch a content row, enforcing `can_view`
pub fn get_content(viewer: Option<AccountId>, id: ContentId) -> Result<Content> {
    let content = crate::db::read(|d, tx| content_in(tx, d, id))?
        .ok_or(Error::NotFound { kind: "content", id })?;
    if can_view(viewer, &Target::Content(&content))? {
        Ok(content)
    } else {
        Err(Error::PermissionDenied(format!(
            "viewer may not view content {}",
            id
        )))
    }
}

/// Everything the viewer may see, as one bulk query
pub fn visible(viewer: Option<AccountId>) -> Result<Vec<Content>> {
    store::query(&compile_filter(viewer)?)
}

/// Activity feed for an account: what it wrote, what was published to
/// it, and notifications naming it — all within its own visibility.
pub fn feed_for(account: AccountId) -> Result<Vec<Content>> {
    let pred = compile_filter(Some(account))?.scoped(vec![
        Clause { publisher: Some(account), ..Clause::default() },
        Clause { author: Some(account), ..Clause::default() },
        Clause { notified: Some(account), ..Clause::default() },
    ]);
    store::query(&pred)
}

/// Content from accounts and communities the viewer follows,
/// intersected with what the viewer may see
pub fn followed_by(account: AccountId) -> Result<Vec<Content>> {
    let follows = crate::account::follows_of(account)?;
    let mut scope = vec![
        Clause { publisher: Some(account), ..Clause::default() },
        Clause { author: Some(account), ..Clause::default() },
    ];
    if !follows.is_empty() {
        scope.push(Clause { publisher_in: Some(follows), ..Clause::default() });
    }
    let pred = compile_filter(Some(account))?.scoped(scope);
    store::query(&pred)
}
