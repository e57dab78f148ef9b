//! Materialized permission mappings: rebuild, idempotence, cascade

use std::sync::OnceLock;

use rolemap::*;
use tempfile::TempDir;

static DIR: OnceLock<TempDir> = OnceLock::new();

fn setup() -> std::sync::MutexGuard<'static, ()> {
    let lock = test_lock();
    let dir = DIR.get_or_init(|| TempDir::new().unwrap());
    init(dir.path().to_str().unwrap()).unwrap();
    clear_all().unwrap();
    bootstrap().unwrap();
    lock
}

fn user(slug: &str, template: &str) -> AccountId {
    create_account(
        SYSTEM_ID,
        NewAccount {
            slug: slug.into(),
            kind: AccountKind::User,
            template: template.into(),
            superuser: false,
        },
    )
    .unwrap()
}

fn status(actor: AccountId, template: &str, text: &str) -> ContentId {
    create_content(
        actor,
        NewContent {
            publisher: None,
            author: None,
            template: Some(template.into()),
            kind: ContentKind::Status { text: text.into() },
            created_at: 1,
        },
    )
    .unwrap()
}

#[test]
fn mapping_mirrors_the_template_grants() {
    let _lock = setup();

    let alice = user("alice", "public");
    let c1 = status(alice, "intranet", "notes");

    let rows = content_mapping(c1).unwrap();
    assert!(rows.contains(&(Permission::CanView, Role::CommunityMember)));
    assert!(rows.contains(&(Permission::CanView, Role::Owner)));
    assert!(rows.contains(&(Permission::CanEdit, Role::Owner)));
    assert!(!rows.contains(&(Permission::CanView, Role::Anonymous)));

    let tpl = content_templates().get("intranet").unwrap();
    assert_eq!(rows.len(), tpl.grants().len());
}

#[test]
fn rebuild_is_idempotent() {
    let _lock = setup();

    let alice = user("alice", "listed");
    let c1 = status(alice, "public", "hello");

    rebuild_account_mapping(alice).unwrap();
    let first = account_mapping(alice).unwrap();
    rebuild_account_mapping(alice).unwrap();
    assert_eq!(first, account_mapping(alice).unwrap());

    rebuild_content_mapping(c1).unwrap();
    let first = content_mapping(c1).unwrap();
    rebuild_content_mapping(c1).unwrap();
    assert_eq!(first, content_mapping(c1).unwrap());
}

#[test]
fn template_change_replaces_the_whole_mapping() {
    let _lock = setup();

    let alice = user("alice", "public");
    let c1 = status(alice, "public", "hello");
    let row = get_content(Some(SYSTEM_ID), c1).unwrap();
    assert!(content_mapping(c1)
        .unwrap()
        .contains(&(Permission::CanView, Role::Anonymous)));

    let mut edited = row;
    edited.template = "private".into();
    save_content(alice, &edited).unwrap();

    let rows = content_mapping(c1).unwrap();
    assert!(!rows.contains(&(Permission::CanView, Role::Anonymous)));
    assert!(rows.contains(&(Permission::CanView, Role::Owner)));
}

#[test]
fn unknown_templates_are_rejected_before_any_write() {
    let _lock = setup();

    let alice = user("alice", "public");
    assert!(matches!(
        create_content(
            alice,
            NewContent {
                publisher: None,
                author: None,
                template: Some("nope".into()),
                kind: ContentKind::Status { text: "x".into() },
                created_at: 1,
            },
        ),
        Err(Error::UnknownTemplate(_))
    ));

    let mut row = get_account(alice).unwrap();
    row.template = "nope".into();
    assert!(matches!(
        save_account(alice, &row),
        Err(Error::UnknownTemplate(_))
    ));
    // The persisted state is untouched
    assert_eq!(get_account(alice).unwrap().template, "public");
}

#[test]
fn rebuilding_a_missing_target_is_an_error() {
    let _lock = setup();

    assert!(matches!(
        rebuild_account_mapping(9999),
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        rebuild_content_mapping(9999),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn deleting_content_cascades_its_mapping() {
    let _lock = setup();

    let alice = user("alice", "public");
    let c1 = status(alice, "public", "temp");
    assert!(!content_mapping(c1).unwrap().is_empty());

    delete_content(alice, c1).unwrap();
    assert!(content_mapping(c1).unwrap().is_empty());
    assert!(matches!(
        get_content(Some(SYSTEM_ID), c1),
        Err(Error::NotFound { .. })
    ));
}

#[test]
fn deleting_an_account_cascades_mappings_and_content() {
    let _lock = setup();

    let alice = user("alice", "public");
    let c1 = status(alice, "public", "post");
    assert!(!account_mapping(alice).unwrap().is_empty());

    delete_account(SYSTEM_ID, alice).unwrap();
    assert!(account_mapping(alice).unwrap().is_empty());
    assert!(content_mapping(c1).unwrap().is_empty());
    assert!(matches!(
        get_content(Some(SYSTEM_ID), c1),
        Err(Error::NotFound { .. })
    ));
    assert!(get_account_by_slug("alice").unwrap().is_none());
}
