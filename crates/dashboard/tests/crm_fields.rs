mod common;

use common::{Backend, SESSION_COOKIE, field_attrs};
use dashboard::{Client, CrmFieldManager, ManagerError, MutationOutcome};

async fn connect(backend: &Backend) -> (Client, CrmFieldManager) {
    let client = Client::new(&backend.spawn().await).unwrap();
    client.restore_cookies(SESSION_COOKIE);
    let mut manager = CrmFieldManager::new();
    manager.refresh(&client).await.unwrap();
    manager.select_campaign("Sales").unwrap();
    (client, manager)
}

fn captions(manager: &CrmFieldManager) -> Vec<&str> {
    manager.fields().iter().map(|f| f.caption.as_str()).collect()
}

fn positions(manager: &CrmFieldManager) -> Vec<u32> {
    manager.fields().iter().map(|f| f.position).collect()
}

#[tokio::test]
async fn configuration_requires_session_cookie() {
    let backend = Backend::seeded();
    let client = Client::new(&backend.spawn().await).unwrap();
    let mut manager = CrmFieldManager::new();

    let err = manager.refresh(&client).await.unwrap_err();
    assert!(matches!(err, ManagerError::Client(dashboard::ClientError::Unauthorized)));
    assert!(!manager.is_loaded());
}

#[tokio::test]
async fn selected_campaign_is_shown_in_position_order() {
    let backend = Backend::seeded();
    let (_client, manager) = connect(&backend).await;
    assert_eq!(captions(&manager), vec!["Name", "Phone"]);
    assert_eq!(manager.campaign_names(), vec!["Sales", "Support"]);
}

#[tokio::test]
async fn append_at_end_adds_exactly_one_field() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;

    let outcome = manager
        .add_field(&client, field_attrs("Email", 3))
        .await
        .unwrap();

    assert_eq!(outcome, MutationOutcome::Appended);
    assert_eq!(captions(&manager), vec!["Name", "Phone", "Email"]);
    assert_eq!(positions(&manager), vec![1, 2, 3]);
}

#[tokio::test]
async fn insert_in_the_middle_adopts_server_renumbering() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;

    let outcome = manager
        .add_field(&client, field_attrs("Email", 1))
        .await
        .unwrap();

    assert_eq!(outcome, MutationOutcome::Replaced);
    assert_eq!(captions(&manager), vec!["Email", "Name", "Phone"]);
    assert_eq!(positions(&manager), vec![1, 2, 3]);
    assert_eq!(manager.fields(), backend.fields_of("c-sales").as_slice());
}

#[tokio::test]
async fn out_of_range_position_never_reaches_backend() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;

    let err = manager
        .add_field(&client, field_attrs("Email", 5))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "CRM Field position should not be more than 3");
    assert_eq!(backend.hits("create-field"), 0);
    assert_eq!(manager.fields().len(), 2);
}

#[tokio::test]
async fn duplicate_caption_on_create_is_reported() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;
    let before = manager.fields().to_vec();

    let outcome = manager
        .add_field(&client, field_attrs("Phone", 3))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        MutationOutcome::Rejected("CRM field with this caption already exists".to_string())
    );
    assert_eq!(manager.fields(), before.as_slice());
}

#[tokio::test]
async fn duplicate_caption_on_edit_leaves_list_identical() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;
    let before = manager.fields().to_vec();

    let outcome = manager
        .edit_field(&client, "f2", field_attrs("Name", 2))
        .await
        .unwrap();

    assert!(matches!(outcome, MutationOutcome::Rejected(ref m) if m.contains("already exists")));
    assert_eq!(manager.fields(), before.as_slice());
    assert!(!manager.is_pending("f2"));
}

#[tokio::test]
async fn moving_a_field_replaces_list_with_server_order() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;

    let outcome = manager
        .edit_field(&client, "f2", field_attrs("Mobile", 1))
        .await
        .unwrap();

    assert_eq!(outcome, MutationOutcome::Replaced);
    assert_eq!(captions(&manager), vec!["Mobile", "Name"]);
    assert_eq!(positions(&manager), vec![1, 2]);
}

#[tokio::test]
async fn delete_adopts_renumbered_list() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;

    let outcome = manager.delete_field(&client, "f1").await.unwrap();

    assert_eq!(outcome, MutationOutcome::Replaced);
    assert!(manager.fields().iter().all(|f| f.id != "f1"));
    assert_eq!(captions(&manager), vec!["Phone"]);
    assert_eq!(positions(&manager), vec![1]);
}

#[tokio::test]
async fn empty_campaign_accepts_first_position_only() {
    let backend = Backend::seeded();
    let (client, mut manager) = connect(&backend).await;
    manager.select_campaign("Support").unwrap();

    assert!(matches!(
        manager.add_field(&client, field_attrs("Ticket", 2)).await,
        Err(ManagerError::PositionOutOfRange { max: 1 })
    ));
    let outcome = manager
        .add_field(&client, field_attrs("Ticket", 1))
        .await
        .unwrap();
    assert_eq!(outcome, MutationOutcome::Appended);
    assert_eq!(captions(&manager), vec!["Ticket"]);
}

#[tokio::test]
async fn unreachable_backend_releases_pending_guard() {
    let backend = Backend::seeded();
    let (_client, mut manager) = connect(&backend).await;
    let dead = Client::new(&common::unreachable_url().await).unwrap();

    let err = manager.delete_field(&dead, "f1").await.unwrap_err();
    assert!(err.is_retryable());
    assert!(!manager.is_pending("f1"));
    assert_eq!(manager.fields().len(), 2);
}

#[tokio::test]
async fn malformed_configuration_is_not_a_transport_failure() {
    let backend = Backend::seeded();
    backend.state().garble_configuration = true;
    let client = Client::new(&backend.spawn().await).unwrap();
    client.restore_cookies(SESSION_COOKIE);
    let mut manager = CrmFieldManager::new();

    let err = manager.refresh(&client).await.unwrap_err();
    assert!(matches!(err, ManagerError::Client(dashboard::ClientError::Decode(_))));
    assert!(!err.is_retryable());
    assert!(!manager.is_loaded());
}
