//! CRUD service rules exercised directly against the in-memory store.

use std::sync::Arc;

use axum::http::Method;
use serde_json::json;

use catch_api::CrudService;
use catch_core::{AnnotationStore, Error, TokenClaims};
use catch_db::test_fixtures::AnnotationBuilder;
use catch_db::MemoryAnnotationStore;

fn claims(user: &str, overrides: &[&str]) -> TokenClaims {
    TokenClaims::from_payload(json!({
        "consumerKey": "hxat",
        "userId": user,
        "issuedAt": "2026-01-01T00:00:00Z",
        "ttl": 60,
        "override": overrides,
    }))
    .unwrap()
}

fn service() -> (CrudService, Arc<MemoryAnnotationStore>) {
    let store = Arc::new(MemoryAnnotationStore::new());
    (CrudService::new(store.clone()), store)
}

#[tokio::test]
async fn test_create_rejects_foreign_creator() {
    let (crud, store) = service();
    let input = AnnotationBuilder::new("c1", "alice").to_json();

    let err = crud
        .create(&claims("bob", &[]), "c1", Some(input.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAnnotationCreator(_)));
    assert_eq!(err.status(), 409);
    assert!(store.is_empty().await);

    // the admin identity may create on behalf of others
    let anno = crud
        .create(&claims("__admin__", &[]), "c1", Some(input))
        .await
        .unwrap();
    assert_eq!(anno.creator_id, "alice");
}

#[tokio::test]
async fn test_create_fills_default_permissions() {
    let (crud, _) = service();
    let mut input = AnnotationBuilder::new("c2", "alice").to_json();
    input.as_object_mut().unwrap().remove("permissions");

    let anno = crud
        .create(&claims("alice", &[]), "c2", Some(input))
        .await
        .unwrap();
    assert!(anno.permissions.can_read.is_empty());
    assert_eq!(anno.permissions.can_update, vec!["alice"]);
    assert_eq!(anno.permissions.can_delete, vec!["alice"]);
    assert_eq!(anno.permissions.can_admin, vec!["alice"]);
}

#[tokio::test]
async fn test_create_requires_body() {
    let (crud, _) = service();
    let err = crud
        .create(&claims("alice", &[]), "c3", None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingAnnotationInput(_)));
    assert_eq!(err.status(), 400);
}

#[tokio::test]
async fn test_reply_needs_live_parent() {
    let (crud, _) = service();
    let reply = AnnotationBuilder::new("r1", "bob").reply_to("nope").to_json();
    let err = crud
        .create(&claims("bob", &[]), "r1", Some(reply))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput(_)));

    let parent = AnnotationBuilder::new("p1", "alice").to_json();
    crud.create(&claims("alice", &[]), "p1", Some(parent))
        .await
        .unwrap();
    let reply = AnnotationBuilder::new("r1", "bob").reply_to("p1").to_json();
    crud.create(&claims("bob", &[]), "r1", Some(reply))
        .await
        .unwrap();

    let parent = crud.read(&claims("carol", &[]), "p1").await.unwrap();
    assert_eq!(parent.total_replies, 1);
}

#[tokio::test]
async fn test_update_keeps_identity_fields() {
    let (crud, _) = service();
    let original = crud
        .create(
            &claims("alice", &[]),
            "u1",
            Some(AnnotationBuilder::new("u1", "alice").text("v1").to_json()),
        )
        .await
        .unwrap();

    // attempt to rename the creator and change the id along with the text
    let mut edit = AnnotationBuilder::new("other-id", "alice").text("v2").to_json();
    edit["creator"]["name"] = json!("Mallory");
    let updated = crud
        .update(&claims("alice", &[]), "u1", Some(edit))
        .await
        .unwrap();

    assert_eq!(updated.id, "u1");
    assert_eq!(updated.body_text, "v2");
    assert_eq!(updated.creator_name, original.creator_name);
    assert_eq!(updated.created, original.created);
    assert!(updated.modified >= original.modified);
}

#[tokio::test]
async fn test_override_flags_bypass_acl() {
    let (crud, _) = service();
    crud.create(
        &claims("alice", &[]),
        "o1",
        Some(AnnotationBuilder::new("o1", "alice").private().to_json()),
    )
    .await
    .unwrap();

    let err = crud.read(&claims("bob", &[]), "o1").await.unwrap_err();
    assert_eq!(err.status(), 403);

    let anno = crud.read(&claims("bob", &["CAN_READ"]), "o1").await.unwrap();
    assert_eq!(anno.id, "o1");

    let err = crud.delete(&claims("bob", &["CAN_READ"]), "o1").await.unwrap_err();
    assert_eq!(err.to_string(), "no permission to delete anno(o1) for user(bob)");
    crud.delete(&claims("bob", &["CAN_DELETE"]), "o1")
        .await
        .unwrap();
}

#[tokio::test]
async fn test_handle_dispatch() {
    let (crud, store) = service();
    let alice = claims("alice", &[]);
    let input = AnnotationBuilder::new("h1", "alice").to_json();

    let err = crud.handle(&Method::GET, &alice, "h1", None).await.unwrap_err();
    assert!(matches!(err, Error::MissingAnnotation(_)));

    crud.handle(&Method::POST, &alice, "h1", Some(input.clone()))
        .await
        .unwrap();
    let err = crud
        .handle(&Method::POST, &alice, "h1", Some(input))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateAnnotationId(_)));

    let read = crud.handle(&Method::HEAD, &alice, "h1", None).await.unwrap();
    assert_eq!(read.id, "h1");

    let deleted = crud.handle(&Method::DELETE, &alice, "h1", None).await.unwrap();
    assert!(deleted.deleted);
    assert!(store.get("h1").await.unwrap().unwrap().deleted);

    let err = crud.handle(&Method::DELETE, &alice, "h1", None).await.unwrap_err();
    assert_eq!(err.status(), 404);
}

#[tokio::test]
async fn test_compat_update_requires_update_permission() {
    let (crud, _) = service();
    crud.create(
        &claims("alice", &[]),
        "cu1",
        Some(AnnotationBuilder::new("cu1", "alice").text("v1").to_json()),
    )
    .await
    .unwrap();

    let edit = AnnotationBuilder::new("cu1", "alice").text("v2").to_json();
    let err = crud
        .compat_update(&claims("bob", &[]), "cu1", Some(edit.clone()))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "no permission to update anno(cu1) for user(bob)");

    let anno = crud
        .compat_update(&claims("alice", &[]), "cu1", Some(edit))
        .await
        .unwrap();
    assert_eq!(anno.body_text, "v2");
}

#[tokio::test]
async fn test_import_isolates_failures() {
    let (crud, store) = service();
    let mut records = vec![
        AnnotationBuilder::new("i1", "alice").to_json(),
        AnnotationBuilder::new("i2", "bob").to_json(),
        AnnotationBuilder::new("i1", "carol").to_json(),
    ];
    let mut anonymous = AnnotationBuilder::new("i3", "dave").to_json();
    anonymous.as_object_mut().unwrap().remove("id");
    records.push(anonymous);

    let err = crud
        .import(&claims("alice", &[]), records.clone())
        .await
        .unwrap_err();
    assert_eq!(err.status(), 403);

    let summary = crud.import(&claims("__admin__", &[]), records).await.unwrap();
    assert_eq!(summary.total_success, 2);
    assert_eq!(summary.total_failed, 2);
    assert_eq!(summary.success, vec!["i1", "i2"]);
    assert_eq!(summary.failure[0].id, "i1");
    assert_eq!(summary.failure[0].msg, "anno(i1): already exists, failed to create");
    assert_eq!(summary.failure[1].id, "");
    assert_eq!(summary.failure[1].msg, "missing id in import record, not created");
    assert_eq!(store.len().await, 2);
    assert!(store.get("").await.unwrap().is_none());
}
