use super::*;

#[tokio::test]
async fn open_assigns_a_session_with_entropy() {
    let manager = SessionManager::new();
    let (id, _rx) = manager.open();
    assert!(id.len() >= 16);
    assert!(manager.exists(&id));
    assert!(!manager.is_ready(&id));
}

#[tokio::test]
async fn mark_ready_records_protocol_version() {
    let manager = SessionManager::new();
    let (id, _rx) = manager.open();
    manager.mark_ready(&id, "2024-11-05".to_string());
    assert!(manager.is_ready(&id));
    assert_eq!(manager.protocol_version(&id), Some("2024-11-05".to_string()));
}

#[tokio::test]
async fn deliver_pushes_onto_outbound_channel_in_order() {
    let manager = SessionManager::new();
    let (id, mut rx) = manager.open();

    manager.deliver(&id, serde_json::json!({"id": 1})).await.unwrap();
    manager.deliver(&id, serde_json::json!({"id": 2})).await.unwrap();

    assert_eq!(rx.recv().await.unwrap(), serde_json::json!({"id": 1}));
    assert_eq!(rx.recv().await.unwrap(), serde_json::json!({"id": 2}));
}

#[tokio::test]
async fn deliver_to_unknown_session_fails() {
    let manager = SessionManager::new();
    let result = manager.deliver("unknown-session", serde_json::json!({})).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn close_cancels_token_and_removes_session() {
    let manager = SessionManager::new();
    let (id, _rx) = manager.open();
    let token = manager.cancellation_token(&id).unwrap();

    manager.close(&id);

    assert!(token.is_cancelled());
    assert!(!manager.exists(&id));
}

#[tokio::test]
async fn close_all_cancels_every_session() {
    let manager = SessionManager::new();
    let (id1, _rx1) = manager.open();
    let (id2, _rx2) = manager.open();
    let token1 = manager.cancellation_token(&id1).unwrap();
    let token2 = manager.cancellation_token(&id2).unwrap();

    manager.close_all();

    assert!(token1.is_cancelled());
    assert!(token2.is_cancelled());
    assert!(manager.is_empty());
}

#[tokio::test]
async fn mark_attached_is_one_shot() {
    let manager = SessionManager::new();
    let (id, _rx) = manager.open();
    assert!(!manager.is_attached(&id));
    assert!(manager.mark_attached(&id));
    assert!(manager.is_attached(&id));
    assert!(!manager.mark_attached(&id));
}

#[tokio::test]
async fn mark_attached_on_unknown_session_fails() {
    let manager = SessionManager::new();
    assert!(!manager.mark_attached("unknown-session"));
}

#[test]
fn two_generated_ids_are_distinct() {
    let a = generate_session_id();
    let b = generate_session_id();
    assert_ne!(a, b);
    assert!(a.len() >= 16);
}
