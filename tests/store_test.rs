use twitter_oauth_v2::{InMemoryTokenStore, StoreKeys, TokenStore};

#[tokio::test]
async fn test_in_memory_store_roundtrip() {
    let store = InMemoryTokenStore::new();
    assert!(!store.has("k").await.unwrap());
    assert_eq!(store.get("k").await.unwrap(), None);

    store.set("k", "v1".to_string()).await.unwrap();
    store.set("k", "v2".to_string()).await.unwrap();
    assert!(store.has("k").await.unwrap());
    assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v2"));
    assert_eq!(store.len(), 1);

    store.remove("k").await.unwrap();
    store.remove("k").await.unwrap();
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_clones_share_entries() {
    let store = InMemoryTokenStore::new();
    let other = store.clone();
    store.set("shared", "1".to_string()).await.unwrap();
    assert_eq!(other.get("shared").await.unwrap().as_deref(), Some("1"));
}

#[tokio::test]
async fn test_store_keys_are_session_scoped() {
    let default = StoreKeys::default();
    assert_eq!(default.code_verifier, "twitter_oauth2.default.code_verifier");
    assert_eq!(default.oauth_token, "twitter_oauth2.default.oauth_token");

    let a = StoreKeys::for_new_attempt();
    let b = StoreKeys::for_new_attempt();
    assert_ne!(a.state, b.state);
    assert_ne!(a.state, a.code_verifier);
    assert_ne!(a.bearer_token, a.oauth_token);
}
