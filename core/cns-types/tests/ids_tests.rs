use cns_types::{ContextId, NodeId};
use std::collections::HashSet;
use std::str::FromStr;

// ── ContextId ─────────────────────────────────────────────────────

#[test]
fn context_id_display_matches_name() {
    let id = ContextId::new("ctx1");
    assert_eq!(id.to_string(), "ctx1");
    assert_eq!(id.as_str(), "ctx1");
}

#[test]
fn context_id_topic() {
    let id = ContextId::from("abc");
    assert_eq!(id.topic(), "node/contexts/abc");
}

#[test]
fn context_id_empty() {
    assert!(ContextId::new("").is_empty());
    assert!(!ContextId::new("x").is_empty());
}

#[test]
fn context_id_serde_is_transparent() {
    let id = ContextId::new("ctx1");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"ctx1\"");
    let back: ContextId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn context_id_hashable() {
    let mut set = HashSet::new();
    set.insert(ContextId::new("a"));
    set.insert(ContextId::new("a"));
    set.insert(ContextId::new("b"));
    assert_eq!(set.len(), 2);
}

// ── NodeId ────────────────────────────────────────────────────────

#[test]
fn node_id_new_is_unique() {
    assert_ne!(NodeId::new(), NodeId::new());
}

#[test]
fn node_id_display_and_parse() {
    let id = NodeId::new();
    let parsed = NodeId::from_str(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn node_id_parse_invalid() {
    assert!(NodeId::from_str("not-a-uuid").is_err());
}

#[test]
fn node_id_from_uuid_roundtrip() {
    let uuid = uuid::Uuid::now_v7();
    assert_eq!(NodeId::from_uuid(uuid).as_uuid(), uuid);
}
