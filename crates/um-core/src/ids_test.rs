use super::*;
use std::collections::HashMap;

#[test]
fn test_compose_global_id() {
    let project = ProjectId::new("customer_project");
    let id = GlobalId::compose(&project, "dim_customer");
    assert_eq!(id, "customer_project_dim_customer");
}

#[test]
fn test_try_new_rejects_empty() {
    assert!(ProjectId::try_new("").is_none());
    assert!(GlobalId::try_new("x_y").is_some());
}

#[test]
fn test_deserialize_rejects_empty() {
    let err = serde_json::from_str::<ProjectId>(r#""""#);
    assert!(err.is_err());
    let ok: GlobalId = serde_json::from_str(r#""a_b""#).unwrap();
    assert_eq!(ok.as_str(), "a_b");
}

#[test]
fn test_serializes_as_plain_string() {
    let id = GlobalId::new("claims_project_stg_customer");
    assert_eq!(
        serde_json::to_string(&id).unwrap(),
        r#""claims_project_stg_customer""#
    );
}

#[test]
fn test_lookup_by_str() {
    let mut map: HashMap<GlobalId, usize> = HashMap::new();
    map.insert(GlobalId::new("p_a"), 1);
    assert_eq!(map.get("p_a"), Some(&1));
}
