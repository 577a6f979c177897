use super::*;
use um_core::{EdgeOrigin, NodeKind, ProjectId};

fn node(id: &str) -> Node {
    Node {
        global_id: GlobalId::new(id),
        local_name: id.to_string(),
        owning_project: ProjectId::new("p"),
        kind: NodeKind::Model,
        schema: None,
        database: None,
        materialized: None,
        description: None,
        columns: Vec::new(),
        raw_text: None,
        source_name: None,
        identifier: None,
        file_path: None,
        tags: Vec::new(),
        user_edited: false,
        ai_description: None,
    }
}

fn edge(source: &str, target: &str, origin: EdgeOrigin) -> Edge {
    Edge::new(GlobalId::new(source), GlobalId::new(target), origin)
}

fn ids(nodes: Vec<&Node>) -> Vec<&str> {
    nodes.into_iter().map(|n| n.global_id.as_str()).collect()
}

#[test]
fn test_dedup_keeps_position_and_upgrades_origin() {
    let (graph, dropped) = LineageGraph::build_with_report(
        vec![node("a"), node("b"), node("c")],
        vec![
            edge("a", "b", EdgeOrigin::HeuristicTextMatch),
            edge("c", "b", EdgeOrigin::SourceReference),
            edge("a", "b", EdgeOrigin::ExplicitCrossProjectRef),
            edge("a", "b", EdgeOrigin::ManifestDependency),
        ],
    );
    assert!(dropped.is_empty());
    assert_eq!(graph.edge_count(), 2);
    assert_eq!(graph.edges()[0].source, "a");
    assert_eq!(graph.edges()[0].origin, EdgeOrigin::ExplicitCrossProjectRef);
    assert_eq!(graph.edges()[1].source, "c");
}

#[test]
fn test_self_loops_and_unknown_endpoints_dropped() {
    let (graph, dropped) = LineageGraph::build_with_report(
        vec![node("a"), node("b")],
        vec![
            edge("a", "a", EdgeOrigin::ManifestDependency),
            edge("a", "ghost", EdgeOrigin::ManifestDependency),
            edge("a", "b", EdgeOrigin::ManifestDependency),
        ],
    );
    assert_eq!(graph.edge_count(), 1);
    let reasons: Vec<DropReason> = dropped.iter().map(|d| d.reason).collect();
    assert_eq!(
        reasons,
        vec![DropReason::SelfLoop, DropReason::UnknownEndpoint]
    );
    for e in graph.edges() {
        assert!(graph.node(&e.source).is_some());
        assert!(graph.node(&e.target).is_some());
        assert_ne!(e.source, e.target);
    }
}

#[test]
fn test_neighbours_follow_edge_insertion_order() {
    let graph = LineageGraph::build(
        vec![node("a"), node("b"), node("c"), node("d")],
        vec![
            edge("c", "d", EdgeOrigin::ManifestDependency),
            edge("a", "d", EdgeOrigin::ManifestDependency),
            edge("b", "d", EdgeOrigin::ManifestDependency),
            edge("d", "b", EdgeOrigin::ManifestDependency),
            edge("d", "a", EdgeOrigin::ManifestDependency),
        ],
    );
    assert_eq!(ids(graph.upstream("d")), vec!["c", "a", "b"]);
    assert_eq!(ids(graph.downstream("d")), vec!["b", "a"]);
    assert!(graph.upstream("missing").is_empty());
}

#[test]
fn test_cycles_reported_not_rejected() {
    let graph = LineageGraph::build(
        vec![node("a"), node("b"), node("c"), node("d")],
        vec![
            edge("a", "b", EdgeOrigin::ManifestDependency),
            edge("b", "c", EdgeOrigin::ManifestDependency),
            edge("c", "a", EdgeOrigin::ManifestDependency),
            edge("c", "d", EdgeOrigin::ManifestDependency),
        ],
    );
    assert_eq!(graph.edge_count(), 4);
    assert_eq!(
        graph.cycles(),
        vec![vec![
            GlobalId::new("a"),
            GlobalId::new("b"),
            GlobalId::new("c")
        ]]
    );
}

#[test]
fn test_acyclic_graph_has_no_cycles() {
    let graph = LineageGraph::build(
        vec![node("a"), node("b")],
        vec![edge("a", "b", EdgeOrigin::ManifestDependency)],
    );
    assert!(graph.cycles().is_empty());
}

#[test]
fn test_duplicate_node_ids_keep_first() {
    let mut second = node("a");
    second.description = Some("second".to_string());
    let graph = LineageGraph::build(vec![node("a"), second], vec![]);
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.node("a").unwrap().description, None);
}

#[test]
fn test_node_mut() {
    let mut graph = LineageGraph::build(vec![node("a")], vec![]);
    graph.node_mut("a").unwrap().description = Some("changed".to_string());
    assert_eq!(
        graph.node("a").unwrap().description.as_deref(),
        Some("changed")
    );
    assert!(graph.node_mut("zzz").is_none());
}
