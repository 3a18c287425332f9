//! Integration test: topology churn and path cache coherence.
//!
//! Departures, link failures and re-announcements must never leave a stale
//! path in the cache or traffic pinned to a link that is gone.

use meshroute_core::{NodeId, INFINITE_COST};
use meshroute_integration_tests::{diamond, drain_events, n, MeshHarness};
use meshroute_routing::{
    CostGraph, DropReason, PathFinder, RoutingError, RoutingEvent, RoutingTable, TopologyManager,
};

// =========================================================================
// Departure invalidates cached paths
// =========================================================================

#[test]
fn test_departure_reroutes_then_disconnects() {
    let mut graph = diamond();
    let topology = TopologyManager::with_defaults(n(1));
    let mut table = RoutingTable::new(n(1));

    let path = table.resolve(&graph, n(4)).unwrap();
    assert_eq!(path.nodes(), [n(1), n(3), n(4)]);

    topology.neighbor_left(&mut graph, n(3)).unwrap();
    assert!(table.cached(n(4)).unwrap().is_stale(&graph));

    let path = table.resolve(&graph, n(4)).unwrap();
    assert_eq!(path.nodes(), [n(1), n(2), n(4)]);
    assert_eq!(path.total_cost(), 4);

    topology.neighbor_left(&mut graph, n(2)).unwrap();
    let err = table.resolve(&graph, n(4)).unwrap_err();
    assert!(matches!(err, RoutingError::RouteNotFound { from, to } if from == n(1) && to == n(4)));
    assert!(table.cached(n(4)).is_none());
}

#[test]
fn test_repeated_departure_is_a_no_op() {
    let mut graph = diamond();
    let topology = TopologyManager::with_defaults(n(1));

    topology.neighbor_left(&mut graph, n(3)).unwrap();
    let version = graph.version();
    let nodes: Vec<NodeId> = graph.nodes().collect();

    assert!(matches!(
        topology.neighbor_left(&mut graph, n(3)),
        Err(RoutingError::UnknownNode(id)) if id == n(3)
    ));
    assert!(!graph.remove_node(n(3)));
    assert_eq!(graph.version(), version);
    assert_eq!(graph.nodes().collect::<Vec<_>>(), nodes);
}

#[test]
fn test_departed_node_is_never_routed_through() {
    let mut graph = diamond();
    let topology = TopologyManager::with_defaults(n(1));
    topology.neighbor_left(&mut graph, n(3)).unwrap();

    for dest in [2, 4] {
        let path = PathFinder::new().shortest_path(&graph, n(1), n(dest)).unwrap();
        assert!(!path.contains(n(3)));
    }
    assert_eq!(graph.cost(n(1), n(3)), None);
    assert_eq!(graph.stored_cost(n(1), n(3)), None);
}

// =========================================================================
// Cache coherence under random mutation
// =========================================================================

/// Minimal deterministic generator for mutation sequences.
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, bound: u32) -> u32 {
        self.next_u32() % bound
    }
}

#[test]
fn test_cached_paths_always_match_fresh_search() {
    let mut rng = Lcg(0x5eed);
    let local = n(0);
    let mut graph = CostGraph::new();
    let topology = TopologyManager::with_defaults(local);
    let mut table = RoutingTable::new(local);
    let finder = PathFinder::new();

    for step in 0..500 {
        let a = n(rng.below(8));
        let b = n(rng.below(8));
        match rng.below(5) {
            0 => {
                let _ = topology.neighbor_joined(&mut graph, b);
            }
            1 if a != b => {
                let _ = topology.link_up(&mut graph, a, b);
            }
            2 if a != b => {
                let _ = graph.increment_cost(a, b, 1 + rng.below(3));
            }
            3 => {
                let _ = topology.neighbor_left(&mut graph, b);
            }
            4 if a != b => {
                let _ = topology.link_down(&mut graph, a, b);
            }
            _ => {}
        }

        for dest in 0..8 {
            let dest = n(dest);
            let cached = table.resolve(&graph, dest).ok();
            let fresh = finder.shortest_path(&graph, local, dest).ok();
            assert_eq!(cached, fresh, "step {} destination {}", step, dest);
        }
    }
    assert!(table.stats().hits > 0);
    assert!(table.stats().misses > 0);
}

#[test]
fn test_unchanged_graph_is_served_from_cache() {
    let graph = diamond();
    let mut table = RoutingTable::new(n(1));

    let first = table.resolve(&graph, n(4)).unwrap();
    let second = table.resolve(&graph, n(4)).unwrap();
    assert_eq!(first, second);
    assert_eq!(table.stats().misses, 1);
    assert_eq!(table.stats().hits, 1);
}

#[test]
fn test_teardown_marker_never_appears_as_cost() {
    let mut graph = diamond();
    graph.set_cost(n(1), n(3), INFINITE_COST).unwrap();
    assert_eq!(graph.cost(n(1), n(3)), None);
    assert_eq!(graph.stored_cost(n(1), n(3)), Some(INFINITE_COST));
    assert_eq!(graph.increment_cost(n(1), n(3), 1).unwrap(), None);

    let path = PathFinder::new().shortest_path(&graph, n(1), n(4)).unwrap();
    assert_eq!(path.nodes(), [n(1), n(2), n(4)]);
}

// =========================================================================
// Churn across engines
// =========================================================================

#[test]
fn test_link_failure_reroutes_across_engines() {
    let mut mesh = MeshHarness::with_links(&[1, 2, 3, 4], &[(1, 2), (2, 4), (1, 3), (3, 4)], 4);
    let mut sink_events = mesh.subscribe(4);

    mesh.disconnect(3, 4);
    assert_eq!(mesh.engine(1).graph().cost(n(3), n(4)), None);
    // Node 3 dropped 4 on disconnect; the re-announcement restores 2-4.
    assert_eq!(mesh.engine(3).graph().cost(n(2), n(4)), Some(1));

    mesh.originate(3).unwrap();
    mesh.run_until_idle();

    let traces: Vec<String> = drain_events(&mut sink_events)
        .into_iter()
        .filter_map(|ev| match ev {
            RoutingEvent::Delivered(d) => Some(d.message.trace_display()),
            _ => None,
        })
        .collect();
    assert_eq!(traces, vec!["3 -> 1 -> 2 -> 4".to_string()]);
}

#[test]
fn test_disconnect_leaves_bystander_graph_intact() {
    let mut mesh = MeshHarness::with_links(&[1, 2, 3, 4], &[(1, 2), (2, 4), (1, 3), (3, 4)], 4);
    mesh.disconnect(3, 4);
    assert_eq!(mesh.engine(2).graph().cost(n(3), n(4)), None);
    assert_eq!(mesh.engine(2).graph().cost(n(1), n(3)), Some(1));
    // Node 4 relearns the rest of node 3's neighborhood.
    assert_eq!(mesh.engine(4).graph().cost(n(1), n(3)), Some(1));
}

#[test]
fn test_partition_drops_with_route_not_found() {
    let mut mesh = MeshHarness::with_links(&[1, 2, 4], &[(1, 2), (2, 4)], 4);
    mesh.disconnect(2, 4);

    let mut events = mesh.subscribe(1);
    let err = mesh.originate(1).unwrap_err();
    assert!(err.is_route_not_found());
    assert_eq!(mesh.in_flight(), 0);

    let events = drain_events(&mut events);
    assert_eq!(events[0], RoutingEvent::RouteNotFound { destination: n(4) });
    assert!(matches!(&events[1], RoutingEvent::Dropped(d) if d.reason == DropReason::RouteNotFound));

    // The link comes back and the next origination succeeds.
    mesh.connect(2, 4);
    assert!(mesh.originate(1).is_ok());
    assert_eq!(mesh.run_until_idle(), 2);
    assert_eq!(mesh.engine(4).stats().delivered, 1);
}

#[test]
fn test_rejoin_keeps_accumulated_cost_until_link_drops() {
    let mut mesh = MeshHarness::with_links(&[1, 2], &[(1, 2)], 2);
    mesh.originate(1).unwrap();
    mesh.run_until_idle();
    assert_eq!(mesh.engine(1).graph().cost(n(1), n(2)), Some(2));

    // A duplicate join report does not reset the learned cost.
    mesh.engine_mut(1)
        .handle_event(meshroute_routing::MeshEvent::NeighborConnected(n(2)));
    assert_eq!(mesh.engine(1).graph().cost(n(1), n(2)), Some(2));

    mesh.disconnect(1, 2);
    mesh.connect(1, 2);
    assert_eq!(mesh.engine(1).graph().cost(n(1), n(2)), Some(1));
}
