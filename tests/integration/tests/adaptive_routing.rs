//! Integration test: cost-adaptive forwarding across the routing crate.
//!
//! Exercises path selection, the usage-driven cost increment and delivery at
//! the sink, first on a single shared graph and then across several engines.

use meshroute_core::{MeshMessage, Role};
use meshroute_integration_tests::{diamond, drain_events, graph_of, n, MeshHarness, RecordingTransport};
use meshroute_routing::{Disposition, Forwarder, PathFinder, RoutingEvent, RoutingTable};

// =========================================================================
// Path selection
// =========================================================================

#[test]
fn test_diamond_prefers_cheaper_branch() {
    let graph = diamond();
    let path = PathFinder::new().shortest_path(&graph, n(1), n(4)).unwrap();
    assert_eq!(path.nodes(), [n(1), n(3), n(4)]);
    assert_eq!(path.total_cost(), 2);
    assert_eq!(path.next_hop(), Some(n(3)));
}

// =========================================================================
// Usage-driven cost increment
// =========================================================================

#[test]
fn test_repeated_use_raises_cost_along_the_path() {
    // Node 2 is not around yet, so every message has to go 1 -> 3 -> 4.
    let mut graph = graph_of(&[(1, 3, 1), (3, 4, 1)]);

    let mut origin = Forwarder::new(n(1), 1, 16);
    origin.set_sink(n(4));
    let mut relay = Forwarder::new(n(3), 1, 16);
    relay.set_sink(n(4));

    let mut origin_table = RoutingTable::new(n(1));
    let mut relay_table = RoutingTable::new(n(3));
    let mut origin_tx = RecordingTransport::new(1, &[3]);
    let mut relay_tx = RecordingTransport::new(3, &[1, 4]);

    for i in 0..3 {
        let message = MeshMessage::new(n(1), n(4), format!("message {}", i));
        let outcome = origin
            .originate(&mut graph, &mut origin_table, &mut origin_tx, &message)
            .unwrap();
        assert!(matches!(outcome, Disposition::Forwarded { next_hop, .. } if next_hop == n(3)));

        let (to, mut in_transit) = origin_tx.last_message().unwrap();
        assert_eq!(to, n(3));
        let outcome = relay
            .receive(&mut graph, &mut relay_table, &mut relay_tx, &mut in_transit)
            .unwrap();
        assert!(matches!(outcome, Disposition::Forwarded { next_hop, .. } if next_hop == n(4)));

        let (_, arrived) = relay_tx.last_message().unwrap();
        assert_eq!(arrived.trace, vec![n(1), n(3)]);
    }

    assert_eq!(graph.cost(n(1), n(3)), Some(4));
    assert_eq!(graph.cost(n(3), n(1)), Some(4));
    assert_eq!(graph.cost(n(3), n(4)), Some(4));
    assert_eq!(graph.cost(n(4), n(3)), Some(4));

    // Node 2 shows up with fresh links; the untouched branch now wins.
    for (a, b) in [(1, 2), (2, 4)] {
        graph.set_cost(n(a), n(b), 2).unwrap();
        graph.set_cost(n(b), n(a), 2).unwrap();
    }
    let path = origin_table.resolve(&graph, n(4)).unwrap();
    assert_eq!(path.nodes(), [n(1), n(2), n(4)]);
    assert_eq!(path.total_cost(), 4);
}

#[test]
fn test_traffic_spreads_over_equal_branches() {
    let mut mesh = MeshHarness::with_links(&[1, 2, 3, 4], &[(1, 2), (2, 4), (1, 3), (3, 4)], 4);
    let mut sink_events = mesh.subscribe(4);

    let mut first_hops = Vec::new();
    for _ in 0..4 {
        match mesh.originate(1).unwrap() {
            Disposition::Forwarded { next_hop, .. } => first_hops.push(next_hop.get()),
            other => panic!("unexpected disposition: {:?}", other),
        }
        mesh.run_until_idle();
    }

    // Ties go to the lower id; each use tips the balance to the other branch.
    assert_eq!(first_hops, vec![2, 3, 2, 3]);
    assert_eq!(mesh.engine(1).graph().cost(n(1), n(2)), Some(3));
    assert_eq!(mesh.engine(1).graph().cost(n(1), n(3)), Some(3));
    assert_eq!(mesh.engine(2).stats().forwarded, 2);
    assert_eq!(mesh.engine(3).stats().forwarded, 2);

    let delivered: Vec<_> = drain_events(&mut sink_events)
        .into_iter()
        .filter_map(|ev| match ev {
            RoutingEvent::Delivered(d) => Some(d.message.trace),
            _ => None,
        })
        .collect();
    assert_eq!(
        delivered,
        vec![
            vec![n(1), n(2), n(4)],
            vec![n(1), n(3), n(4)],
            vec![n(1), n(2), n(4)],
            vec![n(1), n(3), n(4)],
        ]
    );
    assert_eq!(mesh.engine(4).stats().delivered, 4);
}

// =========================================================================
// Sink behaviour
// =========================================================================

#[test]
fn test_sink_originating_to_itself_delivers_locally() {
    let mut mesh = MeshHarness::with_links(&[1, 4], &[(1, 4)], 4);
    assert_eq!(mesh.engine(4).role(), Role::Sink);
    let version = mesh.engine(4).graph().version();

    let outcome = mesh.originate(4).unwrap();
    match outcome {
        Disposition::Delivered { path } => assert_eq!(path.nodes(), [n(4)]),
        other => panic!("unexpected disposition: {:?}", other),
    }
    assert_eq!(mesh.in_flight(), 0);
    assert_eq!(mesh.engine(4).stats().delivered, 1);
    assert_eq!(mesh.engine(4).graph().version(), version);
}

#[test]
fn test_forwarder_without_transport_use_for_local_destination() {
    let mut graph = diamond();
    let mut table = RoutingTable::new(n(4));
    let mut transport = RecordingTransport::new(4, &[2, 3]);
    let mut sink = Forwarder::new(n(4), 1, 16);
    sink.set_sink(n(4));

    let message = MeshMessage::new(n(4), n(4), "self");
    let outcome = sink
        .originate(&mut graph, &mut table, &mut transport, &message)
        .unwrap();
    assert!(matches!(outcome, Disposition::Delivered { ref path } if path.is_local()));
    assert!(transport.sent.is_empty());
}

#[test]
fn test_multi_hop_delivery_records_full_trace() {
    let mut mesh = MeshHarness::with_links(&[1, 2, 3, 4], &[(1, 2), (2, 3), (3, 4)], 4);
    let mut sink_events = mesh.subscribe(4);

    mesh.originate(1).unwrap();
    assert_eq!(mesh.run_until_idle(), 3);

    let events = drain_events(&mut sink_events);
    match &events[..] {
        [RoutingEvent::Delivered(d)] => {
            assert_eq!(d.from, Some(n(3)));
            assert_eq!(d.message.trace_display(), "1 -> 2 -> 3 -> 4");
            assert_eq!(d.message.payload_text(), "Hello from node 1");
        }
        other => panic!("unexpected events: {:?}", other),
    }
}
