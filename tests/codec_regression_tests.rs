#[cfg(test)]
mod codec_regression_tests {
    use std::fs;
    use std::io::Write;
    use tempfile::NamedTempFile;

    use netsim::codec::{deserialize, serialize, serialize_ordered};
    use netsim::config_loader::{build_topology, load_scenario};
    use netsim::generator::{generate, GeneratorParams};
    use netsim::report::TopologyReport;
    use std::collections::{BTreeMap, BTreeSet};

    use netsim::topology::{NodeId, NodeKind, Topology};
    use netsim::TopologyError;

    fn assert_round_trip(topology: &Topology) -> String {
        let text = serialize(topology);
        let decoded = deserialize(&text).unwrap_or_else(|e| panic!("{}\n{}", e, text));
        assert_eq!(serialize(&decoded), text);
        text
    }

    /// Name of a bridge or router that survives decoding: segment position, kind, identifier
    type NamedKey = (usize, NodeKind, String);

    /// For every named node: the named nodes it reaches, and how many endpoints
    /// it reaches in each segment. Also, for each segment, the sorted sizes of
    /// the endpoint-only groups that no named node reaches.
    fn reachability_fingerprint(
        topology: &Topology,
    ) -> (BTreeMap<NamedKey, (BTreeSet<NamedKey>, Vec<usize>)>, Vec<Vec<usize>>) {
        let mut named: Vec<(NodeId, NamedKey)> = Vec::new();
        let mut endpoints: Vec<(usize, NodeId)> = Vec::new();
        for (position, segment) in topology.segments().enumerate() {
            for (id, node) in segment.iter() {
                match node.identifier() {
                    Some(identifier) => named.push((id, (position, node.kind(), identifier.to_string()))),
                    None => endpoints.push((position, id)),
                }
            }
        }

        let mut matrix = BTreeMap::new();
        for (from, key) in &named {
            let reached: BTreeSet<NamedKey> = named
                .iter()
                .filter(|(to, _)| topology.reachable(*from, *to))
                .map(|(_, k)| k.clone())
                .collect();
            let mut per_segment = vec![0; topology.segment_count()];
            for (position, e) in &endpoints {
                if topology.reachable(*from, *e) {
                    per_segment[*position] += 1;
                }
            }
            matrix.insert(key.clone(), (reached, per_segment));
        }

        // endpoints cut off from every named node pair up among themselves
        let mut loose = vec![Vec::new(); topology.segment_count()];
        for (position, e) in &endpoints {
            if named.iter().any(|(n, _)| topology.reachable(*e, *n)) {
                continue;
            }
            let group = endpoints.iter().filter(|(_, other)| topology.reachable(*e, *other)).count();
            loose[*position].push(group);
        }
        for sizes in &mut loose {
            sizes.sort_unstable();
        }
        (matrix, loose)
    }

    /// Two segments joined by a router pair, with a bridge in front of one router
    #[test]
    fn test_router_pair_between_segments() {
        let mut topo = Topology::new();
        let n = topo.add_segment();
        let m = topo.add_segment();

        let (e1, e2, b, r1) = {
            let seg = topo.segment_mut(n).unwrap();
            let e1 = seg.add_endpoint();
            let e2 = seg.add_endpoint();
            let b = seg.add_bridge(2, "ufo").unwrap();
            let r1 = seg.add_router(2, "r1").unwrap();
            (e1, e2, b, r1)
        };
        let (e3, r2) = {
            let seg = topo.segment_mut(m).unwrap();
            let e3 = seg.add_endpoint();
            let r2 = seg.add_router(2, "r2").unwrap();
            (e3, r2)
        };

        assert_eq!(topo.segment(n).unwrap().bridges().len(), 1);
        assert_eq!(topo.segment(n).unwrap().routers().len(), 1);
        assert_eq!(topo.segment(n).unwrap().endpoints().len(), 2);

        assert!(topo.connect(b, e1));
        assert!(topo.connect(b, r1));
        assert!(topo.connect(r1, r2));
        assert!(topo.connect(r2, e3));

        assert!(topo.reachable(e1, e3));
        assert!(!topo.reachable(e1, e2));

        let text = assert_round_trip(&topo);
        let copy = deserialize(&text).unwrap();
        assert_eq!(copy.segment_count(), 2);
        let ids = copy.segment_ids();
        let nn = copy.segment(ids[0]).unwrap().endpoints();
        let mm = copy.segment(ids[1]).unwrap().endpoints();
        assert_eq!(nn.len(), 2);
        assert_eq!(mm.len(), 1);
        assert!(nn.iter().any(|&e| copy.reachable(e, mm[0])));
        assert!(!nn.iter().all(|&e| copy.reachable(e, mm[0])));
    }

    #[test]
    fn test_reachability_survives_round_trip() {
        let mut topo = Topology::new();
        let s0 = topo.add_segment();
        let s1 = topo.add_segment();
        let seg = topo.segment_mut(s0).unwrap();
        let b = seg.add_bridge(5, "ufo").unwrap();
        let e = seg.add_endpoint();
        let r = seg.add_router(2, "r3").unwrap();
        let seg = topo.segment_mut(s1).unwrap();
        let e4 = seg.add_endpoint();
        let e5 = seg.add_endpoint();
        assert!(topo.connect(b, e));
        assert!(topo.connect(b, r));
        assert!(topo.connect(e4, e5));

        let text = assert_round_trip(&topo);
        let copy = deserialize(&text).unwrap();
        let eps = copy.segment(copy.segment_ids()[1]).unwrap().endpoints();
        for &x in &eps {
            for &y in &eps {
                assert!(copy.reachable(x, y));
            }
        }
    }

    #[test]
    fn test_reconnect_restores_encoding() {
        let mut topo = Topology::new();
        let s = topo.add_segment();
        let seg = topo.segment_mut(s).unwrap();
        let a = seg.add_bridge(2, "A").unwrap();
        let b = seg.add_bridge(2, "B").unwrap();
        let c = seg.add_bridge(2, "C").unwrap();
        assert!(topo.connect(a, b));
        assert!(topo.connect(a, c));
        assert!(topo.connect(b, c));
        let reference = serialize(&topo);

        for (x, y) in [(a, b), (a, c), (b, c)] {
            assert!(topo.disconnect(x, y));
            assert!(topo.connect(y, x));
            assert_eq!(serialize(&topo), reference);
        }
    }

    #[test]
    fn test_disconnect_then_reconnect_same_identifiers() {
        let mut topo = Topology::new();
        let s0 = topo.add_segment();
        let s1 = topo.add_segment();
        let seg = topo.segment_mut(s0).unwrap();
        let a1 = seg.add_bridge(2, "A").unwrap();
        let e2 = seg.add_endpoint();
        let e4 = seg.add_endpoint();
        let seg = topo.segment_mut(s1).unwrap();
        // bridge and router may share an identifier
        let a2 = seg.add_bridge(2, "A").unwrap();
        let ra = seg.add_router(2, "A").unwrap();
        let e7 = seg.add_endpoint();

        assert!(topo.connect(a1, e2));
        assert!(topo.connect(a1, e4));
        assert!(topo.connect(a2, ra));
        assert!(topo.connect(a2, e7));
        let reference = assert_round_trip(&topo);

        assert!(!topo.connect(a1, e2));
        assert!(topo.reachable(a1, e2));
        for (x, y) in [(a1, e2), (a1, e4), (a2, ra), (a2, e7)] {
            assert!(topo.disconnect(x, y));
            assert!(topo.connect(y, x));
        }
        assert_eq!(serialize(&topo), reference);
    }

    #[test]
    fn test_generated_topologies_round_trip() {
        for seed in 0..200 {
            let params = GeneratorParams {
                seed,
                segments: 1 + (seed as usize % 4),
                nodes: 2 + (seed as usize % 7),
                links: 5 + (seed as usize % 30),
                ..Default::default()
            };
            let topology = generate(&params);
            let text = assert_round_trip(&topology);

            let copy = deserialize(&text).unwrap();
            assert_eq!(
                TopologyReport::from_topology(&copy),
                TopologyReport::from_topology(&topology),
                "seed {}",
                seed
            );
            assert_eq!(
                reachability_fingerprint(&copy),
                reachability_fingerprint(&topology),
                "seed {}",
                seed
            );
        }
    }

    #[test]
    fn test_fingerprint_tells_reachability_apart() {
        let build = |link_to_b: bool| {
            let mut topo = Topology::new();
            let s0 = topo.add_segment();
            let s1 = topo.add_segment();
            let a = topo.segment_mut(s0).unwrap().add_router(2, "a").unwrap();
            let b = topo.segment_mut(s1).unwrap().add_router(2, "b").unwrap();
            let c = topo.segment_mut(s1).unwrap().add_router(2, "c").unwrap();
            let e = topo.segment_mut(s1).unwrap().add_endpoint();
            assert!(topo.connect(a, if link_to_b { b } else { c }));
            assert!(topo.connect(b, e));
            topo
        };
        let (with_b, _) = reachability_fingerprint(&build(true));
        let (with_c, _) = reachability_fingerprint(&build(false));
        assert_ne!(with_b, with_c);
        let a_key = (0, NodeKind::Router, "a".to_string());
        assert_eq!(with_b[&a_key].1, vec![0, 1]);
        assert_eq!(with_c[&a_key].1, vec![0, 0]);
    }

    #[test]
    fn test_fix_loops_preserves_reachability() {
        for seed in 0..50 {
            let mut topology = generate(&GeneratorParams {
                seed,
                segments: 2,
                nodes: 8,
                links: 30,
                max_capacity: 4,
            });
            let nodes: Vec<NodeId> = topology
                .segments()
                .flat_map(|s| s.iter().map(|(id, _)| id).collect::<Vec<_>>())
                .collect();
            let before: Vec<bool> = nodes
                .iter()
                .flat_map(|&a| nodes.iter().map(move |&b| (a, b)))
                .map(|(a, b)| topology.reachable(a, b))
                .collect();

            topology.fix_loops();
            assert!(!topology.has_loops(), "seed {}", seed);

            let after: Vec<bool> = nodes
                .iter()
                .flat_map(|&a| nodes.iter().map(move |&b| (a, b)))
                .map(|(a, b)| topology.reachable(a, b))
                .collect();
            assert_eq!(before, after, "seed {}", seed);
            assert_round_trip(&topology);
        }
    }

    #[test]
    fn test_segment_order_changes_indexes_only() {
        let mut topo = Topology::new();
        let s0 = topo.add_segment();
        let s1 = topo.add_segment();
        let s2 = topo.add_segment();
        let r0 = topo.segment_mut(s0).unwrap().add_router(3, "r0").unwrap();
        let r2 = topo.segment_mut(s2).unwrap().add_router(3, "r2").unwrap();
        let e1 = topo.segment_mut(s1).unwrap().add_endpoint();
        assert!(topo.connect(r0, r2));
        assert!(topo.connect(r0, e1));

        let reordered = serialize_ordered(&topo, &[s2, s0, s1]).unwrap();
        let copy = deserialize(&reordered).unwrap();
        assert_eq!(serialize(&copy), reordered);
        let ids = copy.segment_ids();
        let r0_copy = copy.segment(ids[1]).unwrap().find_router("r0").unwrap();
        let e1_copy = copy.segment(ids[2]).unwrap().endpoints()[0];
        assert!(copy.reachable(r0_copy, e1_copy));
    }

    #[test]
    fn test_malformed_input_reports_position() {
        let text = "net_series{\nnetwork[ endpoints=( node{ type= widget e_count= 0 } )\n";
        match deserialize(text) {
            Err(TopologyError::MalformedInput { position, token, .. }) => {
                assert_eq!(position.line, 2);
                assert_eq!(token, "widget");
            }
            other => panic!("unexpected result {:?}", other.map(|t| serialize(&t))),
        }
        assert!(deserialize("").is_err());
        assert!(deserialize("net_series{\n").is_err());
    }

    #[test]
    fn test_scenario_to_file_and_back() {
        let mut scenario_file = NamedTempFile::new().unwrap();
        write!(
            scenario_file,
            r#"
segments:
  - name: lan
    endpoints: [pc1, pc2]
    bridges:
      - {{ id: sw, capacity: 4 }}
    routers:
      - {{ id: gw, capacity: 2 }}
  - name: wan
    endpoints: [isp]
    routers:
      - {{ id: core, capacity: 2 }}
links:
  - [lan/pc1, lan/sw]
  - [lan/pc2, lan/sw]
  - [lan/sw, lan/gw]
  - [lan/gw, wan/core]
  - [wan/core, wan/isp]
"#
        )
        .unwrap();

        let scenario = load_scenario(scenario_file.path()).unwrap();
        let topology = build_topology(&scenario).unwrap();
        let output = NamedTempFile::new().unwrap();
        fs::write(output.path(), serialize(&topology)).unwrap();

        let text = fs::read_to_string(output.path()).unwrap();
        let copy = deserialize(&text).unwrap();
        assert_eq!(serialize(&copy), text);

        let ids = copy.segment_ids();
        let lan = copy.segment(ids[0]).unwrap().endpoints();
        let isp = copy.segment(ids[1]).unwrap().endpoints()[0];
        assert!(lan.iter().all(|&e| copy.reachable(e, isp)));
        assert!(!copy.has_loops());
    }
}
