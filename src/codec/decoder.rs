//! Two-pass decoding of the topology text format.
//!
//! Pass 1 parses the text, creating every segment and node and keeping each
//! record's raw references. Pass 2 resolves references against the complete
//! node index and connects nodes: endpoint pairs first, then edges between
//! named nodes, then endpoint claims by named nodes.

use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use log::{debug, info, warn};
use regex::Regex;

use super::lexer::{Token, TokenStream};
use crate::error::{Position, Result, TopologyError};
use crate::topology::{NodeId, NodeKind, Segment, SegmentId, Topology};

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(?:(\d+):)?([ebr])_([A-Za-z0-9]*)$").unwrap())
}

/// Neighbor of an endpoint as recorded by its flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointPeer {
    /// No endpoint neighbor (isolated, or attached to a named node)
    None,
    /// Endpoint neighbor in the same segment
    Local,
    /// Endpoint neighbor in the segment at this position
    Foreign(usize),
}

struct EndpointRecord {
    node: NodeId,
    peer: EndpointPeer,
    position: Position,
}

struct NamedRecord<'a> {
    node: NodeId,
    refs: Vec<Token<'a>>,
    local_endpoints: usize,
    position: Position,
}

#[derive(Default)]
struct SegmentRecords<'a> {
    endpoints: Vec<EndpointRecord>,
    named: Vec<NamedRecord<'a>>,
}

/// Target of one reference token.
enum Target {
    Named(NodeId),
    Endpoint(usize),
}

/// Decode text produced by [`serialize`](super::serialize).
pub fn deserialize(text: &str) -> Result<Topology> {
    let mut topology = Topology::new();
    let mut stream = TokenStream::new(text);
    let mut segments: Vec<(SegmentId, SegmentRecords<'_>)> = Vec::new();

    stream.expect("net_series{")?;
    loop {
        match stream.peek_text() {
            Some("network[") => {
                let id = topology.add_segment();
                let records = parse_segment(&mut stream, &mut topology, id)?;
                segments.push((id, records));
            }
            Some("}ser_end") => {
                stream.next()?;
                break;
            }
            Some(other) => {
                return Err(TopologyError::malformed(
                    stream.position(),
                    other,
                    "expected 'network[' or '}ser_end'",
                ));
            }
            None => return Err(TopologyError::malformed(stream.position(), "<eof>", "missing '}ser_end'")),
        }
    }
    if !stream.is_at_end() {
        let token = stream.next()?;
        return Err(TopologyError::malformed(token.position, token.text, "trailing input after '}ser_end'"));
    }
    debug!("Pass 1 complete: {} segments parsed", segments.len());

    let ids: Vec<SegmentId> = segments.iter().map(|(id, _)| *id).collect();
    pair_endpoints(&mut topology, &segments)?;
    let claims = connect_named(&mut topology, &ids, &segments)?;
    claim_endpoints(&mut topology, &segments, claims)?;

    info!(
        "Decoded {} segments with {} edges",
        topology.segment_count(),
        topology.edges().len()
    );
    Ok(topology)
}

fn parse_segment<'a>(
    stream: &mut TokenStream<'a>,
    topology: &mut Topology,
    id: SegmentId,
) -> Result<SegmentRecords<'a>> {
    let mut records = SegmentRecords::default();
    stream.expect("network[")?;
    stream.expect("endpoints=(")?;
    parse_group(stream, topology, id, NodeKind::Endpoint, &mut records)?;
    stream.expect("bridges=(")?;
    parse_group(stream, topology, id, NodeKind::Bridge, &mut records)?;
    stream.expect("routers=(")?;
    parse_group(stream, topology, id, NodeKind::Router, &mut records)?;
    stream.expect("]")?;
    Ok(records)
}

fn parse_group<'a>(
    stream: &mut TokenStream<'a>,
    topology: &mut Topology,
    id: SegmentId,
    kind: NodeKind,
    records: &mut SegmentRecords<'a>,
) -> Result<()> {
    loop {
        if stream.peek_text() == Some(")") {
            stream.next()?;
            return Ok(());
        }
        let position = stream.expect("node{")?;
        stream.expect("type=")?;
        let type_token = stream.next()?;
        if NodeKind::from_keyword(type_token.text) != Some(kind) {
            return Err(TopologyError::malformed(
                type_token.position,
                type_token.text,
                format!("expected {} record", kind),
            ));
        }
        if kind == NodeKind::Endpoint {
            records.endpoints.push(parse_endpoint(stream, topology, id, position)?);
        } else {
            let free = records.endpoints.len();
            records.named.push(parse_named(stream, topology, id, kind, position, free)?);
        }
    }
}

fn parse_endpoint(
    stream: &mut TokenStream<'_>,
    topology: &mut Topology,
    id: SegmentId,
    position: Position,
) -> Result<EndpointRecord> {
    stream.expect("e_count=")?;
    let (flag, flag_token) = stream.expect_number("endpoint flag")?;
    let peer = match flag {
        0 => EndpointPeer::None,
        1 if stream.peek_text() == Some("segment=") => {
            stream.next()?;
            let (segment, _) = stream.expect_number("segment index")?;
            EndpointPeer::Foreign(segment)
        }
        1 => EndpointPeer::Local,
        _ => {
            return Err(TopologyError::malformed(
                flag_token.position,
                flag_token.text,
                "endpoint flag must be 0 or 1",
            ))
        }
    };
    stream.expect("}")?;
    let node = segment_of(topology, id)?.add_endpoint();
    Ok(EndpointRecord { node, peer, position })
}

fn parse_named<'a>(
    stream: &mut TokenStream<'a>,
    topology: &mut Topology,
    id: SegmentId,
    kind: NodeKind,
    position: Position,
    endpoint_records: usize,
) -> Result<NamedRecord<'a>> {
    stream.expect("id=")?;
    let id_token = stream.next()?;
    stream.expect("capacity=")?;
    let (capacity, capacity_token) = stream.expect_number("capacity")?;
    stream.expect("connected=(")?;
    let mut refs = Vec::new();
    loop {
        let token = stream.next()?;
        if token.text == ")" {
            break;
        }
        refs.push(token);
    }
    stream.expect("e_count=")?;
    let (local_endpoints, count_token) = stream.expect_number("endpoint count")?;
    if local_endpoints > capacity {
        return Err(TopologyError::malformed(
            count_token.position,
            count_token.text,
            format!("endpoint count exceeds capacity {}", capacity),
        ));
    }
    if local_endpoints > endpoint_records {
        return Err(TopologyError::malformed(
            count_token.position,
            count_token.text,
            format!("segment lists only {} endpoints", endpoint_records),
        ));
    }
    stream.expect("}")?;

    let segment = segment_of(topology, id)?;
    let created = match kind {
        NodeKind::Bridge => segment.add_bridge(capacity, id_token.text),
        NodeKind::Router => segment.add_router(capacity, id_token.text),
        NodeKind::Endpoint => unreachable!("endpoint records are parsed separately"),
    };
    let node = created.map_err(|err| {
        let token = match &err {
            TopologyError::InvalidCapacity(_) => capacity_token,
            _ => id_token.clone(),
        };
        TopologyError::malformed(token.position, token.text, err.to_string())
    })?;
    Ok(NamedRecord {
        node,
        refs,
        local_endpoints,
        position,
    })
}

fn segment_of(topology: &mut Topology, id: SegmentId) -> Result<&mut Segment> {
    topology.segment_mut(id).ok_or(TopologyError::UnknownSegment(id))
}

/// Connect flagged endpoints: same-segment pairs in record order, and
/// cross-segment pairs by position between the two segments.
fn pair_endpoints(topology: &mut Topology, segments: &[(SegmentId, SegmentRecords<'_>)]) -> Result<()> {
    let mut foreign: BTreeMap<(usize, usize), Vec<&EndpointRecord>> = BTreeMap::new();
    for (position, (_, records)) in segments.iter().enumerate() {
        let mut local = Vec::new();
        for record in &records.endpoints {
            match record.peer {
                EndpointPeer::None => {}
                EndpointPeer::Local => local.push(record),
                EndpointPeer::Foreign(p) if p == position => {
                    warn!(
                        "Endpoint at {} names its own segment {} as foreign; treating as local",
                        record.position, p
                    );
                    local.push(record);
                }
                EndpointPeer::Foreign(p) if p >= segments.len() => {
                    return Err(TopologyError::malformed(
                        record.position,
                        &p.to_string(),
                        format!("segment index out of range (have {})", segments.len()),
                    ));
                }
                EndpointPeer::Foreign(p) => foreign.entry((position, p)).or_default().push(record),
            }
        }
        if let Some(odd) = local.chunks(2).find(|pair| pair.len() == 1) {
            return Err(TopologyError::malformed(
                odd[0].position,
                "node{",
                "endpoint flagged with an endpoint neighbor has no partner",
            ));
        }
        for pair in local.chunks(2) {
            link(topology, pair[0].node, pair[1].node, pair[1].position, "node{")?;
        }
    }

    for (&(a, b), left) in &foreign {
        if a > b {
            continue;
        }
        let right = foreign.get(&(b, a)).map(Vec::as_slice).unwrap_or_default();
        if left.len() != right.len() {
            let record = if left.len() > right.len() { left[right.len()] } else { right[left.len()] };
            return Err(TopologyError::malformed(
                record.position,
                "node{",
                format!("segments {} and {} disagree on endpoint pairs", a, b),
            ));
        }
        for (x, y) in left.iter().zip(right) {
            link(topology, x.node, y.node, x.position, "node{")?;
        }
    }
    // pairs listed only from the higher-indexed side
    for (&(a, b), right) in &foreign {
        if a > b && !foreign.contains_key(&(b, a)) {
            return Err(TopologyError::malformed(
                right[0].position,
                "node{",
                format!("segments {} and {} disagree on endpoint pairs", b, a),
            ));
        }
    }
    Ok(())
}

fn resolve(
    topology: &Topology,
    ids: &[SegmentId],
    own: usize,
    token: &Token<'_>,
) -> Result<Target> {
    let caps = reference_pattern()
        .captures(token.text)
        .ok_or_else(|| TopologyError::malformed(token.position, token.text, "malformed node reference"))?;
    let segment = match caps.get(1) {
        Some(m) => {
            let index = m
                .as_str()
                .parse::<usize>()
                .map_err(|_| TopologyError::malformed(token.position, token.text, "invalid segment index"))?;
            if index >= ids.len() {
                return Err(TopologyError::malformed(
                    token.position,
                    token.text,
                    format!("segment index out of range (have {})", ids.len()),
                ));
            }
            if index == own {
                warn!("Reference '{}' at {} carries its own segment index", token.text, token.position);
            }
            index
        }
        None => own,
    };
    let identifier = &caps[3];
    match &caps[2] {
        "e" if identifier.is_empty() && caps.get(1).is_some() => Ok(Target::Endpoint(segment)),
        "e" => Err(TopologyError::malformed(
            token.position,
            token.text,
            "endpoint references carry a segment index and no identifier",
        )),
        prefix => {
            let kind = if prefix == "b" { NodeKind::Bridge } else { NodeKind::Router };
            topology
                .segment(ids[segment])
                .and_then(|s| s.find(kind, identifier))
                .map(Target::Named)
                .ok_or_else(|| TopologyError::malformed(token.position, token.text, "unresolvable reference"))
        }
    }
}

/// Connect named nodes that list each other. Returns the endpoint claims:
/// for each named node, the segment positions it takes an endpoint from.
fn connect_named(
    topology: &mut Topology,
    ids: &[SegmentId],
    segments: &[(SegmentId, SegmentRecords<'_>)],
) -> Result<Vec<(NodeId, Vec<(usize, Position)>)>> {
    // directed reference -> position of the token that made it
    let mut directed: BTreeMap<(NodeId, NodeId), (Position, String)> = BTreeMap::new();
    let mut claims = Vec::new();

    for (own, (_, records)) in segments.iter().enumerate() {
        for record in &records.named {
            let mut taken = vec![(own, record.position); record.local_endpoints];
            for token in &record.refs {
                match resolve(topology, ids, own, token)? {
                    Target::Endpoint(segment) => taken.push((segment, token.position)),
                    Target::Named(target) if target == record.node => {
                        return Err(TopologyError::malformed(token.position, token.text, "node references itself"));
                    }
                    Target::Named(target) => {
                        let entry = (token.position, token.text.to_string());
                        if directed.insert((record.node, target), entry).is_some() {
                            return Err(TopologyError::malformed(token.position, token.text, "duplicate reference"));
                        }
                    }
                }
            }
            claims.push((record.node, taken));
        }
    }

    for (&(a, b), (position, text)) in &directed {
        if !directed.contains_key(&(b, a)) {
            return Err(TopologyError::malformed(
                *position,
                text,
                "reference is not matched by the referenced node",
            ));
        }
        if a < b {
            link(topology, a, b, *position, text)?;
        }
    }
    Ok(claims)
}

/// Hand out unflagged endpoints to the named nodes that count them, in
/// record order.
fn claim_endpoints(
    topology: &mut Topology,
    segments: &[(SegmentId, SegmentRecords<'_>)],
    claims: Vec<(NodeId, Vec<(usize, Position)>)>,
) -> Result<()> {
    let mut pools: HashMap<usize, std::vec::IntoIter<NodeId>> = segments
        .iter()
        .enumerate()
        .map(|(i, (_, records))| {
            let free: Vec<NodeId> = records
                .endpoints
                .iter()
                .filter(|r| r.peer == EndpointPeer::None)
                .map(|r| r.node)
                .collect();
            (i, free.into_iter())
        })
        .collect();

    for (node, taken) in claims {
        for (segment, position) in taken {
            let endpoint = pools
                .get_mut(&segment)
                .and_then(|pool| pool.next())
                .ok_or_else(|| {
                    TopologyError::malformed(
                        position,
                        "e_count=",
                        format!("segment {} has no free endpoint left", segment),
                    )
                })?;
            link(topology, node, endpoint, position, "e_count=")?;
        }
    }
    Ok(())
}

fn link(topology: &mut Topology, a: NodeId, b: NodeId, position: Position, token: &str) -> Result<()> {
    if topology.connect(a, b) {
        Ok(())
    } else {
        Err(TopologyError::malformed(
            position,
            token,
            format!("connection {} - {} rejected by node policy", a, b),
        ))
    }
}
