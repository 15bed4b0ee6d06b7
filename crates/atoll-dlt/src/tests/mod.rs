//! Tests for the DLT crate.

mod handle_tests;

use atoll_types::NodeId;

use crate::dlt::{Dlt, DltBuilder};

/// Node identifier used by the single-node wire fixture.
const FIXTURE_NODE: u64 = 1680041476237363857;

fn node(n: u64) -> NodeId {
    NodeId::new(n)
}

/// Version 1, 2^8 tokens, depth 1, one node, every token on ordinal 0.
fn fixture_table() -> Dlt {
    let mut builder = DltBuilder::create(1, 8, 1, 256, vec![node(FIXTURE_NODE)]).unwrap();
    for token in 0..256 {
        builder.place_token(token, 0, 0).unwrap();
    }
    builder.build()
}

/// A table with `node_count` nodes where token `t` slot `s` holds
/// ordinal `(t + s) % node_count`.
fn striped_table(version: u64, bits: u32, depth: u32, node_count: u64) -> Dlt {
    let nodes: Vec<NodeId> = (1..=node_count).map(|n| node(n * 100)).collect();
    let mut builder = DltBuilder::create(version, bits, depth, 1 << bits, nodes).unwrap();
    for token in 0..(1usize << bits) {
        for slot in 0..depth as usize {
            builder
                .place_token(token, slot, (token + slot) % node_count as usize)
                .unwrap();
        }
    }
    builder.build()
}
