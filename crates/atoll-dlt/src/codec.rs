//! Binary wire and on-disk encoding of a [`Dlt`].
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! version            u64
//! num_bits_for_token u32
//! depth              u32
//! num_tokens         u32
//! node_count         u32
//! node ids           node_count x u64
//! placement          num_tokens x depth x u8   (token-major, slot order)
//! ```
//!
//! Total size is `24 + 8 * node_count + num_tokens * depth`. Cluster members
//! on different releases exchange this layout, so it must not change without
//! a new format version.

use atoll_types::{DLT_HEADER_LEN, MAX_NODES, NODE_ID_LEN, NodeId};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::dlt::{Dlt, DltHeader};
use crate::error::DltError;
use crate::matrix::PlacementMatrix;
use crate::node_table::NodeTable;

/// Serialized size of a table with the given dimensions.
pub fn encoded_len(node_count: usize, num_tokens: u32, depth: u32) -> u64 {
    DLT_HEADER_LEN as u64
        + NODE_ID_LEN as u64 * node_count as u64
        + num_tokens as u64 * depth as u64
}

/// Encode a frozen table.
pub fn encode(dlt: &Dlt) -> Bytes {
    let header = dlt.header();
    let mut buf = BytesMut::with_capacity(dlt.encoded_len());

    buf.put_u64(header.version);
    buf.put_u32(header.num_bits_for_token);
    buf.put_u32(header.depth);
    buf.put_u32(header.num_tokens);
    buf.put_u32(dlt.node_count() as u32);
    for node_id in dlt.node_table().iter() {
        buf.put_u64(node_id.as_u64());
    }
    buf.put_slice(dlt.placement_bytes());

    debug!(version = header.version, len = buf.len(), "encoded table");
    buf.freeze()
}

/// Read only the version stamp of a serialized table.
///
/// Lets gossip decide whether a received table supersedes the active one
/// before paying for a full decode.
pub fn peek_version(bytes: &[u8]) -> Result<u64, DltError> {
    let mut buf = bytes;
    if buf.remaining() < 8 {
        return Err(DltError::MalformedTable(format!(
            "buffer of {} bytes too short for version",
            bytes.len()
        )));
    }
    Ok(buf.get_u64())
}

/// Decode a serialized table.
///
/// Any structural problem yields [`DltError::MalformedTable`]; no partially
/// decoded table is ever returned.
pub fn decode(bytes: &[u8]) -> Result<Dlt, DltError> {
    let mut buf = bytes;
    if buf.remaining() < DLT_HEADER_LEN {
        return Err(DltError::MalformedTable(format!(
            "buffer of {} bytes shorter than {DLT_HEADER_LEN}-byte header",
            bytes.len()
        )));
    }

    let header = DltHeader {
        version: buf.get_u64(),
        num_bits_for_token: buf.get_u32(),
        depth: buf.get_u32(),
        num_tokens: buf.get_u32(),
    };
    let node_count = buf.get_u32() as usize;

    header.check().map_err(DltError::MalformedTable)?;
    if node_count == 0 || node_count > MAX_NODES {
        return Err(DltError::MalformedTable(format!(
            "node count {node_count} outside 1..={MAX_NODES}"
        )));
    }

    // Length must match before anything is sized from header fields.
    let expected = encoded_len(node_count, header.num_tokens, header.depth);
    if bytes.len() as u64 != expected {
        return Err(DltError::MalformedTable(format!(
            "buffer is {} bytes, header describes {expected}",
            bytes.len()
        )));
    }

    let mut ids = Vec::with_capacity(node_count);
    for _ in 0..node_count {
        ids.push(NodeId::new(buf.get_u64()));
    }
    let nodes = NodeTable::new(ids)?;

    let matrix = PlacementMatrix::from_cells(
        header.num_tokens,
        header.depth,
        nodes.len(),
        buf.chunk().to_vec(),
    )?;

    debug!(
        version = header.version,
        num_tokens = header.num_tokens,
        depth = header.depth,
        node_count,
        "decoded table"
    );
    Ok(Dlt::from_parts(header, nodes, matrix))
}
