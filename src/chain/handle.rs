//! Edge handles encode the owning node and slot as `"<nodeId>-<slot>"`.
//!
//! Node ids are UUIDs and contain dashes themselves, so a handle is only ever
//! interpreted relative to the node id it is expected to belong to.

use super::definition::{Edge, InputId, OutputId};

pub fn format_handle(node_id: &str, slot: u32) -> String {
    format!("{}-{}", node_id, slot)
}

/// Returns the slot encoded in `handle` if the handle belongs to `node_id`.
pub fn parse_handle(handle: &str, node_id: &str) -> Option<u32> {
    handle
        .strip_prefix(node_id)?
        .strip_prefix('-')?
        .parse()
        .ok()
}

/// Returns the trailing slot number of a handle without checking its owner.
pub fn trailing_slot(handle: &str) -> Option<u32> {
    handle.rsplit('-').next()?.parse().ok()
}

impl Edge {
    pub fn output_slot(&self) -> Option<OutputId> {
        parse_handle(&self.source_handle, &self.source)
    }

    pub fn input_slot(&self) -> Option<InputId> {
        parse_handle(&self.target_handle, &self.target)
    }
}
