//! Deterministic id derivation.
//!
//! Migrations that synthesize nodes or edges must produce the same ids every time they
//! run over the same bytes, so new ids are name-based UUIDs (v5) of their parent id and
//! a salt rather than random ones.

use uuid::Uuid;

/// Namespace for every id derived by this crate.
const CHAIN_NAMESPACE: Uuid = Uuid::from_u128(0x6f3c_2a8e_91d4_4b7a_a5e0_3c1d_7b92_e4f6);

/// Derives a new id from an existing id and a salt naming the role of the new entity.
pub fn derive_unique_id(parent_id: &str, salt: &str) -> String {
    let mut name = Vec::with_capacity(parent_id.len() + salt.len() + 1);
    name.extend_from_slice(parent_id.as_bytes());
    name.push(0);
    name.extend_from_slice(salt.as_bytes());
    Uuid::new_v5(&CHAIN_NAMESPACE, &name).to_string()
}

/// Derives the id of an edge from its endpoints.
pub fn derive_edge_id(source_handle: &str, target_handle: &str) -> String {
    derive_unique_id(source_handle, target_handle)
}
