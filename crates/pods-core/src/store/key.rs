//! Key encoding for the host store trees.
//!
//! Ids are encoded big-endian so lexicographic order matches numeric order
//! and prefix scans over a parent return children in creation order.

/// Size of an encoded id.
pub const ID_SIZE: usize = 8;

/// Separator between string components.
const SEP: u8 = 0;

/// Encode a record id.
pub fn id_key(id: u64) -> [u8; ID_SIZE] {
    id.to_be_bytes()
}

/// Decode a record id from the first `ID_SIZE` bytes.
pub fn decode_id(bytes: &[u8]) -> Option<u64> {
    let head: [u8; ID_SIZE] = bytes.get(..ID_SIZE)?.try_into().ok()?;
    Some(u64::from_be_bytes(head))
}

/// Meta key: `[object_id][meta_key]`.
pub fn meta_key(object_id: u64, key: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(ID_SIZE + key.len());
    out.extend_from_slice(&id_key(object_id));
    out.extend_from_slice(key.as_bytes());
    out
}

/// Name index key: `[record_type]\0[parent_id][name]`.
pub fn name_key(record_type: &str, parent_id: u64, name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(record_type.len() + 1 + ID_SIZE + name.len());
    out.extend_from_slice(record_type.as_bytes());
    out.push(SEP);
    out.extend_from_slice(&id_key(parent_id));
    out.extend_from_slice(name.as_bytes());
    out
}

/// Child index key: `[parent_id][child_id]`.
pub fn child_key(parent_id: u64, child_id: u64) -> [u8; ID_SIZE * 2] {
    let mut out = [0u8; ID_SIZE * 2];
    out[..ID_SIZE].copy_from_slice(&id_key(parent_id));
    out[ID_SIZE..].copy_from_slice(&id_key(child_id));
    out
}
