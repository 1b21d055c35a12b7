//! HFS+ extents overflow 解码

use super::{decode_index_records, decode_leaf_records, read_extents};
use crate::{
    btree::{BTreeHeader, IndexRecord, LeafRecord, Node, NodeCodec},
    consts::*,
    error::{Error, ErrorKind, Result},
    extents::{ExtentKey, ExtentRecord},
    types::{CatalogNodeId, ForkKind, KeyCompareMode},
};
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use core::cmp::Ordering;
use log::error;

/// HFS+ extents overflow 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct HfsPlusExtentsCodec;

pub(crate) fn fork_type_byte(kind: ForkKind) -> u8 {
    match kind {
        ForkKind::Data => HFS_DATA_FORK_TYPE,
        ForkKind::Resource => HFS_RESOURCE_FORK_TYPE,
    }
}

fn decode_key(buf: &[u8]) -> Result<ExtentKey> {
    if buf.len() < HFS_PLUS_EXTENT_KEY_LENGTH as usize {
        return Err(Error::new(ErrorKind::Corrupted, "extent key too short"));
    }

    let fork_kind = match buf[0] {
        HFS_DATA_FORK_TYPE => ForkKind::Data,
        HFS_RESOURCE_FORK_TYPE => ForkKind::Resource,
        other => {
            error!("extent key with fork type {:#x}", other);
            return Err(Error::new(ErrorKind::Corrupted, "invalid fork type in extent key"));
        }
    };

    Ok(ExtentKey {
        fork_kind,
        // buf[1] 为填充
        file_id: CatalogNodeId(BigEndian::read_u32(&buf[2..6])),
        start_block: BigEndian::read_u32(&buf[6..10]),
    })
}

fn decode_record(buf: &[u8]) -> Result<ExtentRecord> {
    if buf.len() < HFS_INLINE_EXTENTS * HFS_EXTENT_DESCRIPTOR_SIZE {
        return Err(Error::new(ErrorKind::Corrupted, "extent record too short"));
    }
    Ok(read_extents(buf))
}

impl NodeCodec for HfsPlusExtentsCodec {
    type Key = ExtentKey;
    type Record = ExtentRecord;

    fn decode_index(&self, node: &Node, header: &BTreeHeader) -> Result<Vec<IndexRecord<ExtentKey>>> {
        decode_index_records(node, header, decode_key)
    }

    fn decode_leaf(
        &self,
        node: &Node,
        header: &BTreeHeader,
    ) -> Result<Vec<LeafRecord<ExtentKey, ExtentRecord>>> {
        decode_leaf_records(node, header, decode_key, decode_record)
    }

    /// 依次比较文件 ID、fork 类型、起始块
    fn compare(&self, _mode: KeyCompareMode, a: &ExtentKey, b: &ExtentKey) -> Ordering {
        a.file_id
            .cmp(&b.file_id)
            .then_with(|| fork_type_byte(a.fork_kind).cmp(&fork_type_byte(b.fork_kind)))
            .then_with(|| a.start_block.cmp(&b.start_block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_extent_key() {
        let buf = [0xFF, 0, 0, 0, 0, 42, 0, 0, 1, 0];
        let key = decode_key(&buf).unwrap();
        assert_eq!(key.fork_kind, ForkKind::Resource);
        assert_eq!(key.file_id, CatalogNodeId(42));
        assert_eq!(key.start_block, 256);

        let bad = [0x07, 0, 0, 0, 0, 42, 0, 0, 1, 0];
        assert!(decode_key(&bad).unwrap_err().is_corrupted());
    }

    #[test]
    fn test_extent_key_order() {
        let codec = HfsPlusExtentsCodec;
        let mode = KeyCompareMode::Binary;
        let data = ExtentKey::new(ForkKind::Data, CatalogNodeId(20), 500);
        let rsrc = ExtentKey::new(ForkKind::Resource, CatalogNodeId(20), 0);
        let other = ExtentKey::new(ForkKind::Data, CatalogNodeId(21), 0);
        assert_eq!(codec.compare(mode, &data, &rsrc), Ordering::Less);
        assert_eq!(codec.compare(mode, &rsrc, &other), Ordering::Less);
        assert_eq!(codec.compare(mode, &data, &data), Ordering::Equal);
    }
}
