//! HFS+ attributes 解码

use super::{decode_index_records, decode_leaf_records, read_extents, read_fork_data, read_unistr};
use crate::{
    attributes::{AttributeKey, AttributeRecord},
    btree::{BTreeHeader, IndexRecord, LeafRecord, Node, NodeCodec},
    consts::*,
    error::{Error, ErrorKind, Result},
    types::{CatalogNodeId, KeyCompareMode},
};
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use core::cmp::Ordering;
use log::error;

/// HFS+ attributes 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct HfsPlusAttributesCodec;

fn decode_key(buf: &[u8]) -> Result<AttributeKey> {
    if buf.len() < HFS_PLUS_ATTR_KEY_FIXED_LENGTH {
        return Err(Error::new(ErrorKind::Corrupted, "attribute key too short"));
    }
    // buf[0..2] 为填充
    let file_id = CatalogNodeId(BigEndian::read_u32(&buf[2..6]));
    let start_block = BigEndian::read_u32(&buf[6..10]);
    let (name, _) = read_unistr(&buf[10..])?;
    Ok(AttributeKey::new(file_id, start_block, name))
}

fn decode_record(buf: &[u8]) -> Result<AttributeRecord> {
    if buf.len() < 4 {
        return Err(Error::new(ErrorKind::Corrupted, "attribute record too short"));
    }

    match BigEndian::read_u32(&buf[0..4]) {
        HFS_PLUS_ATTR_INLINE_DATA => {
            // recordType, reserved[2], attrSize, attrData
            if buf.len() < 16 {
                return Err(Error::new(ErrorKind::Corrupted, "inline attribute too short"));
            }
            let size = BigEndian::read_u32(&buf[12..16]) as usize;
            if 16 + size > buf.len() {
                error!("inline attribute of {} bytes in {} byte record", size, buf.len());
                return Err(Error::new(ErrorKind::Corrupted, "inline attribute size exceeds record"));
            }
            Ok(AttributeRecord::Inline(buf[16..16 + size].to_vec()))
        }
        HFS_PLUS_ATTR_FORK_DATA => {
            if buf.len() < 8 + HFS_FORK_DATA_SIZE {
                return Err(Error::new(ErrorKind::Corrupted, "fork attribute too short"));
            }
            Ok(AttributeRecord::Fork(read_fork_data(&buf[8..8 + HFS_FORK_DATA_SIZE])))
        }
        HFS_PLUS_ATTR_EXTENTS => {
            if buf.len() < 8 + HFS_INLINE_EXTENTS * HFS_EXTENT_DESCRIPTOR_SIZE {
                return Err(Error::new(ErrorKind::Corrupted, "extents attribute too short"));
            }
            Ok(AttributeRecord::Extents(read_extents(&buf[8..])))
        }
        other => {
            error!("unknown attribute record type {:#x}", other);
            Err(Error::new(ErrorKind::Corrupted, "unknown attribute record type"))
        }
    }
}

impl NodeCodec for HfsPlusAttributesCodec {
    type Key = AttributeKey;
    type Record = AttributeRecord;

    fn decode_index(&self, node: &Node, header: &BTreeHeader) -> Result<Vec<IndexRecord<AttributeKey>>> {
        decode_index_records(node, header, decode_key)
    }

    fn decode_leaf(
        &self,
        node: &Node,
        header: &BTreeHeader,
    ) -> Result<Vec<LeafRecord<AttributeKey, AttributeRecord>>> {
        decode_leaf_records(node, header, decode_key, decode_record)
    }

    /// 依次比较文件 ID、属性名（逐码元）、起始块
    ///
    /// 属性名总是二进制比较，与树声明的比较方式无关。
    fn compare(&self, _mode: KeyCompareMode, a: &AttributeKey, b: &AttributeKey) -> Ordering {
        a.file_id
            .cmp(&b.file_id)
            .then_with(|| a.name.units().cmp(b.name.units()))
            .then_with(|| a.start_block.cmp(&b.start_block))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UniStr;
    use alloc::vec;

    #[test]
    fn test_decode_inline() {
        let mut buf = vec![0u8; 16];
        BigEndian::write_u32(&mut buf[0..4], HFS_PLUS_ATTR_INLINE_DATA);
        BigEndian::write_u32(&mut buf[12..16], 3);
        buf.extend_from_slice(b"xyz");
        assert_eq!(decode_record(&buf).unwrap(), AttributeRecord::Inline(b"xyz".to_vec()));

        BigEndian::write_u32(&mut buf[12..16], 30);
        assert!(decode_record(&buf).unwrap_err().is_corrupted());
    }

    #[test]
    fn test_attribute_key_order() {
        let codec = HfsPlusAttributesCodec;
        let mode = KeyCompareMode::CaseFolding;
        let first = AttributeKey::new(CatalogNodeId(30), 0, UniStr::empty());
        let named = AttributeKey::new(CatalogNodeId(30), 0, UniStr::from_str("com.apple.x"));
        let cont = AttributeKey::new(CatalogNodeId(30), 8, UniStr::from_str("com.apple.x"));
        let upper = AttributeKey::new(CatalogNodeId(30), 0, UniStr::from_str("Z"));
        let next = AttributeKey::new(CatalogNodeId(31), 0, UniStr::empty());

        assert_eq!(codec.compare(mode, &first, &named), Ordering::Less);
        assert_eq!(codec.compare(mode, &named, &cont), Ordering::Less);
        // 二进制比较：'Z' < 'c'
        assert_eq!(codec.compare(mode, &upper, &named), Ordering::Less);
        assert_eq!(codec.compare(mode, &cont, &next), Ordering::Less);
    }
}
