//! HFS+ / HFSX 磁盘格式
//!
//! 所有结构均为大端序。这里实现三棵系统树的 [`NodeCodec`] 和卷头解析。

mod attributes;
mod catalog;
mod extents;
pub mod unicode;
mod volume_header;

pub use attributes::HfsPlusAttributesCodec;
pub use catalog::HfsPlusCatalogCodec;
pub use extents::HfsPlusExtentsCodec;
pub use volume_header::{VolumeAttributes, VolumeHeader, VolumeKind};

use crate::{
    btree::{BTreeHeader, IndexRecord, LeafRecord, Node},
    consts::*,
    error::{Error, ErrorKind, Result},
    types::{ExtentDescriptor, ForkData, UniStr},
};
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use log::error;

/// 把一条记录拆成 (键内容, 键之后的数据)
///
/// 键内容不含长度字段。索引节点且未声明可变长索引键时，键固定占
/// `max_key_length` 字节。
pub(crate) fn split_key<'a>(
    record: &'a [u8],
    header: &BTreeHeader,
    index: bool,
) -> Result<(&'a [u8], &'a [u8])> {
    let (len_size, key_len) = if header.has_big_keys() {
        if record.len() < 2 {
            return Err(Error::new(ErrorKind::Corrupted, "record too short for key length"));
        }
        (2, BigEndian::read_u16(&record[0..2]) as usize)
    } else {
        if record.is_empty() {
            return Err(Error::new(ErrorKind::Corrupted, "record too short for key length"));
        }
        (1, record[0] as usize)
    };

    let key_span = if index && !header.has_variable_index_keys() {
        header.max_key_length as usize
    } else {
        key_len
    };

    if key_len > key_span || len_size + key_span > record.len() {
        error!(
            "key length {} (span {}) exceeds record of {} bytes",
            key_len,
            key_span,
            record.len()
        );
        return Err(Error::new(ErrorKind::Corrupted, "key length exceeds record"));
    }

    Ok((
        &record[len_size..len_size + key_len],
        &record[len_size + key_span..],
    ))
}

/// 解码索引节点：每条记录为键 + u32 子节点编号
pub(crate) fn decode_index_records<K, F>(
    node: &Node,
    header: &BTreeHeader,
    decode_key: F,
) -> Result<Vec<IndexRecord<K>>>
where
    F: Fn(&[u8]) -> Result<K>,
{
    let mut records = Vec::with_capacity(node.num_records());
    for raw in node.records() {
        let (key, rest) = split_key(raw, header, true)?;
        if rest.len() < 4 {
            error!("index record in node {} lacks child pointer", node.index());
            return Err(Error::new(ErrorKind::Corrupted, "index record lacks child pointer"));
        }
        records.push(IndexRecord {
            key: decode_key(key)?,
            child: BigEndian::read_u32(&rest[0..4]),
        });
    }
    Ok(records)
}

/// 解码叶子节点
pub(crate) fn decode_leaf_records<K, R, FK, FR>(
    node: &Node,
    header: &BTreeHeader,
    decode_key: FK,
    decode_value: FR,
) -> Result<Vec<LeafRecord<K, R>>>
where
    FK: Fn(&[u8]) -> Result<K>,
    FR: Fn(&[u8]) -> Result<R>,
{
    let mut records = Vec::with_capacity(node.num_records());
    for raw in node.records() {
        let (key, rest) = split_key(raw, header, false)?;
        records.push(LeafRecord {
            key: decode_key(key)?,
            value: decode_value(rest)?,
        });
    }
    Ok(records)
}

/// 解析 8 个 extent 描述符（调用方保证至少 64 字节）
pub(crate) fn read_extents(buf: &[u8]) -> [ExtentDescriptor; HFS_INLINE_EXTENTS] {
    let mut extents = [ExtentDescriptor::default(); HFS_INLINE_EXTENTS];
    for (i, extent) in extents.iter_mut().enumerate() {
        let off = i * HFS_EXTENT_DESCRIPTOR_SIZE;
        *extent = ExtentDescriptor::new(
            BigEndian::read_u32(&buf[off..off + 4]),
            BigEndian::read_u32(&buf[off + 4..off + 8]),
        );
    }
    extents
}

/// 解析 fork data（调用方保证至少 80 字节）
pub(crate) fn read_fork_data(buf: &[u8]) -> ForkData {
    ForkData {
        logical_size: BigEndian::read_u64(&buf[0..8]),
        clump_size: BigEndian::read_u32(&buf[8..12]),
        total_blocks: BigEndian::read_u32(&buf[12..16]),
        extents: read_extents(&buf[16..HFS_FORK_DATA_SIZE]),
    }
}

/// 解析 HFSUniStr255，返回名称和占用的字节数
pub(crate) fn read_unistr(buf: &[u8]) -> Result<(UniStr, usize)> {
    if buf.len() < 2 {
        return Err(Error::new(ErrorKind::Corrupted, "name length missing"));
    }
    let len = BigEndian::read_u16(&buf[0..2]) as usize;
    if len > HFS_MAX_NAME_LEN || 2 + len * 2 > buf.len() {
        error!("name of {} units in {} bytes", len, buf.len());
        return Err(Error::new(ErrorKind::Corrupted, "name length exceeds record"));
    }

    let units = buf[2..2 + len * 2]
        .chunks_exact(2)
        .map(BigEndian::read_u16)
        .collect();
    Ok((UniStr::from_units(units), 2 + len * 2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btree::BTreeAttributes;

    fn header(attributes: BTreeAttributes, max_key_length: u16) -> BTreeHeader {
        BTreeHeader {
            tree_depth: 1,
            root_node: 1,
            leaf_records: 0,
            first_leaf_node: 1,
            last_leaf_node: 1,
            node_size: 512,
            max_key_length,
            total_nodes: 2,
            free_nodes: 0,
            clump_size: 0,
            btree_type: 0,
            key_compare_type: 0,
            attributes,
        }
    }

    #[test]
    fn test_split_key_variable() {
        let h = header(BTreeAttributes::BIG_KEYS | BTreeAttributes::VARIABLE_INDEX_KEYS, 516);
        let record = [0, 3, 1, 2, 3, 0, 0, 0, 9];
        let (key, rest) = split_key(&record, &h, true).unwrap();
        assert_eq!(key, &[1, 2, 3]);
        assert_eq!(rest, &[0, 0, 0, 9]);
    }

    #[test]
    fn test_split_key_fixed_index() {
        let h = header(BTreeAttributes::BIG_KEYS, 6);
        let record = [0, 3, 1, 2, 3, 0xAA, 0xAA, 0xAA, 0, 0, 0, 9];
        let (key, rest) = split_key(&record, &h, true).unwrap();
        assert_eq!(key, &[1, 2, 3]);
        assert_eq!(rest, &[0, 0, 0, 9]);

        // 叶子节点不受固定索引键长度影响
        let (_, rest) = split_key(&record, &h, false).unwrap();
        assert_eq!(rest.len(), 7);
    }

    #[test]
    fn test_split_key_too_long() {
        let h = header(BTreeAttributes::BIG_KEYS, 516);
        let record = [0, 40, 1, 2];
        assert!(split_key(&record, &h, false).unwrap_err().is_corrupted());
    }

    #[test]
    fn test_read_unistr() {
        let buf = [0, 2, 0, b'h', 0, b'i', 0xFF];
        let (name, used) = read_unistr(&buf).unwrap();
        assert_eq!(name.to_string_lossy(), "hi");
        assert_eq!(used, 6);
        assert!(read_unistr(&[0, 9, 0]).is_err());
    }
}
