//! HFS+ catalog 解码

use super::{decode_index_records, decode_leaf_records, read_fork_data, read_unistr, unicode};
use crate::{
    btree::{BTreeHeader, IndexRecord, LeafRecord, Node, NodeCodec},
    catalog::{
        BsdInfo, CatalogDates, CatalogFlags, CatalogKey, CatalogRecord, FileRecord, FolderRecord,
        ThreadRecord,
    },
    consts::*,
    error::{Error, ErrorKind, Result},
    types::{CatalogNodeId, KeyCompareMode},
};
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder};
use core::cmp::Ordering;
use log::error;

/// HFS+ catalog 解码器
#[derive(Debug, Clone, Copy, Default)]
pub struct HfsPlusCatalogCodec;

fn decode_key(buf: &[u8]) -> Result<CatalogKey> {
    if buf.len() < 6 {
        return Err(Error::new(ErrorKind::Corrupted, "catalog key too short"));
    }
    let parent_id = CatalogNodeId(BigEndian::read_u32(&buf[0..4]));
    let (name, _) = read_unistr(&buf[4..])?;
    Ok(CatalogKey::new(parent_id, name))
}

fn read_dates(buf: &[u8]) -> CatalogDates {
    CatalogDates {
        create: BigEndian::read_u32(&buf[0..4]),
        content_mod: BigEndian::read_u32(&buf[4..8]),
        attribute_mod: BigEndian::read_u32(&buf[8..12]),
        access: BigEndian::read_u32(&buf[12..16]),
        backup: BigEndian::read_u32(&buf[16..20]),
    }
}

fn read_bsd(buf: &[u8]) -> BsdInfo {
    BsdInfo {
        owner_id: BigEndian::read_u32(&buf[0..4]),
        group_id: BigEndian::read_u32(&buf[4..8]),
        admin_flags: buf[8],
        owner_flags: buf[9],
        file_mode: BigEndian::read_u16(&buf[10..12]),
        special: BigEndian::read_u32(&buf[12..16]),
    }
}

fn info16(buf: &[u8]) -> [u8; 16] {
    let mut info = [0u8; 16];
    info.copy_from_slice(&buf[..16]);
    info
}

fn decode_record(buf: &[u8]) -> Result<CatalogRecord> {
    if buf.len() < 2 {
        return Err(Error::new(ErrorKind::Corrupted, "catalog record too short"));
    }

    let record_type = BigEndian::read_i16(&buf[0..2]);
    match record_type {
        HFS_PLUS_FOLDER_RECORD => {
            if buf.len() < HFS_PLUS_FOLDER_RECORD_SIZE {
                return Err(Error::new(ErrorKind::Corrupted, "folder record too short"));
            }
            Ok(CatalogRecord::Folder(FolderRecord {
                flags: CatalogFlags::from_bits_retain(BigEndian::read_u16(&buf[2..4])),
                valence: BigEndian::read_u32(&buf[4..8]),
                folder_id: CatalogNodeId(BigEndian::read_u32(&buf[8..12])),
                dates: read_dates(&buf[12..32]),
                bsd: read_bsd(&buf[32..48]),
                user_info: info16(&buf[48..64]),
                finder_info: info16(&buf[64..80]),
                text_encoding: BigEndian::read_u32(&buf[80..84]),
            }))
        }
        HFS_PLUS_FILE_RECORD => {
            if buf.len() < HFS_PLUS_FILE_RECORD_SIZE {
                return Err(Error::new(ErrorKind::Corrupted, "file record too short"));
            }
            Ok(CatalogRecord::File(FileRecord {
                flags: CatalogFlags::from_bits_retain(BigEndian::read_u16(&buf[2..4])),
                file_id: CatalogNodeId(BigEndian::read_u32(&buf[8..12])),
                dates: read_dates(&buf[12..32]),
                bsd: read_bsd(&buf[32..48]),
                user_info: info16(&buf[48..64]),
                finder_info: info16(&buf[64..80]),
                text_encoding: BigEndian::read_u32(&buf[80..84]),
                data_fork: read_fork_data(&buf[88..168]),
                resource_fork: read_fork_data(&buf[168..248]),
            }))
        }
        HFS_PLUS_FOLDER_THREAD_RECORD | HFS_PLUS_FILE_THREAD_RECORD => {
            if buf.len() < 10 {
                return Err(Error::new(ErrorKind::Corrupted, "thread record too short"));
            }
            let (name, _) = read_unistr(&buf[8..])?;
            let thread = ThreadRecord {
                parent_id: CatalogNodeId(BigEndian::read_u32(&buf[4..8])),
                name,
            };
            if record_type == HFS_PLUS_FOLDER_THREAD_RECORD {
                Ok(CatalogRecord::FolderThread(thread))
            } else {
                Ok(CatalogRecord::FileThread(thread))
            }
        }
        other => {
            error!("unknown catalog record type {:#x}", other);
            Err(Error::new(ErrorKind::Corrupted, "unknown catalog record type"))
        }
    }
}

impl NodeCodec for HfsPlusCatalogCodec {
    type Key = CatalogKey;
    type Record = CatalogRecord;

    fn decode_index(&self, node: &Node, header: &BTreeHeader) -> Result<Vec<IndexRecord<CatalogKey>>> {
        decode_index_records(node, header, decode_key)
    }

    fn decode_leaf(
        &self,
        node: &Node,
        header: &BTreeHeader,
    ) -> Result<Vec<LeafRecord<CatalogKey, CatalogRecord>>> {
        decode_leaf_records(node, header, decode_key, decode_record)
    }

    /// 先比较父目录 ID，再按比较方式比较名称
    fn compare(&self, mode: KeyCompareMode, a: &CatalogKey, b: &CatalogKey) -> Ordering {
        a.parent_id
            .cmp(&b.parent_id)
            .then_with(|| unicode::compare_names(mode, a.name.units(), b.name.units()))
    }
}
