//! 资源 fork 中的 `cmpf` 资源
//!
//! 资源 fork 以 16 字节大端头部开始（数据区偏移、资源表偏移、两者长度）。
//! 资源表中 24 字节处是类型列表的偏移；类型列表是 "数量 - 1" 加上若干
//! 8 字节的类型项，每项指向自己的引用列表。引用项 12 字节，5..8 字节是
//! 资源数据相对数据区的 24 位偏移。资源数据本身以 4 字节大端长度开头。
//!
//! `cmpf` 资源的内容以小端块数开头，后面每块 8 字节：相对资源数据起点的
//! 偏移和长度。

use crate::{
    block::BlockDevice,
    consts::DECMPFS_RESOURCE_TYPE,
    error::{Error, ErrorKind, Result},
    fork::ForkReader,
};
use alloc::vec;
use alloc::vec::Vec;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use log::{debug, error};

const RESOURCE_HEADER_SIZE: usize = 16;
const MAP_TYPE_LIST_OFFSET: usize = 24;
const TYPE_ENTRY_SIZE: usize = 8;
const REFERENCE_ENTRY_SIZE: usize = 12;
const BLOCK_ENTRY_SIZE: usize = 8;

/// 压缩块在资源 fork 中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedBlock {
    /// 相对资源 fork 起点的字节偏移
    pub offset: u64,
    pub length: u32,
}

fn corrupted(message: &'static str) -> Error {
    Error::new(ErrorKind::Corrupted, message)
}

fn slice(data: &[u8], start: usize, len: usize) -> Result<&[u8]> {
    start
        .checked_add(len)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| corrupted("resource map entry out of bounds"))
}

/// 在资源 fork 中找到 `cmpf` 资源并读出块表
///
/// # 返回
///
/// 按解压顺序排列的压缩块
///
/// # 错误
///
/// - `ErrorKind::Corrupted` - 资源头部或资源表越界，没有 `cmpf` 资源，
///   或者有不止一个
/// - `ErrorKind::Io` - fork 提前结束
pub fn locate_blocks<D: BlockDevice>(fork: &mut ForkReader<'_, D>) -> Result<Vec<CompressedBlock>> {
    let fork_len = fork.len();
    if fork_len < RESOURCE_HEADER_SIZE as u64 {
        return Err(corrupted("resource fork too short"));
    }

    let mut header = [0u8; RESOURCE_HEADER_SIZE];
    fork.seek(0)?;
    fork.read_exact(&mut header)?;
    let data_offset = BigEndian::read_u32(&header[0..4]) as u64;
    let map_offset = BigEndian::read_u32(&header[4..8]) as u64;
    let map_len = BigEndian::read_u32(&header[12..16]) as u64;

    if map_offset.saturating_add(map_len) > fork_len || map_len < MAP_TYPE_LIST_OFFSET as u64 + 4 {
        error!(
            "resource map {}+{} outside fork of {} bytes",
            map_offset, map_len, fork_len
        );
        return Err(corrupted("resource map out of bounds"));
    }

    let mut map = vec![0u8; map_len as usize];
    fork.seek(map_offset)?;
    fork.read_exact(&mut map)?;

    let type_list = BigEndian::read_u16(&map[MAP_TYPE_LIST_OFFSET..]) as usize;
    let type_count = BigEndian::read_u16(slice(&map, type_list, 2)?).wrapping_add(1) as usize;

    let mut found = None;
    for i in 0..type_count {
        let entry = slice(&map, type_list + 2 + i * TYPE_ENTRY_SIZE, TYPE_ENTRY_SIZE)?;
        if entry[0..4] != DECMPFS_RESOURCE_TYPE {
            continue;
        }

        let count = BigEndian::read_u16(&entry[4..6]).wrapping_add(1);
        if found.is_some() || count != 1 {
            error!("resource fork holds more than one cmpf resource");
            return Err(corrupted("multiple cmpf resources"));
        }

        let refs = type_list + BigEndian::read_u16(&entry[6..8]) as usize;
        let reference = slice(&map, refs, REFERENCE_ENTRY_SIZE)?;
        found = Some(BigEndian::read_u24(&reference[5..8]) as u64);
    }

    let Some(resource_offset) = found else {
        error!("resource fork has no cmpf resource");
        return Err(corrupted("cmpf resource missing"));
    };

    let resource_start = data_offset + resource_offset;
    let content = resource_start + 4;
    if content > fork_len {
        error!("cmpf resource at {} outside fork of {} bytes", resource_start, fork_len);
        return Err(corrupted("cmpf resource out of bounds"));
    }

    let mut length = [0u8; 4];
    fork.seek(resource_start)?;
    fork.read_exact(&mut length)?;
    let resource_len = BigEndian::read_u32(&length) as u64;
    if content + resource_len > fork_len || resource_len < 4 {
        error!(
            "cmpf resource {}+{} outside fork of {} bytes",
            content, resource_len, fork_len
        );
        return Err(corrupted("cmpf resource out of bounds"));
    }

    let mut count = [0u8; 4];
    fork.read_exact(&mut count)?;
    let block_count = LittleEndian::read_u32(&count) as u64;
    if 4 + block_count * BLOCK_ENTRY_SIZE as u64 > resource_len {
        error!("cmpf block table of {} entries exceeds resource", block_count);
        return Err(corrupted("cmpf block table out of bounds"));
    }

    let mut table = vec![0u8; block_count as usize * BLOCK_ENTRY_SIZE];
    fork.read_exact(&mut table)?;

    let mut blocks = Vec::with_capacity(block_count as usize);
    for entry in table.chunks_exact(BLOCK_ENTRY_SIZE) {
        let offset = LittleEndian::read_u32(&entry[0..4]) as u64;
        let length = LittleEndian::read_u32(&entry[4..8]);
        if offset + length as u64 > resource_len {
            error!("cmpf block {}+{} exceeds resource of {} bytes", offset, length, resource_len);
            return Err(corrupted("cmpf block out of bounds"));
        }
        blocks.push(CompressedBlock {
            offset: content + offset,
            length,
        });
    }

    debug!("cmpf resource at {}: {} blocks", content, blocks.len());
    Ok(blocks)
}
