//! decmpfs 透明压缩
//!
//! 压缩文件带有 `com.apple.decmpfs` 扩展属性，开头是 16 字节的小端头部：
//! 魔数、压缩类型、解压后大小。类型 3 的压缩数据紧跟在头部之后，
//! 类型 4 的压缩数据存放在资源 fork 中名为 `cmpf` 的资源里，按块压缩。
//! 其余类型不解压，文件按普通 fork 读取。

mod reader;
mod resource;

pub use reader::CompressedReader;
pub use resource::{locate_blocks, CompressedBlock};

use crate::{
    consts::{
        DECMPFS_HEADER_SIZE, DECMPFS_MAGIC, DECMPFS_RAW_MARKER, DECMPFS_TYPE_INLINE_ZLIB,
        DECMPFS_TYPE_RESOURCE_ZLIB,
    },
    error::{Error, ErrorKind, Result},
};
use alloc::vec::Vec;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, error};
use miniz_oxide::inflate::{decompress_to_vec_with_limit, decompress_to_vec_zlib_with_limit};

/// 压缩数据的存放位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionStorage {
    /// 属性内联
    Inline,
    /// 资源 fork
    ResourceFork,
}

/// decmpfs 属性头部
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecmpfsHeader {
    pub compression_type: u32,
    pub uncompressed_size: u64,
}

impl DecmpfsHeader {
    /// 解析属性开头的头部
    ///
    /// # 返回
    ///
    /// 长度不足或魔数不对时返回 None
    pub fn parse(attr: &[u8]) -> Option<Self> {
        if attr.len() < DECMPFS_HEADER_SIZE {
            return None;
        }
        if LittleEndian::read_u32(&attr[0..4]) != DECMPFS_MAGIC {
            return None;
        }
        Some(Self {
            compression_type: LittleEndian::read_u32(&attr[4..8]),
            uncompressed_size: LittleEndian::read_u64(&attr[8..16]),
        })
    }

    /// 支持的压缩类型对应的存放位置，其余类型返回 None
    pub fn storage(&self) -> Option<CompressionStorage> {
        match self.compression_type {
            DECMPFS_TYPE_INLINE_ZLIB => Some(CompressionStorage::Inline),
            DECMPFS_TYPE_RESOURCE_ZLIB => Some(CompressionStorage::ResourceFork),
            _ => None,
        }
    }

    /// 解压后大小，超出地址空间时报错
    pub fn size_limit(&self) -> Result<usize> {
        usize::try_from(self.uncompressed_size)
            .map_err(|_| Error::new(ErrorKind::InvalidInput, "compressed file too large"))
    }
}

/// 解压类型 3 的内联数据
///
/// # 参数
///
/// * `header` - 已解析的头部
/// * `attr` - 完整的属性值（含头部）
///
/// # 错误
///
/// - `ErrorKind::Corrupted` - zlib 数据无效，或解压结果短于声明的大小
pub fn decompress_inline(header: &DecmpfsHeader, attr: &[u8]) -> Result<Vec<u8>> {
    let limit = header.size_limit()?;
    let payload = attr.get(DECMPFS_HEADER_SIZE..).unwrap_or(&[]);

    let mut data = match payload.first() {
        None => Vec::new(),
        Some(&first) if first & DECMPFS_RAW_MARKER == DECMPFS_RAW_MARKER => payload[1..].to_vec(),
        Some(_) => inflate_zlib(payload, limit)?,
    };

    if data.len() < limit {
        error!(
            "inline compressed data: {} bytes, header declares {}",
            data.len(),
            limit
        );
        return Err(Error::new(ErrorKind::Corrupted, "compressed data shorter than declared size"));
    }
    data.truncate(limit);

    debug!("inline compressed data: {} -> {} bytes", payload.len(), data.len());
    Ok(data)
}

/// 解压资源 fork 中的一个块
///
/// 块的第一个字节低 4 位全 1 表示原始数据；否则是带 2 字节 zlib 头的
/// deflate 流，跳过头部按原始 deflate 解压。
pub fn decompress_block(block: &[u8], limit: usize) -> Result<Vec<u8>> {
    match block.first() {
        None => Ok(Vec::new()),
        Some(&first) if first & DECMPFS_RAW_MARKER == DECMPFS_RAW_MARKER => {
            Ok(block[1..].to_vec())
        }
        Some(_) if block.len() < 2 => {
            Err(Error::new(ErrorKind::Corrupted, "compressed block too short"))
        }
        Some(_) => inflate_raw(&block[2..], limit),
    }
}

// 上限多留一个字节，恰好等于声明大小的输出不会被判为超限
fn inflate_zlib(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    decompress_to_vec_zlib_with_limit(data, limit.saturating_add(1)).map_err(|err| {
        error!("zlib stream rejected: {:?}", err.status);
        Error::new(ErrorKind::Corrupted, "invalid zlib stream")
    })
}

fn inflate_raw(data: &[u8], limit: usize) -> Result<Vec<u8>> {
    decompress_to_vec_with_limit(data, limit.saturating_add(1)).map_err(|err| {
        error!("deflate block rejected: {:?}", err.status);
        Error::new(ErrorKind::Corrupted, "invalid deflate block")
    })
}
