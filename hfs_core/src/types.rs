//! 各 flavor 共用的基础数据结构
//!
//! 这里的类型与磁盘字节布局无关，由各 flavor 的解码器
//! （见 [`crate::hfsplus`]）从原始字节构造。

use crate::consts::*;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Catalog Node ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CatalogNodeId(pub u32);

impl CatalogNodeId {
    /// 根目录的父节点（哨兵）
    pub const ROOT_PARENT: Self = Self(HFS_ROOT_PARENT_ID);
    /// 根目录
    pub const ROOT_FOLDER: Self = Self(HFS_ROOT_FOLDER_ID);
    /// Extents overflow 文件
    pub const EXTENTS_FILE: Self = Self(HFS_EXTENTS_FILE_ID);
    /// Catalog 文件
    pub const CATALOG_FILE: Self = Self(HFS_CATALOG_FILE_ID);
    /// 坏块文件
    pub const BAD_BLOCKS_FILE: Self = Self(HFS_BAD_BLOCKS_FILE_ID);
    /// 分配位图文件
    pub const ALLOCATION_FILE: Self = Self(HFS_ALLOCATION_FILE_ID);
    /// 启动文件
    pub const STARTUP_FILE: Self = Self(HFS_STARTUP_FILE_ID);
    /// Attributes 文件
    pub const ATTRIBUTES_FILE: Self = Self(HFS_ATTRIBUTES_FILE_ID);
    /// 第一个用户可用 ID
    pub const FIRST_USER: Self = Self(HFS_FIRST_USER_CATALOG_NODE_ID);

    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// 下一个 ID（用于构造区间扫描的上界）
    pub fn next(&self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// 是否为保留 ID
    pub fn is_reserved(&self) -> bool {
        self.0 < HFS_FIRST_USER_CATALOG_NODE_ID
    }
}

impl fmt::Display for CatalogNodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CatalogNodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// fork 类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ForkKind {
    /// 数据 fork
    Data,
    /// 资源 fork
    Resource,
}

impl fmt::Display for ForkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForkKind::Data => f.write_str("data"),
            ForkKind::Resource => f.write_str("resource"),
        }
    }
}

/// Extent 描述符：一段连续的分配块
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtentDescriptor {
    pub start_block: u32,
    pub block_count: u32,
}

impl ExtentDescriptor {
    pub const fn new(start_block: u32, block_count: u32) -> Self {
        Self {
            start_block,
            block_count,
        }
    }

    /// (0,0) 描述符，表示有效列表提前结束
    pub fn is_terminator(&self) -> bool {
        self.start_block == 0 && self.block_count == 0
    }

    /// 字节跨度
    pub fn byte_len(&self, allocation_block_size: u32) -> u64 {
        self.block_count as u64 * allocation_block_size as u64
    }
}

/// 截断到第一个 (0,0) 描述符之前
pub fn meaningful_extents(extents: &[ExtentDescriptor]) -> &[ExtentDescriptor] {
    let end = extents
        .iter()
        .position(|e| e.is_terminator())
        .unwrap_or(extents.len());
    &extents[..end]
}

/// extent 列表的总块数
pub fn total_block_count(extents: &[ExtentDescriptor]) -> u64 {
    extents.iter().map(|e| e.block_count as u64).sum()
}

/// fork 数据：逻辑长度 + 内联的前 8 个 extent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForkData {
    pub logical_size: u64,
    pub clump_size: u32,
    pub total_blocks: u32,
    pub extents: [ExtentDescriptor; HFS_INLINE_EXTENTS],
}

impl ForkData {
    /// 内联 extent 中有效的部分
    pub fn inline_extents(&self) -> &[ExtentDescriptor] {
        meaningful_extents(&self.extents)
    }

    /// 内联 extent 的总块数
    pub fn inline_block_count(&self) -> u64 {
        total_block_count(self.inline_extents())
    }

    /// 内联 extent 是否足以覆盖逻辑长度
    pub fn inline_covers(&self, allocation_block_size: u32) -> bool {
        self.inline_block_count() * allocation_block_size as u64 >= self.logical_size
    }

    pub fn is_empty(&self) -> bool {
        self.logical_size == 0
    }
}

/// 键比较方式（来自树的 header node）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyCompareMode {
    /// 忽略大小写
    CaseFolding,
    /// 逐码元二进制比较
    Binary,
}

impl KeyCompareMode {
    /// 从 header record 中的 keyCompareType 字节解析
    ///
    /// 普通 HFS+ 卷上该字段为 0，按忽略大小写处理。
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            HFS_BINARY_COMPARE => KeyCompareMode::Binary,
            _ => KeyCompareMode::CaseFolding,
        }
    }
}

/// Unicode 名称（HFSUniStr255，UTF-16 码元）
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct UniStr(Vec<u16>);

impl UniStr {
    /// 空名称（thread 记录和区间边界使用）
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn from_units(units: Vec<u16>) -> Self {
        Self(units)
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.encode_utf16().collect())
    }

    pub fn units(&self) -> &[u16] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 转换为 UTF-8，非法代理对替换为 U+FFFD
    pub fn to_string_lossy(&self) -> String {
        char::decode_utf16(self.0.iter().copied())
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    }
}

impl fmt::Debug for UniStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string_lossy())
    }
}

impl fmt::Display for UniStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl From<&str> for UniStr {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

/// HFS 时间戳（自 1904-01-01 起的秒数）转 Unix 时间戳
///
/// 早于 1970 年的时间返回 None。
pub fn hfs_time_to_unix(hfs_time: u32) -> Option<u32> {
    hfs_time.checked_sub(HFS_EPOCH_OFFSET)
}
