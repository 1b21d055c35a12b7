//! 挂载参数

use crate::consts::{HFS_DEFAULT_CACHE_BLOCKS, HFS_DEFAULT_CACHE_MAX_AGE};

/// 挂载参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
    /// 卷在设备中的起始字节偏移（分区偏移）
    pub base_offset: u64,
    /// 调试用的字节调整量，加到每个 fork 的物理偏移上
    pub debug_offset: i64,
    /// 块缓存容量（物理块数），0 表示关闭缓存
    pub cache_blocks: usize,
    /// 缓存年龄上限（缓存访问次数）
    pub cache_max_age: u64,
    /// 按路径查找和列目录时是否解析硬链接
    pub resolve_hard_links: bool,
    /// 读取文件内容时是否解压 decmpfs 压缩数据
    pub decompress: bool,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            base_offset: 0,
            debug_offset: 0,
            cache_blocks: HFS_DEFAULT_CACHE_BLOCKS,
            cache_max_age: HFS_DEFAULT_CACHE_MAX_AGE,
            resolve_hard_links: true,
            decompress: true,
        }
    }
}

impl MountOptions {
    /// 指定卷起始偏移
    pub fn with_base_offset(mut self, offset: u64) -> Self {
        self.base_offset = offset;
        self
    }

    /// 指定调试偏移
    pub fn with_debug_offset(mut self, offset: i64) -> Self {
        self.debug_offset = offset;
        self
    }

    /// 指定块缓存
    pub fn with_cache(mut self, blocks: usize, max_age: u64) -> Self {
        self.cache_blocks = blocks;
        self.cache_max_age = max_age;
        self
    }

    /// 开关硬链接解析，关闭时链接按普通文件记录返回
    pub fn with_hard_links(mut self, resolve: bool) -> Self {
        self.resolve_hard_links = resolve;
        self
    }

    /// 开关透明解压，关闭时压缩文件按原始 fork 读取
    pub fn with_decompression(mut self, decompress: bool) -> Self {
        self.decompress = decompress;
        self
    }
}
