//! 块设备核心类型

use super::cache::BlockCache;
use crate::error::Result;

/// 块设备接口
///
/// 实现此 trait 以提供底层只读块设备访问。整个镜像被看作一个
/// 可随机定位的、按物理块（通常 512 字节）对齐的字节源。
///
/// # 示例
///
/// ```rust,ignore
/// use hfs_core::{BlockDevice, Result};
///
/// struct MyDevice {
///     // ...
/// }
///
/// impl BlockDevice for MyDevice {
///     fn total_blocks(&self) -> u64 {
///         1000000
///     }
///
///     fn read_blocks(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
///         // 实现块读取
///         Ok(count as usize * self.block_size() as usize)
///     }
/// }
/// ```
pub trait BlockDevice {
    /// 物理块大小（通常 512）
    fn block_size(&self) -> u32 {
        512
    }

    /// 总块数
    fn total_blocks(&self) -> u64;

    /// 读取物理块
    ///
    /// # 参数
    ///
    /// * `lba` - 物理块地址
    /// * `count` - 要读取的块数
    /// * `buf` - 目标缓冲区（大小至少为 count * block_size）
    ///
    /// # 返回
    ///
    /// 成功返回实际读取的字节数。设备末尾处可能少于请求的字节数。
    fn read_blocks(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> Result<usize>;
}

/// 块设备包装器
///
/// 为 HFS 卷提供字节级访问，包含卷起始偏移、统计信息和可选的块缓存。
pub struct BlockDev<D> {
    /// 底层设备
    device: D,
    /// 卷起始偏移（字节）
    partition_offset: u64,
    /// 物理读取次数
    read_count: u64,
    /// 可选的块缓存
    pub(super) cache: Option<BlockCache>,
}

impl<D: BlockDevice> BlockDev<D> {
    /// 创建新的块设备包装器（不带缓存）
    pub fn new(device: D) -> Self {
        Self {
            device,
            partition_offset: 0,
            read_count: 0,
            cache: None,
        }
    }

    /// 获取底层设备的引用
    pub fn device(&self) -> &D {
        &self.device
    }

    /// 获取底层设备的可变引用
    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// 获取物理块大小
    pub fn block_size(&self) -> u32 {
        self.device.block_size()
    }

    /// 获取总块数
    pub fn total_blocks(&self) -> u64 {
        self.device.total_blocks()
    }

    /// 设备总字节数
    pub fn device_size(&self) -> u64 {
        self.device.total_blocks() * self.device.block_size() as u64
    }

    /// 获取物理读取次数（缓存命中不计入）
    pub fn read_count(&self) -> u64 {
        self.read_count
    }

    /// 设置卷起始偏移
    ///
    /// # 参数
    ///
    /// * `offset` - 卷在设备中的起始偏移（字节）
    pub fn set_partition_offset(&mut self, offset: u64) {
        self.partition_offset = offset;
    }

    /// 获取卷起始偏移
    pub fn partition_offset(&self) -> u64 {
        self.partition_offset
    }

    /// 重新配置块缓存
    ///
    /// `capacity` 为 0 时关闭缓存。这是唯一会丢弃缓存内容的途径。
    pub fn set_cache(&mut self, capacity: usize, max_age: u64) {
        self.cache = if capacity == 0 {
            None
        } else {
            Some(BlockCache::new(capacity, max_age))
        };
    }

    /// 获取块缓存的引用
    pub fn cache(&self) -> Option<&BlockCache> {
        self.cache.as_ref()
    }

    // 内部辅助方法

    /// 增加读计数
    pub(super) fn inc_read_count(&mut self) {
        self.read_count += 1;
    }
}
