//! fork 的几何参数与 extent 布局

use super::ForkReader;
use crate::{
    block::{BlockDevice, Volume},
    error::{Error, ErrorKind, Result},
    types::{total_block_count, ExtentDescriptor, ForkData},
};
use alloc::vec::Vec;
use log::error;

/// 把 fork 内逻辑位置换算为卷内物理偏移所需的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForkGeometry {
    /// 分配块大小（字节）
    pub allocation_block_size: u32,
    /// 分配块 0 相对卷起始的字节偏移
    pub first_block_offset: u64,
    /// 调试用的字节调整量，可为负
    pub debug_offset: i64,
}

impl ForkGeometry {
    pub fn new(allocation_block_size: u32) -> Self {
        Self {
            allocation_block_size,
            first_block_offset: 0,
            debug_offset: 0,
        }
    }

    /// 计算物理偏移
    ///
    /// 物理偏移 = 调试调整量 + 首块偏移 + 起始块 × 分配块大小 + 块内余量。
    /// 卷起始偏移由块设备包装器再加上。
    pub fn physical_offset(&self, start_block: u32, remainder: u64) -> Result<u64> {
        let overflow = || Error::new(ErrorKind::InvalidInput, "physical offset overflow");

        let base = (start_block as u64)
            .checked_mul(self.allocation_block_size as u64)
            .and_then(|v| v.checked_add(self.first_block_offset))
            .and_then(|v| v.checked_add(remainder))
            .ok_or_else(overflow)?;

        if self.debug_offset >= 0 {
            base.checked_add(self.debug_offset as u64).ok_or_else(overflow)
        } else {
            base.checked_sub(self.debug_offset.unsigned_abs())
                .ok_or(Error::new(
                    ErrorKind::InvalidInput,
                    "debug offset moves read before volume start",
                ))
        }
    }
}

/// 为内联 extent 不足的 fork 补全 extent 列表
pub trait ExtentResolver {
    /// 返回内联 extent 与溢出 extent 连接后的完整列表
    fn resolve_extents(&self, fork: &ForkData) -> Result<Vec<ExtentDescriptor>>;
}

/// 完整解析后的 fork：逻辑长度 + 有序 extent 列表
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForkLayout {
    length: u64,
    extents: Vec<ExtentDescriptor>,
}

impl ForkLayout {
    pub fn new(length: u64, extents: Vec<ExtentDescriptor>) -> Self {
        Self { length, extents }
    }

    /// 只用内联 extent 构造
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 内联 extent 覆盖不了逻辑长度
    pub fn inline(fork: &ForkData, allocation_block_size: u32) -> Result<Self> {
        Self::resolve(fork, allocation_block_size, None)
    }

    /// 构造 fork 布局，必要时通过 `resolver` 补全溢出 extent
    ///
    /// # 参数
    ///
    /// * `fork` - 元数据中的 fork data
    /// * `allocation_block_size` - 分配块大小
    /// * `resolver` - 溢出 extent 来源，为 None 时只接受内联 extent
    pub fn resolve(
        fork: &ForkData,
        allocation_block_size: u32,
        resolver: Option<&dyn ExtentResolver>,
    ) -> Result<Self> {
        if fork.inline_covers(allocation_block_size) {
            return Ok(Self::new(fork.logical_size, fork.inline_extents().to_vec()));
        }

        match resolver {
            Some(resolver) => {
                let extents = resolver.resolve_extents(fork)?;
                Ok(Self::new(fork.logical_size, extents))
            }
            None => {
                error!(
                    "fork of {} bytes has only {} inline blocks and no resolver",
                    fork.logical_size,
                    fork.inline_block_count()
                );
                Err(Error::new(
                    ErrorKind::Corrupted,
                    "fork exceeds inline extents without resolver",
                ))
            }
        }
    }

    /// 逻辑长度
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn extents(&self) -> &[ExtentDescriptor] {
        &self.extents
    }

    /// extent 总块数
    pub fn block_count(&self) -> u64 {
        total_block_count(&self.extents)
    }

    /// 在卷上打开读取器
    pub fn reader<'v, D: BlockDevice>(
        &self,
        volume: &'v Volume<D>,
        geometry: ForkGeometry,
    ) -> ForkReader<'v, D> {
        ForkReader::new(volume.stream(), geometry, self.length, self.extents.clone())
    }
}
