//! 共享卷
//!
//! 一个卷被许多 fork 同时引用（catalog、extents、attributes 以及用户文件），
//! 它们各自持有短生命周期的 [`VolumeStream`] 句柄。每个句柄有自己的物理
//! 游标，真正的"定位 + 读取"在卷锁内原子完成，因此不同句柄之间的
//! seek 与 read 不会交错。

use super::{BlockDev, BlockDevice};
use crate::error::Result;
use spin::Mutex;

/// 共享卷
pub struct Volume<D> {
    bdev: Mutex<BlockDev<D>>,
}

impl<D: BlockDevice> Volume<D> {
    /// 从块设备包装器创建共享卷
    pub fn new(bdev: BlockDev<D>) -> Self {
        Self {
            bdev: Mutex::new(bdev),
        }
    }

    /// 在卷内偏移处读取（定位与读取在锁内一次完成）
    pub fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut bdev = self.bdev.lock();
        bdev.read_bytes(offset, buf)
    }

    /// 对块设备包装器执行操作（持锁）
    pub fn with_device<R>(&self, f: impl FnOnce(&mut BlockDev<D>) -> R) -> R {
        let mut bdev = self.bdev.lock();
        f(&mut bdev)
    }

    /// 物理读取次数
    pub fn read_count(&self) -> u64 {
        self.bdev.lock().read_count()
    }

    /// 打开一个读取句柄
    pub fn stream(&self) -> VolumeStream<'_, D> {
        VolumeStream {
            volume: self,
            position: 0,
            seek_count: 0,
        }
    }

    /// 取回块设备包装器
    pub fn into_inner(self) -> BlockDev<D> {
        self.bdev.into_inner()
    }
}

/// 卷读取句柄
///
/// 只持有卷的共享引用，不拥有卷；丢弃句柄不会影响卷本身。
pub struct VolumeStream<'v, D> {
    volume: &'v Volume<D>,
    position: u64,
    seek_count: u64,
}

impl<'v, D: BlockDevice> VolumeStream<'v, D> {
    /// 定位到卷内偏移
    pub fn seek(&mut self, pos: u64) {
        self.position = pos;
        self.seek_count += 1;
    }

    /// 当前物理位置
    pub fn position(&self) -> u64 {
        self.position
    }

    /// 定位次数
    pub fn seek_count(&self) -> u64 {
        self.seek_count
    }

    /// 从当前位置读取并前移
    ///
    /// 返回 0 表示已到达设备末尾。
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self.volume.read_at(self.position, buf)?;
        self.position += n as u64;
        Ok(n)
    }

    /// 所属的卷
    pub fn volume(&self) -> &'v Volume<D> {
        self.volume
    }
}
