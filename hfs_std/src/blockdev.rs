//! 块设备适配模块，把任意 `Read + Seek` 数据源包装成 HFS 块设备。

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use hfs_core::{Error, ErrorKind, Result, HFS_DEV_BSIZE};

/// 设备的物理块大小（固定为512字节）
pub const HFS_DEV_BLOCK_SIZE: usize = HFS_DEV_BSIZE;

/// 块设备接口，由 hfs_core 定义
///
/// # 示例
///
/// ```ignore
/// struct MyBlockDevice {
///     // ... 底层设备字段
/// }
///
/// impl BlockDevice for MyBlockDevice {
///     fn total_blocks(&self) -> u64 {
///         // 返回总块数
///     }
///
///     fn read_blocks(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
///         // 实现块读取
///     }
/// }
/// ```
pub use hfs_core::BlockDevice;

/// 基于 `Read + Seek` 的块设备
///
/// 镜像文件、内存缓冲区（`io::Cursor`）都可以直接使用。镜像长度不是
/// 512 的整数倍时，最后一个不完整的块仍然可读，只是返回的字节数较少。
pub struct StreamDevice<R> {
    inner: R,
    size: u64,
}

impl<R: Read + Seek> StreamDevice<R> {
    /// 创建新的 StreamDevice 实例
    ///
    /// # 参数
    ///
    /// * `inner` - 数据源
    ///
    /// # 返回
    ///
    /// 成功返回 StreamDevice 实例，数据源长度在此时确定
    pub fn new(mut inner: R) -> io::Result<Self> {
        let size = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        debug!("stream device: {} bytes", size);
        Ok(Self { inner, size })
    }

    /// 数据源长度（字节）
    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// 取回数据源
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl StreamDevice<File> {
    /// 以只读方式打开镜像文件
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        Self::new(File::open(path)?)
    }
}

impl<R: Read + Seek> BlockDevice for StreamDevice<R> {
    fn total_blocks(&self) -> u64 {
        self.size.div_ceil(HFS_DEV_BLOCK_SIZE as u64)
    }

    fn read_blocks(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
        let offset = lba
            .checked_mul(HFS_DEV_BLOCK_SIZE as u64)
            .ok_or(Error::new(ErrorKind::InvalidInput, "block address overflow"))?;
        if offset >= self.size {
            return Ok(0);
        }

        let want = std::cmp::min(count as usize * HFS_DEV_BLOCK_SIZE, buf.len());
        let want = std::cmp::min(want as u64, self.size - offset) as usize;

        self.inner.seek(SeekFrom::Start(offset))?;
        let mut done = 0;
        while done < want {
            match self.inner.read(&mut buf[done..want]) {
                Ok(0) => break,
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(done)
    }
}
