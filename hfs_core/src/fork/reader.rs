//! fork 读取器

use super::ForkGeometry;
use crate::{
    block::{BlockDevice, VolumeStream},
    error::{Error, ErrorKind, Result},
    types::ExtentDescriptor,
};
use alloc::vec::Vec;
use log::{trace, warn};

/// fork 读取器
///
/// 把分散在卷上的 extent 列表呈现为一个连续、可定位的字节流。
/// 定位是惰性的，下一次读取前不做任何 I/O；顺序读取时不会重复定位
/// 底层流。丢弃读取器不会影响共享的卷。
pub struct ForkReader<'v, D> {
    stream: VolumeStream<'v, D>,
    geometry: ForkGeometry,
    length: u64,
    extents: Vec<ExtentDescriptor>,
    /// 当前逻辑位置
    position: u64,
    /// 上次读取结束时的逻辑位置
    last_logical: Option<u64>,
    /// 上次读取结束时的物理位置
    last_physical: u64,
}

impl<'v, D: BlockDevice> ForkReader<'v, D> {
    /// 创建读取器
    ///
    /// # 参数
    ///
    /// * `stream` - 卷读取句柄
    /// * `geometry` - 物理偏移换算参数
    /// * `length` - fork 逻辑长度
    /// * `extents` - 完整的有序 extent 列表
    pub fn new(
        stream: VolumeStream<'v, D>,
        geometry: ForkGeometry,
        length: u64,
        extents: Vec<ExtentDescriptor>,
    ) -> Self {
        Self {
            stream,
            geometry,
            length,
            extents,
            position: 0,
            last_logical: None,
            last_physical: 0,
        }
    }

    /// 从当前位置读取
    ///
    /// # 返回
    ///
    /// 实际读取的字节数。返回 0 表示已到 fork 末尾；底层设备提前结束时
    /// 返回已读到的部分。
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let mut fork = fs.open_fork("/docs/readme.txt", ForkKind::Data)?;
    /// let mut buf = vec![0u8; 4096];
    /// let n = fork.read(&mut buf)?;
    /// ```
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || self.position >= self.length {
            return Ok(0);
        }

        let block_size = self.geometry.allocation_block_size as u64;

        // 跳过位于当前位置之前的整个 extent
        let mut index = 0;
        let mut skip = self.position;
        loop {
            let Some(extent) = self.extents.get(index) else {
                warn!(
                    "fork position {} beyond mapped span ({} extents)",
                    self.position,
                    self.extents.len()
                );
                return Ok(0);
            };
            let span = extent.byte_len(self.geometry.allocation_block_size);
            if skip < span {
                break;
            }
            skip -= span;
            index += 1;
        }

        let total = core::cmp::min(buf.len() as u64, self.length - self.position) as usize;
        let mut done = 0;

        while done < total {
            let Some(extent) = self.extents.get(index).copied() else {
                break;
            };

            let available = extent.block_count as u64 * block_size - skip;
            let want = core::cmp::min(available, (total - done) as u64) as usize;
            let physical = self.geometry.physical_offset(extent.start_block, skip)?;

            if self.last_logical != Some(self.position + done as u64)
                || self.stream.position() != physical
            {
                self.stream.seek(physical);
            }

            let n = self.stream.read(&mut buf[done..done + want])?;
            trace!(
                "fork read: extent {} start={} skip={} want={} got={}",
                index,
                extent.start_block,
                skip,
                want,
                n
            );

            done += n;
            self.last_logical = Some(self.position + done as u64);
            self.last_physical = self.stream.position();

            if n < want {
                // 底层设备提前结束
                break;
            }

            index += 1;
            skip = 0;
        }

        self.position += done as u64;
        Ok(done)
    }

    /// 尽量读满缓冲区，返回读到的字节数
    pub fn read_full(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    /// 读满缓冲区
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Io` - fork 或设备在读满之前结束
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.read_full(buf)? < buf.len() {
            return Err(Error::new(ErrorKind::Io, "unexpected end of fork"));
        }
        Ok(())
    }

    /// 从当前位置读到 fork 末尾
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        let remaining = self.length.saturating_sub(self.position);
        if remaining > usize::MAX as u64 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "fork too large to read into memory",
            ));
        }

        let mut buf = alloc::vec![0u8; remaining as usize];
        let n = self.read_full(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// 定位到逻辑位置（不做 I/O）
    ///
    /// # 错误
    ///
    /// 位置超出 fork 长度时返回 `ErrorKind::InvalidInput`
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        if pos > self.length {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "seek position beyond fork length",
            ));
        }
        self.position = pos;
        Ok(pos)
    }

    /// 当前逻辑位置
    pub fn position(&self) -> u64 {
        self.position
    }

    /// fork 逻辑长度
    pub fn len(&self) -> u64 {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// 底层流实际定位的次数
    pub fn seek_count(&self) -> u64 {
        self.stream.seek_count()
    }

    pub fn extents(&self) -> &[ExtentDescriptor] {
        &self.extents
    }

    pub fn geometry(&self) -> ForkGeometry {
        self.geometry
    }

    /// 上次读取结束时的物理位置
    pub fn last_physical(&self) -> u64 {
        self.last_physical
    }
}
