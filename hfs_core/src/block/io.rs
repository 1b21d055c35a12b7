//! 块 I/O 操作实现

use super::{BlockDev, BlockDevice};
use crate::error::{Error, ErrorKind, Result};
use alloc::vec::Vec;
use log::trace;

/// 一次设备读取最多合并的块数
const MAX_RUN_BLOCKS: u32 = 128;

impl<D: BlockDevice> BlockDev<D> {
    /// 读取单个物理块（经过缓存）
    ///
    /// # 参数
    ///
    /// * `lba` - 物理块地址（设备绝对地址，不含卷偏移换算）
    /// * `buf` - 目标缓冲区（大小至少为 block_size）
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数，设备末尾可能不足一个块
    pub fn read_block(&mut self, lba: u64, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.block_size() as usize;

        if buf.len() < block_size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "buffer too small for block",
            ));
        }

        if let Some(cache) = self.cache.as_mut() {
            if let Some(data) = cache.get(lba) {
                buf[..data.len()].copy_from_slice(data);
                return Ok(data.len());
            }
        }

        self.inc_read_count();
        let n = self.device_mut().read_blocks(lba, 1, &mut buf[..block_size])?;

        if let Some(cache) = self.cache.as_mut() {
            cache.insert(lba, buf[..n].to_vec());
        }

        Ok(n)
    }

    /// 读取字节
    ///
    /// 从卷内任意字节偏移读取，自动处理跨块情况。偏移相对卷起始
    /// （即会加上卷起始偏移）。
    ///
    /// # 参数
    ///
    /// * `offset` - 卷内字节偏移量
    /// * `buf` - 目标缓冲区
    ///
    /// # 返回
    ///
    /// 成功返回读取的字节数。到达设备末尾时返回的字节数小于 `buf.len()`，
    /// 偏移已在设备之外时返回 0。
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let mut buf = vec![0u8; 512];
    /// block_dev.read_bytes(1024, &mut buf)?;
    /// ```
    pub fn read_bytes(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let block_size = self.block_size() as u64;
        let absolute = self
            .partition_offset()
            .checked_add(offset)
            .ok_or(Error::new(ErrorKind::InvalidInput, "offset overflow"))?;

        let device_size = self.device_size();
        if absolute >= device_size {
            return Ok(0);
        }

        let len = core::cmp::min(buf.len() as u64, device_size - absolute) as usize;
        trace!("read_bytes: offset={:#x}, len={}", absolute, len);

        let last_lba = (absolute + len as u64 - 1) / block_size;
        let mut scratch = Vec::new();
        let mut done = 0;

        while done < len {
            let pos = absolute + done as u64;
            let lba = pos / block_size;
            let block_offset = (pos % block_size) as usize;

            if let Some(data) = self.cache.as_mut().and_then(|cache| cache.get(lba)) {
                if data.len() <= block_offset {
                    break; // 设备提前结束
                }
                let chunk = core::cmp::min(data.len() - block_offset, len - done);
                buf[done..done + chunk].copy_from_slice(&data[block_offset..block_offset + chunk]);
                done += chunk;
                if data.len() < block_size as usize {
                    break;
                }
                continue;
            }

            // 连续的未缓存块合并为一次设备读取
            let mut run = 1u32;
            while run < MAX_RUN_BLOCKS
                && lba + (run as u64) <= last_lba
                && !self
                    .cache
                    .as_ref()
                    .is_some_and(|cache| cache.contains(lba + run as u64))
            {
                run += 1;
            }

            let run_bytes = run as usize * block_size as usize;
            scratch.resize(run_bytes, 0);
            self.inc_read_count();
            let n = self.device_mut().read_blocks(lba, run, &mut scratch[..run_bytes])?;
            trace!("read_blocks: lba={} count={} got={}", lba, run, n);

            if let Some(cache) = self.cache.as_mut() {
                for (i, block) in scratch[..n].chunks(block_size as usize).enumerate() {
                    cache.insert(lba + i as u64, block.to_vec());
                }
            }

            if n <= block_offset {
                break;
            }
            let chunk = core::cmp::min(n - block_offset, len - done);
            buf[done..done + chunk].copy_from_slice(&scratch[block_offset..block_offset + chunk]);
            done += chunk;

            if n < run_bytes {
                break;
            }
        }

        Ok(done)
    }
}
