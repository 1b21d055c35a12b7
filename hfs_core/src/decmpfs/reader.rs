//! 按块解压的读取器

use super::{decompress_block, locate_blocks, CompressedBlock, DecmpfsHeader};
use crate::{
    block::BlockDevice,
    error::{Error, ErrorKind, Result},
    fork::ForkReader,
};
use alloc::vec;
use alloc::vec::Vec;
use log::{trace, warn};

/// 资源 fork 压缩数据（类型 4）的读取器
///
/// 块只在读到时才解压，最近解压的一块保留在内存里。每块解压后的长度
/// 事先未知，`bounds` 记录已经解压过的块在解压数据中的起止位置，
/// 定位到尚未解压的区域时按顺序补齐。
pub struct CompressedReader<'v, D> {
    fork: ForkReader<'v, D>,
    blocks: Vec<CompressedBlock>,
    size: u64,
    position: u64,
    /// `bounds[i]`..`bounds[i + 1]` 是第 i 块的解压数据范围
    bounds: Vec<u64>,
    current: Option<(usize, Vec<u8>)>,
}

impl<'v, D: BlockDevice> CompressedReader<'v, D> {
    /// 在资源 fork 上打开
    ///
    /// # 参数
    ///
    /// * `fork` - 文件的资源 fork
    /// * `header` - decmpfs 头部，提供解压后大小
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 资源 fork 中没有可用的 `cmpf` 资源
    pub fn open(mut fork: ForkReader<'v, D>, header: &DecmpfsHeader) -> Result<Self> {
        header.size_limit()?;
        let blocks = locate_blocks(&mut fork)?;
        Ok(Self {
            fork,
            blocks,
            size: header.uncompressed_size,
            position: 0,
            bounds: vec![0],
            current: None,
        })
    }

    /// 解压后的长度
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// 压缩块数量
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// 定位到解压数据中的位置（不做 I/O）
    ///
    /// # 错误
    ///
    /// 位置超出解压后长度时返回 `ErrorKind::InvalidInput`
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        if pos > self.size {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "seek position beyond file length",
            ));
        }
        self.position = pos;
        Ok(pos)
    }

    /// 从当前位置读取，返回 0 表示已到末尾
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut done = 0;

        while done < buf.len() && self.position < self.size {
            let Some(index) = self.block_for(self.position)? else {
                warn!(
                    "compressed data ends at {} of {} bytes",
                    self.position, self.size
                );
                break;
            };
            self.load(index)?;

            let Some((_, data)) = &self.current else {
                break;
            };
            let within = (self.position - self.bounds[index]) as usize;
            let available = core::cmp::min(
                (data.len() - within) as u64,
                self.size - self.position,
            ) as usize;
            let n = core::cmp::min(available, buf.len() - done);
            buf[done..done + n].copy_from_slice(&data[within..within + n]);

            done += n;
            self.position += n as u64;
        }

        Ok(done)
    }

    /// 包含 `pos` 的块，必要时依次解压前面尚未解压的块
    fn block_for(&mut self, pos: u64) -> Result<Option<usize>> {
        loop {
            let known = self.bounds.len() - 1;
            if pos < self.bounds[known] {
                let index = self.bounds.partition_point(|&start| start <= pos) - 1;
                return Ok(Some(index));
            }
            if known == self.blocks.len() {
                return Ok(None);
            }

            self.load(known)?;
            let len = self.current.as_ref().map_or(0, |(_, data)| data.len() as u64);
            self.bounds.push(self.bounds[known] + len);
        }
    }

    fn load(&mut self, index: usize) -> Result<()> {
        if matches!(&self.current, Some((i, _)) if *i == index) {
            return Ok(());
        }

        let block = self.blocks[index];
        let mut raw = vec![0u8; block.length as usize];
        self.fork.seek(block.offset)?;
        self.fork.read_exact(&mut raw)?;

        let limit = self.size.saturating_sub(self.bounds[index]) as usize;
        let data = decompress_block(&raw, limit)?;
        trace!(
            "cmpf block {}: {} -> {} bytes",
            index,
            block.length,
            data.len()
        );

        self.current = Some((index, data));
        Ok(())
    }
}
