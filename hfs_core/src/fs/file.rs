//! 文件内容读取器

use crate::{
    block::BlockDevice,
    decmpfs::CompressedReader,
    error::{Error, ErrorKind, Result},
    fork::ForkReader,
};
use alloc::vec::Vec;

/// 文件内容读取器
///
/// 普通文件直接读 fork；透明压缩的文件返回解压后的内容，调用方看到
/// 的都是一个按逻辑位置读取、可定位的字节流。
pub enum FileReader<'v, D> {
    /// 未压缩的 fork
    Fork(ForkReader<'v, D>),
    /// 内联压缩数据，打开时已全部解压
    Inline { data: Vec<u8>, position: u64 },
    /// 资源 fork 中按块压缩的数据
    Compressed(CompressedReader<'v, D>),
}

impl<'v, D: BlockDevice> FileReader<'v, D> {
    /// 从当前位置读取
    ///
    /// # 返回
    ///
    /// 实际读取的字节数，返回 0 表示已到末尾
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        match self {
            FileReader::Fork(reader) => reader.read(buf),
            FileReader::Inline { data, position } => {
                let start = core::cmp::min(*position, data.len() as u64) as usize;
                let n = core::cmp::min(buf.len(), data.len() - start);
                buf[..n].copy_from_slice(&data[start..start + n]);
                *position += n as u64;
                Ok(n)
            }
            FileReader::Compressed(reader) => reader.read(buf),
        }
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
    /// - `ErrorKind::Io` - 内容在读满之前结束
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        if self.read_full(buf)? < buf.len() {
            return Err(Error::new(ErrorKind::Io, "unexpected end of file"));
        }
        Ok(())
    }

    /// 从当前位置读到末尾
    pub fn read_to_end(&mut self) -> Result<Vec<u8>> {
        if let FileReader::Fork(reader) = self {
            return reader.read_to_end();
        }

        let remaining = self.len().saturating_sub(self.position());
        if remaining > usize::MAX as u64 {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                "file too large to read into memory",
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
    /// 位置超出长度时返回 `ErrorKind::InvalidInput`
    pub fn seek(&mut self, pos: u64) -> Result<u64> {
        match self {
            FileReader::Fork(reader) => reader.seek(pos),
            FileReader::Inline { data, position } => {
                if pos > data.len() as u64 {
                    return Err(Error::new(
                        ErrorKind::InvalidInput,
                        "seek position beyond file length",
                    ));
                }
                *position = pos;
                Ok(pos)
            }
            FileReader::Compressed(reader) => reader.seek(pos),
        }
    }

    pub fn position(&self) -> u64 {
        match self {
            FileReader::Fork(reader) => reader.position(),
            FileReader::Inline { position, .. } => *position,
            FileReader::Compressed(reader) => reader.position(),
        }
    }

    /// 逻辑长度（压缩文件为解压后的长度）
    pub fn len(&self) -> u64 {
        match self {
            FileReader::Fork(reader) => reader.len(),
            FileReader::Inline { data, .. } => data.len() as u64,
            FileReader::Compressed(reader) => reader.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 内容是否经过解压
    pub fn is_compressed(&self) -> bool {
        !matches!(self, FileReader::Fork(_))
    }

    /// 未压缩时取得底层 fork 读取器
    pub fn as_fork(&self) -> Option<&ForkReader<'v, D>> {
        match self {
            FileReader::Fork(reader) => Some(reader),
            _ => None,
        }
    }
}
