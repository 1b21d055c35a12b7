//! fork 读取流，实现 `std::io::Read` 和 `std::io::Seek`。

use std::io::{self, Read, Seek, SeekFrom};

use hfs_core::{BlockDevice, FileReader};

use crate::error::io_error;

/// fork 读取流
///
/// 包装 [`FileReader`]，使 fork 可以交给任何接受 `Read + Seek` 的代码
/// （`io::copy`、解析器等）。透明压缩的文件读到的是解压后的内容。
/// 定位到长度之外会返回 `InvalidInput`。
///
/// # 示例
///
/// ```ignore
/// let reader = fs.open_fork("/docs/readme.txt", ForkKind::Data)?;
/// let mut stream = ForkStream::new(reader);
/// let mut text = String::new();
/// stream.read_to_string(&mut text)?;
/// ```
pub struct ForkStream<'v, D> {
    inner: FileReader<'v, D>,
}

impl<'v, D: BlockDevice> ForkStream<'v, D> {
    pub fn new(inner: FileReader<'v, D>) -> Self {
        Self { inner }
    }

    /// 逻辑长度
    pub fn len(&self) -> u64 {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// 获取内部读取器
    pub fn get_ref(&self) -> &FileReader<'v, D> {
        &self.inner
    }

    pub fn into_inner(self) -> FileReader<'v, D> {
        self.inner
    }
}

impl<D: BlockDevice> Read for ForkStream<'_, D> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf).map_err(io_error)
    }
}

impl<D: BlockDevice> Seek for ForkStream<'_, D> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.inner.len().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.inner.position().checked_add_signed(delta),
        };

        let Some(target) = target else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek to a negative or overflowing position",
            ));
        };
        self.inner.seek(target).map_err(io_error)
    }
}
