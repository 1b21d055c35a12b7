//! 错误处理模块，把 hfs_core 的错误转换为 `std::io::Error`。

use std::io;

use hfs_core::{Error, ErrorKind};

/// 把 hfs_core 错误转换为 io 错误
pub fn io_error(err: Error) -> io::Error {
    let kind = match err.kind() {
        ErrorKind::Io => io::ErrorKind::Other,
        ErrorKind::Corrupted => io::ErrorKind::InvalidData,
        ErrorKind::NotFound => io::ErrorKind::NotFound,
        ErrorKind::InvalidInput => io::ErrorKind::InvalidInput,
        ErrorKind::Unsupported => io::ErrorKind::Unsupported,
    };
    io::Error::new(kind, err)
}

/// 为结果类型添加上下文的 trait
pub(crate) trait Context<T> {
    /// 转换为 io 结果，并在错误信息前加上上下文
    fn context(self, context: &str) -> io::Result<T>;
}

impl<T> Context<T> for hfs_core::Result<T> {
    fn context(self, context: &str) -> io::Result<T> {
        self.map_err(|e| {
            let io = io_error(e);
            io::Error::new(io.kind(), format!("{context}: {io}"))
        })
    }
}
