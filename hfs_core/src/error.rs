//! 错误处理模块

use core::fmt;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// 底层设备读取/定位失败
    Io,
    /// 磁盘上的结构违反了格式保证（节点类型不对、必需的记录缺失等）
    ///
    /// 对当前操作总是致命的，不做修补也不重试。
    Corrupted,
    /// 按路径查找时某一级不存在
    NotFound,
    /// 调用参数无效
    InvalidInput,
    /// 不支持的格式或功能
    Unsupported,
}

impl ErrorKind {
    fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Io => "I/O error",
            ErrorKind::Corrupted => "structural inconsistency",
            ErrorKind::NotFound => "not found",
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::Unsupported => "unsupported",
        }
    }
}

/// HFS 错误类型
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
}

impl Error {
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self { kind, message }
    }

    /// 获取错误类别
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// 获取错误描述
    pub fn message(&self) -> &'static str {
        self.message
    }

    /// 是否为结构不一致错误
    pub fn is_corrupted(&self) -> bool {
        self.kind == ErrorKind::Corrupted
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl core::error::Error for Error {}

#[cfg(feature = "std")]
impl From<std::io::Error> for Error {
    /// 设备层的任何错误都归为 `Io`，不与查找失败混淆
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                Error::new(ErrorKind::Io, "unexpected end of device")
            }
            _ => Error::new(ErrorKind::Io, "device I/O failed"),
        }
    }
}

/// HFS Result 类型
pub type Result<T> = core::result::Result<T, Error>;
