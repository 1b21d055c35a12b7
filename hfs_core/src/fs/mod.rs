//! 文件系统高级 API
//!
//! 这个模块提供只读的 HFS+ 文件系统操作接口。

mod file;
mod filesystem;
mod metadata;
mod options;

pub use file::FileReader;
pub use filesystem::HfsFileSystem;
pub use metadata::{DirEntry, FileMetadata, FileType, StatFs};
pub use options::MountOptions;
