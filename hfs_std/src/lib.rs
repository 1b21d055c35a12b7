//! 该模块是 HFS+ 只读实现在标准库环境下的入口，把 hfs_core 的
//! 接口适配到 `std::io` 和 `std::fs`。

// 引入日志宏
#[macro_use]
extern crate log;

// 块设备适配模块
mod blockdev;
// 错误转换模块
mod error;
// 镜像级操作模块
mod fs;
// fork 读取流模块
mod stream;

// 对外暴露块设备相关类型
pub use blockdev::{BlockDevice, StreamDevice, HFS_DEV_BLOCK_SIZE};
// 对外暴露错误转换
pub use error::io_error;
// 对外暴露镜像级操作
pub use fs::{extract_fork, open_image, open_image_with, open_stream, walk, HfsImage};
// 对外暴露 fork 读取流
pub use stream::ForkStream;

// 重新导出常用的核心类型
pub use hfs_core::{
    DirEntry, FileMetadata, FileReader, FileType, ForkKind, HfsFileSystem, MountOptions, StatFs,
};
