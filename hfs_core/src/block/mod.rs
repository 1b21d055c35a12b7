//! 块设备抽象
//!
//! 提供块设备接口、字节级 I/O、块缓存以及多个 fork 共享的卷。

mod cache;
mod device;
mod io;
mod volume;

pub use cache::BlockCache;
pub use device::{BlockDev, BlockDevice};
pub use volume::{Volume, VolumeStream};
