//! fork 物化
//!
//! 把 fork 的 extent 列表映射为连续字节流。系统树（catalog、extents、
//! attributes）本身也存放在 fork 中，通过同一个读取器访问。

mod layout;
mod reader;

pub use layout::{ExtentResolver, ForkGeometry, ForkLayout};
pub use reader::ForkReader;
