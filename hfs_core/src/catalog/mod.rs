//! Catalog 树
//!
//! 卷上全部文件和目录的元数据，以及用于反向路径解析的 thread 记录。

mod record;
mod tree;

pub use record::{
    BsdInfo, CatalogDates, CatalogEntry, CatalogFlags, CatalogKey, CatalogRecord, FileRecord,
    FolderRecord, ThreadRecord,
};
pub use tree::CatalogTree;
