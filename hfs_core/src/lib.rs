//! hfs-core: Pure Rust read-only HFS+/HFSX implementation
//!
//! This crate provides the B-tree engine, extent resolution and fork
//! streaming needed to browse an HFS+ volume without mounting it.

#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

// 公共模块
pub mod attributes;
pub mod block;
pub mod btree;
pub mod catalog;
pub mod consts;
pub mod decmpfs;
pub mod error;
pub mod extents;
pub mod fork;
pub mod fs;
pub mod hfsplus;
pub mod types;

// 重新导出常用类型
pub use consts::*;
pub use error::{Error, ErrorKind, Result};
pub use types::*;

// 重新导出核心API
pub use attributes::{AttributeKey, AttributeRecord, AttributesTree};
pub use block::{BlockDev, BlockDevice, Volume};
pub use btree::{BTree, BTreeHeader, NodeCodec, NodeKind};
pub use catalog::{CatalogEntry, CatalogKey, CatalogRecord, CatalogTree, FileRecord, FolderRecord};
pub use extents::{ExtentKey, ExtentsOverflowTree};
pub use fork::{ExtentResolver, ForkGeometry, ForkLayout, ForkReader};
pub use decmpfs::DecmpfsHeader;
pub use fs::{DirEntry, FileMetadata, FileReader, FileType, HfsFileSystem, MountOptions, StatFs};
pub use hfsplus::{VolumeHeader, VolumeKind};
