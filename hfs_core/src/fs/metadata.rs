//! 文件元数据

use crate::catalog::{BsdInfo, CatalogDates, CatalogEntry, CatalogFlags, CatalogRecord};
use crate::types::{CatalogNodeId, ForkKind};
use alloc::string::String;

/// 目录项类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Folder,
    File,
}

/// 目录项
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub cnid: CatalogNodeId,
    pub file_type: FileType,
}

impl DirEntry {
    /// 从 catalog 记录构造，thread 记录返回 None
    pub fn from_entry(entry: &CatalogEntry) -> Option<Self> {
        let (cnid, file_type) = match &entry.value {
            CatalogRecord::Folder(f) => (f.folder_id, FileType::Folder),
            CatalogRecord::File(f) => (f.file_id, FileType::File),
            _ => return None,
        };
        Some(Self {
            name: entry.key.name.to_string_lossy(),
            cnid,
            file_type,
        })
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Folder
    }
}

/// 文件或目录的元数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    pub cnid: CatalogNodeId,
    pub parent: CatalogNodeId,
    pub file_type: FileType,
    /// 内容长度：数据 fork 长度，透明压缩的文件为解压后长度（目录为 0）
    pub size: u64,
    /// 内容经过 decmpfs 压缩
    pub compressed: bool,
    /// 资源 fork 长度（目录为 0）
    pub resource_size: u64,
    /// 直接子项数量（文件为 0）
    pub valence: u32,
    pub flags: CatalogFlags,
    pub dates: CatalogDates,
    pub bsd: BsdInfo,
}

impl FileMetadata {
    /// 从 catalog 记录构造，thread 记录返回 None
    pub fn from_entry(entry: &CatalogEntry) -> Option<Self> {
        let parent = entry.key.parent_id;
        match &entry.value {
            CatalogRecord::Folder(f) => Some(Self {
                cnid: f.folder_id,
                parent,
                file_type: FileType::Folder,
                size: 0,
                compressed: false,
                resource_size: 0,
                valence: f.valence,
                flags: f.flags,
                dates: f.dates,
                bsd: f.bsd,
            }),
            CatalogRecord::File(f) => Some(Self {
                cnid: f.file_id,
                parent,
                file_type: FileType::File,
                size: f.fork(ForkKind::Data).logical_size,
                compressed: false,
                resource_size: f.fork(ForkKind::Resource).logical_size,
                valence: 0,
                flags: f.flags,
                dates: f.dates,
                bsd: f.bsd,
            }),
            _ => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Folder
    }

    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// 权限位
    pub fn permissions(&self) -> u16 {
        self.bsd.permissions()
    }

    /// 链接计数
    ///
    /// 普通文件的 inode 记录在 special 字段保存链接数，其余情况为 1。
    pub fn link_count(&self) -> u32 {
        let regular = self.bsd.file_mode & 0o170000 == 0o100000;
        if self.is_file() && regular && self.bsd.special > 0 {
            self.bsd.special
        } else {
            1
        }
    }
}

/// 卷统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub file_count: u32,
    pub folder_count: u32,
    pub blocks_count: u64,
    pub free_blocks_count: u64,
    pub block_size: u32,
}
