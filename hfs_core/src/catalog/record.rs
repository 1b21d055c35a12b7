//! Catalog 键与记录

use crate::btree::LeafRecord;
use crate::consts::{
    HFS_DIR_LINK_CREATOR, HFS_DIR_LINK_FILE_TYPE, HFS_HARD_LINK_CREATOR, HFS_HARD_LINK_FILE_TYPE,
};
use crate::types::{hfs_time_to_unix, CatalogNodeId, ForkData, ForkKind, UniStr};
use bitflags::bitflags;

/// Catalog 键：(父目录 ID, 名称)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CatalogKey {
    pub parent_id: CatalogNodeId,
    pub name: UniStr,
}

impl CatalogKey {
    pub fn new(parent_id: CatalogNodeId, name: UniStr) -> Self {
        Self { parent_id, name }
    }

    /// thread 记录的键：(自身 ID, 空名称)
    pub fn thread(id: CatalogNodeId) -> Self {
        Self::new(id, UniStr::empty())
    }
}

bitflags! {
    /// 文件/目录记录标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CatalogFlags: u16 {
        const FILE_LOCKED = 0x0001;
        const THREAD_EXISTS = 0x0002;
        const HAS_ATTRIBUTES = 0x0004;
        const HAS_SECURITY = 0x0008;
        const HAS_FOLDER_COUNT = 0x0010;
        const HAS_LINK_CHAIN = 0x0020;
        const HAS_CHILD_LINK = 0x0040;
        const HAS_DATE_ADDED = 0x0080;
    }
}

/// 五个时间戳（自 1904-01-01 起的秒数）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CatalogDates {
    pub create: u32,
    pub content_mod: u32,
    pub attribute_mod: u32,
    pub access: u32,
    pub backup: u32,
}

impl CatalogDates {
    /// 修改时间（Unix 秒）
    pub fn modified_unix(&self) -> Option<u32> {
        hfs_time_to_unix(self.content_mod)
    }

    /// 创建时间（Unix 秒）
    pub fn created_unix(&self) -> Option<u32> {
        hfs_time_to_unix(self.create)
    }
}

/// BSD 权限信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BsdInfo {
    pub owner_id: u32,
    pub group_id: u32,
    pub admin_flags: u8,
    pub owner_flags: u8,
    pub file_mode: u16,
    /// inode 编号、链接计数或设备号，取决于文件类型
    pub special: u32,
}

impl BsdInfo {
    /// 权限位（不含文件类型）
    pub fn permissions(&self) -> u16 {
        self.file_mode & 0o7777
    }
}

/// 目录记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    pub flags: CatalogFlags,
    /// 直接子项数量
    pub valence: u32,
    pub folder_id: CatalogNodeId,
    pub dates: CatalogDates,
    pub bsd: BsdInfo,
    pub user_info: [u8; 16],
    pub finder_info: [u8; 16],
    pub text_encoding: u32,
}

/// 文件记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub flags: CatalogFlags,
    pub file_id: CatalogNodeId,
    pub dates: CatalogDates,
    pub bsd: BsdInfo,
    pub user_info: [u8; 16],
    pub finder_info: [u8; 16],
    pub text_encoding: u32,
    pub data_fork: ForkData,
    pub resource_fork: ForkData,
}

impl FileRecord {
    pub fn fork(&self, kind: ForkKind) -> &ForkData {
        match kind {
            ForkKind::Data => &self.data_fork,
            ForkKind::Resource => &self.resource_fork,
        }
    }

    /// Finder 文件类型（四字符代码）
    pub fn file_type(&self) -> [u8; 4] {
        [
            self.user_info[0],
            self.user_info[1],
            self.user_info[2],
            self.user_info[3],
        ]
    }

    /// Finder 创建者（四字符代码）
    pub fn creator(&self) -> [u8; 4] {
        [
            self.user_info[4],
            self.user_info[5],
            self.user_info[6],
            self.user_info[7],
        ]
    }

    /// 是否为文件硬链接（`hlnk`/`hfs+`）
    pub fn is_hard_file_link(&self) -> bool {
        self.file_type() == HFS_HARD_LINK_FILE_TYPE && self.creator() == HFS_HARD_LINK_CREATOR
    }

    /// 是否为目录硬链接（`fdrp`/`MACS`）
    pub fn is_hard_dir_link(&self) -> bool {
        self.file_type() == HFS_DIR_LINK_FILE_TYPE && self.creator() == HFS_DIR_LINK_CREATOR
    }

    pub fn is_hard_link(&self) -> bool {
        self.is_hard_file_link() || self.is_hard_dir_link()
    }

    /// 硬链接指向的 inode 编号
    pub fn link_inode(&self) -> u32 {
        self.bsd.special
    }
}

/// thread 记录：对象 ID → (父目录 ID, 名称)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadRecord {
    pub parent_id: CatalogNodeId,
    pub name: UniStr,
}

/// Catalog 叶子记录数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogRecord {
    Folder(FolderRecord),
    File(FileRecord),
    FolderThread(ThreadRecord),
    FileThread(ThreadRecord),
}

impl CatalogRecord {
    /// 目录或文件的 ID，thread 记录返回 None
    pub fn id(&self) -> Option<CatalogNodeId> {
        match self {
            CatalogRecord::Folder(f) => Some(f.folder_id),
            CatalogRecord::File(f) => Some(f.file_id),
            _ => None,
        }
    }

    pub fn as_folder(&self) -> Option<&FolderRecord> {
        match self {
            CatalogRecord::Folder(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileRecord> {
        match self {
            CatalogRecord::File(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_thread(&self) -> Option<&ThreadRecord> {
        match self {
            CatalogRecord::FolderThread(t) | CatalogRecord::FileThread(t) => Some(t),
            _ => None,
        }
    }

    pub fn is_thread(&self) -> bool {
        self.as_thread().is_some()
    }
}

/// catalog 叶子记录（键 + 数据）
pub type CatalogEntry = LeafRecord<CatalogKey, CatalogRecord>;
