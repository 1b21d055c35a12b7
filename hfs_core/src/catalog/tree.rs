//! Catalog 树操作

use super::record::{CatalogEntry, CatalogKey, CatalogRecord, FileRecord, ThreadRecord};
use crate::{
    block::{BlockDevice, Volume},
    btree::{BTree, BTreeHeader, Node, NodeCodec},
    consts::{
        HFS_DIR_INODE_PREFIX, HFS_FILE_INODE_PREFIX, HFS_PRIVATE_DATA_DIR,
        HFS_PRIVATE_DIR_DATA_DIR,
    },
    error::{Error, ErrorKind, Result},
    fork::{ForkGeometry, ForkLayout},
    hfsplus::HfsPlusCatalogCodec,
    types::{CatalogNodeId, UniStr},
};
use alloc::format;
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, error, warn};

/// Catalog 树
///
/// 以 (父目录 ID, 名称) 为键的 B-tree，提供目录列举、点查询和
/// 基于 thread 记录的路径解析。每个操作在 catalog fork 上打开
/// 自己的会话。
pub struct CatalogTree<'v, D, C = HfsPlusCatalogCodec> {
    volume: &'v Volume<D>,
    geometry: ForkGeometry,
    layout: &'v ForkLayout,
    codec: C,
}

impl<'v, D, C> CatalogTree<'v, D, C>
where
    D: BlockDevice,
    C: NodeCodec<Key = CatalogKey, Record = CatalogRecord> + Clone,
{
    /// 创建 catalog 树
    ///
    /// # 参数
    ///
    /// * `volume` - 共享卷
    /// * `geometry` - 物理偏移换算参数
    /// * `layout` - catalog 文件的完整 fork 布局
    /// * `codec` - catalog 解码器
    pub fn new(
        volume: &'v Volume<D>,
        geometry: ForkGeometry,
        layout: &'v ForkLayout,
        codec: C,
    ) -> Self {
        Self {
            volume,
            geometry,
            layout,
            codec,
        }
    }

    /// 打开一次会话
    fn open(&self) -> Result<BTree<'v, D, C>> {
        BTree::open(
            self.layout.reader(self.volume, self.geometry),
            self.codec.clone(),
        )
    }

    /// 读取 header record
    pub fn header(&self) -> Result<BTreeHeader> {
        Ok(*self.open()?.header())
    }

    /// 读取任意节点
    pub fn node(&self, index: u32) -> Result<Node> {
        self.open()?.node(index)
    }

    /// 按 (父目录 ID, 名称) 查找
    pub fn get_record(&self, parent_id: CatalogNodeId, name: &UniStr) -> Result<Option<CatalogEntry>> {
        let key = CatalogKey::new(parent_id, name.clone());
        self.open()?.get_record(&key)
    }

    /// 根目录记录
    ///
    /// 根目录的键为 (根父节点, 卷名)，取父 ID 为根父节点的第一条记录。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 找不到记录，或找到的不是目录记录
    pub fn root_folder(&self) -> Result<CatalogEntry> {
        let mut tree = self.open()?;
        Self::root_in(&mut tree)
    }

    fn root_in(tree: &mut BTree<'v, D, C>) -> Result<CatalogEntry> {
        let parent = CatalogNodeId::ROOT_PARENT;
        let min = CatalogKey::thread(parent);
        let max = CatalogKey::thread(parent.next());
        let records = tree.collect_range(&min, &max)?;

        let Some(root) = records.into_iter().next() else {
            error!("no catalog record under parent {}", parent);
            return Err(Error::new(ErrorKind::Corrupted, "root folder record missing"));
        };

        if root.value.as_folder().is_none() {
            error!("root record {:?} is not a folder", root.key.name);
            return Err(Error::new(ErrorKind::Corrupted, "root record is not a folder"));
        }

        Ok(root)
    }

    /// 列出目录的直接子项（键升序）
    ///
    /// 扫描 `[(folder_id, ""), (folder_id + 1, ""))`，去掉目录自身的
    /// thread 记录，只返回文件和目录记录。
    pub fn list_records(&self, folder_id: CatalogNodeId) -> Result<Vec<CatalogEntry>> {
        let min = CatalogKey::thread(folder_id);
        let max = CatalogKey::thread(folder_id.next());

        let mut tree = self.open()?;
        let mut records = tree.collect_range(&min, &max)?;
        records.retain(|rec| rec.key.parent_id == folder_id && !rec.value.is_thread());

        debug!("folder {}: {} entries", folder_id, records.len());
        Ok(records)
    }

    /// 查找对象的 thread 记录
    pub fn thread(&self, id: CatalogNodeId) -> Result<Option<ThreadRecord>> {
        let mut tree = self.open()?;
        Self::thread_in(&mut tree, id)
    }

    fn thread_in(tree: &mut BTree<'v, D, C>, id: CatalogNodeId) -> Result<Option<ThreadRecord>> {
        let Some(entry) = tree.get_record(&CatalogKey::thread(id))? else {
            return Ok(None);
        };

        match entry.value {
            CatalogRecord::FolderThread(t) | CatalogRecord::FileThread(t) => Ok(Some(t)),
            _ => {
                error!("record keyed ({}, \"\") is not a thread", id);
                Err(Error::new(ErrorKind::Corrupted, "expected thread record"))
            }
        }
    }

    /// 按 ID 查找文件或目录记录（经由 thread 记录）
    ///
    /// # 返回
    ///
    /// 没有该 ID 的 thread 记录时返回 None
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - thread 记录指向不存在的记录
    pub fn record_by_id(&self, id: CatalogNodeId) -> Result<Option<CatalogEntry>> {
        let mut tree = self.open()?;
        let Some(thread) = Self::thread_in(&mut tree, id)? else {
            return Ok(None);
        };

        let key = CatalogKey::new(thread.parent_id, thread.name);
        match tree.get_record(&key)? {
            Some(entry) => Ok(Some(entry)),
            None => {
                error!(
                    "thread of {} points to missing ({}, {:?})",
                    id, key.parent_id, key.name
                );
                Err(Error::new(ErrorKind::Corrupted, "thread record points to missing record"))
            }
        }
    }

    /// 从根目录到 `leaf` 的记录链
    ///
    /// 从叶子的父 ID 开始，反复查找 (ID, "") 的目录 thread 记录得到
    /// (祖父 ID, 名称)，直到父 ID 为根父节点。结果第一项是根目录记录，
    /// 最后一项是 `leaf`。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - thread 记录缺失、类型不对，或链条成环
    pub fn path_to(&self, leaf: &CatalogEntry) -> Result<Vec<CatalogEntry>> {
        let mut tree = self.open()?;
        let limit = tree.header().leaf_records as usize + 1;

        let mut path = vec![leaf.clone()];
        let mut parent = leaf.key.parent_id;

        while parent != CatalogNodeId::ROOT_PARENT {
            if path.len() > limit {
                error!("path to {:?} longer than {} levels", leaf.key.name, limit);
                return Err(Error::new(ErrorKind::Corrupted, "catalog parent chain does not terminate"));
            }

            let thread = match tree.get_record(&CatalogKey::thread(parent))? {
                Some(entry) => match entry.value {
                    CatalogRecord::FolderThread(t) => t,
                    CatalogRecord::FileThread(_) => {
                        error!("({}, \"\") is a file thread, expected folder thread", parent);
                        return Err(Error::new(ErrorKind::Corrupted, "parent has a file thread"));
                    }
                    _ => {
                        error!("({}, \"\") is not a thread record", parent);
                        return Err(Error::new(ErrorKind::Corrupted, "expected folder thread record"));
                    }
                },
                None => {
                    error!("folder thread for {} missing", parent);
                    return Err(Error::new(ErrorKind::Corrupted, "folder thread record missing"));
                }
            };

            let key = CatalogKey::new(thread.parent_id, thread.name);
            let Some(ancestor) = tree.get_record(&key)? else {
                error!("ancestor ({}, {:?}) missing", key.parent_id, key.name);
                return Err(Error::new(ErrorKind::Corrupted, "thread record points to missing record"));
            };

            parent = thread.parent_id;
            path.insert(0, ancestor);
        }

        Ok(path)
    }

    /// 按 ID 解析路径，ID 不存在时返回 None
    pub fn path_to_id(&self, id: CatalogNodeId) -> Result<Option<Vec<CatalogEntry>>> {
        match self.record_by_id(id)? {
            Some(leaf) => self.path_to(&leaf).map(Some),
            None => Ok(None),
        }
    }

    /// 按 POSIX 风格路径逐级查找
    ///
    /// `"/"` 或空路径返回根目录记录。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::NotFound` - 某一级不存在
    /// - `ErrorKind::InvalidInput` - 中间某一级不是目录
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let entry = catalog.lookup_path("/Users/shared/notes.txt")?;
    /// ```
    pub fn lookup_path(&self, path: &str) -> Result<CatalogEntry> {
        self.lookup(path, false)
    }

    /// 按路径查找，并沿途解析硬链接
    ///
    /// 目录硬链接可以作为中间一级继续向下查找。最后一级是硬链接时，
    /// 返回的条目保留链接自己的键，记录内容换成 inode 的记录。
    pub fn lookup_path_resolving(&self, path: &str) -> Result<CatalogEntry> {
        self.lookup(path, true)
    }

    fn lookup(&self, path: &str, resolve_links: bool) -> Result<CatalogEntry> {
        let mut tree = self.open()?;
        let mut entry = Self::root_in(&mut tree)?;

        for component in path.split('/').filter(|c| !c.is_empty()) {
            let Some(folder) = entry.value.as_folder() else {
                return Err(Error::new(ErrorKind::InvalidInput, "path component is not a folder"));
            };

            let key = CatalogKey::new(folder.folder_id, UniStr::from_str(component));
            entry = match tree.get_record(&key)? {
                Some(next) if next.value.is_thread() => {
                    error!("named key ({}, {:?}) holds a thread record", key.parent_id, key.name);
                    return Err(Error::new(ErrorKind::Corrupted, "thread record under a named key"));
                }
                Some(next) => next,
                None => return Err(Error::new(ErrorKind::NotFound, "path component not found")),
            };

            if resolve_links {
                entry = Self::resolve_link_in(&mut tree, entry)?;
            }
        }

        Ok(entry)
    }

    /// 解析硬链接
    ///
    /// 文件链接（`hlnk`/`hfs+`）指向根目录下 `"\0\0\0\0HFS+ Private Data"`
    /// 中的 `iNode<N>`，目录链接（`fdrp`/`MACS`）指向
    /// `".HFS+ Private Directory Data\r"` 中的 `dir_<N>`，N 取自链接记录
    /// BSD 信息的 special 字段。
    ///
    /// # 返回
    ///
    /// 保留 `entry` 的键、换成 inode 记录内容的条目；`entry` 不是硬链接，
    /// 或私有目录、inode 不存在时原样返回 `entry`。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - inode 名称下的记录类型与链接类型不符
    pub fn resolve_link(&self, entry: CatalogEntry) -> Result<CatalogEntry> {
        if !entry.value.as_file().is_some_and(FileRecord::is_hard_link) {
            return Ok(entry);
        }
        let mut tree = self.open()?;
        Self::resolve_link_in(&mut tree, entry)
    }

    fn resolve_link_in(tree: &mut BTree<'v, D, C>, entry: CatalogEntry) -> Result<CatalogEntry> {
        let (private_dir, prefix, inode, to_folder) = match entry.value.as_file() {
            Some(file) if file.is_hard_file_link() => {
                (HFS_PRIVATE_DATA_DIR, HFS_FILE_INODE_PREFIX, file.link_inode(), false)
            }
            Some(file) if file.is_hard_dir_link() => {
                (HFS_PRIVATE_DIR_DATA_DIR, HFS_DIR_INODE_PREFIX, file.link_inode(), true)
            }
            _ => return Ok(entry),
        };

        let dir_key = CatalogKey::new(CatalogNodeId::ROOT_FOLDER, UniStr::from_str(private_dir));
        let dir_id = tree
            .get_record(&dir_key)?
            .and_then(|dir| dir.value.as_folder().map(|f| f.folder_id));
        let Some(dir_id) = dir_id else {
            warn!("hard link {:?}: private directory missing", entry.key.name);
            return Ok(entry);
        };

        let inode_name = format!("{}{}", prefix, inode);
        let key = CatalogKey::new(dir_id, UniStr::from_str(&inode_name));
        let Some(target) = tree.get_record(&key)? else {
            warn!("hard link {:?}: {} missing", entry.key.name, inode_name);
            return Ok(entry);
        };

        let matches = if to_folder {
            target.value.as_folder().is_some()
        } else {
            target.value.as_file().is_some()
        };
        if !matches {
            error!("hard link {:?}: {} has the wrong record type", entry.key.name, inode_name);
            return Err(Error::new(ErrorKind::Corrupted, "hard link inode has wrong record type"));
        }

        debug!("hard link {:?} -> {}", entry.key.name, inode_name);
        Ok(CatalogEntry {
            key: entry.key,
            value: target.value,
        })
    }

    /// 沿叶子链读出全部记录
    pub fn all_records(&self) -> Result<Vec<CatalogEntry>> {
        self.open()?.leaf_records()
    }
}
