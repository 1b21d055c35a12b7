//! HFS+ 文件系统核心结构

use super::{
    file::FileReader,
    metadata::{DirEntry, FileMetadata, StatFs},
    options::MountOptions,
};
use crate::{
    attributes::AttributesTree,
    block::{BlockDev, BlockDevice, Volume},
    catalog::{CatalogEntry, CatalogTree, FileRecord},
    consts::DECMPFS_XATTR_NAME,
    decmpfs::{self, CompressedReader, CompressionStorage, DecmpfsHeader},
    error::{Error, ErrorKind, Result},
    extents::ExtentsOverflowTree,
    fork::{ForkGeometry, ForkLayout, ForkReader},
    hfsplus::{HfsPlusAttributesCodec, HfsPlusCatalogCodec, HfsPlusExtentsCodec, VolumeHeader},
    types::{CatalogNodeId, ForkKind, UniStr},
};
use alloc::string::String;
use alloc::vec::Vec;
use log::{debug, error, warn};

/// HFS+ 文件系统（只读）
///
/// 持有共享卷和三棵特殊文件的 fork 布局；catalog、extents 和 attributes
/// 树都借用这些布局，每次操作各自打开读取会话。
///
/// # 示例
///
/// ```rust,ignore
/// use hfs_core::{BlockDev, HfsFileSystem, MountOptions};
///
/// let bdev = BlockDev::new(MyBlockDevice::new());
/// let fs = HfsFileSystem::mount(bdev, MountOptions::default())?;
///
/// // 读取目录
/// for entry in fs.read_dir("/Users")? {
///     println!("{}", entry.name);
/// }
///
/// // 读取文件内容
/// let data = fs.read_file("/Users/shared/notes.txt")?;
/// ```
pub struct HfsFileSystem<D: BlockDevice> {
    volume: Volume<D>,
    header: VolumeHeader,
    geometry: ForkGeometry,
    extents_fork: ForkLayout,
    catalog_fork: ForkLayout,
    attributes_fork: Option<ForkLayout>,
    options: MountOptions,
}

impl<D: BlockDevice> HfsFileSystem<D> {
    /// 挂载文件系统
    ///
    /// 读取卷头，只用内联 extent 打开 extents overflow 树，再借助它
    /// 解析 catalog 和 attributes 文件的完整 extent 列表。
    ///
    /// # 参数
    ///
    /// * `bdev` - 块设备包装器
    /// * `options` - 挂载参数
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Unsupported` - 经典 HFS 卷
    /// - `ErrorKind::Corrupted` - 卷头或特殊文件的 extent 无效
    /// - `ErrorKind::Io` - 设备读取失败
    pub fn mount(mut bdev: BlockDev<D>, options: MountOptions) -> Result<Self> {
        bdev.set_partition_offset(options.base_offset);
        bdev.set_cache(options.cache_blocks, options.cache_max_age);

        let header = VolumeHeader::load(&mut bdev)?;
        let block_size = header.block_size;
        let geometry = ForkGeometry {
            allocation_block_size: block_size,
            first_block_offset: 0,
            debug_offset: options.debug_offset,
        };

        let extents_fork = ForkLayout::inline(&header.extents_file, block_size)?;
        let volume = Volume::new(bdev);

        let (catalog_fork, attributes_fork) = {
            let tree =
                ExtentsOverflowTree::new(&volume, geometry, &extents_fork, HfsPlusExtentsCodec);

            let resolver = tree.resolver(CatalogNodeId::CATALOG_FILE, ForkKind::Data);
            let catalog = ForkLayout::resolve(&header.catalog_file, block_size, Some(&resolver))?;

            let attributes = if header.has_attributes_file() {
                let resolver = tree.resolver(CatalogNodeId::ATTRIBUTES_FILE, ForkKind::Data);
                Some(ForkLayout::resolve(
                    &header.attributes_file,
                    block_size,
                    Some(&resolver),
                )?)
            } else {
                None
            };

            (catalog, attributes)
        };

        debug!(
            "mounted: catalog {} bytes in {} extents, attributes {}",
            catalog_fork.length(),
            catalog_fork.extents().len(),
            attributes_fork.as_ref().map_or(0, |f| f.length())
        );

        let fs = Self {
            volume,
            header,
            geometry,
            extents_fork,
            catalog_fork,
            attributes_fork,
            options,
        };

        // catalog 的 header 节点必须可读
        let catalog = fs.catalog().header()?;
        debug!(
            "catalog tree: depth={}, {} leaf records, compare={:?}",
            catalog.tree_depth,
            catalog.leaf_records,
            catalog.compare_mode()
        );

        Ok(fs)
    }

    /// 获取卷头
    pub fn volume_header(&self) -> &VolumeHeader {
        &self.header
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub fn geometry(&self) -> ForkGeometry {
        self.geometry
    }

    /// 获取共享卷
    pub fn volume(&self) -> &Volume<D> {
        &self.volume
    }

    /// 物理读取次数
    pub fn read_count(&self) -> u64 {
        self.volume.read_count()
    }

    /// 重新配置块缓存（旧缓存内容被丢弃）
    pub fn set_cache(&mut self, capacity: usize, max_age: u64) {
        self.options.cache_blocks = capacity;
        self.options.cache_max_age = max_age;
        self.volume
            .with_device(|bdev| bdev.set_cache(capacity, max_age));
    }

    /// 卸载，取回块设备包装器
    pub fn unmount(self) -> BlockDev<D> {
        self.volume.into_inner()
    }

    /// catalog 树
    pub fn catalog(&self) -> CatalogTree<'_, D> {
        CatalogTree::new(
            &self.volume,
            self.geometry,
            &self.catalog_fork,
            HfsPlusCatalogCodec,
        )
    }

    /// extents overflow 树
    pub fn extents(&self) -> ExtentsOverflowTree<'_, D> {
        ExtentsOverflowTree::new(
            &self.volume,
            self.geometry,
            &self.extents_fork,
            HfsPlusExtentsCodec,
        )
    }

    /// attributes 树，卷上没有 attributes 文件时返回 None
    pub fn attributes(&self) -> Option<AttributesTree<'_, D>> {
        self.attributes_fork.as_ref().map(|layout| {
            AttributesTree::new(&self.volume, self.geometry, layout, HfsPlusAttributesCodec)
        })
    }

    /// 根目录记录
    pub fn root(&self) -> Result<CatalogEntry> {
        self.catalog().root_folder()
    }

    /// 按路径查找 catalog 记录
    ///
    /// 挂载参数开启硬链接解析时，沿途的硬链接换成 inode 的记录。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::NotFound` - 路径不存在
    /// - `ErrorKind::InvalidInput` - 中间某一级不是目录
    /// - `ErrorKind::Corrupted` - 硬链接的 inode 记录类型不对
    pub fn lookup(&self, path: &str) -> Result<CatalogEntry> {
        if self.options.resolve_hard_links {
            self.catalog().lookup_path_resolving(path)
        } else {
            self.catalog().lookup_path(path)
        }
    }

    /// 路径是否存在
    ///
    /// # 错误
    ///
    /// 只有 `ErrorKind::NotFound` 被视为不存在；结构损坏和 I/O 错误照常返回。
    pub fn exists(&self, path: &str) -> Result<bool> {
        match self.lookup(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// 读取目录内容
    ///
    /// # 参数
    ///
    /// * `path` - 目录路径
    ///
    /// # 返回
    ///
    /// 按名称键序排列的目录项
    ///
    /// # 错误
    ///
    /// - `ErrorKind::InvalidInput` - 路径指向文件
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let entries = fs.read_dir("/System/Library")?;
    /// for entry in entries {
    ///     println!("{} {}", entry.cnid, entry.name);
    /// }
    /// ```
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>> {
        let entry = self.lookup(path)?;
        let Some(folder) = entry.value.as_folder() else {
            return Err(Error::new(ErrorKind::InvalidInput, "not a directory"));
        };
        self.read_dir_id(folder.folder_id)
    }

    /// 按目录 ID 读取目录内容
    pub fn read_dir_id(&self, folder_id: CatalogNodeId) -> Result<Vec<DirEntry>> {
        let catalog = self.catalog();
        let mut entries = Vec::new();
        for record in catalog.list_records(folder_id)? {
            let record = if self.options.resolve_hard_links {
                catalog.resolve_link(record)?
            } else {
                record
            };
            entries.extend(DirEntry::from_entry(&record));
        }
        Ok(entries)
    }

    /// 获取文件或目录的元数据
    ///
    /// 透明压缩的文件报告解压后的长度。
    pub fn metadata(&self, path: &str) -> Result<FileMetadata> {
        let entry = self.lookup(path)?;
        let mut meta = FileMetadata::from_entry(&entry)
            .ok_or(Error::new(ErrorKind::Corrupted, "path resolved to a thread record"))?;

        if let Some(file) = entry.value.as_file() {
            if let Some((header, _)) = self.compression(file)? {
                meta.size = header.uncompressed_size;
                meta.compressed = true;
            }
        }
        Ok(meta)
    }

    /// 检查路径是否为目录
    pub fn is_dir(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.value.as_folder().is_some())
    }

    /// 检查路径是否为文件
    pub fn is_file(&self, path: &str) -> Result<bool> {
        Ok(self.lookup(path)?.value.as_file().is_some())
    }

    /// 按 ID 求完整路径（如 `/Users/shared`）
    ///
    /// # 返回
    ///
    /// ID 不存在时返回 None
    pub fn path_of(&self, id: CatalogNodeId) -> Result<Option<String>> {
        if id == CatalogNodeId::ROOT_FOLDER {
            return Ok(Some(String::from("/")));
        }

        let Some(chain) = self.catalog().path_to_id(id)? else {
            return Ok(None);
        };

        // 第一项是根目录，名称为卷名，不出现在路径中
        let mut path = String::new();
        for entry in chain.iter().skip(1) {
            path.push('/');
            path.push_str(&entry.key.name.to_string_lossy());
        }
        Ok(Some(path))
    }

    /// 为文件记录的某个 fork 打开读取器
    ///
    /// 内联 extent 不够时先经 extents overflow 树补全。
    pub fn open_file_fork(&self, file: &FileRecord, kind: ForkKind) -> Result<ForkReader<'_, D>> {
        let fork = file.fork(kind);
        let extents = self.extents();
        let resolver = extents.resolver(file.file_id, kind);
        let layout = ForkLayout::resolve(fork, self.geometry.allocation_block_size, Some(&resolver))?;

        debug!(
            "file {} {} fork: {} bytes in {} extents",
            file.file_id,
            kind,
            layout.length(),
            layout.extents().len()
        );
        Ok(layout.reader(&self.volume, self.geometry))
    }

    /// 文件的 decmpfs 压缩信息
    ///
    /// # 返回
    ///
    /// 文件带有可解压的 `com.apple.decmpfs` 属性时返回头部和完整属性值；
    /// 没有该属性、魔数不对、压缩类型不支持或关闭了解压时返回 None。
    pub fn compression(&self, file: &FileRecord) -> Result<Option<(DecmpfsHeader, Vec<u8>)>> {
        if !self.options.decompress {
            return Ok(None);
        }
        let Some(tree) = self.attributes() else {
            return Ok(None);
        };
        let Some(attr) = tree.read_attribute(file.file_id, &UniStr::from_str(DECMPFS_XATTR_NAME))?
        else {
            return Ok(None);
        };

        match DecmpfsHeader::parse(&attr) {
            Some(header) if header.storage().is_some() => Ok(Some((header, attr))),
            Some(header) => {
                debug!(
                    "file {}: compression type {} read as a plain fork",
                    file.file_id, header.compression_type
                );
                Ok(None)
            }
            None => {
                warn!("file {}: {} has a bad header", file.file_id, DECMPFS_XATTR_NAME);
                Ok(None)
            }
        }
    }

    /// 打开文件内容
    ///
    /// 透明压缩的文件返回解压后的内容，其余文件读数据 fork。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 压缩数据或资源 fork 结构无效
    pub fn open_file(&self, file: &FileRecord) -> Result<FileReader<'_, D>> {
        let Some((header, attr)) = self.compression(file)? else {
            return self.open_file_fork(file, ForkKind::Data).map(FileReader::Fork);
        };

        match header.storage() {
            Some(CompressionStorage::Inline) => {
                let data = decmpfs::decompress_inline(&header, &attr)?;
                Ok(FileReader::Inline { data, position: 0 })
            }
            Some(CompressionStorage::ResourceFork) => {
                let fork = self.open_file_fork(file, ForkKind::Resource)?;
                let reader = CompressedReader::open(fork, &header)?;
                debug!(
                    "file {}: {} compressed blocks, {} bytes",
                    file.file_id,
                    reader.block_count(),
                    reader.len()
                );
                Ok(FileReader::Compressed(reader))
            }
            None => self.open_file_fork(file, ForkKind::Data).map(FileReader::Fork),
        }
    }

    /// 按路径打开文件的某个 fork
    ///
    /// 数据 fork 经由 [`open_file`](Self::open_file) 打开，透明压缩的
    /// 文件返回解压后的内容；资源 fork 总是原样返回。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::InvalidInput` - 路径指向目录
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let mut reader = fs.open_fork("/Applications/Tool", ForkKind::Resource)?;
    /// let mut buf = vec![0u8; 4096];
    /// let n = reader.read(&mut buf)?;
    /// ```
    pub fn open_fork(&self, path: &str, kind: ForkKind) -> Result<FileReader<'_, D>> {
        let entry = self.lookup(path)?;
        let Some(file) = entry.value.as_file() else {
            return Err(Error::new(ErrorKind::InvalidInput, "not a file"));
        };
        match kind {
            ForkKind::Data => self.open_file(file),
            ForkKind::Resource => self.open_file_fork(file, kind).map(FileReader::Fork),
        }
    }

    /// 读取文件的全部内容
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.open_fork(path, ForkKind::Data)?.read_to_end()
    }

    /// 列出扩展属性名
    ///
    /// 卷上没有 attributes 文件时返回空列表。透明压缩的文件不列出
    /// `com.apple.decmpfs`。
    pub fn list_xattrs(&self, path: &str) -> Result<Vec<String>> {
        let entry = self.lookup(path)?;
        let id = Self::entry_id(path, &entry)?;
        let Some(tree) = self.attributes() else {
            return Ok(Vec::new());
        };

        let hidden = match entry.value.as_file() {
            Some(file) => self.compression(file)?.is_some(),
            None => false,
        };

        Ok(tree
            .attribute_names(id)?
            .iter()
            .map(UniStr::to_string_lossy)
            .filter(|name| !(hidden && name == DECMPFS_XATTR_NAME))
            .collect())
    }

    /// 读取扩展属性值，不存在时返回 None
    pub fn get_xattr(&self, path: &str, name: &str) -> Result<Option<Vec<u8>>> {
        let id = self.object_id(path)?;
        let Some(tree) = self.attributes() else {
            return Ok(None);
        };
        tree.read_attribute(id, &UniStr::from_str(name))
    }

    /// 卷统计信息
    pub fn statfs(&self) -> StatFs {
        StatFs {
            file_count: self.header.file_count,
            folder_count: self.header.folder_count,
            blocks_count: self.header.total_blocks as u64,
            free_blocks_count: self.header.free_blocks as u64,
            block_size: self.header.block_size,
        }
    }

    fn object_id(&self, path: &str) -> Result<CatalogNodeId> {
        let entry = self.lookup(path)?;
        Self::entry_id(path, &entry)
    }

    fn entry_id(path: &str, entry: &CatalogEntry) -> Result<CatalogNodeId> {
        entry.value.id().ok_or_else(|| {
            error!("path {} resolved to a thread record", path);
            Error::new(ErrorKind::Corrupted, "path resolved to a thread record")
        })
    }
}
