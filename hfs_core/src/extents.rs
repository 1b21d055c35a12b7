//! Extents overflow 树
//!
//! fork 的前 8 个 extent 内联在元数据中，其余按 (fork 类型, 文件 ID,
//! 起始块) 存放在这棵树里。这棵树自己的 fork 只用内联 extent 构造，
//! 不挂接解析器，否则查询它会递归到自身。

use crate::{
    block::{BlockDevice, Volume},
    btree::{BTree, BTreeHeader, NodeCodec},
    consts::HFS_INLINE_EXTENTS,
    error::{Error, ErrorKind, Result},
    fork::{ExtentResolver, ForkGeometry, ForkLayout},
    hfsplus::HfsPlusExtentsCodec,
    types::{total_block_count, CatalogNodeId, ExtentDescriptor, ForkData, ForkKind},
};
use alloc::vec::Vec;
use log::{debug, error};

/// Extents 键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtentKey {
    pub fork_kind: ForkKind,
    pub file_id: CatalogNodeId,
    /// 本批 extent 之前的累计块数
    pub start_block: u32,
}

impl ExtentKey {
    pub fn new(fork_kind: ForkKind, file_id: CatalogNodeId, start_block: u32) -> Self {
        Self {
            fork_kind,
            file_id,
            start_block,
        }
    }
}

/// 一条 extents 叶子记录：8 个描述符
pub type ExtentRecord = [ExtentDescriptor; HFS_INLINE_EXTENTS];

/// 按累计块数循环查找溢出 extent
///
/// 从内联 extent 开始，每次用当前累计块数做一次点查询，把返回的一批
/// 描述符（遇到块数为 0 的描述符即截止）追加到结果，直到覆盖逻辑长度。
///
/// # 返回
///
/// 按批次分组的描述符，第一批是内联 extent
///
/// # 错误
///
/// - `ErrorKind::Corrupted` - 中途查找落空，或某一批没有贡献任何块
pub(crate) fn resolve_batches<F>(
    fork: &ForkData,
    allocation_block_size: u32,
    mut lookup: F,
) -> Result<Vec<Vec<ExtentDescriptor>>>
where
    F: FnMut(u32) -> Result<Option<ExtentRecord>>,
{
    let inline = fork.inline_extents().to_vec();
    let mut blocks = total_block_count(&inline);
    let mut batches = Vec::new();
    batches.push(inline);

    let block_size = allocation_block_size as u64;
    while blocks * block_size < fork.logical_size {
        let start = u32::try_from(blocks)
            .map_err(|_| Error::new(ErrorKind::Corrupted, "extent block count overflow"))?;

        let Some(record) = lookup(start)? else {
            error!(
                "overflow extents at block {} missing, fork needs {} bytes",
                start, fork.logical_size
            );
            return Err(Error::new(ErrorKind::Corrupted, "overflow extent record missing"));
        };

        let end = record
            .iter()
            .position(|e| e.block_count == 0)
            .unwrap_or(record.len());
        let batch = record[..end].to_vec();
        let added = total_block_count(&batch);
        if added == 0 {
            error!("overflow extent record at block {} is empty", start);
            return Err(Error::new(ErrorKind::Corrupted, "overflow extent record adds no blocks"));
        }

        debug!("overflow batch at block {}: {} extents, {} blocks", start, batch.len(), added);
        blocks += added;
        batches.push(batch);
    }

    Ok(batches)
}

/// Extents overflow 树
pub struct ExtentsOverflowTree<'v, D, C = HfsPlusExtentsCodec> {
    volume: &'v Volume<D>,
    geometry: ForkGeometry,
    layout: &'v ForkLayout,
    codec: C,
}

impl<'v, D, C> ExtentsOverflowTree<'v, D, C>
where
    D: BlockDevice,
    C: NodeCodec<Key = ExtentKey, Record = ExtentRecord> + Clone,
{
    /// 创建 extents 树
    ///
    /// `layout` 应当由 [`ForkLayout::inline`] 构造。
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

    fn open(&self) -> Result<BTree<'v, D, C>> {
        BTree::open(
            self.layout.reader(self.volume, self.geometry),
            self.codec.clone(),
        )
    }

    pub fn header(&self) -> Result<BTreeHeader> {
        Ok(*self.open()?.header())
    }

    /// 查找一条溢出 extent 记录
    pub fn get_overflow_extent(&self, key: &ExtentKey) -> Result<Option<ExtentRecord>> {
        Ok(self.open()?.get_record(key)?.map(|rec| rec.value))
    }

    /// 按批次解析 fork 的全部 extent
    ///
    /// 内联 extent 已经足够时只返回一批。
    pub fn extent_batches(
        &self,
        file_id: CatalogNodeId,
        kind: ForkKind,
        fork: &ForkData,
    ) -> Result<Vec<Vec<ExtentDescriptor>>> {
        if fork.inline_covers(self.geometry.allocation_block_size) {
            let mut batches = Vec::new();
            batches.push(fork.inline_extents().to_vec());
            return Ok(batches);
        }

        let mut tree = self.open()?;
        resolve_batches(fork, self.geometry.allocation_block_size, |start| {
            let key = ExtentKey::new(kind, file_id, start);
            Ok(tree.get_record(&key)?.map(|rec| rec.value))
        })
    }

    /// 解析 fork 的全部 extent（内联在前，溢出按偏移递增在后）
    ///
    /// # 示例
    ///
    /// ```rust,ignore
    /// let extents = fs.extents().all_extents(file.file_id, ForkKind::Data, &file.data_fork)?;
    /// ```
    pub fn all_extents(
        &self,
        file_id: CatalogNodeId,
        kind: ForkKind,
        fork: &ForkData,
    ) -> Result<Vec<ExtentDescriptor>> {
        let batches = self.extent_batches(file_id, kind, fork)?;
        Ok(batches.into_iter().flatten().collect())
    }

    /// 绑定到某个 fork 的解析器
    pub fn resolver(&self, file_id: CatalogNodeId, kind: ForkKind) -> FileForkExtents<'_, 'v, D, C> {
        FileForkExtents {
            tree: self,
            file_id,
            kind,
        }
    }
}

/// 文件 fork 的 extent 解析器
pub struct FileForkExtents<'t, 'v, D, C> {
    tree: &'t ExtentsOverflowTree<'v, D, C>,
    file_id: CatalogNodeId,
    kind: ForkKind,
}

impl<D, C> ExtentResolver for FileForkExtents<'_, '_, D, C>
where
    D: BlockDevice,
    C: NodeCodec<Key = ExtentKey, Record = ExtentRecord> + Clone,
{
    fn resolve_extents(&self, fork: &ForkData) -> Result<Vec<ExtentDescriptor>> {
        self.tree.all_extents(self.file_id, self.kind, fork)
    }
}
