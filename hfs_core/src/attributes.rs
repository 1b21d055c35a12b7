//! Attributes 树（扩展属性）
//!
//! 键为 (文件 ID, 属性名, 起始块)。起始块为 0 的记录是一个属性的
//! 第一段；fork data 形式的大属性值的后续 extent 以同名、起始块为
//! 累计块数的 extents 记录存放在同一棵树里。

use crate::{
    block::{BlockDevice, Volume},
    btree::{BTree, BTreeHeader, LeafRecord, NodeCodec},
    error::{Error, ErrorKind, Result},
    extents::{resolve_batches, ExtentRecord},
    fork::{ExtentResolver, ForkGeometry, ForkLayout},
    hfsplus::HfsPlusAttributesCodec,
    types::{CatalogNodeId, ExtentDescriptor, ForkData, UniStr},
};
use alloc::vec::Vec;
use log::{debug, error};

/// Attributes 键
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeKey {
    pub file_id: CatalogNodeId,
    pub start_block: u32,
    pub name: UniStr,
}

impl AttributeKey {
    pub fn new(file_id: CatalogNodeId, start_block: u32, name: UniStr) -> Self {
        Self {
            file_id,
            start_block,
            name,
        }
    }
}

/// Attributes 叶子记录数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeRecord {
    /// 值直接内联在记录中
    Inline(Vec<u8>),
    /// 值存放在 fork 中
    Fork(ForkData),
    /// fork 形式的值的后续 extent
    Extents(ExtentRecord),
}

/// attributes 叶子记录（键 + 数据）
pub type AttributeEntry = LeafRecord<AttributeKey, AttributeRecord>;

/// Attributes 树
pub struct AttributesTree<'v, D, C = HfsPlusAttributesCodec> {
    volume: &'v Volume<D>,
    geometry: ForkGeometry,
    layout: &'v ForkLayout,
    codec: C,
}

impl<'v, D, C> AttributesTree<'v, D, C>
where
    D: BlockDevice,
    C: NodeCodec<Key = AttributeKey, Record = AttributeRecord> + Clone,
{
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

    /// 列出对象的全部属性（每个属性一条，键升序）
    ///
    /// 扫描 `[(file_id, 0, ""), (file_id + 1, 0, ""))`，只保留起始块为 0 的记录。
    pub fn list_attribute_records(&self, file_id: CatalogNodeId) -> Result<Vec<AttributeEntry>> {
        let min = AttributeKey::new(file_id, 0, UniStr::empty());
        let max = AttributeKey::new(file_id.next(), 0, UniStr::empty());

        let mut records = self.open()?.collect_range(&min, &max)?;
        records.retain(|rec| rec.key.file_id == file_id && rec.key.start_block == 0);

        debug!("object {}: {} attributes", file_id, records.len());
        Ok(records)
    }

    /// 列出对象的属性名
    pub fn attribute_names(&self, file_id: CatalogNodeId) -> Result<Vec<UniStr>> {
        Ok(self
            .list_attribute_records(file_id)?
            .into_iter()
            .map(|rec| rec.key.name)
            .collect())
    }

    /// 查找属性的第一段记录
    pub fn get_attribute(&self, file_id: CatalogNodeId, name: &UniStr) -> Result<Option<AttributeRecord>> {
        let key = AttributeKey::new(file_id, 0, name.clone());
        Ok(self.open()?.get_record(&key)?.map(|rec| rec.value))
    }

    /// 读取属性值
    ///
    /// 内联值直接返回；fork 形式的值经 fork 读取器读出，必要时从本树的
    /// extents 记录补全 extent。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 起始块 0 处是 extents 记录
    pub fn read_attribute(&self, file_id: CatalogNodeId, name: &UniStr) -> Result<Option<Vec<u8>>> {
        match self.get_attribute(file_id, name)? {
            None => Ok(None),
            Some(AttributeRecord::Inline(data)) => Ok(Some(data)),
            Some(AttributeRecord::Fork(fork)) => {
                let resolver = AttributeForkExtents {
                    tree: self,
                    file_id,
                    name: name.clone(),
                };
                let layout = ForkLayout::resolve(
                    &fork,
                    self.geometry.allocation_block_size,
                    Some(&resolver),
                )?;
                let mut reader = layout.reader(self.volume, self.geometry);
                reader.read_to_end().map(Some)
            }
            Some(AttributeRecord::Extents(_)) => {
                error!("attribute {:?} of {} starts with an extents record", name, file_id);
                Err(Error::new(
                    ErrorKind::Corrupted,
                    "attribute starts with an extents record",
                ))
            }
        }
    }
}

/// fork 形式属性值的 extent 解析器
struct AttributeForkExtents<'t, 'v, D, C> {
    tree: &'t AttributesTree<'v, D, C>,
    file_id: CatalogNodeId,
    name: UniStr,
}

impl<D, C> ExtentResolver for AttributeForkExtents<'_, '_, D, C>
where
    D: BlockDevice,
    C: NodeCodec<Key = AttributeKey, Record = AttributeRecord> + Clone,
{
    fn resolve_extents(&self, fork: &ForkData) -> Result<Vec<ExtentDescriptor>> {
        let mut tree = self.tree.open()?;
        let batches = resolve_batches(fork, self.tree.geometry.allocation_block_size, |start| {
            let key = AttributeKey::new(self.file_id, start, self.name.clone());
            match tree.get_record(&key)? {
                None => Ok(None),
                Some(rec) => match rec.value {
                    AttributeRecord::Extents(extents) => Ok(Some(extents)),
                    _ => {
                        error!("attribute {:?} record at block {} is not extents", self.name, start);
                        Err(Error::new(
                            ErrorKind::Corrupted,
                            "expected attribute extents record",
                        ))
                    }
                },
            }
        })?;
        Ok(batches.into_iter().flatten().collect())
    }
}
