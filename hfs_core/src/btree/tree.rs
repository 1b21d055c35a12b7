//! B-tree 引擎
//!
//! 在一次会话内完成点查询、区间枚举和叶子链遍历。

use super::codec::{IndexRecord, LeafRecord, NodeCodec};
use super::node::{BTreeHeader, Node, NodeKind, NodeStore};
use super::search::{find_le_key, find_le_keys};
use crate::{
    block::BlockDevice,
    error::{Error, ErrorKind, Result},
    fork::ForkReader,
    types::KeyCompareMode,
};
use alloc::vec::Vec;
use core::cmp::Ordering;
use log::{debug, error, warn};

/// 一棵打开的 B-tree
///
/// 持有树 fork 上的会话和该树的解码器，随作用域结束释放。
///
/// # 示例
///
/// ```rust,ignore
/// let reader = layout.reader(&volume, geometry);
/// let mut tree = BTree::open(reader, HfsPlusCatalogCodec)?;
/// if let Some(rec) = tree.get_record(&key)? {
///     println!("{:?}", rec.value);
/// }
/// ```
pub struct BTree<'v, D, C> {
    store: NodeStore<'v, D>,
    codec: C,
}

impl<'v, D: BlockDevice, C: NodeCodec> BTree<'v, D, C> {
    /// 在树 fork 上打开会话
    pub fn open(reader: ForkReader<'v, D>, codec: C) -> Result<Self> {
        let store = NodeStore::open(reader)?;
        Ok(Self { store, codec })
    }

    pub fn header(&self) -> &BTreeHeader {
        self.store.header()
    }

    pub fn compare_mode(&self) -> KeyCompareMode {
        self.store.header().compare_mode()
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn store(&self) -> &NodeStore<'v, D> {
        &self.store
    }

    /// 读取任意节点
    pub fn node(&mut self, index: u32) -> Result<Node> {
        self.store.read_node(index)
    }

    /// 按树的比较方式比较两个键
    pub fn compare(&self, a: &C::Key, b: &C::Key) -> Ordering {
        self.codec.compare(self.compare_mode(), a, b)
    }

    fn decode_index(&self, node: &Node) -> Result<Vec<IndexRecord<C::Key>>> {
        self.codec.decode_index(node, self.store.header())
    }

    fn decode_leaf(&self, node: &Node) -> Result<Vec<LeafRecord<C::Key, C::Record>>> {
        self.codec.decode_leaf(node, self.store.header())
    }

    /// 点查询
    ///
    /// 从根节点开始，在索引节点中选择键不大于查找键的最大记录并下降，
    /// 到达叶子后做精确匹配。
    ///
    /// # 返回
    ///
    /// 找到返回 `Some(record)`；键不存在返回 `None`
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 根以下的索引节点里找不到下降路径，
    ///   或遇到既不是索引也不是叶子的节点
    pub fn get_record(&mut self, key: &C::Key) -> Result<Option<LeafRecord<C::Key, C::Record>>> {
        let header = *self.store.header();
        if header.is_empty() {
            return Ok(None);
        }

        let mut current = header.root_node;
        let mut visited = 0u32;

        loop {
            visited += 1;
            if visited > header.total_nodes {
                error!("lookup exceeded {} nodes, cycle suspected", header.total_nodes);
                return Err(Error::new(ErrorKind::Corrupted, "B-tree descent does not terminate"));
            }

            let node = self.store.read_node(current)?;
            match self.codec.classify(&node) {
                NodeKind::Index => {
                    let records = self.decode_index(&node)?;
                    let cmp = |a: &C::Key, b: &C::Key| self.compare(a, b);
                    match find_le_key(&records, key, cmp) {
                        Some(rec) => current = rec.child,
                        None if current == header.root_node => {
                            // 查找键比整棵树的最小键还小
                            return Ok(None);
                        }
                        None => {
                            error!("index node {} has no key <= search key", current);
                            return Err(Error::new(
                                ErrorKind::Corrupted,
                                "index node does not bound search key",
                            ));
                        }
                    }
                }
                NodeKind::Leaf => {
                    let records = self.decode_leaf(&node)?;
                    let found = records
                        .into_iter()
                        .find(|rec| self.compare(&rec.key, key) == Ordering::Equal);
                    return Ok(found);
                }
                kind => {
                    error!("node {} has kind {:?} during descent", current, kind);
                    return Err(Error::new(
                        ErrorKind::Corrupted,
                        "unexpected node kind during descent",
                    ));
                }
            }
        }
    }

    /// 枚举 `[min, max)` 内的全部叶子记录（键升序）
    ///
    /// 用显式工作栈代替递归：索引节点做非严格扫描，得到的子节点按键序
    /// 依次访问；叶子节点做严格扫描，`found` 为 false 时不贡献记录。
    ///
    /// # 错误
    ///
    /// - `ErrorKind::Corrupted` - 遇到意外的节点类型，或访问节点数超过
    ///   header 声明的节点总数（树中有环）
    pub fn collect_range(
        &mut self,
        min: &C::Key,
        max: &C::Key,
    ) -> Result<Vec<LeafRecord<C::Key, C::Record>>> {
        let header = *self.store.header();
        let mut result = Vec::new();
        if header.is_empty() {
            return Ok(result);
        }

        let mut worklist = Vec::new();
        worklist.push(header.root_node);
        let mut visited = 0u32;

        while let Some(index) = worklist.pop() {
            visited += 1;
            if visited > header.total_nodes {
                error!(
                    "range scan visited more than {} nodes, cycle suspected",
                    header.total_nodes
                );
                return Err(Error::new(ErrorKind::Corrupted, "B-tree enumeration does not terminate"));
            }

            let node = self.store.read_node(index)?;
            match self.codec.classify(&node) {
                NodeKind::Index => {
                    let records = self.decode_index(&node)?;
                    let cmp = |a: &C::Key, b: &C::Key| self.compare(a, b);
                    let scan = find_le_keys(&records, min, max, false, cmp);
                    // 倒序压栈，出栈时按键序访问
                    worklist.extend(scan.records.iter().rev().map(|rec| rec.child));
                }
                NodeKind::Leaf => {
                    let records = self.decode_leaf(&node)?;
                    let cmp = |a: &C::Key, b: &C::Key| self.compare(a, b);
                    let scan = find_le_keys(&records, min, max, true, cmp);
                    if scan.found {
                        result.extend(scan.records.into_iter().cloned());
                    }
                }
                kind => {
                    error!("node {} has kind {:?} during enumeration", index, kind);
                    return Err(Error::new(
                        ErrorKind::Corrupted,
                        "unexpected node kind during enumeration",
                    ));
                }
            }
        }

        debug!("range scan: {} records from {} nodes", result.len(), visited);
        Ok(result)
    }

    /// 沿叶子链遍历全部叶子记录
    ///
    /// 从 header 中的第一个叶子开始，沿前向链接走到末尾。
    pub fn leaf_records(&mut self) -> Result<Vec<LeafRecord<C::Key, C::Record>>> {
        let header = *self.store.header();
        let mut result = Vec::new();
        let mut current = header.first_leaf_node;
        let mut visited = 0u32;

        while current != 0 {
            visited += 1;
            if visited > header.total_nodes {
                error!("leaf chain longer than {} nodes", header.total_nodes);
                return Err(Error::new(ErrorKind::Corrupted, "leaf chain does not terminate"));
            }

            let node = self.store.read_node(current)?;
            if self.codec.classify(&node) != NodeKind::Leaf {
                error!("node {} in leaf chain is not a leaf", current);
                return Err(Error::new(ErrorKind::Corrupted, "non-leaf node in leaf chain"));
            }

            result.extend(self.decode_leaf(&node)?);
            current = node.descriptor().f_link;
        }

        if result.len() as u64 != header.leaf_records as u64 {
            warn!(
                "leaf chain holds {} records, header claims {}",
                result.len(),
                header.leaf_records
            );
        }

        Ok(result)
    }
}
