//! 格式解码能力
//!
//! B-tree 引擎只依赖 [`NodeCodec`]：节点分类、索引记录解码、叶子记录解码
//! 与键比较。每种磁盘格式（flavor）实现一次，再注入引擎。

use super::node::{BTreeHeader, Node, NodeKind};
use crate::error::Result;
use crate::types::KeyCompareMode;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

/// 带键的记录
pub trait Keyed {
    type Key;

    fn key(&self) -> &Self::Key;
}

/// 索引记录：键 + 子节点编号
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexRecord<K> {
    pub key: K,
    pub child: u32,
}

impl<K> Keyed for IndexRecord<K> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }
}

/// 叶子记录：键 + 树相关的数据
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafRecord<K, R> {
    pub key: K,
    pub value: R,
}

impl<K, R> Keyed for LeafRecord<K, R> {
    type Key = K;

    fn key(&self) -> &K {
        &self.key
    }
}

/// 节点解码器
///
/// # 示例
///
/// ```rust,ignore
/// struct MyCodec;
///
/// impl NodeCodec for MyCodec {
///     type Key = u32;
///     type Record = Vec<u8>;
///
///     fn decode_index(&self, node: &Node, header: &BTreeHeader)
///         -> Result<Vec<IndexRecord<u32>>> { /* ... */ }
///
///     fn decode_leaf(&self, node: &Node, header: &BTreeHeader)
///         -> Result<Vec<LeafRecord<u32, Vec<u8>>>> { /* ... */ }
///
///     fn compare(&self, _mode: KeyCompareMode, a: &u32, b: &u32) -> Ordering {
///         a.cmp(b)
///     }
/// }
/// ```
pub trait NodeCodec {
    type Key: Clone + Debug;
    type Record: Clone + Debug;

    /// 节点分类
    ///
    /// 默认使用节点描述符中的类型字段。
    fn classify(&self, node: &Node) -> NodeKind {
        node.kind()
    }

    /// 解码索引节点中的全部记录（按存储顺序）
    fn decode_index(&self, node: &Node, header: &BTreeHeader)
        -> Result<Vec<IndexRecord<Self::Key>>>;

    /// 解码叶子节点中的全部记录（按存储顺序）
    fn decode_leaf(
        &self,
        node: &Node,
        header: &BTreeHeader,
    ) -> Result<Vec<LeafRecord<Self::Key, Self::Record>>>;

    /// 按树声明的比较方式比较两个键
    fn compare(&self, mode: KeyCompareMode, a: &Self::Key, b: &Self::Key) -> Ordering;
}
