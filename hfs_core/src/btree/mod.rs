//! 通用 B-tree 引擎
//!
//! catalog、extents overflow 和 attributes 三棵系统树共用同一套引擎，
//! 差异只在各自的 [`NodeCodec`] 实现。

mod codec;
mod node;
mod search;
mod tree;

pub use codec::{IndexRecord, Keyed, LeafRecord, NodeCodec};
pub use node::{BTreeAttributes, BTreeHeader, Node, NodeDescriptor, NodeKind, NodeStore};
pub use search::{find_le_key, find_le_keys, RangeScan};
pub use tree::BTree;
