//! B-tree 节点读取
//!
//! 节点是树 fork 中固定大小的块，节点 N 位于 fork 内偏移 `N * node_size`。
//! 节点描述符与 header record 的布局在所有 flavor 之间相同，因此在这里
//! 直接解析；记录内容交给 [`NodeCodec`](super::NodeCodec) 解码。

use crate::{
    block::BlockDevice,
    consts::*,
    error::{Error, ErrorKind, Result},
    fork::ForkReader,
    types::KeyCompareMode,
};
use alloc::vec;
use alloc::vec::Vec;
use bitflags::bitflags;
use byteorder::{BigEndian, ByteOrder};
use log::{debug, error};

/// 节点类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Leaf,
    Index,
    Header,
    Map,
    /// 未知的类型值
    Unknown(i8),
}

impl NodeKind {
    pub fn from_raw(raw: i8) -> Self {
        match raw {
            BT_LEAF_NODE => NodeKind::Leaf,
            BT_INDEX_NODE => NodeKind::Index,
            BT_HEADER_NODE => NodeKind::Header,
            BT_MAP_NODE => NodeKind::Map,
            other => NodeKind::Unknown(other),
        }
    }
}

/// 节点描述符（每个节点开头的 14 字节）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeDescriptor {
    /// 同层下一个节点
    pub f_link: u32,
    /// 同层上一个节点
    pub b_link: u32,
    pub kind: NodeKind,
    /// 叶子为 1，往上逐层加一
    pub height: u8,
    pub num_records: u16,
}

impl NodeDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < BT_NODE_DESCRIPTOR_SIZE {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "node shorter than its descriptor",
            ));
        }

        Ok(Self {
            f_link: BigEndian::read_u32(&data[0..4]),
            b_link: BigEndian::read_u32(&data[4..8]),
            kind: NodeKind::from_raw(data[8] as i8),
            height: data[9],
            num_records: BigEndian::read_u16(&data[10..12]),
        })
    }
}

bitflags! {
    /// B-tree 属性（header record 中的 attributes 字段）
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct BTreeAttributes: u32 {
        /// 树未被正确关闭
        const BAD_CLOSE = 0x0000_0001;
        /// keyLength 字段为 u16
        const BIG_KEYS = 0x0000_0002;
        /// 索引节点中的键长度可变
        const VARIABLE_INDEX_KEYS = 0x0000_0004;
    }
}

/// B-tree header record（节点 0 的第一条记录）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BTreeHeader {
    pub tree_depth: u16,
    /// 根节点编号，0 表示空树
    pub root_node: u32,
    pub leaf_records: u32,
    pub first_leaf_node: u32,
    pub last_leaf_node: u32,
    pub node_size: u16,
    pub max_key_length: u16,
    pub total_nodes: u32,
    pub free_nodes: u32,
    pub clump_size: u32,
    pub btree_type: u8,
    pub key_compare_type: u8,
    pub attributes: BTreeAttributes,
}

impl BTreeHeader {
    /// 从 header record 字节解析
    pub fn parse(record: &[u8]) -> Result<Self> {
        if record.len() < BT_HEADER_RECORD_SIZE {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "B-tree header record too short",
            ));
        }

        let header = Self {
            tree_depth: BigEndian::read_u16(&record[0..2]),
            root_node: BigEndian::read_u32(&record[2..6]),
            leaf_records: BigEndian::read_u32(&record[6..10]),
            first_leaf_node: BigEndian::read_u32(&record[10..14]),
            last_leaf_node: BigEndian::read_u32(&record[14..18]),
            node_size: BigEndian::read_u16(&record[18..20]),
            max_key_length: BigEndian::read_u16(&record[20..22]),
            total_nodes: BigEndian::read_u32(&record[22..26]),
            free_nodes: BigEndian::read_u32(&record[26..30]),
            // reserved1: u16 @30
            clump_size: BigEndian::read_u32(&record[32..36]),
            btree_type: record[36],
            key_compare_type: record[37],
            attributes: BTreeAttributes::from_bits_retain(BigEndian::read_u32(&record[38..42])),
        };

        if !header.node_size.is_power_of_two()
            || header.node_size < BT_MIN_NODE_SIZE
            || header.node_size > BT_MAX_NODE_SIZE
        {
            error!("invalid B-tree node size {}", header.node_size);
            return Err(Error::new(ErrorKind::Corrupted, "invalid B-tree node size"));
        }

        if header.root_node != 0 && header.root_node >= header.total_nodes {
            error!(
                "root node {} outside tree of {} nodes",
                header.root_node, header.total_nodes
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "root node index out of range",
            ));
        }

        Ok(header)
    }

    /// 键比较方式
    pub fn compare_mode(&self) -> KeyCompareMode {
        KeyCompareMode::from_raw(self.key_compare_type)
    }

    /// 是否为空树
    pub fn is_empty(&self) -> bool {
        self.root_node == 0
    }

    pub fn has_big_keys(&self) -> bool {
        self.attributes.contains(BTreeAttributes::BIG_KEYS)
    }

    pub fn has_variable_index_keys(&self) -> bool {
        self.attributes.contains(BTreeAttributes::VARIABLE_INDEX_KEYS)
    }
}

/// 一个已读入内存的节点
#[derive(Debug, Clone)]
pub struct Node {
    index: u32,
    descriptor: NodeDescriptor,
    /// 记录起始偏移，最后一项是空闲区偏移
    offsets: Vec<u16>,
    data: Vec<u8>,
}

impl Node {
    /// 解析节点并校验记录偏移表
    pub fn parse(index: u32, data: Vec<u8>) -> Result<Self> {
        let descriptor = NodeDescriptor::parse(&data)?;
        let count = descriptor.num_records as usize + 1;
        let table_size = count * 2;

        if BT_NODE_DESCRIPTOR_SIZE + table_size > data.len() {
            error!(
                "node {} claims {} records, too many for {} bytes",
                index,
                descriptor.num_records,
                data.len()
            );
            return Err(Error::new(
                ErrorKind::Corrupted,
                "record offset table overflows node",
            ));
        }

        let table_start = data.len() - table_size;
        let mut offsets = Vec::with_capacity(count);
        for i in 0..count {
            let pos = data.len() - 2 * (i + 1);
            offsets.push(BigEndian::read_u16(&data[pos..pos + 2]));
        }

        let mut previous = BT_NODE_DESCRIPTOR_SIZE as u16;
        for &offset in &offsets {
            if offset < previous || offset as usize > table_start {
                error!("node {} has bad record offset {:#x}", index, offset);
                return Err(Error::new(
                    ErrorKind::Corrupted,
                    "record offsets out of order",
                ));
            }
            previous = offset;
        }

        Ok(Self {
            index,
            descriptor,
            offsets,
            data,
        })
    }

    /// 节点编号
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn descriptor(&self) -> &NodeDescriptor {
        &self.descriptor
    }

    pub fn kind(&self) -> NodeKind {
        self.descriptor.kind
    }

    pub fn num_records(&self) -> usize {
        self.descriptor.num_records as usize
    }

    /// 节点原始字节
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 第 `i` 条记录的字节
    pub fn record(&self, i: usize) -> Result<&[u8]> {
        if i >= self.num_records() {
            return Err(Error::new(ErrorKind::InvalidInput, "record index out of range"));
        }
        let start = self.offsets[i] as usize;
        let end = self.offsets[i + 1] as usize;
        Ok(&self.data[start..end])
    }

    /// 按顺序遍历所有记录
    pub fn records(&self) -> impl Iterator<Item = &[u8]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.data[w[0] as usize..w[1] as usize])
    }
}

/// 节点存储
///
/// 在树 fork 上打开的一次会话：读出 header node 后按编号读取节点。
/// 会话随作用域结束释放，不持有卷以外的任何资源。
pub struct NodeStore<'v, D> {
    reader: ForkReader<'v, D>,
    header: BTreeHeader,
}

impl<'v, D: BlockDevice> NodeStore<'v, D> {
    /// 打开会话：读取并校验 header node
    pub fn open(mut reader: ForkReader<'v, D>) -> Result<Self> {
        let mut buf = vec![0u8; BT_NODE_DESCRIPTOR_SIZE + BT_HEADER_RECORD_SIZE];
        reader.seek(0)?;
        let n = reader.read_full(&mut buf)?;
        if n < buf.len() {
            return Err(Error::new(
                ErrorKind::Corrupted,
                "tree fork too short for header node",
            ));
        }

        let descriptor = NodeDescriptor::parse(&buf)?;
        if descriptor.kind != NodeKind::Header {
            error!("node 0 has kind {:?}, expected header", descriptor.kind);
            return Err(Error::new(ErrorKind::Corrupted, "node 0 is not a header node"));
        }

        let header = BTreeHeader::parse(&buf[BT_NODE_DESCRIPTOR_SIZE..])?;
        debug!(
            "B-tree session: root={}, depth={}, node_size={}, total_nodes={}",
            header.root_node, header.tree_depth, header.node_size, header.total_nodes
        );

        Ok(Self { reader, header })
    }

    pub fn header(&self) -> &BTreeHeader {
        &self.header
    }

    /// 读取节点 `index`
    pub fn read_node(&mut self, index: u32) -> Result<Node> {
        if index >= self.header.total_nodes {
            error!(
                "node {} outside tree of {} nodes",
                index, self.header.total_nodes
            );
            return Err(Error::new(ErrorKind::Corrupted, "node index out of range"));
        }

        let node_size = self.header.node_size as u64;
        let offset = index as u64 * node_size;
        if offset + node_size > self.reader.len() {
            error!(
                "node {} ends past tree fork length {}",
                index,
                self.reader.len()
            );
            return Err(Error::new(ErrorKind::Corrupted, "node beyond end of tree fork"));
        }

        let mut data = vec![0u8; node_size as usize];
        self.reader.seek(offset)?;
        self.reader.read_exact(&mut data)?;
        debug!("read node {}", index);

        Node::parse(index, data)
    }

    /// 底层 fork 读取器（用于统计）
    pub fn reader(&self) -> &ForkReader<'v, D> {
        &self.reader
    }
}
