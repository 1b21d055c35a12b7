//! 内存中的合成 HFS+ 镜像
//!
//! 测试不依赖外部镜像文件：这里按磁盘格式手工编码节点、B-tree、
//! catalog/extents/attributes 记录和卷头。

#![allow(dead_code)]

use hfs_core::hfsplus::unicode::compare_case_folding;
use hfs_core::{BlockDev, BlockDevice, ForkKind, Result};
use std::cmp::Ordering;

pub const NODE_SIZE: u16 = 4096;

/// 内存块设备，块大小 512
pub struct MemDevice {
    data: Vec<u8>,
}

impl MemDevice {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl BlockDevice for MemDevice {
    fn total_blocks(&self) -> u64 {
        self.data.len().div_ceil(512) as u64
    }

    fn read_blocks(&mut self, lba: u64, count: u32, buf: &mut [u8]) -> Result<usize> {
        let start = (lba * 512) as usize;
        let end = std::cmp::min(start + count as usize * 512, self.data.len());
        if start >= end {
            return Ok(0);
        }
        buf[..end - start].copy_from_slice(&self.data[start..end]);
        Ok(end - start)
    }
}

pub fn block_dev(image: Vec<u8>) -> BlockDev<MemDevice> {
    BlockDev::new(MemDevice::new(image))
}

fn put_u16(buf: &mut [u8], off: usize, v: u16) {
    buf[off..off + 2].copy_from_slice(&v.to_be_bytes());
}

fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_be_bytes());
}

fn put_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_be_bytes());
}

pub fn units(name: &str) -> Vec<u16> {
    name.encode_utf16().collect()
}

/// 可预测的测试数据：相邻块的内容互不相同
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| (i.wrapping_mul(31) ^ (i >> 9)) as u8)
        .collect()
}

// ---------------------------------------------------------------------------
// 分配与放置
// ---------------------------------------------------------------------------

/// fork 在元数据里的样子：逻辑长度、总块数、最多 8 个内联 extent
#[derive(Debug, Clone, Default)]
pub struct ForkSpec {
    pub logical_size: u64,
    pub total_blocks: u32,
    pub inline: Vec<(u32, u32)>,
}

impl ForkSpec {
    /// 所有 extent 都内联
    pub fn new(logical_size: u64, extents: &[(u32, u32)]) -> Self {
        assert!(extents.len() <= 8);
        Self {
            logical_size,
            total_blocks: extents.iter().map(|e| e.1).sum(),
            inline: extents.to_vec(),
        }
    }

    /// 内联 extent 之外还有溢出 extent
    pub fn with_total(logical_size: u64, inline: &[(u32, u32)], total_blocks: u32) -> Self {
        assert!(inline.len() <= 8);
        Self {
            logical_size,
            total_blocks,
            inline: inline.to_vec(),
        }
    }

    pub fn encode(&self) -> [u8; 80] {
        let mut buf = [0u8; 80];
        put_u64(&mut buf, 0, self.logical_size);
        put_u32(&mut buf, 12, self.total_blocks);
        for (i, &(start, count)) in self.inline.iter().enumerate() {
            put_u32(&mut buf, 16 + i * 8, start);
            put_u32(&mut buf, 20 + i * 8, count);
        }
        buf
    }
}

/// 按分配块组织的镜像
pub struct ImageBuilder {
    block_size: u32,
    data: Vec<u8>,
    next_block: u32,
}

impl ImageBuilder {
    pub fn new(block_size: u32) -> Self {
        // 前 1536 字节（引导块 + 卷头）不分配
        let reserved = 1536u32.div_ceil(block_size);
        Self {
            block_size,
            data: vec![0u8; (reserved * block_size) as usize],
            next_block: reserved,
        }
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn alloc(&mut self, count: u32) -> u32 {
        let start = self.next_block;
        self.next_block += count;
        let end = (self.next_block * self.block_size) as usize;
        if self.data.len() < end {
            self.data.resize(end, 0);
        }
        start
    }

    pub fn blocks_for(&self, len: usize) -> u32 {
        (len as u64).div_ceil(self.block_size as u64).max(1) as u32
    }

    /// 把 `bytes` 依次写进 `extents` 覆盖的块
    pub fn write_fork(&mut self, bytes: &[u8], extents: &[(u32, u32)]) {
        let bs = self.block_size as usize;
        let mut pos = 0;
        for &(start, count) in extents {
            for b in 0..count as usize {
                if pos >= bytes.len() {
                    return;
                }
                let n = std::cmp::min(bs, bytes.len() - pos);
                let off = (start as usize + b) * bs;
                self.data[off..off + n].copy_from_slice(&bytes[pos..pos + n]);
                pos += n;
            }
        }
        assert!(pos >= bytes.len(), "extents too small for data");
    }

    /// 连续存放
    pub fn store(&mut self, bytes: &[u8]) -> ForkSpec {
        let count = self.blocks_for(bytes.len());
        let start = self.alloc(count);
        self.write_fork(bytes, &[(start, count)]);
        ForkSpec::new(bytes.len() as u64, &[(start, count)])
    }

    /// 按 `piece` 块一段分散存放，段与段之间空一块，返回全部 extent
    pub fn store_fragmented(&mut self, bytes: &[u8], piece: u32) -> Vec<(u32, u32)> {
        let mut remaining = self.blocks_for(bytes.len());
        let mut extents = Vec::new();
        while remaining > 0 {
            let count = std::cmp::min(piece, remaining);
            extents.push((self.alloc(count), count));
            self.alloc(1);
            remaining -= count;
        }
        self.write_fork(bytes, &extents);
        extents
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

// ---------------------------------------------------------------------------
// 节点与 B-tree
// ---------------------------------------------------------------------------

pub const LEAF: i8 = -1;
pub const INDEX: i8 = 0;
pub const HEADER: i8 = 1;

/// 编码一个节点：描述符 + 记录 + 末尾的偏移表
pub fn encode_node(
    kind: i8,
    height: u8,
    f_link: u32,
    b_link: u32,
    records: &[Vec<u8>],
    node_size: u16,
) -> Vec<u8> {
    let size = node_size as usize;
    let mut node = vec![0u8; size];
    put_u32(&mut node, 0, f_link);
    put_u32(&mut node, 4, b_link);
    node[8] = kind as u8;
    node[9] = height;
    put_u16(&mut node, 10, records.len() as u16);

    let mut offset = 14usize;
    for (i, rec) in records.iter().enumerate() {
        put_u16(&mut node, size - 2 * (i + 1), offset as u16);
        node[offset..offset + rec.len()].copy_from_slice(rec);
        offset += rec.len();
    }
    let table = 2 * (records.len() + 1);
    assert!(offset <= size - table, "records overflow node");
    put_u16(&mut node, size - table, offset as u16);
    node
}

/// 树的形状参数
#[derive(Debug, Clone, Copy)]
pub struct TreeOptions {
    pub node_size: u16,
    pub max_key_length: u16,
    pub key_compare_type: u8,
    /// 每个叶子最多放几条记录（同时受节点大小限制）
    pub leaf_capacity: usize,
    /// 每个索引节点最多几个子节点
    pub fanout: usize,
    pub variable_index_keys: bool,
}

impl TreeOptions {
    pub fn catalog() -> Self {
        Self {
            node_size: NODE_SIZE,
            max_key_length: 516,
            key_compare_type: 0xCF,
            leaf_capacity: usize::MAX,
            fanout: usize::MAX,
            variable_index_keys: true,
        }
    }

    pub fn extents() -> Self {
        Self {
            node_size: 512,
            max_key_length: 10,
            key_compare_type: 0,
            leaf_capacity: usize::MAX,
            fanout: usize::MAX,
            variable_index_keys: false,
        }
    }

    pub fn attributes() -> Self {
        Self {
            node_size: NODE_SIZE,
            max_key_length: 266,
            key_compare_type: 0,
            leaf_capacity: usize::MAX,
            fanout: usize::MAX,
            variable_index_keys: true,
        }
    }

    pub fn leaf_capacity(mut self, n: usize) -> Self {
        self.leaf_capacity = n;
        self
    }

    pub fn fanout(mut self, n: usize) -> Self {
        self.fanout = n;
        self
    }
}

fn keyed(key: &[u8], tail: &[u8]) -> Vec<u8> {
    let mut rec = Vec::with_capacity(2 + key.len() + tail.len());
    rec.extend_from_slice(&(key.len() as u16).to_be_bytes());
    rec.extend_from_slice(key);
    rec.extend_from_slice(tail);
    rec
}

/// 按容量把记录分组成节点
fn pack(records: Vec<(Vec<u8>, Vec<u8>)>, capacity: usize, node_size: u16) -> Vec<Vec<(Vec<u8>, Vec<u8>)>> {
    let room = node_size as usize - 14;
    let mut groups: Vec<Vec<(Vec<u8>, Vec<u8>)>> = Vec::new();
    let mut used = 2;
    for (first, rec) in records {
        let need = rec.len() + 2;
        let full = groups
            .last()
            .map_or(true, |g| g.len() >= capacity || used + need > room);
        if full {
            groups.push(Vec::new());
            used = 2;
        }
        used += need;
        groups.last_mut().unwrap().push((first, rec));
    }
    groups
}

/// 把已排序的 (键内容, 数据) 编码成一棵完整的树文件
///
/// 节点 0 为 header，随后是叶子，再往后逐层是索引节点，最后一个是根。
pub fn build_tree(records: &[(Vec<u8>, Vec<u8>)], opts: TreeOptions) -> Vec<u8> {
    let leaf_records: Vec<(Vec<u8>, Vec<u8>)> = records
        .iter()
        .map(|(key, value)| (key.clone(), keyed(key, value)))
        .collect();
    let leaves = pack(leaf_records, opts.leaf_capacity, opts.node_size);

    let mut nodes: Vec<Vec<u8>> = vec![Vec::new()];
    let mut level: Vec<(Vec<u8>, u32)> = Vec::new();
    let first_leaf = if leaves.is_empty() { 0 } else { 1 };
    let leaf_count = leaves.len() as u32;
    for (i, group) in leaves.iter().enumerate() {
        let index = i as u32 + 1;
        let f_link = if index < leaf_count { index + 1 } else { 0 };
        let b_link = index - 1;
        let recs: Vec<Vec<u8>> = group.iter().map(|(_, r)| r.clone()).collect();
        nodes.push(encode_node(LEAF, 1, f_link, b_link, &recs, opts.node_size));
        level.push((group[0].0.clone(), index));
    }

    let mut depth = if leaves.is_empty() { 0 } else { 1 };
    while level.len() > 1 {
        depth += 1;
        let index_records: Vec<(Vec<u8>, Vec<u8>)> = level
            .iter()
            .map(|(key, child)| {
                let mut k = key.clone();
                if !opts.variable_index_keys {
                    k.resize(opts.max_key_length as usize, 0);
                }
                let mut rec = keyed(&k, &child.to_be_bytes());
                // 固定长度索引键：长度字段写实际键长
                put_u16(&mut rec, 0, key.len() as u16);
                (key.clone(), rec)
            })
            .collect();

        let mut next = Vec::new();
        for group in pack(index_records, opts.fanout, opts.node_size) {
            let index = nodes.len() as u32;
            let recs: Vec<Vec<u8>> = group.iter().map(|(_, r)| r.clone()).collect();
            nodes.push(encode_node(INDEX, depth as u8, 0, 0, &recs, opts.node_size));
            next.push((group[0].0.clone(), index));
        }
        level = next;
    }

    let root = level.first().map_or(0, |(_, index)| *index);
    let total_nodes = nodes.len() as u32;

    let mut header = vec![0u8; 106];
    put_u16(&mut header, 0, depth as u16);
    put_u32(&mut header, 2, root);
    put_u32(&mut header, 6, records.len() as u32);
    put_u32(&mut header, 10, first_leaf);
    put_u32(&mut header, 14, leaf_count);
    put_u16(&mut header, 18, opts.node_size);
    put_u16(&mut header, 20, opts.max_key_length);
    put_u32(&mut header, 22, total_nodes);
    put_u32(&mut header, 26, 0);
    put_u32(&mut header, 32, opts.node_size as u32);
    header[37] = opts.key_compare_type;
    let attributes = if opts.variable_index_keys { 0x6 } else { 0x2 };
    put_u32(&mut header, 38, attributes);

    let user = vec![0u8; 128];
    let map = vec![0u8; opts.node_size as usize - 14 - 106 - 128 - 8];
    nodes[0] = encode_node(HEADER, 0, 0, 0, &[header, user, map], opts.node_size);

    nodes.concat()
}

// ---------------------------------------------------------------------------
// catalog
// ---------------------------------------------------------------------------

enum CatalogValue {
    Folder { id: u32 },
    File { id: u32, data: ForkSpec, rsrc: ForkSpec, finder: Finder },
    Thread { folder: bool, parent: u32, name: String },
}

/// 文件记录的 Finder 类型、创建者和 BSD special 字段
#[derive(Debug, Clone, Copy)]
pub struct Finder {
    pub file_type: [u8; 4],
    pub creator: [u8; 4],
    pub special: u32,
}

impl Default for Finder {
    fn default() -> Self {
        Self {
            file_type: *b"TEXT",
            creator: *b"ttxt",
            special: 0,
        }
    }
}

struct CatalogItem {
    parent: u32,
    name: String,
    value: CatalogValue,
}

/// catalog 记录集合，编号从 16 开始分配
pub struct CatalogBuilder {
    items: Vec<CatalogItem>,
    next_id: u32,
}

impl CatalogBuilder {
    pub fn new(volume_name: &str) -> Self {
        let mut builder = Self {
            items: Vec::new(),
            next_id: 16,
        };
        builder.push_folder(1, volume_name, 2);
        builder
    }

    fn push_folder(&mut self, parent: u32, name: &str, id: u32) {
        self.items.push(CatalogItem {
            parent,
            name: name.to_string(),
            value: CatalogValue::Folder { id },
        });
        self.items.push(CatalogItem {
            parent: id,
            name: String::new(),
            value: CatalogValue::Thread {
                folder: true,
                parent,
                name: name.to_string(),
            },
        });
    }

    pub fn add_folder(&mut self, parent: u32, name: &str) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.push_folder(parent, name, id);
        id
    }

    pub fn add_file(&mut self, parent: u32, name: &str, data: ForkSpec, rsrc: ForkSpec) -> u32 {
        self.add_file_with(parent, name, data, rsrc, Finder::default())
    }

    /// 文件硬链接：`hlnk`/`hfs+`，special 为 inode 编号，两个 fork 都为空
    pub fn add_file_link(&mut self, parent: u32, name: &str, inode: u32) -> u32 {
        let finder = Finder {
            file_type: *b"hlnk",
            creator: *b"hfs+",
            special: inode,
        };
        self.add_file_with(parent, name, ForkSpec::default(), ForkSpec::default(), finder)
    }

    /// 目录硬链接：`fdrp`/`MACS`
    pub fn add_dir_link(&mut self, parent: u32, name: &str, inode: u32) -> u32 {
        let finder = Finder {
            file_type: *b"fdrp",
            creator: *b"MACS",
            special: inode,
        };
        self.add_file_with(parent, name, ForkSpec::default(), ForkSpec::default(), finder)
    }

    pub fn add_file_with(
        &mut self,
        parent: u32,
        name: &str,
        data: ForkSpec,
        rsrc: ForkSpec,
        finder: Finder,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(CatalogItem {
            parent,
            name: name.to_string(),
            value: CatalogValue::File {
                id,
                data,
                rsrc,
                finder,
            },
        });
        self.items.push(CatalogItem {
            parent: id,
            name: String::new(),
            value: CatalogValue::Thread {
                folder: false,
                parent,
                name: name.to_string(),
            },
        });
        id
    }

    pub fn file_count(&self) -> u32 {
        self.items
            .iter()
            .filter(|i| matches!(i.value, CatalogValue::File { .. }))
            .count() as u32
    }

    pub fn folder_count(&self) -> u32 {
        self.items
            .iter()
            .filter(|i| matches!(i.value, CatalogValue::Folder { .. }))
            .count() as u32
    }

    /// 按 catalog 键序排好的 (键内容, 数据)
    pub fn encode(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut items: Vec<&CatalogItem> = self.items.iter().collect();
        items.sort_by(|a, b| {
            a.parent
                .cmp(&b.parent)
                .then_with(|| compare_case_folding(&units(&a.name), &units(&b.name)))
        });

        items
            .iter()
            .map(|item| {
                let key = catalog_key(item.parent, &item.name);
                let value = match &item.value {
                    CatalogValue::Folder { id } => {
                        let valence = self
                            .items
                            .iter()
                            .filter(|c| c.parent == *id && !matches!(c.value, CatalogValue::Thread { .. }))
                            .count() as u32;
                        folder_record(*id, valence)
                    }
                    CatalogValue::File {
                        id,
                        data,
                        rsrc,
                        finder,
                    } => file_record_with(*id, data, rsrc, finder),
                    CatalogValue::Thread { folder, parent, name } => {
                        thread_record(*folder, *parent, name)
                    }
                };
                (key, value)
            })
            .collect()
    }
}

pub fn unistr(name: &str) -> Vec<u8> {
    let u = units(name);
    let mut buf = Vec::with_capacity(2 + u.len() * 2);
    buf.extend_from_slice(&(u.len() as u16).to_be_bytes());
    for unit in u {
        buf.extend_from_slice(&unit.to_be_bytes());
    }
    buf
}

pub fn catalog_key(parent: u32, name: &str) -> Vec<u8> {
    let mut key = parent.to_be_bytes().to_vec();
    key.extend_from_slice(&unistr(name));
    key
}

pub fn folder_record(id: u32, valence: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 88];
    put_u16(&mut buf, 0, 1);
    put_u32(&mut buf, 4, valence);
    put_u32(&mut buf, 8, id);
    put_u32(&mut buf, 12, 3_600_000_000);
    put_u32(&mut buf, 16, 3_600_000_100);
    put_u16(&mut buf, 42, 0o040755);
    buf
}

pub fn file_record(id: u32, data: &ForkSpec, rsrc: &ForkSpec) -> Vec<u8> {
    file_record_with(id, data, rsrc, &Finder::default())
}

pub fn file_record_with(id: u32, data: &ForkSpec, rsrc: &ForkSpec, finder: &Finder) -> Vec<u8> {
    let mut buf = vec![0u8; 248];
    put_u16(&mut buf, 0, 2);
    put_u32(&mut buf, 8, id);
    put_u32(&mut buf, 12, 3_600_000_000);
    put_u32(&mut buf, 16, 3_600_000_200);
    put_u16(&mut buf, 42, 0o100644);
    put_u32(&mut buf, 44, finder.special);
    buf[48..52].copy_from_slice(&finder.file_type);
    buf[52..56].copy_from_slice(&finder.creator);
    buf[88..168].copy_from_slice(&data.encode());
    buf[168..248].copy_from_slice(&rsrc.encode());
    buf
}

pub fn thread_record(folder: bool, parent: u32, name: &str) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    put_u16(&mut buf, 0, if folder { 3 } else { 4 });
    put_u32(&mut buf, 4, parent);
    buf.extend_from_slice(&unistr(name));
    buf
}

// ---------------------------------------------------------------------------
// extents 与 attributes
// ---------------------------------------------------------------------------

fn fork_type(kind: ForkKind) -> u8 {
    match kind {
        ForkKind::Data => 0x00,
        ForkKind::Resource => 0xFF,
    }
}

pub fn extent_key(kind: ForkKind, file_id: u32, start_block: u32) -> Vec<u8> {
    let mut key = vec![fork_type(kind), 0];
    key.extend_from_slice(&file_id.to_be_bytes());
    key.extend_from_slice(&start_block.to_be_bytes());
    key
}

pub fn extent_record(extents: &[(u32, u32)]) -> Vec<u8> {
    assert!(extents.len() <= 8);
    let mut buf = vec![0u8; 64];
    for (i, &(start, count)) in extents.iter().enumerate() {
        put_u32(&mut buf, i * 8, start);
        put_u32(&mut buf, i * 8 + 4, count);
    }
    buf
}

pub fn attribute_key(file_id: u32, start_block: u32, name: &str) -> Vec<u8> {
    let mut key = vec![0, 0];
    key.extend_from_slice(&file_id.to_be_bytes());
    key.extend_from_slice(&start_block.to_be_bytes());
    key.extend_from_slice(&unistr(name));
    key
}

pub fn inline_attribute(data: &[u8]) -> Vec<u8> {
    let mut buf = vec![0u8; 16];
    put_u32(&mut buf, 0, 0x10);
    put_u32(&mut buf, 12, data.len() as u32);
    buf.extend_from_slice(data);
    if buf.len() % 2 == 1 {
        buf.push(0);
    }
    buf
}

pub fn fork_attribute(fork: &ForkSpec) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    put_u32(&mut buf, 0, 0x20);
    buf.extend_from_slice(&fork.encode());
    buf
}

pub fn extents_attribute(extents: &[(u32, u32)]) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    put_u32(&mut buf, 0, 0x30);
    buf.extend_from_slice(&extent_record(extents));
    buf
}

// ---------------------------------------------------------------------------
// decmpfs
// ---------------------------------------------------------------------------

/// `com.apple.decmpfs` 属性值：16 字节小端头部加上数据
pub fn decmpfs_attr(kind: u32, size: u64, payload: &[u8]) -> Vec<u8> {
    let mut buf = b"fpmc".to_vec();
    buf.extend_from_slice(&kind.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf.extend_from_slice(payload);
    buf
}

/// `cmpf` 资源内容：小端块表加上各块数据
pub fn cmpf_content(blocks: &[Vec<u8>]) -> Vec<u8> {
    let mut table = (blocks.len() as u32).to_le_bytes().to_vec();
    let mut body = Vec::new();
    let mut offset = 4 + 8 * blocks.len();
    for block in blocks {
        table.extend_from_slice(&(offset as u32).to_le_bytes());
        table.extend_from_slice(&(block.len() as u32).to_le_bytes());
        body.extend_from_slice(block);
        offset += block.len();
    }
    table.extend_from_slice(&body);
    table
}

/// 只含一个资源的资源 fork
pub fn resource_fork(res_type: [u8; 4], content: &[u8]) -> Vec<u8> {
    let data_offset = 256usize;
    let data_len = 4 + content.len();
    let map_offset = data_offset + data_len;

    // 映射头 28 字节，类型列表 2 + 8 字节，引用项 12 字节
    let mut map = vec![0u8; 28];
    put_u16(&mut map, 24, 28);
    put_u16(&mut map, 26, 50);
    map.extend_from_slice(&0u16.to_be_bytes());
    map.extend_from_slice(&res_type);
    map.extend_from_slice(&0u16.to_be_bytes());
    map.extend_from_slice(&10u16.to_be_bytes());
    map.extend_from_slice(&128u16.to_be_bytes());
    map.extend_from_slice(&0xFFFFu16.to_be_bytes());
    map.extend_from_slice(&[0, 0, 0, 0]);
    map.extend_from_slice(&[0, 0, 0, 0]);

    let mut fork = vec![0u8; data_offset];
    put_u32(&mut fork, 0, data_offset as u32);
    put_u32(&mut fork, 4, map_offset as u32);
    put_u32(&mut fork, 8, data_len as u32);
    put_u32(&mut fork, 12, map.len() as u32);
    map[..16].copy_from_slice(&fork[..16]);

    fork.extend_from_slice(&(content.len() as u32).to_be_bytes());
    fork.extend_from_slice(content);
    fork.extend_from_slice(&map);
    fork
}

// ---------------------------------------------------------------------------
// 整卷
// ---------------------------------------------------------------------------

struct OverflowEntry {
    kind: ForkKind,
    file_id: u32,
    start_block: u32,
    extents: Vec<(u32, u32)>,
}

struct AttributeEntry {
    file_id: u32,
    start_block: u32,
    name: String,
    value: Vec<u8>,
}

/// 整卷构造器
pub struct VolumeBuilder {
    pub image: ImageBuilder,
    pub catalog: CatalogBuilder,
    pub catalog_options: TreeOptions,
    pub extents_options: TreeOptions,
    /// catalog 文件按多少块一段分散存放，None 表示连续
    pub catalog_piece: Option<u32>,
    overflow: Vec<OverflowEntry>,
    attributes: Vec<AttributeEntry>,
}

impl VolumeBuilder {
    pub fn new(block_size: u32, volume_name: &str) -> Self {
        Self {
            image: ImageBuilder::new(block_size),
            catalog: CatalogBuilder::new(volume_name),
            catalog_options: TreeOptions::catalog(),
            extents_options: TreeOptions::extents(),
            catalog_piece: None,
            overflow: Vec::new(),
            attributes: Vec::new(),
        }
    }

    /// 登记一条溢出 extent 记录
    pub fn add_overflow(&mut self, kind: ForkKind, file_id: u32, start_block: u32, extents: &[(u32, u32)]) {
        self.overflow.push(OverflowEntry {
            kind,
            file_id,
            start_block,
            extents: extents.to_vec(),
        });
    }

    pub fn add_inline_xattr(&mut self, file_id: u32, name: &str, data: &[u8]) {
        self.attributes.push(AttributeEntry {
            file_id,
            start_block: 0,
            name: name.to_string(),
            value: inline_attribute(data),
        });
    }

    pub fn add_fork_xattr(&mut self, file_id: u32, name: &str, fork: &ForkSpec) {
        self.attributes.push(AttributeEntry {
            file_id,
            start_block: 0,
            name: name.to_string(),
            value: fork_attribute(fork),
        });
    }

    pub fn add_xattr_extents(&mut self, file_id: u32, name: &str, start_block: u32, extents: &[(u32, u32)]) {
        self.attributes.push(AttributeEntry {
            file_id,
            start_block,
            name: name.to_string(),
            value: extents_attribute(extents),
        });
    }

    fn extents_records(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries: Vec<&OverflowEntry> = self.overflow.iter().collect();
        entries.sort_by_key(|e| (e.file_id, fork_type(e.kind), e.start_block));
        entries
            .iter()
            .map(|e| {
                (
                    extent_key(e.kind, e.file_id, e.start_block),
                    extent_record(&e.extents),
                )
            })
            .collect()
    }

    fn attribute_records(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        let mut entries: Vec<&AttributeEntry> = self.attributes.iter().collect();
        entries.sort_by(|a, b| {
            a.file_id
                .cmp(&b.file_id)
                .then_with(|| units(&a.name).cmp(&units(&b.name)))
                .then_with(|| a.start_block.cmp(&b.start_block))
        });
        entries
            .iter()
            .map(|e| (attribute_key(e.file_id, e.start_block, &e.name), e.value.clone()))
            .collect()
    }

    pub fn build(mut self) -> Vec<u8> {
        let catalog_tree = build_tree(&self.catalog.encode(), self.catalog_options);
        let catalog_fork = match self.catalog_piece {
            None => self.image.store(&catalog_tree),
            Some(piece) => {
                let extents = self.image.store_fragmented(&catalog_tree, piece);
                let total: u32 = extents.iter().map(|e| e.1).sum();
                let inline = &extents[..std::cmp::min(8, extents.len())];
                let mut start = inline.iter().map(|e| e.1).sum::<u32>();
                for batch in extents[inline.len()..].chunks(8) {
                    self.add_overflow(ForkKind::Data, 4, start, batch);
                    start += batch.iter().map(|e| e.1).sum::<u32>();
                }
                ForkSpec::with_total(catalog_tree.len() as u64, inline, total)
            }
        };

        let extents_tree = build_tree(&self.extents_records(), self.extents_options);
        let extents_fork = self.image.store(&extents_tree);

        let attributes_fork = if self.attributes.is_empty() {
            ForkSpec::default()
        } else {
            let tree = build_tree(&self.attribute_records(), TreeOptions::attributes());
            self.image.store(&tree)
        };

        let block_size = self.image.block_size();
        let files = self.catalog.file_count();
        let folders = self.catalog.folder_count() - 1;
        let mut data = self.image.into_bytes();
        let total_blocks = (data.len() as u32) / block_size;

        let vh = &mut data[1024..1536];
        put_u16(vh, 0, 0x482B);
        put_u16(vh, 2, 4);
        put_u32(vh, 4, 1 << 8);
        put_u32(vh, 32, files);
        put_u32(vh, 36, folders);
        put_u32(vh, 40, block_size);
        put_u32(vh, 44, total_blocks);
        put_u32(vh, 48, 0);
        put_u32(vh, 64, 1000);
        vh[192..272].copy_from_slice(&extents_fork.encode());
        vh[272..352].copy_from_slice(&catalog_fork.encode());
        vh[352..432].copy_from_slice(&attributes_fork.encode());
        data
    }
}

/// 在 `image` 前面拼接 `offset` 字节的填充（模拟分区偏移）
pub fn with_partition_offset(image: Vec<u8>, offset: usize) -> Vec<u8> {
    let mut data = vec![0u8; offset];
    data.extend_from_slice(&image);
    data
}

/// 按 catalog 的大小写折叠规则排序名称
pub fn sort_names(names: &mut [String]) {
    names.sort_by(|a, b| match compare_case_folding(&units(a), &units(b)) {
        Ordering::Equal => a.cmp(b),
        other => other,
    });
}
