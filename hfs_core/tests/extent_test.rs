//! Extent 解析与 fork 读取集成测试
//!
//! - 溢出 extent 按批次查找
//! - 按不同块大小读取 fork 结果一致
//! - 逐字节读取与整块读取一致，逻辑末尾之后读不到数据

mod common;

use common::{block_dev, pattern, ForkSpec, VolumeBuilder};
use hfs_core::{
    CatalogNodeId, ErrorKind, ExtentDescriptor, FileRecord, ForkKind, HfsFileSystem, MountOptions,
};

const BIG_SIZE: usize = 1_000_000;

struct BigFile {
    image: Vec<u8>,
    data: Vec<u8>,
    id: u32,
    batches: [(u32, u32); 5],
}

/// 4096 字节块的卷：16 块内联，两批各 2 × 100 块溢出，物理上乱序摆放
fn big_file_volume() -> BigFile {
    let mut vb = VolumeBuilder::new(4096, "Big");
    vb.extents_options = vb.extents_options.leaf_capacity(1);

    let inline = vb.image.alloc(16);
    let c = vb.image.alloc(100);
    vb.image.alloc(2);
    let d = vb.image.alloc(100);
    vb.image.alloc(1);
    let a = vb.image.alloc(100);
    vb.image.alloc(3);
    let b = vb.image.alloc(100);

    let extents = [(inline, 16), (a, 100), (b, 100), (c, 100), (d, 100)];
    let data = pattern(BIG_SIZE);
    vb.image.write_fork(&data, &extents);

    let fork = ForkSpec::with_total(BIG_SIZE as u64, &[(inline, 16)], 416);
    let id = vb.catalog.add_file(2, "big.bin", fork, ForkSpec::default());
    vb.add_overflow(ForkKind::Data, id, 16, &[(a, 100), (b, 100)]);
    vb.add_overflow(ForkKind::Data, id, 216, &[(c, 100), (d, 100)]);
    // 同一文件资源 fork 的记录不能被数据 fork 的查找命中
    vb.add_overflow(ForkKind::Resource, id, 16, &[(inline, 1)]);

    BigFile {
        image: vb.build(),
        data,
        id,
        batches: extents,
    }
}

fn big_file(fs: &HfsFileSystem<common::MemDevice>) -> FileRecord {
    let entry = fs.lookup("/big.bin").unwrap();
    entry.value.as_file().unwrap().clone()
}

#[test]
fn test_overflow_batches() {
    println!("\n=== 测试 1: 溢出 extent 批次 ===");

    let vol = big_file_volume();
    let fs = HfsFileSystem::mount(block_dev(vol.image), MountOptions::default()).unwrap();
    let file = big_file(&fs);
    assert_eq!(file.file_id, CatalogNodeId(vol.id));

    let batches = fs
        .extents()
        .extent_batches(file.file_id, ForkKind::Data, &file.data_fork)
        .unwrap();
    assert_eq!(batches.len(), 3);

    let [inline, a, b, c, d] = vol.batches.map(|(s, n)| ExtentDescriptor::new(s, n));
    assert_eq!(batches[0], vec![inline]);
    assert_eq!(batches[1], vec![a, b]);
    assert_eq!(batches[2], vec![c, d]);

    let blocks: u64 = batches.iter().flatten().map(|e| e.block_count as u64).sum();
    assert!(blocks >= 245);
    assert!(blocks * 4096 >= BIG_SIZE as u64);

    let all = fs
        .extents()
        .all_extents(file.file_id, ForkKind::Data, &file.data_fork)
        .unwrap();
    assert_eq!(all, vec![inline, a, b, c, d]);

    println!("✓ {} 批，共 {} 块", batches.len(), blocks);
}

#[test]
fn test_point_lookup_in_extents_tree() {
    let vol = big_file_volume();
    let fs = HfsFileSystem::mount(block_dev(vol.image), MountOptions::default()).unwrap();
    let tree = fs.extents();

    let header = tree.header().unwrap();
    assert_eq!(header.leaf_records, 3);
    assert_eq!(header.tree_depth, 2);

    let key = hfs_core::ExtentKey::new(ForkKind::Data, CatalogNodeId(vol.id), 216);
    let record = tree.get_overflow_extent(&key).unwrap().unwrap();
    assert_eq!(record[0], ExtentDescriptor::new(vol.batches[3].0, 100));
    assert_eq!(record[2], ExtentDescriptor::default());

    let missing = hfs_core::ExtentKey::new(ForkKind::Data, CatalogNodeId(vol.id), 17);
    assert!(tree.get_overflow_extent(&missing).unwrap().is_none());

    let below_all = hfs_core::ExtentKey::new(ForkKind::Data, CatalogNodeId(1), 0);
    assert!(tree.get_overflow_extent(&below_all).unwrap().is_none());
}

#[test]
fn test_missing_overflow_record_is_corrupted() {
    let mut vb = VolumeBuilder::new(4096, "Broken");
    let inline = vb.image.alloc(4);
    let fork = ForkSpec::with_total(10 * 4096, &[(inline, 4)], 10);
    vb.catalog.add_file(2, "short.bin", fork, ForkSpec::default());

    let fs = HfsFileSystem::mount(block_dev(vb.build()), MountOptions::default()).unwrap();
    let err = match fs.open_fork("/short.bin", ForkKind::Data) {
        Ok(_) => panic!("fork without overflow records opened"),
        Err(err) => err,
    };
    assert!(err.is_corrupted());
}

#[test]
fn test_chunked_reads_identical() {
    println!("\n=== 测试 2: 不同块大小读取 ===");

    let vol = big_file_volume();
    let fs = HfsFileSystem::mount(block_dev(vol.image), MountOptions::default()).unwrap();

    let read_with = |chunk: usize| {
        let mut reader = fs.open_fork("/big.bin", ForkKind::Data).unwrap();
        let mut out = Vec::new();
        let mut buf = vec![0u8; chunk];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        out
    };

    let small = read_with(4097);
    let large = read_with(65_536);
    assert_eq!(small.len(), BIG_SIZE);
    assert_eq!(small, large);
    assert_eq!(small, vol.data);

    assert_eq!(fs.read_file("/big.bin").unwrap(), vol.data);
    println!("✓ 4097 与 65536 字节读取结果相同");
}

#[test]
fn test_byte_reads_match_chunked() {
    println!("\n=== 测试 3: 逐字节读取 ===");

    let mut vb = VolumeBuilder::new(512, "Small");
    let data = pattern(1500);
    let extents = vb.image.store_fragmented(&data, 1);
    assert_eq!(extents.len(), 3);
    vb.catalog
        .add_file(2, "frag.txt", ForkSpec::new(1500, &extents), ForkSpec::default());

    let fs = HfsFileSystem::mount(block_dev(vb.build()), MountOptions::default()).unwrap();

    let mut reader = fs.open_fork("/frag.txt", ForkKind::Data).unwrap();
    assert_eq!(reader.len(), 1500);
    let mut bytes = Vec::new();
    let mut one = [0u8; 1];
    while reader.read(&mut one).unwrap() == 1 {
        bytes.push(one[0]);
    }
    assert_eq!(bytes, data);

    let mut reader = fs.open_fork("/frag.txt", ForkKind::Data).unwrap();
    let mut chunked = Vec::new();
    let mut buf = [0u8; 7];
    loop {
        let n = reader.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        chunked.extend_from_slice(&buf[..n]);
    }
    assert_eq!(chunked, bytes);

    // 逻辑末尾之后
    assert_eq!(reader.seek(1500).unwrap(), 1500);
    assert_eq!(reader.read(&mut buf).unwrap(), 0);
    assert_eq!(reader.seek(1501).unwrap_err().kind(), ErrorKind::InvalidInput);

    // 跨 extent 边界的随机位置
    reader.seek(510).unwrap();
    let mut span = [0u8; 4];
    reader.read_exact(&mut span).unwrap();
    assert_eq!(&span, &data[510..514]);

    println!("✓ 逐字节读取 {} 字节", bytes.len());
}

#[test]
fn test_resource_fork_is_separate() {
    let mut vb = VolumeBuilder::new(512, "Forks");
    let data = b"data fork contents".to_vec();
    let rsrc = pattern(700);
    let data_fork = vb.image.store(&data);
    let rsrc_fork = vb.image.store(&rsrc);
    vb.catalog.add_file(2, "both", data_fork, rsrc_fork);

    let fs = HfsFileSystem::mount(block_dev(vb.build()), MountOptions::default()).unwrap();
    assert_eq!(fs.read_file("/both").unwrap(), data);

    let mut reader = fs.open_fork("/both", ForkKind::Resource).unwrap();
    assert_eq!(reader.read_to_end().unwrap(), rsrc);

    let meta = fs.metadata("/both").unwrap();
    assert_eq!(meta.size, data.len() as u64);
    assert_eq!(meta.resource_size, 700);
}
