//! 镜像级操作：打开镜像文件、导出 fork、遍历目录树。

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use hfs_core::{BlockDev, BlockDevice, DirEntry, ForkKind, HfsFileSystem, MountOptions};

use crate::blockdev::StreamDevice;
use crate::error::Context;
use crate::stream::ForkStream;

/// 基于镜像文件的 HFS+ 文件系统
pub type HfsImage = HfsFileSystem<StreamDevice<File>>;

/// 导出时每次读取的字节数
const COPY_CHUNK: usize = 64 * 1024;

/// 以默认参数打开镜像文件
///
/// # 示例
///
/// ```ignore
/// let fs = hfs_std::open_image("disk.img")?;
/// for entry in fs.read_dir("/")? {
///     println!("{}", entry.name);
/// }
/// ```
pub fn open_image<P: AsRef<Path>>(path: P) -> io::Result<HfsImage> {
    open_image_with(path, MountOptions::default())
}

/// 以指定参数打开镜像文件
///
/// # 参数
///
/// * `path` - 镜像文件路径
/// * `options` - 挂载参数（分区偏移、调试偏移、缓存）
pub fn open_image_with<P: AsRef<Path>>(path: P, options: MountOptions) -> io::Result<HfsImage> {
    let device = StreamDevice::open(path.as_ref())?;
    info!(
        "opening {} ({} bytes) at offset {}",
        path.as_ref().display(),
        device.size(),
        options.base_offset
    );
    HfsFileSystem::mount(BlockDev::new(device), options).context("mount")
}

/// 为路径上的文件打开 `Read + Seek` 流
pub fn open_stream<'a, D: BlockDevice>(
    fs: &'a HfsFileSystem<D>,
    path: &str,
    kind: ForkKind,
) -> io::Result<ForkStream<'a, D>> {
    let reader = fs.open_fork(path, kind).context(path)?;
    Ok(ForkStream::new(reader))
}

/// 把文件的某个 fork 写入 `writer`
///
/// # 返回
///
/// 写入的字节数，等于 fork 的逻辑长度
///
/// # 示例
///
/// ```ignore
/// let mut out = File::create("Icon.rsrc")?;
/// hfs_std::extract_fork(&fs, "/Applications/Tool", ForkKind::Resource, &mut out)?;
/// ```
pub fn extract_fork<D: BlockDevice, W: Write>(
    fs: &HfsFileSystem<D>,
    path: &str,
    kind: ForkKind,
    writer: &mut W,
) -> io::Result<u64> {
    let mut reader = fs.open_fork(path, kind).context(path)?;
    let expected = reader.len();
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;

    loop {
        let n = reader.read(&mut buf).context(path)?;
        if n == 0 {
            break;
        }
        writer.write_all(&buf[..n])?;
        written += n as u64;
    }

    if written != expected {
        warn!("{}: {} fork ended after {} of {} bytes", path, kind, written, expected);
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("{path}: fork truncated at {written} of {expected} bytes"),
        ));
    }

    debug!("extracted {} fork of {}: {} bytes", kind, path, written);
    Ok(written)
}

/// 递归列出 `root` 之下的全部目录项
///
/// 返回 (完整路径, 目录项)，目录先于其内容出现，同一目录内按键序排列。
/// 经目录硬链接再次遇到的目录只列出自身，不再展开。
pub fn walk<D: BlockDevice>(fs: &HfsFileSystem<D>, root: &str) -> io::Result<Vec<(String, DirEntry)>> {
    let base = root.trim_end_matches('/').to_string();
    let mut result = Vec::new();
    let mut visited = HashSet::new();
    let mut top = fs.read_dir(root).context(root)?;
    // 倒序存放，出栈时按键序处理
    top.reverse();
    let mut pending = vec![(base, top)];

    while let Some((dir, mut entries)) = pending.pop() {
        while let Some(entry) = entries.pop() {
            let path = format!("{}/{}", dir, entry.name);
            if entry.is_dir() && !visited.insert(entry.cnid) {
                warn!("{}: folder {} already listed", path, entry.cnid);
                result.push((path, entry));
                continue;
            }
            if entry.is_dir() {
                let mut children = fs.read_dir_id(entry.cnid).context("walk")?;
                children.reverse();
                result.push((path.clone(), entry));
                pending.push((dir, entries));
                pending.push((path, children));
                break;
            }
            result.push((path, entry));
        }
    }

    Ok(result)
}
