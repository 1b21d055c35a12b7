//! 物理块缓存
//!
//! 固定容量，以物理块号为键。淘汰策略按访问次数加最近访问时间，
//! 另有年龄上限：超过 `max_age` 次缓存访问未被命中的条目无论访问次数
//! 多高都优先淘汰。`no_std` 下没有时钟，年龄以缓存访问计数衡量。
//!
//! 本系统从不写入，所以缓存不会被隐式失效，只能通过
//! [`BlockDev::set_cache`](super::BlockDev::set_cache) 重新配置。

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

struct CacheEntry {
    data: Vec<u8>,
    access_count: u64,
    last_access: u64,
}

/// 块缓存
///
/// 除按块号的主索引外，另维护两个有序索引：按最近访问时间和按
/// (访问次数, 最近访问时间)。访问时间互不相同，淘汰只需取其中一个
/// 索引的最小项。
pub struct BlockCache {
    capacity: usize,
    max_age: u64,
    clock: u64,
    entries: BTreeMap<u64, CacheEntry>,
    /// (last_access, lba)
    by_age: BTreeSet<(u64, u64)>,
    /// (access_count, last_access, lba)
    by_use: BTreeSet<(u64, u64, u64)>,
    hits: u64,
    misses: u64,
}

impl BlockCache {
    /// 创建块缓存
    ///
    /// # 参数
    ///
    /// * `capacity` - 最多缓存的物理块数（至少为 1）
    /// * `max_age` - 年龄上限（缓存访问次数）
    pub fn new(capacity: usize, max_age: u64) -> Self {
        Self {
            capacity: capacity.max(1),
            max_age,
            clock: 0,
            entries: BTreeMap::new(),
            by_age: BTreeSet::new(),
            by_use: BTreeSet::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// 容量
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 当前缓存的块数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 命中次数
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// 未命中次数
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// 块是否在缓存中（不计入访问）
    pub fn contains(&self, lba: u64) -> bool {
        self.entries.contains_key(&lba)
    }

    /// 查找块，命中时更新访问次数和访问时间
    pub fn get(&mut self, lba: u64) -> Option<&[u8]> {
        self.clock += 1;
        let clock = self.clock;
        match self.entries.get_mut(&lba) {
            Some(entry) => {
                self.hits += 1;
                self.by_age.remove(&(entry.last_access, lba));
                self.by_use.remove(&(entry.access_count, entry.last_access, lba));
                entry.access_count += 1;
                entry.last_access = clock;
                self.by_age.insert((clock, lba));
                self.by_use.insert((entry.access_count, clock, lba));
                Some(&entry.data)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// 放入一个块，缓存已满时淘汰一个条目
    pub fn insert(&mut self, lba: u64, data: Vec<u8>) {
        self.clock += 1;
        let clock = self.clock;

        if let Some(entry) = self.entries.get_mut(&lba) {
            self.by_age.remove(&(entry.last_access, lba));
            self.by_use.remove(&(entry.access_count, entry.last_access, lba));
            entry.data = data;
            entry.last_access = clock;
            self.by_age.insert((clock, lba));
            self.by_use.insert((entry.access_count, clock, lba));
            return;
        }

        if self.entries.len() >= self.capacity {
            if let Some(victim) = self.victim() {
                self.remove(victim);
            }
        }

        self.entries.insert(
            lba,
            CacheEntry {
                data,
                access_count: 1,
                last_access: clock,
            },
        );
        self.by_age.insert((clock, lba));
        self.by_use.insert((1, clock, lba));
    }

    fn remove(&mut self, lba: u64) {
        if let Some(entry) = self.entries.remove(&lba) {
            self.by_age.remove(&(entry.last_access, lba));
            self.by_use.remove(&(entry.access_count, entry.last_access, lba));
        }
    }

    /// 选出淘汰的块号
    ///
    /// 最久未访问的条目超过年龄上限时淘汰它，否则淘汰访问次数最少、
    /// 其次最久未访问的条目。
    fn victim(&self) -> Option<u64> {
        let &(oldest, lba) = self.by_age.first()?;
        if self.clock - oldest >= self.max_age {
            return Some(lba);
        }
        self.by_use.first().map(|&(_, _, lba)| lba)
    }
}
