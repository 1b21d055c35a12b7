//! 节点内查找
//!
//! 两个纯函数，只处理已解码、按键升序排列的记录。

use super::codec::Keyed;
use alloc::vec::Vec;
use core::cmp::Ordering;

/// 区间扫描结果
#[derive(Debug)]
pub struct RangeScan<'r, R> {
    /// 命中的记录（可能在最前面带上前驱）
    pub records: Vec<&'r R>,
    /// 是否有记录落在区间内
    pub found: bool,
}

/// 找出键不大于 `key` 的最大记录
///
/// 所有记录的键都大于 `key` 时返回 None。
pub fn find_le_key<'r, R, F>(records: &'r [R], key: &R::Key, compare: F) -> Option<&'r R>
where
    R: Keyed,
    F: Fn(&R::Key, &R::Key) -> Ordering,
{
    let mut best = None;
    for record in records {
        if compare(record.key(), key) == Ordering::Greater {
            break;
        }
        best = Some(record);
    }
    best
}

/// 区间扫描 `[min, max)`
///
/// 按顺序返回 `min <= key < max` 的记录。另外记下键小于 `min` 的最大记录
/// （前驱）：区间内没有记录，或 `strict` 为 false 时，前驱（若存在）被放在
/// 结果最前面。
///
/// 索引节点用 `strict = false`：前驱子树里可能含有区间内的叶子记录。
/// 叶子节点用 `strict = true`，此时只有 `found` 为 true 的结果才是数据。
///
/// # 参数
///
/// * `records` - 节点中的记录（键升序）
/// * `min` - 下界（包含）
/// * `max` - 上界（不包含）
/// * `strict` - 是否只在区间为空时才带上前驱
/// * `compare` - 键比较函数
pub fn find_le_keys<'r, R, F>(
    records: &'r [R],
    min: &R::Key,
    max: &R::Key,
    strict: bool,
    compare: F,
) -> RangeScan<'r, R>
where
    R: Keyed,
    F: Fn(&R::Key, &R::Key) -> Ordering,
{
    let mut predecessor = None;
    let mut matches = Vec::new();

    for record in records {
        let key = record.key();
        if compare(key, min) == Ordering::Less {
            predecessor = Some(record);
        } else if compare(key, max) == Ordering::Less {
            matches.push(record);
        } else {
            break;
        }
    }

    let found = !matches.is_empty();
    if !found || !strict {
        if let Some(pred) = predecessor {
            matches.insert(0, pred);
        }
    }

    RangeScan {
        records: matches,
        found,
    }
}
