//! HFS+ 名称比较
//!
//! HFS+ catalog 默认忽略大小写比较名称，HFSX 可声明为逐码元二进制比较。
//! 忽略大小写时按 Apple 的 FastUnicodeCompare 规则，先用固定的小写
//! 映射表折叠每个 UTF-16 码元，并跳过一组可忽略的格式控制字符；
//! U+0000 排在所有字符之后。映射表不随 Unicode 版本变化。

use crate::types::KeyCompareMode;
use core::cmp::Ordering;

/// 小写映射表中的一段
enum Fold {
    /// 区间内每个码元加上固定差值
    Shift(u16, u16, u16),
    /// 区间内偶数码元映射到下一个奇数码元，奇数码元保持不变
    Pairs(u16, u16),
    /// 单个码元
    To(u16, u16),
    /// 可忽略的码元区间
    Ignore(u16, u16),
}

/// Apple FastUnicodeCompare 使用的小写映射（gLowerCaseTable）
///
/// Latin-1 区段的大写字母全部折叠；其余区段只折叠 Unicode 2.0 中没有
/// 规范分解的大写字母，带分解的字符在磁盘上已经以分解形式存放，
/// 保持原值。表外的码元不做映射。按码元升序排列。
const LOWER_CASE: &[Fold] = &[
    Fold::Shift(0x0041, 0x005A, 0x20),
    Fold::Shift(0x00C0, 0x00D6, 0x20),
    Fold::Shift(0x00D8, 0x00DE, 0x20),
    // Latin Extended-A
    Fold::To(0x0110, 0x0111),
    Fold::To(0x0126, 0x0127),
    Fold::To(0x0132, 0x0133),
    Fold::To(0x013F, 0x0140),
    Fold::To(0x0141, 0x0142),
    Fold::To(0x014A, 0x014B),
    Fold::To(0x0152, 0x0153),
    Fold::To(0x0166, 0x0167),
    // Latin Extended-B
    Fold::To(0x0181, 0x0253),
    Fold::To(0x0182, 0x0183),
    Fold::To(0x0184, 0x0185),
    Fold::To(0x0186, 0x0254),
    Fold::To(0x0187, 0x0188),
    Fold::To(0x0189, 0x0256),
    Fold::To(0x018A, 0x0257),
    Fold::To(0x018B, 0x018C),
    Fold::To(0x018E, 0x01DD),
    Fold::To(0x018F, 0x0259),
    Fold::To(0x0190, 0x025B),
    Fold::To(0x0191, 0x0192),
    Fold::To(0x0193, 0x0260),
    Fold::To(0x0194, 0x0263),
    Fold::To(0x0196, 0x0269),
    Fold::To(0x0197, 0x0268),
    Fold::To(0x0198, 0x0199),
    Fold::To(0x019C, 0x026F),
    Fold::To(0x019D, 0x0272),
    Fold::To(0x019F, 0x0275),
    Fold::To(0x01A2, 0x01A3),
    Fold::To(0x01A4, 0x01A5),
    Fold::To(0x01A7, 0x01A8),
    Fold::To(0x01A9, 0x0283),
    Fold::To(0x01AC, 0x01AD),
    Fold::To(0x01AE, 0x0288),
    Fold::To(0x01B1, 0x028A),
    Fold::To(0x01B2, 0x028B),
    Fold::To(0x01B3, 0x01B4),
    Fold::To(0x01B5, 0x01B6),
    Fold::To(0x01B7, 0x0292),
    Fold::To(0x01B8, 0x01B9),
    Fold::To(0x01BC, 0x01BD),
    Fold::To(0x01C4, 0x01C6),
    Fold::To(0x01C5, 0x01C6),
    Fold::To(0x01C7, 0x01C9),
    Fold::To(0x01C8, 0x01C9),
    Fold::To(0x01CA, 0x01CC),
    Fold::To(0x01CB, 0x01CC),
    Fold::To(0x01E4, 0x01E5),
    Fold::To(0x01F1, 0x01F3),
    Fold::To(0x01F2, 0x01F3),
    // 希腊字母
    Fold::Shift(0x0391, 0x03A1, 0x20),
    Fold::Shift(0x03A3, 0x03A9, 0x20),
    Fold::Pairs(0x03E2, 0x03EF),
    // 西里尔字母
    Fold::To(0x0402, 0x0452),
    Fold::Shift(0x0404, 0x0406, 0x50),
    Fold::Shift(0x0408, 0x040B, 0x50),
    Fold::To(0x040F, 0x045F),
    Fold::Shift(0x0410, 0x0418, 0x20),
    Fold::Shift(0x041A, 0x042F, 0x20),
    Fold::Pairs(0x0460, 0x0475),
    Fold::Pairs(0x0478, 0x0481),
    Fold::Pairs(0x0490, 0x04BF),
    Fold::To(0x04C3, 0x04C4),
    Fold::To(0x04C7, 0x04C8),
    Fold::To(0x04CB, 0x04CC),
    // 亚美尼亚字母
    Fold::Shift(0x0531, 0x0556, 0x30),
    // 格鲁吉亚字母
    Fold::Shift(0x10A0, 0x10C5, 0x30),
    // 零宽连接符、双向控制符等
    Fold::Ignore(0x200C, 0x200F),
    Fold::Ignore(0x202A, 0x202E),
    Fold::Ignore(0x206A, 0x206F),
    // 罗马数字
    Fold::Shift(0x2160, 0x216F, 0x10),
    Fold::Ignore(0xFEFF, 0xFEFF),
    // 全角拉丁字母
    Fold::Shift(0xFF21, 0xFF3A, 0x20),
];

impl Fold {
    fn range(&self) -> (u16, u16) {
        match *self {
            Fold::Shift(lo, hi, _) | Fold::Pairs(lo, hi) | Fold::Ignore(lo, hi) => (lo, hi),
            Fold::To(unit, _) => (unit, unit),
        }
    }

    fn apply(&self, unit: u16) -> Option<u16> {
        match *self {
            Fold::Shift(_, _, delta) => Some(unit + delta),
            Fold::Pairs(..) => Some(unit | 1),
            Fold::To(_, lower) => Some(lower),
            Fold::Ignore(..) => None,
        }
    }
}

/// 折叠单个码元，可忽略的码元返回 None
///
/// U+0000 映射为 0xFFFF，排在所有字符之后。
pub fn fold_unit(unit: u16) -> Option<u16> {
    if unit == 0 {
        return Some(0xFFFF);
    }

    let found = LOWER_CASE.binary_search_by(|fold| {
        let (lo, hi) = fold.range();
        if hi < unit {
            Ordering::Less
        } else if lo > unit {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    });

    match found {
        Ok(index) => LOWER_CASE[index].apply(unit),
        Err(_) => Some(unit),
    }
}

/// 忽略大小写比较
pub fn compare_case_folding(a: &[u16], b: &[u16]) -> Ordering {
    let mut left = a.iter().filter_map(|&u| fold_unit(u));
    let mut right = b.iter().filter_map(|&u| fold_unit(u));

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
        }
    }
}

/// 逐码元二进制比较
pub fn compare_binary(a: &[u16], b: &[u16]) -> Ordering {
    a.cmp(b)
}

/// 按树声明的比较方式比较两个名称
pub fn compare_names(mode: KeyCompareMode, a: &[u16], b: &[u16]) -> Ordering {
    match mode {
        KeyCompareMode::CaseFolding => compare_case_folding(a, b),
        KeyCompareMode::Binary => compare_binary(a, b),
    }
}
