//! 掩码重叠度量.

use crate::LabelGrid;

/// 两个二值掩码之间的重叠统计.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct OverlapMetrics {
    /// 交集像素数.
    pub intersection_pixels: usize,

    /// 并集像素数.
    pub union_pixels: usize,

    /// 交并比. 并集为空时取 0.
    pub intersection_ratio: f64,

    /// Dice 系数 `2|A∩B| / (|A| + |B|)`. 两掩码皆空时取 0.
    pub dice_coefficient: f64,
}

/// 计算两个掩码的重叠度量. 非零像素一律视为前景.
///
/// 如果两个掩码形状不同, 则程序 panic.
pub fn overlap_metrics(a: &LabelGrid, b: &LabelGrid) -> OverlapMetrics {
    assert_eq!(a.shape(), b.shape(), "掩码形状不一致");

    let mut intersection = 0usize;
    let mut union = 0usize;
    let mut area_a = 0usize;
    let mut area_b = 0usize;

    for (&pa, &pb) in a.iter().zip(b.iter()) {
        let fa = pa != 0;
        let fb = pb != 0;
        intersection += usize::from(fa && fb);
        union += usize::from(fa || fb);
        area_a += usize::from(fa);
        area_b += usize::from(fb);
    }

    let intersection_ratio = if union > 0 {
        intersection as f64 / union as f64
    } else {
        0.0
    };
    let dice_coefficient = if area_a + area_b > 0 {
        2.0 * intersection as f64 / (area_a + area_b) as f64
    } else {
        0.0
    };

    OverlapMetrics {
        intersection_pixels: intersection,
        union_pixels: union,
        intersection_ratio,
        dice_coefficient,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_rows(rows: std::ops::Range<usize>) -> LabelGrid {
        let mut m = LabelGrid::new((8, 8));
        for h in rows {
            for w in 0..8 {
                m[(h, w)] = 1;
            }
        }
        m
    }

    #[test]
    fn test_dice_symmetric_and_bounded() {
        let a = mask_rows(0..4);
        let b = mask_rows(2..6);
        let ab = overlap_metrics(&a, &b);
        let ba = overlap_metrics(&b, &a);
        assert_eq!(ab.dice_coefficient, ba.dice_coefficient);
        assert!(ab.dice_coefficient > 0.0 && ab.dice_coefficient < 1.0);
        assert_eq!(ab.intersection_pixels, 16);
        assert_eq!(ab.union_pixels, 48);
    }

    #[test]
    fn test_dice_identity() {
        let a = mask_rows(1..5);
        let m = overlap_metrics(&a, &a);
        assert_eq!(m.dice_coefficient, 1.0);
        assert_eq!(m.intersection_ratio, 1.0);
    }

    #[test]
    fn test_dice_both_empty() {
        let a = LabelGrid::new((8, 8));
        let m = overlap_metrics(&a, &a);
        assert_eq!(m.dice_coefficient, 0.0);
        assert_eq!(m.intersection_ratio, 0.0);
        assert_eq!(m.union_pixels, 0);
    }

    #[test]
    fn test_disjoint_zero() {
        let a = mask_rows(0..2);
        let b = mask_rows(6..8);
        let m = overlap_metrics(&a, &b);
        assert_eq!(m.dice_coefficient, 0.0);
        assert_eq!(m.intersection_pixels, 0);
        assert_eq!(m.union_pixels, 32);
    }
}
