//! 平移 + 旋转候选空间的穷举搜索.

use super::metrics::{overlap_metrics, OverlapMetrics};
use super::transform::{rotate_about, shift};
use crate::{Idx2dF, LabelGrid};
use itertools::iproduct;

/// 配准搜索参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct AlignParams {
    /// 平移搜索半径 (像素). 行列平移均在 `[-r, r]` 内取值.
    pub search_range: isize,

    /// 待测试的旋转角集合 (度).
    pub angles: Vec<f64>,
}

impl AlignParams {
    /// 以平移半径 `search_range` 与均匀角步长 `step_deg` 构造.
    pub fn with_rotation_step(search_range: isize, step_deg: f64) -> Self {
        assert!(step_deg > 0.0, "角步长必须为正");
        let n = (360.0 / step_deg).ceil() as usize;
        Self {
            search_range,
            angles: (0..n).map(|k| k as f64 * step_deg).collect(),
        }
    }
}

impl Default for AlignParams {
    fn default() -> Self {
        Self::with_rotation_step(10, 30.0)
    }
}

/// 一个配准候选: 平移 `(dh, dw)`、旋转角与重叠度量.
///
/// 搜索只保留当前最优候选; Dice 并列时先被枚举到的候选获胜
/// (更新条件为严格大于).
#[derive(Clone, Debug)]
pub struct Alignment {
    /// 平移 `(行, 列)`.
    pub shift: (isize, isize),

    /// 旋转角 (度).
    pub angle: f64,

    /// 最优候选的重叠度量.
    pub metrics: OverlapMetrics,
}

impl Alignment {
    /// 零位移、零旋转、零度量的初始候选.
    fn identity() -> Self {
        Self {
            shift: (0, 0),
            angle: 0.0,
            metrics: OverlapMetrics::default(),
        }
    }
}

/// 对单个平移评估所有旋转角, 返回该平移下的最优候选 (并列取先者).
fn best_for_shift(
    myocardium: &LabelGrid,
    donor: &LabelGrid,
    center: Idx2dF,
    (dh, dw): (isize, isize),
    angles: &[f64],
) -> Alignment {
    let shifted = shift(donor, dh, dw);
    let mut best = Alignment::identity();
    let mut init = true;
    for &angle in angles {
        let rotated = rotate_about(&shifted, angle, center);
        let metrics = overlap_metrics(&rotated, myocardium);
        if init || metrics.dice_coefficient > best.metrics.dice_coefficient {
            best = Alignment {
                shift: (dh, dw),
                angle,
                metrics,
            };
            init = false;
        }
    }
    best
}

/// 枚举顺序: 列平移在外层, 行平移次之, 角度最内层.
fn shift_pairs(r: isize) -> Vec<(isize, isize)> {
    iproduct!(-r..=r, -r..=r).map(|(dw, dh)| (dh, dw)).collect()
}

/// 在全部候选上穷举, 返回 Dice 最优的配准.
///
/// 候选打分彼此独立; 开启 `rayon` feature 时并行打分,
/// 但归约按固定枚举顺序进行, 并列时的胜者与串行一致.
/// `center` 是旋转中心, 一般取心肌掩码的最小包围圆心.
pub fn find_best_alignment(
    myocardium: &LabelGrid,
    donor: &LabelGrid,
    center: Idx2dF,
    params: &AlignParams,
) -> Alignment {
    let pairs = shift_pairs(params.search_range);

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use rayon::prelude::*;
            let locals: Vec<Alignment> = pairs
                .par_iter()
                .map(|&pair| best_for_shift(myocardium, donor, center, pair, &params.angles))
                .collect();
        } else {
            let locals: Vec<Alignment> = pairs
                .iter()
                .map(|&pair| best_for_shift(myocardium, donor, center, pair, &params.angles))
                .collect();
        }
    }

    // 按枚举顺序归约, 保持 "先到先得" 的并列规则.
    let mut best = Alignment::identity();
    for candidate in locals {
        if candidate.metrics.dice_coefficient > best.metrics.dice_coefficient {
            best = candidate;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(at: (usize, usize)) -> LabelGrid {
        let mut m = LabelGrid::new((24, 24));
        for h in 0..4 {
            for w in 0..4 {
                m[(at.0 + h, at.1 + w)] = 1;
            }
        }
        m
    }

    #[test]
    fn test_pure_translation_recovered() {
        let myo = block((10, 10));
        let donor = block((7, 12));
        let params = AlignParams {
            search_range: 5,
            angles: vec![0.0],
        };
        let best = find_best_alignment(&myo, &donor, (12.0, 12.0), &params);
        assert_eq!(best.shift, (3, -2));
        assert_eq!(best.metrics.dice_coefficient, 1.0);
    }

    #[test]
    fn test_empty_masks_keep_identity() {
        let myo = LabelGrid::new((16, 16));
        let donor = LabelGrid::new((16, 16));
        let best = find_best_alignment(&myo, &donor, (8.0, 8.0), &AlignParams::default());
        // 所有候选 Dice 皆 0, 严格大于才更新: 保留初始候选.
        assert_eq!(best.shift, (0, 0));
        assert_eq!(best.angle, 0.0);
        assert_eq!(best.metrics.dice_coefficient, 0.0);
    }

    #[test]
    fn test_angle_set_constructor() {
        let p = AlignParams::with_rotation_step(4, 30.0);
        assert_eq!(p.angles.len(), 12);
        assert_eq!(p.angles[0], 0.0);
        assert_eq!(p.angles[11], 330.0);
    }
}
