//! 面积比例统计与接受门控.

use crate::consts::Palette;
use crate::LabelGrid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一个比例的接受区间. 只有 **严格落在区间内部** 的比例才被接受,
/// 恰好等于边界视为拒绝.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RatioBounds {
    /// 下界 (不含).
    pub lower: f64,

    /// 上界 (不含).
    pub upper: f64,
}

impl RatioBounds {
    /// `v` 是否严格位于区间内部?
    #[inline]
    pub fn strictly_contains(&self, v: f64) -> bool {
        self.lower < v && v < self.upper
    }
}

/// 统计门控的完整约束.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GateBounds {
    /// `(梗死 + 无复流) / (心肌 + 梗死 + 无复流)` 的接受区间.
    pub infarct_to_myo: RatioBounds,

    /// `无复流 / (梗死 + 无复流)` 的接受区间.
    pub noflow_to_infarct: RatioBounds,
}

impl Default for GateBounds {
    fn default() -> Self {
        Self {
            infarct_to_myo: RatioBounds {
                lower: 0.2,
                upper: 0.6,
            },
            noflow_to_infarct: RatioBounds {
                lower: 0.1,
                upper: 0.4,
            },
        }
    }
}

impl GateBounds {
    /// 合并掩码流水线的默认约束: 合并掩码不携带无复流像素,
    /// 因此无复流比例区间完全放开, 只有梗死比例有实际约束力.
    pub fn merged_default() -> Self {
        Self {
            noflow_to_infarct: RatioBounds {
                lower: -1.0,
                upper: 2.0,
            },
            ..Self::default()
        }
    }
}

/// 一次生成的面积比例统计与接受标志.
#[derive(Copy, Clone, Debug)]
pub struct GenStats {
    /// `(梗死 + 无复流) / (心肌 + 梗死 + 无复流)`. 分母为 0 时取 0.
    pub infarct_to_myo: f64,

    /// `无复流 / (梗死 + 无复流)`. 分母为 0 时取 0.
    pub noflow_to_infarct: f64,

    /// 梗死比例是否在界内.
    pub infarct_in_bounds: bool,

    /// 无复流比例是否在界内.
    pub noflow_in_bounds: bool,
}

impl GenStats {
    /// 在最终编码格网上计算统计并做门控判定.
    pub fn measure(grid: &LabelGrid, palette: &Palette, bounds: &GateBounds) -> Self {
        let infarct = grid.count(palette.infarction);
        let myocardium = grid.count(palette.myocardium);
        let no_flow = grid.count(palette.no_flow);

        let infarct_plus_noflow = infarct + no_flow;
        let myocardium_total = myocardium + infarct_plus_noflow;

        let infarct_to_myo = if myocardium_total > 0 {
            infarct_plus_noflow as f64 / myocardium_total as f64
        } else {
            0.0
        };
        let noflow_to_infarct = if infarct_plus_noflow > 0 {
            no_flow as f64 / infarct_plus_noflow as f64
        } else {
            0.0
        };

        Self {
            infarct_to_myo,
            noflow_to_infarct,
            infarct_in_bounds: bounds.infarct_to_myo.strictly_contains(infarct_to_myo),
            noflow_in_bounds: bounds.noflow_to_infarct.strictly_contains(noflow_to_infarct),
        }
    }

    /// 两个比例是否都被接受?
    #[inline]
    pub fn accepted(&self) -> bool {
        self.infarct_in_bounds && self.noflow_in_bounds
    }

    /// 比例的整数百分比 `(梗死比, 无复流比)`, 用于输出文件命名.
    #[inline]
    pub fn percentages(&self) -> (u32, u32) {
        (
            (self.infarct_to_myo * 100.0) as u32,
            (self.noflow_to_infarct * 100.0) as u32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 构造含指定像素数的最小格网.
    fn grid_with_counts(myocardium: usize, infarct: usize, no_flow: usize) -> LabelGrid {
        let pal = Palette::default();
        let total = myocardium + infarct + no_flow;
        let side = (total as f64).sqrt().ceil() as usize + 1;
        let mut g = LabelGrid::new((side, side));
        let mut it = g.pos_iter().collect::<Vec<_>>().into_iter();
        for _ in 0..myocardium {
            g[it.next().unwrap()] = pal.myocardium;
        }
        for _ in 0..infarct {
            g[it.next().unwrap()] = pal.infarction;
        }
        for _ in 0..no_flow {
            g[it.next().unwrap()] = pal.no_flow;
        }
        g
    }

    #[test]
    fn test_reference_ratios_accepted() {
        let g = grid_with_counts(100, 30, 10);
        let stats = GenStats::measure(&g, &Palette::default(), &GateBounds::default());
        assert!((stats.infarct_to_myo - 40.0 / 140.0).abs() < 1e-12);
        assert!((stats.noflow_to_infarct - 0.25).abs() < 1e-12);
        assert!(stats.accepted());
        assert_eq!(stats.percentages(), (28, 25));
    }

    #[test]
    fn test_zero_grid_no_division() {
        let g = grid_with_counts(0, 0, 0);
        let stats = GenStats::measure(&g, &Palette::default(), &GateBounds::default());
        assert_eq!(stats.infarct_to_myo, 0.0);
        assert_eq!(stats.noflow_to_infarct, 0.0);
        assert!(!stats.accepted());
    }

    #[test]
    fn test_boundary_is_rejected() {
        // 梗死比恰好等于上界 0.6: 60 / (40 + 60).
        let g = grid_with_counts(40, 60, 0);
        let stats = GenStats::measure(&g, &Palette::default(), &GateBounds::default());
        assert!((stats.infarct_to_myo - 0.6).abs() < 1e-12);
        assert!(!stats.infarct_in_bounds);
        assert!(!stats.accepted());
    }
}
