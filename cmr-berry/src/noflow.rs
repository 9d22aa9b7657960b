//! 无复流子区域生成.
//!
//! 在已过滤的梗死掩码内部, 逐连通分量地生长无复流子区域:
//! 随机选择若干分量, 在分量内无放回地采样种子, 能量预算取分量面积的
//! 随机比例, 然后复用 [`crate::growth`] 的生长算法. 生长结束后做闭运算
//! 与腐蚀收缩, 保证无复流严格位于父梗死分量内部.

use crate::consts::gray::is_foreground;
use crate::growth::{spread, GrowthParams};
use crate::morph::{self, SeShape};
use crate::{Idx2d, LabelGrid};
use rand::seq::index;
use rand::Rng;
use std::ops::Range;

/// 生长工作格网中 "仍是梗死" 的值.
const PARENT: u8 = 1;

/// 生长工作格网中 "已是无复流" 的值.
const GROWN: u8 = 2;

/// 无复流生成参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct NoFlowParams {
    /// 每个选中分量的种子个数上限 (超过分量面积时按面积钳制).
    pub seeds_per_component: usize,

    /// 能量预算占分量面积的比例取值范围.
    pub energy_ratio: Range<f64>,

    /// 能量扩张消耗与方向权重.
    pub growth: GrowthParams,

    /// 闭运算结构元边长 (矩形).
    pub close_size: Idx2d,

    /// 腐蚀结构元边长 (矩形).
    pub erode_size: Idx2d,
}

impl Default for NoFlowParams {
    fn default() -> Self {
        Self {
            seeds_per_component: 10,
            energy_ratio: 0.05..0.2,
            growth: GrowthParams::default(),
            close_size: (8, 8),
            erode_size: (7, 7),
        }
    }
}

/// 在二值梗死掩码 `infarct` 内生长无复流子区域, 返回二值无复流掩码.
///
/// 没有任何梗死分量时返回全零掩码, 不报错.
/// 生长方向是 4-相邻, 而 4-相邻的前景像素必然与当前像素同属一个
/// 8-连通分量, 因此无需显式校验分量编号.
pub fn grow_no_flow<R: Rng + ?Sized>(
    infarct: &LabelGrid,
    params: &NoFlowParams,
    rng: &mut R,
) -> LabelGrid {
    let components = infarct.areas8(is_foreground);
    if components.is_empty() {
        log::warn!("梗死掩码中不存在连通分量, 无复流输出为空");
        return LabelGrid::new(infarct.shape());
    }

    // 随机选择要生长的分量子集.
    let chosen_len = rng.random_range(1..=components.len());
    let chosen = index::sample(rng, components.len(), chosen_len);

    let mut work = infarct.binarize(1);
    debug_assert_eq!(work.count_nonzero(), infarct.count_nonzero());

    for comp_idx in chosen {
        let component = &components[comp_idx];

        // 种子个数钳制到分量面积, 无放回采样.
        let seed_len = params.seeds_per_component.min(component.len());
        let seeds: Vec<Idx2d> = index::sample(rng, component.len(), seed_len)
            .into_iter()
            .map(|i| component[i])
            .collect();

        let ratio = rng.random_range(params.energy_ratio.clone());
        let energy = (ratio * component.len() as f64) as i32;

        let growth = GrowthParams {
            energy,
            ..params.growth.clone()
        };
        spread(&mut work, &seeds, PARENT, GROWN, &growth, rng);
    }

    // 闭运算弥合生长留下的缝隙, 腐蚀使子区域严格内缩.
    let grown = work.binarize(GROWN);
    let closed = morph::close(&grown, &morph::structuring_element(SeShape::Rect, params.close_size));
    let mut eroded =
        morph::erode(&closed, &morph::structuring_element(SeShape::Rect, params.erode_size));

    // 闭运算可能在父分量边缘外侧残留像素, 与父掩码求交维持子集不变式.
    for (pos, &pix) in infarct.indexed_iter() {
        if pix == 0 {
            eroded[pos] = 0;
        }
    }
    eroded
}
