//! 种子采样: 初始种子选取与极坐标随机游走.

use crate::polar::{cartesian_to_polar, polar_to_cartesian};
use crate::{Idx2d, Idx2dF, LabelGrid, SimError};
use rand::seq::IndexedRandom;
use rand::Rng;

/// 极坐标随机游走参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct WalkParams {
    /// 游走步数预算. 产出的种子序列最多 `count - 1` 个
    /// (游走起点本身不计入输出).
    pub count: usize,

    /// 单步半径扰动上限 (像素).
    pub max_radius_step: f64,

    /// 单步弧度扰动上限.
    pub max_arc_step: f64,
}

impl Default for WalkParams {
    fn default() -> Self {
        Self {
            count: 80,
            max_radius_step: 2.0,
            max_arc_step: std::f64::consts::FRAC_PI_4,
        }
    }
}

/// 在值为 `target` 的像素中均匀抽取游走起点, 并计算这些像素的质心.
///
/// 目标像素不存在时返回 [`SimError::EmptyRegion`].
pub fn initial_seed<R: Rng + ?Sized>(
    grid: &LabelGrid,
    target: u8,
    rng: &mut R,
) -> Result<(Idx2d, Idx2dF), SimError> {
    let positions = grid.positions_of(target);
    let &origin = positions
        .choose(rng)
        .ok_or(SimError::EmptyRegion { value: target })?;

    let n = positions.len() as f64;
    let (sum_h, sum_w) = positions
        .iter()
        .fold((0.0f64, 0.0f64), |(sh, sw), &(h, w)| {
            (sh + h as f64, sw + w as f64)
        });
    let centroid = (sum_h / n, sum_w / n);

    log::debug!("初始种子 {origin:?}, 质心 ({:.2}, {:.2})", centroid.0, centroid.1);
    Ok((origin, centroid))
}

/// 以 `origin` 为起点、`center` 为极坐标原点做随机游走, 产出候选种子.
///
/// 每步对运行中的 `(半径, 弧度)` 施加有界均匀扰动后转回格网索引;
/// 只有落在格网内且仍持有 `target` 值的点才被采纳.
/// 输出序列有序, 且可能比 `count - 1` 短.
pub fn polar_walk<R: Rng + ?Sized>(
    grid: &LabelGrid,
    target: u8,
    origin: Idx2d,
    center: Idx2dF,
    params: &WalkParams,
    rng: &mut R,
) -> Vec<Idx2d> {
    let (mut radius, mut arc) = cartesian_to_polar(origin, center);
    let mut selected = Vec::new();

    for _ in 1..params.count.max(1) {
        radius += rng.random_range(-params.max_radius_step..=params.max_radius_step);
        arc += rng.random_range(-params.max_arc_step..=params.max_arc_step);

        if let Some(pos) = polar_to_cartesian(radius, arc, center) {
            if grid.check(pos) && grid[pos] == target {
                selected.push(pos);
            }
        }
    }

    log::info!("生成 {} 个种子点", selected.len());
    selected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::WORK_MYOCARDIUM;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn ring_grid() -> LabelGrid {
        let mut g = LabelGrid::new((40, 40));
        for (h, w) in g.pos_iter().collect::<Vec<_>>() {
            let dh = h as f64 - 20.0;
            let dw = w as f64 - 20.0;
            let d = (dh * dh + dw * dw).sqrt();
            if (10.0..=14.0).contains(&d) {
                g[(h, w)] = WORK_MYOCARDIUM;
            }
        }
        g
    }

    #[test]
    fn test_empty_region_error() {
        let g = LabelGrid::new((16, 16));
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            initial_seed(&g, WORK_MYOCARDIUM, &mut rng),
            Err(SimError::EmptyRegion {
                value: WORK_MYOCARDIUM
            })
        ));
    }

    #[test]
    fn test_seeds_on_target_only() {
        let g = ring_grid();
        let mut rng = StdRng::seed_from_u64(17);
        let (origin, center) = initial_seed(&g, WORK_MYOCARDIUM, &mut rng).unwrap();
        assert_eq!(g[origin], WORK_MYOCARDIUM);
        // 环的质心落在环心附近.
        assert!((center.0 - 20.0).abs() < 1.0 && (center.1 - 20.0).abs() < 1.0);

        let walk = polar_walk(
            &g,
            WORK_MYOCARDIUM,
            origin,
            center,
            &WalkParams::default(),
            &mut rng,
        );
        assert!(!walk.is_empty());
        assert!(walk.len() <= 79);
        for pos in walk {
            assert_eq!(g[pos], WORK_MYOCARDIUM);
        }
    }

    #[test]
    fn test_walk_budget_zero() {
        let g = ring_grid();
        let mut rng = StdRng::seed_from_u64(3);
        let (origin, center) = initial_seed(&g, WORK_MYOCARDIUM, &mut rng).unwrap();
        let params = WalkParams {
            count: 1,
            ..WalkParams::default()
        };
        assert!(polar_walk(&g, WORK_MYOCARDIUM, origin, center, &params, &mut rng).is_empty());
    }
}
