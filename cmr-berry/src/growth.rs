//! 能量约束的方向偏置区域生长.
//!
//! 从种子集合出发的 FIFO 随机泛洪: 每个队列项携带剩余能量,
//! 能量耗尽即终止; 每次扩张按权重随机抽取两个轴向方向,
//! 只有仍持有可生长占位值的邻居才会入队. 能量沿任何路径严格递减,
//! 因此生长必然终止, 且只会覆盖可生长区域内的像素.

use crate::grid::neighbour4;
use crate::{Idx2d, LabelGrid};
use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::Rng;
use std::collections::VecDeque;
use std::ops::RangeInclusive;

/// 区域生长参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct GrowthParams {
    /// 每个种子的初始能量.
    pub energy: i32,

    /// 每次扩张消耗的能量取值范围.
    pub decay: RangeInclusive<i32>,

    /// 四个轴向方向 (上, 下, 左, 右) 的抽样权重. 不对称权重是
    /// 各向异性旋钮, 默认偏向 "上" 方向.
    pub weights: [f64; 4],

    /// 每次扩张抽取的方向个数 (允许重复).
    pub picks: usize,
}

impl Default for GrowthParams {
    fn default() -> Self {
        Self {
            energy: 30,
            decay: 1..=3,
            weights: [0.3, 0.2, 0.2, 0.2],
            picks: 2,
        }
    }
}

impl GrowthParams {
    /// 以 `energy` 为初始能量、其余参数取默认值构造.
    #[inline]
    pub fn with_energy(energy: i32) -> Self {
        Self {
            energy,
            ..Self::default()
        }
    }
}

/// 从 `seeds` 出发, 在 `grid` 上生长.
///
/// 只有仍持有 `growable` 值的像素才可被扩张; 被扩张到的像素写为 `grown`.
/// 队列项只携带坐标与能量, 不持有对格网的别名; 所有修改都通过独占引用进行.
///
/// # 注意
///
/// `params.weights` 必须全部非负且和为正, 否则程序 panic.
pub fn spread<R: Rng + ?Sized>(
    grid: &mut LabelGrid,
    seeds: &[Idx2d],
    growable: u8,
    grown: u8,
    params: &GrowthParams,
    rng: &mut R,
) {
    let directions = WeightedIndex::new(params.weights).expect("方向权重非法");

    let mut queue: VecDeque<(Idx2d, i32)> =
        seeds.iter().map(|&pos| (pos, params.energy)).collect();

    while let Some((pos, energy)) = queue.pop_front() {
        if energy <= 0 {
            continue;
        }
        grid[pos] = grown;

        for _ in 0..params.picks {
            let next = neighbour4(pos)[directions.sample(rng)];
            if grid.check(next) && grid[next] == growable {
                let cost = rng.random_range(params.decay.clone());
                queue.push_back((next, energy - cost));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn myocardium_field() -> LabelGrid {
        LabelGrid::from_elem((32, 32), WORK_MYOCARDIUM)
    }

    #[test]
    fn test_growth_stays_in_region() {
        let mut grid = LabelGrid::new((32, 32));
        // 只有中心 8x8 可生长.
        for h in 12..20 {
            for w in 12..20 {
                grid[(h, w)] = WORK_MYOCARDIUM;
            }
        }
        let before = grid.positions_of(WORK_MYOCARDIUM);
        let mut rng = StdRng::seed_from_u64(11);
        spread(
            &mut grid,
            &[(15, 15)],
            WORK_MYOCARDIUM,
            WORK_INFARCT,
            &GrowthParams::with_energy(50),
            &mut rng,
        );
        // 生长像素必须是原先的可生长像素.
        for pos in grid.positions_of(WORK_INFARCT) {
            assert!(before.contains(&pos), "{pos:?} 越出可生长区域");
        }
    }

    #[test]
    fn test_growth_connected_and_bounded() {
        let mut grid = myocardium_field();
        let seed = (16, 16);
        let energy = 10;
        let mut rng = StdRng::seed_from_u64(42);
        spread(
            &mut grid,
            &[seed],
            WORK_MYOCARDIUM,
            WORK_INFARCT,
            &GrowthParams::with_energy(energy),
            &mut rng,
        );

        let grown = grid.positions_of(WORK_INFARCT);
        assert!(grown.contains(&seed));

        // 连通性: 生长区域构成单个 4-连通分量.
        assert_eq!(grid.areas(is_work_infarct).len(), 1);

        // 有界性: 能量 E、每步至少消耗 1, 任何生长像素到种子的路径长 <= E,
        // 故切比雪夫半径被 E 约束, 总量被分支系数约束.
        for (h, w) in &grown {
            assert!(h.abs_diff(seed.0) + w.abs_diff(seed.1) <= energy as usize);
        }
        assert!(grown.len() <= (2 * energy as usize + 1).pow(2));
    }

    #[test]
    fn test_zero_energy_inert() {
        let mut grid = myocardium_field();
        let mut rng = StdRng::seed_from_u64(5);
        spread(
            &mut grid,
            &[(8, 8)],
            WORK_MYOCARDIUM,
            WORK_INFARCT,
            &GrowthParams::with_energy(0),
            &mut rng,
        );
        assert_eq!(grid.count(WORK_INFARCT), 0);
    }
}
