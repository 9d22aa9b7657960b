//! 配准后的掩码合并.

use super::search::Alignment;
use super::transform::{rotate_about, shift};
use crate::consts::Palette;
use crate::{Idx2dF, LabelGrid};
use ndarray::Array2;

/// 将最优变换重新施加到供体病理掩码上, 与心肌模板合并.
///
/// 病理被约束在解剖区域内: 只有变换后供体与心肌同时非零的像素
/// 才写入梗死编码; 其余心肌像素写入心肌编码, 剩下的是背景.
/// 合并结果不可能在心肌掩码之外引入病理像素.
pub fn merge_aligned(
    myocardium: &LabelGrid,
    donor: &LabelGrid,
    best: &Alignment,
    center: Idx2dF,
    palette: &Palette,
) -> LabelGrid {
    let shifted = shift(donor, best.shift.0, best.shift.1);
    let aligned = rotate_about(&shifted, best.angle, center);
    log::debug!(
        "合并: 平移 {:?}, 旋转 {}°, Dice {:.3}",
        best.shift,
        best.angle,
        best.metrics.dice_coefficient
    );

    let mut out = LabelGrid::from_elem(myocardium.shape(), palette.background);
    for (pos, &myo) in myocardium.indexed_iter() {
        if myo == 0 {
            continue;
        }
        out[pos] = if aligned[pos] != 0 {
            palette.infarction
        } else {
            palette.myocardium
        };
    }
    out
}

/// 将配对的血池掩码叠加到编码格网上: 血池非零处写入血池编码.
///
/// 如果两者形状不同, 则程序 panic.
pub fn add_blood_pool(grid: &mut LabelGrid, blood_pool: &Array2<u8>, code: u8) {
    assert_eq!(
        grid.shape(),
        blood_pool.dim(),
        "血池掩码形状与格网不一致"
    );
    for ((h, w), &pix) in blood_pool.indexed_iter() {
        if pix != 0 {
            grid[(h, w)] = code;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::OverlapMetrics;

    #[test]
    fn test_pathology_confined_to_myocardium() {
        let mut myo = LabelGrid::new((16, 16));
        for h in 4..12 {
            for w in 4..12 {
                myo[(h, w)] = 1;
            }
        }
        // 供体一部分落在心肌外.
        let mut donor = LabelGrid::new((16, 16));
        for h in 0..8 {
            for w in 0..8 {
                donor[(h, w)] = 1;
            }
        }
        let identity = Alignment {
            shift: (0, 0),
            angle: 0.0,
            metrics: OverlapMetrics::default(),
        };
        let pal = Palette::default();
        let merged = merge_aligned(&myo, &donor, &identity, (8.0, 8.0), &pal);

        for (pos, &pix) in merged.indexed_iter() {
            if pix == pal.infarction {
                assert_eq!(myo[pos], 1, "{pos:?} 的病理落在心肌之外");
            }
            if myo[pos] == 1 {
                assert!(pix == pal.infarction || pix == pal.myocardium);
            } else {
                assert_eq!(pix, pal.background);
            }
        }
        // 交叠区域确实标成了梗死.
        assert_eq!(merged[(5, 5)], pal.infarction);
        assert_eq!(merged[(10, 10)], pal.myocardium);
    }

    #[test]
    fn test_add_blood_pool_overlay() {
        let pal = Palette::default();
        let mut grid = LabelGrid::from_elem((4, 4), pal.myocardium);
        let mut bp = Array2::<u8>::zeros((4, 4));
        bp[(1, 1)] = 1;
        bp[(2, 2)] = 1;
        add_blood_pool(&mut grid, &bp, pal.blood_pool);
        assert_eq!(grid[(1, 1)], pal.blood_pool);
        assert_eq!(grid[(2, 2)], pal.blood_pool);
        assert_eq!(grid[(0, 0)], pal.myocardium);
    }
}
