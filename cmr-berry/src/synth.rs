//! 合成心肌模板生成.
//!
//! "环 + 腔" 模板: 以图像中心为圆心画一个心肌环 (圆环带),
//! 再以带随机偏移的圆心画一个实心血池腔. 两个形状各自经过逐像素随机
//! 位移抖动与高斯平滑, 重新二值化后写入标签格网.

use crate::consts::gray::*;
use crate::{morph, Idx2d, LabelGrid, SimError};
use rand::Rng;
use std::ops::RangeInclusive;

/// 环形抖动的最大像素位移.
const RING_JITTER: isize = 1;

/// 腔体抖动的最大像素位移.
const CAVITY_JITTER: isize = 3;

/// 形状平滑的高斯核长.
const BLUR_KSIZE: usize = 9;

/// 平滑后的保留阈值. 等价于 8-bit 0/255 掩码平滑取整后非零.
const BLUR_KEEP: f64 = 0.5 / 255.0;

/// 合成模板的几何参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct RingParams {
    /// 心肌环外半径的取值范围 (像素).
    pub outer_radius: RangeInclusive<usize>,

    /// 心肌环厚度的取值范围 (像素).
    pub ring_thickness: RangeInclusive<usize>,
}

impl RingParams {
    /// 校验几何参数能放入 `(h, w)` 图像.
    ///
    /// 外半径 + 半厚度 + 腔体抖动 + 平滑外扩必须小于图像短边的一半,
    /// 否则返回 [`SimError::Geometry`] (配置错误, 不应重试).
    pub fn validate(&self, (h, w): Idx2d) -> Result<(), SimError> {
        let r_max = *self.outer_radius.end();
        let t_max = *self.ring_thickness.end();
        let required = r_max + t_max / 2 + CAVITY_JITTER as usize + BLUR_KSIZE / 2;
        let fits = !self.outer_radius.is_empty()
            && !self.ring_thickness.is_empty()
            && required < h.min(w) / 2;
        if fits {
            Ok(())
        } else {
            Err(SimError::Geometry {
                height: h,
                width: w,
                required,
            })
        }
    }
}

/// 对二值掩码施加逐像素随机位移抖动.
///
/// 每个前景像素独立地移动到 `[-max_offset, max_offset]` 内的随机偏移处
/// (越界则钳制到边界). 源位置不保留, 所以掩码会出现有机的毛边与孔洞.
fn random_displacement<R: Rng + ?Sized>(
    mask: &LabelGrid,
    max_offset: isize,
    rng: &mut R,
) -> LabelGrid {
    let (height, width) = mask.shape();
    let mut out = LabelGrid::new((height, width));
    for ((h, w), &pix) in mask.indexed_iter() {
        if pix == 0 {
            continue;
        }
        let nh = (h as isize + rng.random_range((-max_offset as i64)..=(max_offset as i64)) as isize)
            .clamp(0, height as isize - 1);
        let nw = (w as isize + rng.random_range((-max_offset as i64)..=(max_offset as i64)) as isize)
            .clamp(0, width as isize - 1);
        out[(nh as usize, nw as usize)] = 1;
    }
    out
}

/// 以 `center` 为圆心、按距离谓词 `keep` 绘制二值形状.
fn draw_shape(size: Idx2d, center: Idx2d, keep: impl Fn(f64) -> bool) -> LabelGrid {
    let mut mask = LabelGrid::new(size);
    for (h, w) in mask.pos_iter().collect::<Vec<_>>() {
        let dh = h as f64 - center.0 as f64;
        let dw = w as f64 - center.1 as f64;
        if keep((dh * dh + dw * dw).sqrt()) {
            mask[(h, w)] = 1;
        }
    }
    mask
}

/// 抖动 + 平滑 + 重新二值化, 然后把形状以 `value` 写入格网.
fn stamp<R: Rng + ?Sized>(grid: &mut LabelGrid, shape: &LabelGrid, jitter: isize, value: u8, rng: &mut R) {
    let deformed = random_displacement(shape, jitter, rng);
    let smoothed = morph::gaussian_smooth(&deformed, BLUR_KSIZE, 0.0, BLUR_KEEP);
    for (pos, &pix) in smoothed.indexed_iter() {
        if pix != 0 {
            grid[pos] = value;
        }
    }
}

/// 生成 "环 + 腔" 合成心肌模板.
///
/// 外半径与厚度在参数范围内均匀抽取. 输出格网恰好含有两类非背景像素:
/// 心肌占位值 [`WORK_MYOCARDIUM`] 与血池占位值 [`WORK_BLOOD_POOL`].
/// 腔体后画, 与环重叠处以腔体为准.
pub fn ring_with_cavity<R: Rng + ?Sized>(
    size: Idx2d,
    params: &RingParams,
    rng: &mut R,
) -> Result<LabelGrid, SimError> {
    params.validate(size)?;

    let outer = rng.random_range(params.outer_radius.clone());
    let thick = rng.random_range(params.ring_thickness.clone());
    let center = (size.0 / 2, size.1 / 2);

    let mut grid = LabelGrid::new(size);

    // 心肌环: 到圆心距离落在 [outer - thick/2, outer + thick/2] 的环带.
    let half = thick as f64 / 2.0;
    let ring = draw_shape(size, center, |d| (d - outer as f64).abs() <= half);
    stamp(&mut grid, &ring, RING_JITTER, WORK_MYOCARDIUM, rng);

    // 血池腔: 半径到环带内沿的实心圆, 圆心带小幅随机偏移.
    let cavity_radius = outer - thick / 2;
    let max_off = (*params.ring_thickness.start() / 2) as isize;
    let cavity_center = (
        (center.0 as isize + rng.random_range((-max_off as i64)..=(max_off as i64)) as isize) as usize,
        (center.1 as isize + rng.random_range((-max_off as i64)..=(max_off as i64)) as isize) as usize,
    );
    let cavity = draw_shape(size, cavity_center, |d| d <= cavity_radius as f64);
    stamp(&mut grid, &cavity, CAVITY_JITTER, WORK_BLOOD_POOL, rng);

    Ok(grid)
}

/// 从真实提取的心肌掩码构造模板 (真实数据模式).
///
/// 不做任何生成, 只把提取编码 [`CASE_MYOCARDIUM`] 重映射为下游阶段
/// 使用的占位值 [`WORK_MYOCARDIUM`].
pub fn from_case_myocardium(myo: &ndarray::Array2<u8>) -> LabelGrid {
    let mut grid = LabelGrid::from_raw(myo.clone());
    grid.replace(CASE_MYOCARDIUM, WORK_MYOCARDIUM);
    grid
}
