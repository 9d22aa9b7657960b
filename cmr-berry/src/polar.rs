//! 以质心为原点的极坐标变换.
//!
//! 我们一般使用行优先编码存储二维图像. 其中行就是 "Height" (垂直方向),
//! 列就是 "Width" (水平方向). 然后将 "Height" 作为平面直角坐标系中的 x 轴,
//! 将 "Width" 作为平面直角坐标系中的 y 轴, 这样相当于将原先的平面直角坐标系
//! 按顺时针旋转了 90 度.
//!
//! 以质心为原点, 则平面上任意点的方向就可以通过 `atan2` 确定下来了.
//! 注意我们通过归一化保证了弧度的范围为 `[0, 2 * PI)`.

use crate::{Idx2d, Idx2dF};

const PI_2: f64 = std::f64::consts::PI * 2.0;

/// 获取点 `(h, w)` 相对于 `center` 的极坐标 `(半径, 弧度)`.
/// 弧度取值范围为 `[0, 2 * PI)`.
///
/// # 弧度规范
///
/// - h 增加的方向弧度为 `0`;
/// - w 增加的方向弧度为 `pi / 2`;
/// - h 减少的方向弧度为 `pi`;
/// - w 减少的方向弧度为 `3 * pi / 2`.
pub fn cartesian_to_polar((h, w): Idx2d, center: Idx2dF) -> (f64, f64) {
    let dh = h as f64 - center.0;
    let dw = w as f64 - center.1;
    let radius = (dh * dh + dw * dw).sqrt();
    let mut arc = f64::atan2(dw, dh);
    if arc < 0.0 {
        arc += PI_2;
    }
    (radius, arc)
}

/// 将极坐标 `(radius, arc)` 转换回 `center` 附近的格网索引.
///
/// 坐标分量向零截断, 因此 `(-1, 0)` 开区间内的分量落到 0.
/// 任一分量 `<= -1` 时返回 `None`; 调用方仍需检查格网边界.
/// `radius` 允许为负 (等价于反向半径), `arc` 不要求归一化.
pub fn polar_to_cartesian(radius: f64, arc: f64, center: Idx2dF) -> Option<Idx2d> {
    let h = center.0 + radius * arc.cos();
    let w = center.1 + radius * arc.sin();
    if h <= -1.0 || w <= -1.0 || !h.is_finite() || !w.is_finite() {
        return None;
    }
    Some((h.max(0.0) as usize, w.max(0.0) as usize))
}
