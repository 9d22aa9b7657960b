//! 二维二值形态学操作与平滑.
//!
//! 本模块的所有函数只对二值格网 (像素值 0/1) 有意义. 结构元以相对锚点的
//! 偏移集合表示, 锚点取 `(高 / 2, 宽 / 2)`.

use crate::{Idx2d, LabelGrid};

/// 结构元形状.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SeShape {
    /// 实心矩形.
    Rect,

    /// 内切椭圆.
    Ellipse,
}

/// 相对锚点的结构元偏移集合.
pub type StructElem = Vec<(isize, isize)>;

/// 构造 `(h, w)` 大小、形状为 `shape` 的结构元.
///
/// 如果任一边长为 0, 则程序 panic.
pub fn structuring_element(shape: SeShape, (h, w): Idx2d) -> StructElem {
    assert!(h > 0 && w > 0, "结构元边长不能为 0");
    let (ah, aw) = ((h / 2) as isize, (w / 2) as isize);

    // 内切椭圆按几何中心判定, 偏移仍按锚点计算.
    let (cy, cx) = ((h as f64 - 1.0) / 2.0, (w as f64 - 1.0) / 2.0);
    let (ry, rx) = (cy.max(0.5), cx.max(0.5));

    let mut offsets = StructElem::with_capacity(h * w);
    for r in 0..h {
        for c in 0..w {
            let keep = match shape {
                SeShape::Rect => true,
                SeShape::Ellipse => {
                    let dy = (r as f64 - cy) / ry;
                    let dx = (c as f64 - cx) / rx;
                    dy * dy + dx * dx <= 1.0 + 1e-9
                }
            };
            if keep {
                offsets.push((r as isize - ah, c as isize - aw));
            }
        }
    }
    offsets
}

/// 将 `pos` 按偏移 `off` 平移. 越界或为负时返回 `None`.
#[inline]
fn offset_within((h, w): Idx2d, (dh, dw): (isize, isize), shape: Idx2d) -> Option<Idx2d> {
    let nh = h as isize + dh;
    let nw = w as isize + dw;
    (nh >= 0 && nw >= 0 && (nh as usize) < shape.0 && (nw as usize) < shape.1)
        .then(|| (nh as usize, nw as usize))
}

/// 二值膨胀: 每个前景像素向结构元偏移方向散射.
pub fn dilate(mask: &LabelGrid, se: &StructElem) -> LabelGrid {
    let shape = mask.shape();
    let mut out = LabelGrid::new(shape);
    for (pos, &pix) in mask.indexed_iter() {
        if pix == 0 {
            continue;
        }
        for &off in se {
            if let Some(np) = offset_within(pos, off, shape) {
                out[np] = 1;
            }
        }
    }
    out
}

/// 二值腐蚀: 结构元覆盖范围内全部为前景的像素才保留. 图像外视为背景.
pub fn erode(mask: &LabelGrid, se: &StructElem) -> LabelGrid {
    let shape = mask.shape();
    let mut out = LabelGrid::new(shape);
    'pixel: for (pos, &pix) in mask.indexed_iter() {
        if pix == 0 {
            continue;
        }
        for &off in se {
            match offset_within(pos, off, shape) {
                Some(np) if mask[np] != 0 => {}
                _ => continue 'pixel,
            }
        }
        out[pos] = 1;
    }
    out
}

/// 二值闭运算: 先膨胀后腐蚀. 弥合小于结构元尺度的缝隙.
#[inline]
pub fn close(mask: &LabelGrid, se: &StructElem) -> LabelGrid {
    erode(&dilate(mask, se), se)
}

/// 生成一维高斯核. `sigma <= 0` 时按核长自动推导
/// (`sigma = 0.3 * ((ksize - 1) * 0.5 - 1) + 0.8`).
///
/// 如果 `size` 不是正奇数, 则程序 panic.
pub(crate) fn gaussian_kernel_1d(size: usize, sigma: f64) -> Vec<f64> {
    assert!(size % 2 == 1, "高斯核长必须是奇数");
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8
    };
    let center = (size / 2) as f64;
    let mut kernel = Vec::with_capacity(size);
    let mut sum = 0.0;
    for i in 0..size {
        let x = i as f64 - center;
        let value = (-x * x / (2.0 * sigma * sigma)).exp();
        kernel.push(value);
        sum += value;
    }
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// 对二值格网做可分离高斯平滑, 并以 `threshold` 重新二值化.
///
/// 卷积在 0/1 浮点域上进行, 边界按最近像素延拓 (clamp).
/// 输出像素为 1 当且仅当平滑值 `>= threshold`.
pub fn gaussian_smooth(mask: &LabelGrid, ksize: usize, sigma: f64, threshold: f64) -> LabelGrid {
    let (height, width) = mask.shape();
    if height == 0 || width == 0 {
        return mask.clone();
    }
    let kernel = gaussian_kernel_1d(ksize, sigma);
    let half_k = ksize / 2;

    // 水平方向
    let mut temp = vec![0.0f64; height * width];
    for h in 0..height {
        for w in 0..width {
            let mut sum = 0.0;
            for (i, &k_val) in kernel.iter().enumerate() {
                let sw = (w + i).saturating_sub(half_k).min(width - 1);
                sum += f64::from(mask[(h, sw)]) * k_val;
            }
            temp[h * width + w] = sum;
        }
    }

    // 垂直方向 + 二值化
    let mut out = LabelGrid::new((height, width));
    for h in 0..height {
        for w in 0..width {
            let mut sum = 0.0;
            for (i, &k_val) in kernel.iter().enumerate() {
                let sh = (h + i).saturating_sub(half_k).min(height - 1);
                sum += temp[sh * width + w] * k_val;
            }
            if sum >= threshold {
                out[(h, w)] = 1;
            }
        }
    }
    out
}

/// 以 8-相邻规则标记所有前景连通分量, 丢弃像素数小于 `min_size` 的分量.
///
/// 对已过滤的掩码再次以相同阈值过滤, 结果不变 (幂等).
pub fn filter_components(mask: &LabelGrid, min_size: usize) -> LabelGrid {
    let mut out = LabelGrid::new(mask.shape());
    for area in mask.areas8(crate::consts::gray::is_foreground) {
        if area.len() >= min_size {
            out.fill_batch(area, 1);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structuring_element_shapes() {
        let rect = structuring_element(SeShape::Rect, (3, 3));
        assert_eq!(rect.len(), 9);
        assert!(rect.contains(&(0, 0)) && rect.contains(&(-1, -1)) && rect.contains(&(1, 1)));

        // 3x3 内切椭圆去掉四角.
        let ell = structuring_element(SeShape::Ellipse, (3, 3));
        assert!(ell.contains(&(0, 0)) && ell.contains(&(-1, 0)));
        assert!(!ell.contains(&(-1, -1)));
        assert_eq!(ell.len(), 5);
    }

    #[test]
    fn test_close_fills_gap() {
        // 两个相距 1 像素的前景块, 3x3 闭运算应当弥合中间缝隙.
        let mut m = LabelGrid::new((3, 7));
        for h in 0..3 {
            for w in 0..3 {
                m[(h, w)] = 1;
                m[(h, w + 4)] = 1;
            }
        }
        let closed = close(&m, &structuring_element(SeShape::Rect, (3, 3)));
        assert_eq!(closed[(1, 3)], 1);
        // 闭运算不应该把前景腐蚀掉.
        for (pos, &pix) in m.indexed_iter() {
            if pix == 1 {
                assert_eq!(closed[pos], 1, "{pos:?} 被错误移除");
            }
        }
    }

    #[test]
    fn test_erode_subset() {
        let mut m = LabelGrid::new((9, 9));
        for h in 2..7 {
            for w in 2..7 {
                m[(h, w)] = 1;
            }
        }
        let eroded = erode(&m, &structuring_element(SeShape::Rect, (3, 3)));
        assert!(eroded.count_nonzero() < m.count_nonzero());
        for (pos, &pix) in eroded.indexed_iter() {
            if pix == 1 {
                assert_eq!(m[pos], 1);
            }
        }
        assert_eq!(eroded[(4, 4)], 1);
        assert_eq!(eroded[(2, 2)], 0);
    }

    #[test]
    fn test_gaussian_kernel_normalized() {
        let k = gaussian_kernel_1d(5, 2.0);
        assert_eq!(k.len(), 5);
        assert!((k.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!((k[0] - k[4]).abs() < 1e-12 && (k[1] - k[3]).abs() < 1e-12);
        assert!(k[2] > k[1]);
    }

    #[test]
    fn test_filter_components_idempotent() {
        let mut m = LabelGrid::new((10, 10));
        // 大分量 (6 像素) 与小分量 (2 像素).
        for w in 0..6 {
            m[(1, w)] = 1;
        }
        m[(8, 8)] = 1;
        m[(8, 9)] = 1;

        let once = filter_components(&m, 3);
        assert_eq!(once.count_nonzero(), 6);
        assert_eq!(once[(8, 8)], 0);

        let twice = filter_components(&once, 3);
        for (pos, &pix) in once.indexed_iter() {
            assert_eq!(pix, twice[pos]);
        }
    }
}
