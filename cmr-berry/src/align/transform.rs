//! 掩码的整像素平移与绕点旋转.

use crate::{Idx2dF, LabelGrid};

/// 计算一维平移后源窗口起点、目标窗口起点与窗口长度.
#[inline]
fn shift_range(offset: isize, size: usize) -> (usize, usize, usize) {
    let n = size as isize;
    if offset >= 0 {
        let len = (n - offset).max(0) as usize;
        (0, offset.min(n) as usize, len)
    } else {
        let len = (n + offset).max(0) as usize;
        ((-offset).min(n) as usize, 0, len)
    }
}

/// 将掩码平移 `(dh, dw)` 个像素. 移出边界的内容被裁剪, 不回绕.
pub fn shift(mask: &LabelGrid, dh: isize, dw: isize) -> LabelGrid {
    let (height, width) = mask.shape();
    let mut out = LabelGrid::new((height, width));

    let (src_h, dst_h, len_h) = shift_range(dh, height);
    let (src_w, dst_w, len_w) = shift_range(dw, width);

    for r in 0..len_h {
        for c in 0..len_w {
            out[(dst_h + r, dst_w + c)] = mask[(src_h + r, src_w + c)];
        }
    }
    out
}

/// 双线性采样. 越界部分按背景 (0) 处理.
fn bilinear(mask: &LabelGrid, sh: f64, sw: f64) -> f64 {
    let (height, width) = mask.shape();
    let h0 = sh.floor();
    let w0 = sw.floor();
    let fh = sh - h0;
    let fw = sw - w0;

    let sample = |h: f64, w: f64| -> f64 {
        if h < 0.0 || w < 0.0 || h >= height as f64 || w >= width as f64 {
            0.0
        } else {
            f64::from(mask[(h as usize, w as usize)].min(1))
        }
    };

    sample(h0, w0) * (1.0 - fh) * (1.0 - fw)
        + sample(h0, w0 + 1.0) * (1.0 - fh) * fw
        + sample(h0 + 1.0, w0) * fh * (1.0 - fw)
        + sample(h0 + 1.0, w0 + 1.0) * fh * fw
}

/// 将掩码绕 `center` 旋转 `angle_deg` 度, 输出保持原尺寸.
///
/// 逐目标像素做逆映射, 在 0/1 浮点域上双线性插值,
/// 以 `> 0.5` 阈值重新二值化. 非零输入像素一律视为前景.
pub fn rotate_about(mask: &LabelGrid, angle_deg: f64, center: Idx2dF) -> LabelGrid {
    let (sin, cos) = angle_deg.to_radians().sin_cos();
    let (height, width) = mask.shape();
    let mut out = LabelGrid::new((height, width));

    for h in 0..height {
        for w in 0..width {
            let dh = h as f64 - center.0;
            let dw = w as f64 - center.1;
            // 逆映射: 源坐标 = R(-angle) * (目标 - center) + center.
            let sh = cos * dh + sin * dw + center.0;
            let sw = -sin * dh + cos * dw + center.1;
            if bilinear(mask, sh, sw) > 0.5 {
                out[(h, w)] = 1;
            }
        }
    }
    out
}
