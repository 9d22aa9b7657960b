//! 最小包围圆.
//!
//! 求掩码最大连通前景的边界像素的最小包围圆, 其圆心作为旋转中心.
//! 算法为 Welzl 增量法的非随机化形式: 对边界像素集合规模
//! (几百个点) 而言足够快.

use crate::consts::gray::is_foreground;
use crate::{Idx2dF, LabelGrid};

/// 判定点在圆内的浮点容差.
const EPS: f64 = 1e-7;

/// 平面圆.
#[derive(Copy, Clone, Debug)]
pub struct Circle {
    /// 圆心 `(高, 宽)`.
    pub center: Idx2dF,

    /// 半径.
    pub radius: f64,
}

impl Circle {
    #[inline]
    fn contains(&self, (h, w): Idx2dF) -> bool {
        let dh = h - self.center.0;
        let dw = w - self.center.1;
        (dh * dh + dw * dw).sqrt() <= self.radius + EPS
    }
}

/// 以两点为直径构圆.
fn circle_from_two(a: Idx2dF, b: Idx2dF) -> Circle {
    let center = ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0);
    let dh = a.0 - b.0;
    let dw = a.1 - b.1;
    Circle {
        center,
        radius: (dh * dh + dw * dw).sqrt() / 2.0,
    }
}

/// 三点外接圆. 三点近似共线时退化为最远点对的直径圆.
fn circle_from_three(a: Idx2dF, b: Idx2dF, c: Idx2dF) -> Circle {
    let d = 2.0 * (a.0 * (b.1 - c.1) + b.0 * (c.1 - a.1) + c.0 * (a.1 - b.1));
    if d.abs() < 1e-12 {
        let candidates = [
            circle_from_two(a, b),
            circle_from_two(a, c),
            circle_from_two(b, c),
        ];
        return candidates
            .into_iter()
            .max_by(|x, y| x.radius.total_cmp(&y.radius))
            .unwrap();
    }
    let a2 = a.0 * a.0 + a.1 * a.1;
    let b2 = b.0 * b.0 + b.1 * b.1;
    let c2 = c.0 * c.0 + c.1 * c.1;
    let ch = (a2 * (b.1 - c.1) + b2 * (c.1 - a.1) + c2 * (a.1 - b.1)) / d;
    let cw = (a2 * (c.0 - b.0) + b2 * (a.0 - c.0) + c2 * (b.0 - a.0)) / d;
    let dh = a.0 - ch;
    let dw = a.1 - cw;
    Circle {
        center: (ch, cw),
        radius: (dh * dh + dw * dw).sqrt(),
    }
}

/// 求点集的最小包围圆. 点集为空时返回 `None`.
pub fn min_enclosing_circle(points: &[Idx2dF]) -> Option<Circle> {
    let &first = points.first()?;
    let mut circle = Circle {
        center: first,
        radius: 0.0,
    };

    for (i, &p) in points.iter().enumerate().skip(1) {
        if circle.contains(p) {
            continue;
        }
        circle = Circle {
            center: p,
            radius: 0.0,
        };
        for (j, &q) in points[..i].iter().enumerate() {
            if circle.contains(q) {
                continue;
            }
            circle = circle_from_two(p, q);
            for &r in &points[..j] {
                if !circle.contains(r) {
                    circle = circle_from_three(p, q, r);
                }
            }
        }
    }
    Some(circle)
}

/// 求掩码最大 4-连通前景分量边界像素的最小包围圆.
///
/// 非零像素视为前景. 全背景掩码返回 `None`.
pub fn mask_enclosing_circle(mask: &LabelGrid) -> Option<Circle> {
    let areas = mask.areas(is_foreground);
    let largest = areas.into_iter().max_by_key(|a| a.len())?;

    // 只取与背景 4-相邻或位于图像边缘的像素, 缩减点集规模.
    let border: Vec<Idx2dF> = largest
        .into_iter()
        .filter(|&pos| mask.is_at_border(pos) || mask.is_n4_having(pos, |p| p == 0))
        .map(|(h, w)| (h as f64, w as f64))
        .collect();

    min_enclosing_circle(&border)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_points() {
        let c = min_enclosing_circle(&[(0.0, 0.0), (0.0, 4.0)]).unwrap();
        assert!((c.radius - 2.0).abs() < 1e-9);
        assert!((c.center.1 - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_collinear_points() {
        let c = min_enclosing_circle(&[(0.0, 0.0), (0.0, 2.0), (0.0, 6.0)]).unwrap();
        assert!((c.radius - 3.0).abs() < 1e-6);
        assert!((c.center.1 - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_all_points_enclosed() {
        let pts: Vec<_> = (0..12)
            .map(|k| {
                let arc = k as f64 * std::f64::consts::PI / 6.0;
                (5.0 + 3.0 * arc.cos(), 5.0 + 3.0 * arc.sin())
            })
            .collect();
        let c = min_enclosing_circle(&pts).unwrap();
        assert!((c.radius - 3.0).abs() < 1e-6);
        for p in pts {
            assert!(c.contains(p));
        }
    }

    #[test]
    fn test_mask_center() {
        // 以 (10, 10) 为圆心的实心圆盘.
        let mut m = LabelGrid::new((21, 21));
        for (h, w) in m.pos_iter().collect::<Vec<_>>() {
            let dh = h as f64 - 10.0;
            let dw = w as f64 - 10.0;
            if (dh * dh + dw * dw).sqrt() <= 6.0 {
                m[(h, w)] = 1;
            }
        }
        let c = mask_enclosing_circle(&m).unwrap();
        assert!((c.center.0 - 10.0).abs() < 1.0);
        assert!((c.center.1 - 10.0).abs() < 1.0);
        assert!(mask_enclosing_circle(&LabelGrid::new((4, 4))).is_none());
    }
}
