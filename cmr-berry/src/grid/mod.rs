//! 二维标签格网基础数据结构.

mod save;

pub use save::{ImgWriteRaw, ImgWriteVis};

use crate::{Area2d, Areas2d, Idx2d, Idx2dF};
use ndarray::iter::{Iter, IterMut};
use ndarray::{Array2, ArrayView2, Ix2};
use std::collections::{HashSet, VecDeque};
use std::ops::{Index, IndexMut};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 获得 `(h, w)` 的 4-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour4((h, w): Idx2d) -> [Idx2d; 4] {
    [
        (h.wrapping_sub(1), w),
        (h.saturating_add(1), w),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
    ]
}

/// 获得 `(h, w)` 的 8-邻居索引. 不检查越界.
#[inline]
pub(crate) fn neighbour8((h, w): Idx2d) -> [Idx2d; 8] {
    [
        (h.wrapping_sub(1), w.wrapping_sub(1)),
        (h.wrapping_sub(1), w),
        (h.wrapping_sub(1), w.saturating_add(1)),
        (h, w.wrapping_sub(1)),
        (h, w.saturating_add(1)),
        (h.saturating_add(1), w.wrapping_sub(1)),
        (h.saturating_add(1), w),
        (h.saturating_add(1), w.saturating_add(1)),
    ]
}

/// 拥有所有权的二维标签格网.
///
/// 每个像素持有一个小整数分类编码. 格网在流水线各阶段间转移所有权,
/// 阶段内通过独占引用原地修改; 生长队列等辅助结构只持有坐标值,
/// 不持有对格网本体的别名.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug)]
pub struct LabelGrid {
    data: Array2<u8>,
}

impl Index<Idx2d> for LabelGrid {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for LabelGrid {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl LabelGrid {
    /// 创建 `(h, w)` 全零格网.
    #[inline]
    pub fn new((h, w): Idx2d) -> Self {
        Self::from_elem((h, w), 0)
    }

    /// 创建以 `elem` 填满的 `(h, w)` 格网.
    #[inline]
    pub fn from_elem((h, w): Idx2d, elem: u8) -> Self {
        Self {
            data: Array2::from_elem((h, w), elem),
        }
    }

    /// 从底层数据直接初始化.
    #[inline]
    pub fn from_raw(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<u8> {
        self.data
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<u8> {
        self.data.view()
    }

    /// 获取可以迭代格网像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 获取可以迭代并修改格网像素的迭代器.
    #[inline]
    pub fn iter_mut(&mut self) -> IterMut<'_, u8, Ix2> {
        self.data.iter_mut()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 格网的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let &[h, w] = self.data.shape() else {
            unreachable!()
        };
        (h, w)
    }

    /// 获得格网的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得格网的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 格网的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 判断一个索引是否合法 (未越界).
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        let (h_len, w_len) = self.shape();
        h < h_len && w < w_len
    }

    /// 判断一个索引是否位于格网的边缘.
    #[inline]
    pub fn is_at_border(&self, (h, w): Idx2d) -> bool {
        h == 0
            || h.saturating_add(1) == self.height()
            || w == 0
            || w.saturating_add(1) == self.width()
    }

    /// 统计格网中值为 `label` 的像素总个数.
    #[inline]
    pub fn count(&self, label: u8) -> usize {
        self.data.iter().filter(|&p| *p == label).count()
    }

    /// 统计格网中的非零像素总个数.
    #[inline]
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&p| *p != 0).count()
    }

    /// 将格网中值为 `old` 的像素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u8, new: u8) -> usize {
        let mut cnt = 0usize;
        self.data
            .iter_mut()
            .filter(|pix| **pix == old)
            .for_each(|p| {
                cnt += 1;
                *p = new;
            });
        cnt
    }

    /// 将 `it` 中的每个索引对应的像素改为 `new`.
    pub fn fill_batch<I: IntoIterator<Item = Idx2d>>(&mut self, it: I, new: u8) {
        for pos in it.into_iter() {
            self[pos] = new;
        }
    }

    /// 以行优先规则, 获取能迭代格网所有索引的迭代器.
    #[inline]
    pub fn pos_iter(&self) -> impl Iterator<Item = Idx2d> {
        let (h, w) = self.shape();
        (0..h).flat_map(move |first| (0..w).map(move |second| (first, second)))
    }

    /// 以行优先规则, 获取能迭代格网所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }

    /// 判断 `(h, w)` 的 4-邻域是否有满足谓词 `pred` 的像素.
    pub fn is_n4_having(&self, (h, w): Idx2d, mut pred: impl FnMut(u8) -> bool) -> bool {
        matches!(self.get((h.wrapping_sub(1), w)), Some(&v) if pred(v))
            || matches!(self.get((h.saturating_add(1), w)), Some(&v) if pred(v))
            || matches!(self.get((h, w.wrapping_sub(1))), Some(&v) if pred(v))
            || matches!(self.get((h, w.saturating_add(1))), Some(&v) if pred(v))
    }

    /// 获取所有值为 `label` 的像素索引, 按行优先顺序.
    pub fn positions_of(&self, label: u8) -> Area2d {
        self.data
            .indexed_iter()
            .filter_map(|(pos, &pix)| (pix == label).then_some(pos))
            .collect()
    }

    /// 计算所有值为 `label` 的像素的质心 `(高, 宽)`.
    /// 如果不存在目标像素则返回 `None`.
    pub fn centroid_of(&self, label: u8) -> Option<Idx2dF> {
        let mut cnt = 0usize;
        let (mut sum_h, mut sum_w) = (0.0f64, 0.0f64);
        for ((h, w), &pix) in self.data.indexed_iter() {
            if pix == label {
                cnt += 1;
                sum_h += h as f64;
                sum_w += w as f64;
            }
        }
        (cnt > 0).then(|| (sum_h / cnt as f64, sum_w / cnt as f64))
    }

    /// 获得将值为 `label` 的像素映射为 1, 其余映射为 0 的二值格网.
    pub fn binarize(&self, label: u8) -> LabelGrid {
        LabelGrid {
            data: self.data.mapv(|p| u8::from(p == label)),
        }
    }

    /// 按照 4-相邻规则获取所有区域. 两个像素 `p1` 和 `p2` 属于同一个区域,
    /// 当且仅当存在一条从 `p1` 到 `p2` 的 4-相邻路径, 且路径上的所有像素
    /// (包括 `p1` 和 `p2`) 都满足谓词 `pred`.
    #[inline]
    pub fn areas(&self, pred: crate::Predicate) -> Areas2d {
        self.areas_with(pred, false)
    }

    /// 按照 8-相邻规则获取所有区域. 语义同 [`Self::areas`], 但对角相邻也算相邻.
    #[inline]
    pub fn areas8(&self, pred: crate::Predicate) -> Areas2d {
        self.areas_with(pred, true)
    }

    /// 区域提取实现. `diagonal` 决定使用 4-相邻还是 8-相邻.
    fn areas_with(&self, pred: crate::Predicate, diagonal: bool) -> Areas2d {
        let mut ans = Areas2d::with_capacity(1);
        let mut bfs_q = VecDeque::with_capacity(4);
        let mut set = HashSet::with_capacity(16);

        for pos in self.pos_iter() {
            if set.contains(&pos) || !pred(self[pos]) {
                continue;
            }
            bfs_q.push_back(pos);
            let mut this_area = Area2d::with_capacity(1);
            while let Some(cur_pos) = bfs_q.pop_front() {
                if set.contains(&cur_pos) {
                    continue;
                }
                set.insert(cur_pos);
                this_area.push(cur_pos);

                // bfs
                let push = |q: &mut VecDeque<Idx2d>, set: &HashSet<Idx2d>, p: Idx2d| {
                    if self.check(p) && pred(self[p]) && !set.contains(&p) {
                        q.push_back(p);
                    }
                };
                if diagonal {
                    for p in neighbour8(cur_pos) {
                        push(&mut bfs_q, &set, p);
                    }
                } else {
                    for p in neighbour4(cur_pos) {
                        push(&mut bfs_q, &set, p);
                    }
                }
            }
            ans.push(this_area);
        }
        ans
    }

    /// 该格网是否全零?
    #[inline]
    pub fn is_all_zero(&self) -> bool {
        self.data.iter().all(|&p| p == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::LabelGrid;

    #[test]
    fn test_count_replace() {
        let mut g = LabelGrid::from_elem((3, 3), 5);
        g[(1, 1)] = 7;
        assert_eq!(g.count(5), 8);
        assert_eq!(g.count(7), 1);
        assert_eq!(g.replace(5, 9), 8);
        assert_eq!(g.count(9), 8);
    }

    #[test]
    fn test_areas_connectivity() {
        // 两个对角相邻的前景像素: 4-相邻认为是两个区域, 8-相邻认为是一个.
        let mut g = LabelGrid::new((4, 4));
        g[(1, 1)] = 1;
        g[(2, 2)] = 1;
        assert_eq!(g.areas(|p| p == 1).len(), 2);
        assert_eq!(g.areas8(|p| p == 1).len(), 1);
    }

    #[test]
    fn test_centroid_of() {
        let mut g = LabelGrid::new((5, 5));
        g[(1, 1)] = 3;
        g[(3, 3)] = 3;
        let (ch, cw) = g.centroid_of(3).unwrap();
        assert_eq!((ch, cw), (2.0, 2.0));
        assert!(g.centroid_of(9).is_none());
    }

    #[test]
    fn test_binarize() {
        let mut g = LabelGrid::new((2, 2));
        g[(0, 0)] = 4;
        let b = g.binarize(4);
        assert_eq!(b[(0, 0)], 1);
        assert_eq!(b[(1, 1)], 0);
        assert_eq!(b.count_nonzero(), 1);
    }
}
