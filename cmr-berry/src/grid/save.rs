//! 格网的持久化存储.

use super::LabelGrid;
use crate::consts::Palette;
use image::ImageResult;
use ndarray_npy::{WriteNpyError, WriteNpyExt};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// 表明一个可以通过 **可视化友好** 模式持久化存储的图像对象.
///
/// `ImgWriteVis` trait 的意图是, 图像将以 "可视化友好"
/// 的方式保存, 而不是 "as is" 的方式. 对于只存在 0..=4
/// 类别编码的最终格网, 直接保存的图像肉眼不可分辨,
/// 保存前需要先映射到较易区分的灰度.
pub trait ImgWriteVis {
    /// 按照一定的可视化规则将图片保存到 `path` 路径.
    fn save_vis<P: AsRef<Path>>(&self, palette: &Palette, path: P) -> ImageResult<()>;
}

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 像素编码不经任何映射直接写入单通道栅格, 保证类别编码无损往返.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 使最终类别编码更有利于单通道可视化.
#[inline]
fn pretty(palette: &Palette, label: u8) -> u8 {
    use crate::consts::gray::*;
    match label {
        // 背景为黑色
        v if v == palette.background => BLACK,

        // 血池为暗灰色
        v if v == palette.blood_pool => DARK_GRAY,

        // 心肌为灰色
        v if v == palette.myocardium => GRAY,

        // 梗死为亮灰色
        v if v == palette.infarction => LIGHT_GRAY,

        // 无复流为白色
        v if v == palette.no_flow => WHITE,

        any_else => panic!("只允许图像存在五个类别编码, 但发现了 `{any_else}`"),
    }
}

impl ImgWriteVis for LabelGrid {
    fn save_vis<P: AsRef<Path>>(&self, palette: &Palette, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, image::Luma([pretty(palette, pix)]));
        }
        buf.save(path)
    }
}

impl ImgWriteRaw for LabelGrid {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        let (height, width) = self.shape();
        let mut buf = image::GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.indexed_iter() {
            buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
        }
        buf.save(path)
    }
}

impl LabelGrid {
    /// 将底层数据按 npy 格式写到 `path` 路径. 下游生成模型直接消费该文件.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> Result<(), WriteNpyError> {
        let writer = BufWriter::new(File::create(path)?);
        self.array_view().write_npy(writer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::gray::*;

    fn coded_grid() -> LabelGrid {
        let pal = Palette::default();
        let mut g = LabelGrid::new((6, 5));
        g[(0, 1)] = pal.blood_pool;
        g[(1, 2)] = pal.myocardium;
        g[(2, 3)] = pal.infarction;
        g[(3, 4)] = pal.no_flow;
        g
    }

    /// 类别编码必须无损往返.
    #[test]
    fn test_save_raw_round_trip() {
        let g = coded_grid();
        let path = std::env::temp_dir().join("cmr_berry_save_raw_test.png");
        g.save_raw(&path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!((img.height(), img.width()), (6, 5));
        for ((h, w), &pix) in g.indexed_iter() {
            assert_eq!(img.get_pixel(w as u32, h as u32).0[0], pix);
        }
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_save_vis_distinct_grays() {
        let g = coded_grid();
        let path = std::env::temp_dir().join("cmr_berry_save_vis_test.png");
        g.save_vis(&Palette::default(), &path).unwrap();

        let img = image::open(&path).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0).0[0], BLACK);
        assert_eq!(img.get_pixel(1, 0).0[0], DARK_GRAY);
        assert_eq!(img.get_pixel(2, 1).0[0], GRAY);
        assert_eq!(img.get_pixel(3, 2).0[0], LIGHT_GRAY);
        assert_eq!(img.get_pixel(4, 3).0[0], WHITE);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_save_npy_round_trip() {
        use ndarray_npy::ReadNpyExt;

        let g = coded_grid();
        let path = std::env::temp_dir().join("cmr_berry_save_npy_test.npy");
        g.save_npy(&path).unwrap();

        let back = ndarray::Array2::<u8>::read_npy(File::open(&path).unwrap()).unwrap();
        assert_eq!(back, g.into_raw());
        std::fs::remove_file(path).ok();
    }
}
