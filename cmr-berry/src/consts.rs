//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 仿真过程中, 背景的工作像素值.
    pub const WORK_BACKGROUND: u8 = 0;

    /// 仿真过程中, 血池的工作像素值.
    pub const WORK_BLOOD_POOL: u8 = 80;

    /// 仿真过程中, 心肌的工作像素值. 同时也是区域生长的可生长占位值.
    pub const WORK_MYOCARDIUM: u8 = 150;

    /// 区域生长后, 梗死像素的哨兵值.
    pub const WORK_INFARCT: u8 = 255;

    /// 组装期无复流区域的工作像素值.
    pub const WORK_NO_FLOW: u8 = 40;

    /// 无复流子区域生长的哨兵值.
    pub const NO_FLOW_GROWN: u8 = 20;

    /// 提取掩码中, 血池的像素值.
    pub const CASE_BLOOD_POOL: u8 = 1;

    /// 提取掩码中, 心肌的像素值.
    pub const CASE_MYOCARDIUM: u8 = 2;

    /// 提取掩码中, 梗死像素的最小值 (`>= 3` 均视为梗死).
    pub const CASE_INFARCT_MIN: u8 = 3;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道暗灰色.
    pub const DARK_GRAY: u8 = 0b_0100_0000;

    /// 单通道灰色.
    pub const GRAY: u8 = 0b_1000_0000;

    /// 单通道亮灰色.
    pub const LIGHT_GRAY: u8 = 0b_1100_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是生长后的梗死哨兵?
    #[inline]
    pub const fn is_work_infarct(p: u8) -> bool {
        matches!(p, WORK_INFARCT)
    }

    /// 像素是否是提取掩码中的梗死?
    #[inline]
    pub const fn is_case_infarct(p: u8) -> bool {
        p >= CASE_INFARCT_MIN
    }

    /// 像素是否非零 (二值掩码前景)?
    #[inline]
    pub const fn is_foreground(p: u8) -> bool {
        p != 0
    }
}

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 最终输出格网的五个类别像素编码.
///
/// 工作期像素值 (见 [`gray`]) 是库内固定常量, 输出编码由配置决定.
/// 五个编码必须两两不同, 否则组装后的格网无法还原类别.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Palette {
    /// 背景编码.
    pub background: u8,

    /// 血池编码.
    pub blood_pool: u8,

    /// 心肌编码.
    pub myocardium: u8,

    /// 梗死编码.
    pub infarction: u8,

    /// 无复流编码.
    pub no_flow: u8,
}

impl Default for Palette {
    /// 原始数据集约定: 背景 0, 血池 1, 心肌 2, 梗死 3, 无复流 4.
    fn default() -> Self {
        Self {
            background: 0,
            blood_pool: 1,
            myocardium: 2,
            infarction: 3,
            no_flow: 4,
        }
    }
}

impl Palette {
    /// 五个编码是否两两不同?
    pub fn is_distinct(&self) -> bool {
        let v = [
            self.background,
            self.blood_pool,
            self.myocardium,
            self.infarction,
            self.no_flow,
        ];
        v.iter().enumerate().all(|(i, a)| v[i + 1..].iter().all(|b| a != b))
    }
}
