//! 运行时错误.

use thiserror::Error;

/// 仿真与配准流水线的运行时错误.
///
/// 统计门控拒绝 **不是** 错误, 由 [`crate::sim::GenOutcome::Rejected`] 表达.
#[derive(Debug, Error)]
pub enum SimError {
    /// 几何配置无法满足: 请求的半径/厚度超出图像边界. 致命, 不应重试.
    #[error("几何配置无法放入 {height}x{width} 图像: 所需半径余量 {required}")]
    Geometry {
        /// 图像高.
        height: usize,
        /// 图像宽.
        width: usize,
        /// 模板外沿 (半径 + 半厚度 + 抖动 + 平滑) 所需的像素余量.
        required: usize,
    },

    /// 格网中找不到值为 `value` 的像素, 种子采样无法进行. 瞬态, 可整样重试.
    #[error("找不到值为 {value} 的种子区域")]
    EmptyRegion {
        /// 目标像素值.
        value: u8,
    },

    /// 连续 `attempts` 次生成尝试均被拒绝或瞬态失败.
    #[error("{attempts} 次生成尝试后仍未接受")]
    RetriesExhausted {
        /// 已消耗的尝试次数.
        attempts: u32,
    },

    /// 持久化失败. 对当前样本致命, 不影响已写出的样本.
    #[error("持久化失败: {0}")]
    Persist(#[from] std::io::Error),

    /// 栅格图像编码/写出失败.
    #[error("图像写出失败: {0}")]
    Image(#[from] image::ImageError),

    /// `.npy` 数组写出失败.
    #[error("npy 写出失败: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    /// 掩码数据集加载失败.
    #[error("掩码数据集加载失败: {0}")]
    Dataset(String),
}
