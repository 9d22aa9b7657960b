//! 运行配置.
//!
//! 配置以 JSON 文件给出, 两条流水线各自独立开关:
//! 省略 `simulate` 或 `merge` 小节即跳过对应流水线.

use cmr_berry::prelude::*;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 顶层配置.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// 输入/输出路径.
    pub paths: Paths,

    /// 仿真流水线配置. 缺省则跳过.
    #[serde(default)]
    pub simulate: Option<SimulateConfig>,

    /// 合并掩码流水线配置. 缺省则跳过.
    #[serde(default)]
    pub merge: Option<MergeConfig>,

    /// 批量生成的基础随机种子. 缺省取 0.
    #[serde(default)]
    pub seed: u64,
}

/// 路径配置.
#[derive(Debug, Deserialize)]
pub struct Paths {
    /// 提取掩码数据集根目录. 缺省时落到 `{home}/dataset/cmr`.
    #[serde(default)]
    pub masks_root: Option<PathBuf>,

    /// 输出目录.
    pub output_dir: PathBuf,
}

impl Paths {
    /// 解析掩码数据集根目录.
    pub fn resolve_masks_root(&self) -> Option<PathBuf> {
        self.masks_root
            .clone()
            .or_else(|| home_dataset_dir_with(["cmr"]))
    }
}

/// 模板来源类型.
#[derive(Copy, Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    /// 合成模板.
    #[default]
    Simulated,

    /// 真实提取模板.
    Real,
}

/// 仿真流水线配置.
#[derive(Debug, Deserialize)]
pub struct SimulateConfig {
    /// 生成的样本数.
    pub number_of_images: usize,

    /// 模板来源.
    #[serde(default)]
    pub template: TemplateKind,

    /// 流水线参数. 缺省取默认值.
    #[serde(default)]
    pub params: SimParams,
}

/// 合并掩码流水线配置.
#[derive(Debug, Deserialize)]
pub struct MergeConfig {
    /// 生成的样本数.
    pub number_of_masks: usize,

    /// 流水线参数. 缺省取默认值.
    #[serde(default)]
    pub params: MergeParams,
}

/// 从 JSON 文件加载配置.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, String> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .map_err(|e| format!("配置文件 {} 打开失败: {e}", path.display()))?;
    serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| format!("配置文件 {} 解析失败: {e}", path.display()))
}
