//! 仿真流水线与批量编排.
//!
//! 单次生成 = 模板 -> 种子 -> 生长 -> 形态学后处理 -> 无复流 ->
//! 组装 -> 统计门控. 编排器以 "整样重来" 的方式循环:
//! 每次尝试都从全新格网开始, 拒绝与瞬态失败都不会把部分状态
//! 泄漏到下一次尝试.

use crate::align::{self, AlignParams};
use crate::consts::gray::*;
use crate::consts::Palette;
use crate::dataset::MaskLibrary;
use crate::growth::{spread, GrowthParams};
use crate::morph::{self, SeShape};
use crate::noflow::{self, NoFlowParams};
use crate::seeds::{self, WalkParams};
use crate::stats::{GateBounds, GenStats};
use crate::synth::{self, RingParams};
use crate::{Idx2d, ImgWriteRaw, LabelGrid, SimError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 梗死后处理的闭运算结构元 (椭圆).
const INFARCT_CLOSE: Idx2d = (8, 8);

/// 梗死后处理的高斯核长与 sigma.
const INFARCT_BLUR: (usize, f64) = (5, 2.0);

/// 模板来源.
#[derive(Copy, Clone)]
pub enum TemplateSource<'a> {
    /// 合成 "环 + 腔" 模板.
    Synthetic,

    /// 从真实掩码库抽取心肌/血池切片对.
    Real(&'a MaskLibrary),
}

impl TemplateSource<'_> {
    /// 输出文件名中的来源标记.
    #[inline]
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Synthetic => "simulated",
            Self::Real(_) => "real_simulated",
        }
    }
}

/// 仿真流水线参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct SimParams {
    /// 输出图像分辨率 (高, 宽).
    pub image_size: Idx2d,

    /// 合成模板几何参数.
    pub ring: RingParams,

    /// 种子游走参数.
    pub walk: WalkParams,

    /// 梗死生长参数.
    pub growth: GrowthParams,

    /// 梗死连通分量的最小保留面积.
    pub min_cluster_size: usize,

    /// 无复流生成参数.
    pub no_flow: NoFlowParams,

    /// 无复流连通分量的最小保留面积.
    pub min_no_flow_size: usize,

    /// 输出类别编码.
    pub palette: Palette,

    /// 统计门控约束.
    pub bounds: GateBounds,

    /// 单样本的尝试上限, 超出则报 [`SimError::RetriesExhausted`].
    pub max_attempts: u32,

    /// 瞬态失败后的退避时长 (毫秒).
    pub retry_backoff_ms: u64,
}

impl SimParams {
    /// 按图像尺寸构造默认参数. 外半径范围取图像短边的 1/4 到 1/3.
    pub fn for_size(size: Idx2d) -> Self {
        let edge = size.0.min(size.1);
        Self {
            image_size: size,
            ring: RingParams {
                outer_radius: edge / 4..=edge / 3,
                ring_thickness: 15..=20,
            },
            walk: WalkParams::default(),
            growth: GrowthParams::default(),
            min_cluster_size: 70,
            no_flow: NoFlowParams::default(),
            min_no_flow_size: 30,
            palette: Palette::default(),
            bounds: GateBounds::default(),
            max_attempts: 64,
            retry_backoff_ms: 1000,
        }
    }
}

impl Default for SimParams {
    fn default() -> Self {
        Self::for_size((250, 250))
    }
}

/// 一次生成尝试的结果.
///
/// 拒绝不是错误: 编排器只对 `Rejected` 与可恢复的 `Err` 循环.
pub enum GenOutcome {
    /// 通过统计门控, 可以持久化.
    Accepted {
        /// 最终编码格网.
        grid: LabelGrid,
        /// 门控统计.
        stats: GenStats,
    },

    /// 比例越界, 整样重新生成.
    Rejected(GenStats),
}

/// 把工作值格网单遍重映射到输出编码.
///
/// 最终格网中不允许残留任何工作值; 发现未知像素值说明流水线
/// 存在内部缺陷, 程序直接 panic.
fn remap_to_palette(grid: &mut LabelGrid, palette: &Palette) {
    for pix in grid.iter_mut() {
        *pix = match *pix {
            WORK_BACKGROUND => palette.background,
            WORK_INFARCT => palette.infarction,
            WORK_NO_FLOW => palette.no_flow,
            WORK_MYOCARDIUM => palette.myocardium,
            WORK_BLOOD_POOL => palette.blood_pool,
            other => panic!("组装格网中出现未知工作值 `{other}`"),
        };
    }
}

/// 执行一次完整的仿真生成尝试.
pub fn generate_once<R: Rng + ?Sized>(
    source: TemplateSource,
    params: &SimParams,
    rng: &mut R,
) -> Result<GenOutcome, SimError> {
    // 模板. 真实模式额外携带配对血池掩码.
    let (template, blood_pool) = match source {
        TemplateSource::Synthetic => (
            synth::ring_with_cavity(params.image_size, &params.ring, rng)?,
            None,
        ),
        TemplateSource::Real(library) => {
            let (myo, bp) = library.random_myocardium_slice(rng).ok_or(
                SimError::EmptyRegion {
                    value: CASE_MYOCARDIUM,
                },
            )?;
            (synth::from_case_myocardium(myo), Some(bp.clone()))
        }
    };

    // 种子采样与梗死生长. 生长在模板副本上进行, 组装仍从干净模板出发.
    let (origin, centroid) = seeds::initial_seed(&template, WORK_MYOCARDIUM, rng)?;
    let walk = seeds::polar_walk(
        &template,
        WORK_MYOCARDIUM,
        origin,
        centroid,
        &params.walk,
        rng,
    );

    let mut grown = template.clone();
    spread(
        &mut grown,
        &walk,
        WORK_MYOCARDIUM,
        WORK_INFARCT,
        &params.growth,
        rng,
    );

    // 形态学后处理: 闭运算 -> 高斯平滑 -> 最小面积过滤.
    let raw_infarct = grown.binarize(WORK_INFARCT);
    let closed = morph::close(
        &raw_infarct,
        &morph::structuring_element(SeShape::Ellipse, INFARCT_CLOSE),
    );
    let smoothed = morph::gaussian_smooth(&closed, INFARCT_BLUR.0, INFARCT_BLUR.1, 0.5);
    let infarct = morph::filter_components(&smoothed, params.min_cluster_size);

    // 无复流子区域.
    let noflow_grown = noflow::grow_no_flow(&infarct, &params.no_flow, rng);
    let noflow_mask = morph::filter_components(&noflow_grown, params.min_no_flow_size);

    // 组装: 干净模板 + 过滤后的两层掩码, 然后单遍重映射.
    let mut final_grid = template;
    for (pos, &pix) in infarct.indexed_iter() {
        if pix != 0 {
            final_grid[pos] = WORK_INFARCT;
        }
    }
    for (pos, &pix) in noflow_mask.indexed_iter() {
        if pix != 0 {
            final_grid[pos] = WORK_NO_FLOW;
        }
    }
    remap_to_palette(&mut final_grid, &params.palette);

    if let Some(bp) = blood_pool {
        align::add_blood_pool(&mut final_grid, &bp, params.palette.blood_pool);
    }

    // 统计门控.
    let stats = GenStats::measure(&final_grid, &params.palette, &params.bounds);
    Ok(if stats.accepted() {
        GenOutcome::Accepted {
            grid: final_grid,
            stats,
        }
    } else {
        GenOutcome::Rejected(stats)
    })
}

/// 重试语义: 配置错误立即失败, 拒绝立即重来, 瞬态失败退避后重来.
fn retry_loop<F>(
    max_attempts: u32,
    backoff: Duration,
    mut attempt_fn: F,
) -> Result<(LabelGrid, GenStats), SimError>
where
    F: FnMut() -> Result<GenOutcome, SimError>,
{
    for attempt in 1..=max_attempts {
        match attempt_fn() {
            Ok(GenOutcome::Accepted { grid, stats }) => return Ok((grid, stats)),
            Ok(GenOutcome::Rejected(stats)) => {
                log::warn!(
                    "第 {attempt} 次尝试被门控拒绝: 梗死比 {:.3}, 无复流比 {:.3}",
                    stats.infarct_to_myo,
                    stats.noflow_to_infarct
                );
            }
            Err(e @ SimError::Geometry { .. }) => return Err(e),
            Err(e @ SimError::EmptyRegion { .. }) => {
                log::error!("第 {attempt} 次尝试失败: {e}");
                std::thread::sleep(backoff);
            }
            Err(e) => return Err(e),
        }
    }
    Err(SimError::RetriesExhausted {
        attempts: max_attempts,
    })
}

/// 循环生成直到通过统计门控, 或尝试预算耗尽.
pub fn generate_until_accepted<R: Rng + ?Sized>(
    source: TemplateSource,
    params: &SimParams,
    rng: &mut R,
) -> Result<(LabelGrid, GenStats), SimError> {
    retry_loop(
        params.max_attempts,
        Duration::from_millis(params.retry_backoff_ms),
        || generate_once(source, params, rng),
    )
}

/// 合并掩码流水线参数.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct MergeParams {
    /// 配准搜索参数.
    pub align: AlignParams,

    /// 输出类别编码.
    pub palette: Palette,

    /// 统计门控约束 (见 [`GateBounds::merged_default`]).
    pub bounds: GateBounds,

    /// 单样本的尝试上限.
    pub max_attempts: u32,

    /// 瞬态失败后的退避时长 (毫秒).
    pub retry_backoff_ms: u64,
}

impl Default for MergeParams {
    fn default() -> Self {
        Self {
            align: AlignParams::default(),
            palette: Palette::default(),
            bounds: GateBounds::merged_default(),
            max_attempts: 64,
            retry_backoff_ms: 1000,
        }
    }
}

/// 执行一次合并掩码生成: 随机抽取心肌/血池切片对与供体梗死切片,
/// 配准搜索后合并, 叠加血池, 过统计门控.
pub fn merge_once<R: Rng + ?Sized>(
    library: &MaskLibrary,
    params: &MergeParams,
    rng: &mut R,
) -> Result<GenOutcome, SimError> {
    let (myo, bp) = library
        .random_myocardium_slice(rng)
        .ok_or(SimError::EmptyRegion {
            value: CASE_MYOCARDIUM,
        })?;
    let donor = library
        .random_infarction_slice(rng)
        .ok_or(SimError::EmptyRegion {
            value: CASE_INFARCT_MIN,
        })?;

    let myo_grid = LabelGrid::from_raw(myo.clone());
    let donor_grid = LabelGrid::from_raw(donor.clone());
    if myo_grid.shape() != donor_grid.shape() {
        return Err(SimError::Dataset(format!(
            "病例切片形状不一致: {:?} 与 {:?}",
            myo_grid.shape(),
            donor_grid.shape()
        )));
    }

    let circle = align::mask_enclosing_circle(&myo_grid).ok_or(SimError::EmptyRegion {
        value: CASE_MYOCARDIUM,
    })?;

    let best = align::find_best_alignment(&myo_grid, &donor_grid, circle.center, &params.align);
    let mut merged = align::merge_aligned(
        &myo_grid,
        &donor_grid,
        &best,
        circle.center,
        &params.palette,
    );
    align::add_blood_pool(&mut merged, bp, params.palette.blood_pool);

    let stats = GenStats::measure(&merged, &params.palette, &params.bounds);
    Ok(if stats.accepted() {
        GenOutcome::Accepted {
            grid: merged,
            stats,
        }
    } else {
        GenOutcome::Rejected(stats)
    })
}

/// 循环合并直到通过统计门控, 或尝试预算耗尽.
pub fn merge_until_accepted<R: Rng + ?Sized>(
    library: &MaskLibrary,
    params: &MergeParams,
    rng: &mut R,
) -> Result<(LabelGrid, GenStats), SimError> {
    retry_loop(
        params.max_attempts,
        Duration::from_millis(params.retry_backoff_ms),
        || merge_once(library, params, rng),
    )
}

/// 持久化一个已接受的样本: 同名 `.png` (按原样编码) 与 `.npy`.
///
/// 文件基名编码来源标记、两个比例的整数百分比与亚秒级时间戳.
/// 返回不带扩展名的输出基路径.
pub fn persist_sample<P: AsRef<Path>>(
    dir: P,
    mode: &str,
    grid: &LabelGrid,
    stats: &GenStats,
) -> Result<PathBuf, SimError> {
    let (im, ni) = stats.percentages();
    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S-%f");
    let base = format!("{mode}_{im}_{ni}_{timestamp}");

    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    grid.save_raw(dir.join(format!("{base}.png")))?;
    grid.save_npy(dir.join(format!("{base}.npy")))?;
    Ok(dir.join(base))
}

/// 一次批量生成的结果汇总.
#[derive(Copy, Clone, Debug, Default)]
pub struct BatchReport {
    /// 请求的样本数.
    pub requested: usize,

    /// 成功持久化的样本数.
    pub succeeded: usize,

    /// 生成或持久化失败的样本数.
    pub failed: usize,
}

/// 生成单个批量样本并持久化. 返回输出基路径.
fn batch_sample(
    out_dir: &Path,
    source: TemplateSource,
    params: &SimParams,
    sample_idx: usize,
    base_seed: u64,
) -> Result<PathBuf, SimError> {
    // 每个样本一个独立的随机源, 批量并行时互不干扰.
    let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(sample_idx as u64));
    let (grid, stats) = generate_until_accepted(source, params, &mut rng)?;
    persist_sample(out_dir, source.tag(), &grid, &stats)
}

/// 批量生成 `count` 个仿真样本.
///
/// 每个样本独立生成与持久化: 单样本失败记入日志后继续下一个,
/// 最终成功/失败计数可从日志流推导. 开启 `rayon` feature 时
/// 样本级并行, 每个样本的随机源由 `base_seed` 派生.
pub fn generate_batch<P: AsRef<Path>>(
    out_dir: P,
    source: TemplateSource,
    params: &SimParams,
    count: usize,
    base_seed: u64,
) -> BatchReport {
    let out_dir = out_dir.as_ref();

    let run = |i: usize| -> bool {
        match batch_sample(out_dir, source, params, i, base_seed) {
            Ok(base) => {
                log::info!("样本 {i} 已保存: {}", base.display());
                true
            }
            Err(e) => {
                log::error!("样本 {i} 生成失败: {e}");
                false
            }
        }
    };

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use rayon::prelude::*;
            let oks: Vec<bool> = (0..count).into_par_iter().map(run).collect();
        } else {
            let oks: Vec<bool> = (0..count).map(run).collect();
        }
    }

    let succeeded = oks.iter().filter(|&&ok| ok).count();
    BatchReport {
        requested: count,
        succeeded,
        failed: count - succeeded,
    }
}

/// 批量生成 `count` 个合并掩码样本. 语义同 [`generate_batch`].
pub fn generate_merged_batch<P: AsRef<Path>>(
    out_dir: P,
    library: &MaskLibrary,
    params: &MergeParams,
    count: usize,
    base_seed: u64,
) -> BatchReport {
    let out_dir = out_dir.as_ref();

    let run = |i: usize| -> bool {
        let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(i as u64));
        let persisted = merge_until_accepted(library, params, &mut rng)
            .and_then(|(grid, stats)| persist_sample(out_dir, "real_real", &grid, &stats));
        match persisted {
            Ok(base) => {
                log::info!("合并样本 {i} 已保存: {}", base.display());
                true
            }
            Err(e) => {
                log::error!("合并样本 {i} 生成失败: {e}");
                false
            }
        }
    };

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            use rayon::prelude::*;
            let oks: Vec<bool> = (0..count).into_par_iter().map(run).collect();
        } else {
            let oks: Vec<bool> = (0..count).map(run).collect();
        }
    }

    let succeeded = oks.iter().filter(|&&ok| ok).count();
    BatchReport {
        requested: count,
        succeeded,
        failed: count - succeeded,
    }
}
