//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Idx2dF, ImgWriteRaw, ImgWriteVis, LabelGrid, SimError};

pub use crate::consts::gray::{
    CASE_BLOOD_POOL, CASE_INFARCT_MIN, CASE_MYOCARDIUM, WORK_BACKGROUND, WORK_BLOOD_POOL,
    WORK_INFARCT, WORK_MYOCARDIUM, WORK_NO_FLOW,
};
pub use crate::consts::Palette;

pub use crate::align::{find_best_alignment, mask_enclosing_circle, AlignParams, Alignment};
pub use crate::dataset::{home_dataset_dir_with, CaseMasks, MaskLibrary};
pub use crate::growth::GrowthParams;
pub use crate::noflow::NoFlowParams;
pub use crate::seeds::WalkParams;
pub use crate::sim::{
    generate_batch, generate_merged_batch, BatchReport, GenOutcome, MergeParams, SimParams,
    TemplateSource,
};
pub use crate::stats::{GateBounds, GenStats, RatioBounds};
pub use crate::synth::RingParams;
