//! 批量掩码生成入口.
//!
//! 用法: `maskgen [配置文件]`. 配置路径解析顺序:
//!
//! 1. 命令行第一个参数;
//! 2. 环境变量 `$MASKGEN_CONFIG`;
//! 3. 当前目录下的 `maskgen.json`.

mod config;

use cmr_berry::prelude::*;
use config::TemplateKind;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

/// 解析配置文件路径.
fn config_path_from_args_or_env() -> PathBuf {
    if let Some(p) = env::args().nth(1) {
        PathBuf::from(p)
    } else if let Ok(p) = env::var("MASKGEN_CONFIG") {
        PathBuf::from(p)
    } else {
        PathBuf::from("maskgen.json")
    }
}

/// 加载提取掩码库.
fn load_library(paths: &config::Paths) -> Result<MaskLibrary, String> {
    let root = paths
        .resolve_masks_root()
        .ok_or("无法确定掩码数据集根目录: 请在配置中给出 paths.masks_root")?;
    MaskLibrary::load(&root).map_err(|e| format!("掩码库 {} 加载失败: {e}", root.display()))
}

fn main() -> ExitCode {
    simple_logger::init_with_level(log::Level::Info).expect("日志初始化失败");

    let path = config_path_from_args_or_env();
    let cfg = match config::load(&path) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    // 真实模板与合并流水线都依赖掩码库, 最多加载一次.
    let needs_library = cfg
        .simulate
        .as_ref()
        .is_some_and(|s| s.template == TemplateKind::Real)
        || cfg.merge.is_some();
    let library = if needs_library {
        match load_library(&cfg.paths) {
            Ok(lib) => {
                log::info!("掩码库加载完成: {} 个病例", lib.len());
                Some(lib)
            }
            Err(e) => {
                log::error!("{e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        None
    };

    let mut requested = 0;
    let mut failed = 0;

    if let Some(sim) = &cfg.simulate {
        let source = match sim.template {
            TemplateKind::Simulated => TemplateSource::Synthetic,
            TemplateKind::Real => TemplateSource::Real(library.as_ref().expect("掩码库未加载")),
        };
        let report = generate_batch(
            &cfg.paths.output_dir,
            source,
            &sim.params,
            sim.number_of_images,
            cfg.seed,
        );
        log::info!(
            "仿真批量完成: 请求 {}, 成功 {}, 失败 {}",
            report.requested,
            report.succeeded,
            report.failed
        );
        requested += report.requested;
        failed += report.failed;
    }

    if let Some(merge) = &cfg.merge {
        let report = generate_merged_batch(
            &cfg.paths.output_dir,
            library.as_ref().expect("掩码库未加载"),
            &merge.params,
            merge.number_of_masks,
            cfg.seed,
        );
        log::info!(
            "合并批量完成: 请求 {}, 成功 {}, 失败 {}",
            report.requested,
            report.succeeded,
            report.failed
        );
        requested += report.requested;
        failed += report.failed;
    }

    if requested == 0 {
        log::warn!("配置未启用任何流水线, 无事可做");
    }

    if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
