//! 掩码数据集操作.
//!
//! 输入掩码由外部提取流程产出: 每个病例一个目录, 目录下的 `Slices/`
//! 子目录存放该病例所有切片的 `.npy` 二维整数标签数组
//! (编码: 背景 0, 血池 1, 心肌 2, 梗死 `>= 3`).
//! 提供迭代器风格的数据集获取模式.

use crate::consts::gray::*;
use crate::SimError;
use ndarray::Array2;
use ndarray_npy::ReadNpyExt;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 单病例的四类掩码切片栈.
///
/// 以类型化记录替代按字符串键索引的字典结构, 四个栈的切片一一配对.
#[derive(Clone, Debug, Default)]
pub struct CaseMasks {
    /// 原始标准掩码 (所有编码混合).
    pub standard: Vec<Array2<u8>>,

    /// 血池掩码 (`{0, 1}`).
    pub blood_pool: Vec<Array2<u8>>,

    /// 心肌掩码 (`{0, 2}`; 病理像素计为心肌).
    pub myocardium: Vec<Array2<u8>>,

    /// 梗死掩码 (`{0} ∪ [3, 255]`, 原编码保留).
    pub infarction: Vec<Array2<u8>>,
}

impl CaseMasks {
    /// 从标准掩码栈派生四类掩码.
    pub fn from_standard(slices: Vec<Array2<u8>>) -> Self {
        let blood_pool = slices
            .iter()
            .map(|s| s.mapv(|p| u8::from(p == CASE_BLOOD_POOL)))
            .collect();
        let myocardium = slices
            .iter()
            .map(|s| {
                s.mapv(|p| {
                    if p != 0 && p != CASE_BLOOD_POOL {
                        CASE_MYOCARDIUM
                    } else {
                        0
                    }
                })
            })
            .collect();
        let infarction = slices
            .iter()
            .map(|s| s.mapv(|p| if is_case_infarct(p) { p } else { 0 }))
            .collect();
        Self {
            standard: slices,
            blood_pool,
            myocardium,
            infarction,
        }
    }

    /// 病例包含的切片数.
    #[inline]
    pub fn len(&self) -> usize {
        self.standard.len()
    }

    /// 病例是否没有任何切片?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.standard.is_empty()
    }

    /// 病例是否含有病理像素?
    pub fn has_infarction(&self) -> bool {
        self.infarction
            .iter()
            .any(|s| s.iter().any(|&p| p != 0))
    }
}

/// 病例目录加载器, 以迭代器方式逐病例产出掩码包.
pub struct CaseLoader {
    dirs_rev: Vec<PathBuf>,
}

/// 从数据集根目录创建病例加载器.
///
/// `root` 的每个子目录视为一个病例, 目录名即病例 id.
///
/// # 注意
///
/// `root` 必须是目录, 否则程序 panic.
pub fn case_loader<P: AsRef<Path>>(root: P) -> CaseLoader {
    let root = root.as_ref();
    assert!(root.is_dir(), "数据集根目录不存在: {}", root.display());

    let mut dirs: Vec<PathBuf> = std::fs::read_dir(root)
        .expect("数据集根目录不可读")
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs.reverse();
    CaseLoader { dirs_rev: dirs }
}

/// 读取一个病例目录下 `Slices/` 内的所有 `.npy` 标准掩码.
fn read_case_slices(case_dir: &Path) -> Result<Vec<Array2<u8>>, SimError> {
    let slices_dir = case_dir.join("Slices");
    let mut files: Vec<PathBuf> = std::fs::read_dir(&slices_dir)
        .map_err(|e| SimError::Dataset(format!("{} 不可读: {e}", slices_dir.display())))?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "npy"))
        .collect();
    files.sort();

    let mut slices = Vec::with_capacity(files.len());
    for path in files {
        let file = File::open(&path)
            .map_err(|e| SimError::Dataset(format!("{} 打开失败: {e}", path.display())))?;
        let arr = Array2::<u8>::read_npy(file)
            .map_err(|e| SimError::Dataset(format!("{} 解析失败: {e}", path.display())))?;
        slices.push(arr);
    }
    Ok(slices)
}

impl Iterator for CaseLoader {
    type Item = (String, Result<CaseMasks, SimError>);

    fn next(&mut self) -> Option<Self::Item> {
        let dir = self.dirs_rev.pop()?;
        let case_id = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let masks = read_case_slices(&dir).map(CaseMasks::from_standard);
        Some((case_id, masks))
    }
}

impl ExactSizeIterator for CaseLoader {
    #[inline]
    fn len(&self) -> usize {
        self.dirs_rev.len()
    }
}

/// 以病例 id 为键的掩码库.
#[derive(Default)]
pub struct MaskLibrary {
    cases: BTreeMap<String, CaseMasks>,
}

impl MaskLibrary {
    /// 从数据集根目录加载全部病例.
    ///
    /// 任何病例加载失败都会使整个加载失败.
    pub fn load<P: AsRef<Path>>(root: P) -> Result<Self, SimError> {
        let mut cases = BTreeMap::new();
        for (case_id, masks) in case_loader(root) {
            let masks = masks?;
            log::debug!("病例 {case_id}: {} 个切片", masks.len());
            cases.insert(case_id, masks);
        }
        Ok(Self { cases })
    }

    /// 直接从内存中的病例集合构建.
    pub fn from_cases<I: IntoIterator<Item = (String, CaseMasks)>>(it: I) -> Self {
        Self {
            cases: it.into_iter().collect(),
        }
    }

    /// 病例个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// 掩码库是否为空?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    /// 随机抽取一个心肌切片及其配对的血池切片.
    pub fn random_myocardium_slice<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Option<(&Array2<u8>, &Array2<u8>)> {
        let with_slices: Vec<&CaseMasks> =
            self.cases.values().filter(|c| !c.is_empty()).collect();
        let case = with_slices.choose(rng)?;
        let idx = rng.random_range(0..case.len());
        Some((&case.myocardium[idx], &case.blood_pool[idx]))
    }

    /// 从含有病理像素的病例中随机抽取一个梗死切片.
    pub fn random_infarction_slice<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Array2<u8>> {
        let with_infarct: Vec<&CaseMasks> = self
            .cases
            .values()
            .filter(|c| !c.is_empty() && c.has_infarction())
            .collect();
        let case = with_infarct.choose(rng)?;
        let idx = rng.random_range(0..case.len());
        Some(&case.infarction[idx])
    }
}
