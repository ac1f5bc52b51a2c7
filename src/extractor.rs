use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use ndarray::Array2;
use ndarray_npy::{read_npy, write_npy};

/// 一张图片的线段描述子信息，每行对应一条线段
///
/// 具体内容由上游的描述子提取器决定，匹配部分不会解释其含义
pub type DescInfo = Array2<f32>;

/// 描述子信息的读取接口，由提取器一侧实现
pub trait DescInfoReader {
    /// 从指定目录读取指定图片的描述子信息
    fn read_descinfo(&self, folder: &Path, idx: usize) -> Result<DescInfo>;
}

/// 以 npy 格式存取描述子信息，文件名为 `descinfo_{idx}.npy`
pub struct NpyDescInfoReader;

impl NpyDescInfoReader {
    /// 返回指定图片的描述子文件路径
    pub fn descinfo_filename(folder: &Path, idx: usize) -> PathBuf {
        folder.join(format!("descinfo_{}.npy", idx))
    }

    /// 保存一张图片的描述子信息，目录不存在时自动创建
    pub fn save_descinfo(folder: &Path, idx: usize, descinfo: &DescInfo) -> Result<()> {
        fs::create_dir_all(folder)?;
        write_npy(Self::descinfo_filename(folder, idx), descinfo)?;
        Ok(())
    }
}

impl DescInfoReader for NpyDescInfoReader {
    fn read_descinfo(&self, folder: &Path, idx: usize) -> Result<DescInfo> {
        let descinfo = read_npy(Self::descinfo_filename(folder, idx))?;
        Ok(descinfo)
    }
}
