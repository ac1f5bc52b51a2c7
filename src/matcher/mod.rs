mod nearest;

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use anyhow::{Result, ensure};
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::{debug, info};
use ndarray::Array2;
use ndarray_npy::{NpzReader, NpzWriter};
pub use nearest::*;
use rayon::prelude::*;

use crate::extractor::{DescInfo, DescInfoReader};
use crate::neighbors::NeighborMap;
use crate::utils::pb_style;

/// 一对图片的匹配结果，每行为一对线段索引 (第一张图中的索引, 第二张图中的索引)
///
/// 结果由具体的匹配策略产生，批处理部分只负责缓存，不会解释其含义
pub type PairMatches = Array2<u32>;

/// 线段匹配策略需要实现的最小能力集合
pub trait LineMatcher {
    /// 匹配器标识，用于缓存目录命名
    ///
    /// 同一配置必须保持稳定，不同配置必须互不相同，否则会错误地复用缓存
    fn module_name(&self) -> String;

    /// 计算两张图片描述子信息之间的匹配
    ///
    /// 纯函数，没有副作用。输入不合法时（例如描述子维度不一致）返回错误，
    /// 具体判定标准由策略自行决定
    fn match_pair(&self, descinfo1: &DescInfo, descinfo2: &DescInfo) -> Result<PairMatches>;
}

/// 返回指定图片的匹配缓存文件路径
pub fn match_filename(matches_folder: &Path, idx: usize) -> PathBuf {
    matches_folder.join(format!("matches_{}.npz", idx))
}

/// 将一张图片的全部邻居匹配结果按顺序写入缓存文件
pub fn save_match(matches_folder: &Path, idx: usize, matches: &[PairMatches]) -> Result<()> {
    let fname = match_filename(matches_folder, idx);
    let mut npz = NpzWriter::new(File::create(&fname)?);
    for (i, m) in matches.iter().enumerate() {
        npz.add_array(i.to_string(), m)?;
    }
    npz.finish()?;
    Ok(())
}

/// 读取一张图片的邻居匹配结果，顺序与写入时一致
pub fn read_match(matches_folder: &Path, idx: usize) -> Result<Vec<PairMatches>> {
    let fname = match_filename(matches_folder, idx);
    let mut npz = NpzReader::new(File::open(&fname)?)?;
    let n = npz.names()?.len();
    let mut matches = Vec::with_capacity(n);
    for i in 0..n {
        matches.push(npz.by_name(&i.to_string())?);
    }
    Ok(matches)
}

/// 匹配引擎，持有一个匹配策略和一个描述子读取器，负责批处理和缓存
pub struct MatcherEngine<M, E> {
    matcher: M,
    extractor: E,
    topk: usize,
    n_neighbors: usize,
    n_jobs: usize,
}

/// MatcherEngine 的构造器
pub struct MatcherEngineBuilder<M, E> {
    matcher: M,
    extractor: E,
    topk: usize,
    n_neighbors: usize,
    n_jobs: usize,
}

impl<M, E> MatcherEngineBuilder<M, E> {
    pub fn new(matcher: M, extractor: E) -> Self {
        Self { matcher, extractor, topk: 10, n_neighbors: 20, n_jobs: 1 }
    }

    /// 每对图片保留的最大匹配数量，仅影响缓存目录命名，具体解释由策略决定
    pub fn topk(mut self, topk: usize) -> Self {
        self.topk = topk;
        self
    }

    /// 每张图片的期望邻居数量，仅影响缓存目录命名
    pub fn n_neighbors(mut self, n_neighbors: usize) -> Self {
        self.n_neighbors = n_neighbors;
        self
    }

    /// 批处理的并行任务数量，1 表示完全串行
    pub fn n_jobs(mut self, n_jobs: usize) -> Self {
        self.n_jobs = n_jobs;
        self
    }

    pub fn build(self) -> Result<MatcherEngine<M, E>> {
        ensure!(self.topk >= 1, "topk 必须为正数: {}", self.topk);
        ensure!(self.n_neighbors >= 1, "n_neighbors 必须为正数: {}", self.n_neighbors);
        ensure!(self.n_jobs >= 1, "n_jobs 必须为正数: {}", self.n_jobs);
        Ok(MatcherEngine {
            matcher: self.matcher,
            extractor: self.extractor,
            topk: self.topk,
            n_neighbors: self.n_neighbors,
            n_jobs: self.n_jobs,
        })
    }
}

impl<M, E> MatcherEngine<M, E>
where
    M: LineMatcher + Sync,
    E: DescInfoReader + Sync,
{
    /// 返回匹配缓存目录的路径
    ///
    /// 标识和参数完全相同的两个引擎会得到同一个目录，以便复用缓存
    pub fn matches_folder<P: AsRef<Path>>(&self, output_folder: P) -> PathBuf {
        output_folder.as_ref().join(format!(
            "{}_n{}_top{}",
            self.matcher.module_name(),
            self.n_neighbors,
            self.topk
        ))
    }

    /// 读取指定图片的描述子信息，转发给描述子读取器
    pub fn read_descinfo<P: AsRef<Path>>(&self, descinfo_folder: P, idx: usize) -> Result<DescInfo> {
        self.extractor.read_descinfo(descinfo_folder.as_ref(), idx)
    }

    /// 为邻居图中的每张图片计算与其全部邻居的匹配，并写入缓存目录
    ///
    /// skip_exists 为 false 时会先清空已有的缓存目录；为 true 时跳过已有
    /// 缓存文件的图片，用于从上一次中断的位置继续。任何一张图片的匹配或
    /// 读写失败都会使整个批处理失败，已写入的缓存文件保留在磁盘上
    pub fn match_all_neighbors<P, Q>(
        &self,
        output_folder: P,
        neighbors: &NeighborMap,
        descinfo_folder: Q,
        skip_exists: bool,
    ) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let matches_folder = self.matches_folder(output_folder);
        if !skip_exists && matches_folder.exists() {
            debug!("清空已有的匹配缓存目录: {}", matches_folder.display());
            fs::remove_dir_all(&matches_folder)?;
        }
        fs::create_dir_all(&matches_folder)?;

        let n_images = neighbors.len();
        info!("开始匹配 {} 张图片的邻居", n_images);
        let pb = ProgressBar::new(n_images as u64).with_style(pb_style());

        let descinfo_folder = descinfo_folder.as_ref();
        let pool = rayon::ThreadPoolBuilder::new().num_threads(self.n_jobs).build()?;
        pool.install(|| {
            (0..n_images).into_par_iter().progress_with(pb).try_for_each(|idx| {
                self.match_one_image(
                    &matches_folder,
                    descinfo_folder,
                    idx,
                    &neighbors[idx],
                    skip_exists,
                )
            })
        })?;

        info!("匹配完成，结果保存在 {}", matches_folder.display());
        Ok(matches_folder)
    }

    /// 批处理单元：匹配一张图片和它的全部邻居，结果写入一个缓存文件
    fn match_one_image(
        &self,
        matches_folder: &Path,
        descinfo_folder: &Path,
        idx: usize,
        ng_idx_list: &[usize],
        skip_exists: bool,
    ) -> Result<()> {
        let fname = match_filename(matches_folder, idx);
        if skip_exists && fname.exists() {
            return Ok(());
        }
        let descinfo1 = self.read_descinfo(descinfo_folder, idx)?;
        let mut matches = Vec::with_capacity(ng_idx_list.len());
        for &ng_idx in ng_idx_list {
            let descinfo2 = self.read_descinfo(descinfo_folder, ng_idx)?;
            matches.push(self.matcher.match_pair(&descinfo1, &descinfo2)?);
        }
        save_match(matches_folder, idx, &matches)
    }
}
