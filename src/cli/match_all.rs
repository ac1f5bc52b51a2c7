use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::extractor::NpyDescInfoReader;
use crate::matcher::{MatcherEngineBuilder, NearestNeighborMatcher};
use crate::neighbors;

#[derive(Parser, Debug, Clone)]
pub struct MatchAllCommand {
    /// 邻居图 JSON 文件路径
    pub neighbors: PathBuf,
    /// 描述子信息所在目录
    pub descinfo_folder: PathBuf,
    /// 匹配结果输出目录
    pub output_folder: PathBuf,
    /// 每对图片保留的最大匹配数量
    #[arg(long, value_name = "K", default_value_t = 10)]
    pub topk: usize,
    /// 每张图片的期望邻居数量，仅影响缓存目录命名
    #[arg(long, value_name = "N", default_value_t = 20)]
    pub n_neighbors: usize,
    /// 并行任务数量，0 表示使用全部 CPU 核心
    #[arg(short = 'j', long, value_name = "N", default_value_t = 1)]
    pub n_jobs: usize,
    /// 最近邻匹配的比例测试阈值
    #[arg(long, value_name = "RATIO", default_value_t = 0.7)]
    pub ratio: f32,
    /// 跳过已有缓存文件的图片，用于从上一次中断的位置继续
    #[arg(long)]
    pub skip_exists: bool,
}

impl SubCommandExtend for MatchAllCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let neighbors = neighbors::read_neighbors(&self.neighbors)?;
        let n_jobs = match self.n_jobs {
            0 => num_cpus::get(),
            n => n,
        };

        let matcher = NearestNeighborMatcher::new(self.topk, self.ratio);
        let engine = MatcherEngineBuilder::new(matcher, NpyDescInfoReader)
            .topk(self.topk)
            .n_neighbors(self.n_neighbors)
            .n_jobs(n_jobs)
            .build()?;

        let matches_folder = engine.match_all_neighbors(
            &self.output_folder,
            &neighbors,
            &self.descinfo_folder,
            self.skip_exists,
        )?;
        info!("匹配结果已保存到 {}", matches_folder.display());
        Ok(())
    }
}
