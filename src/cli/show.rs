use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use serde::Serialize;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::matcher;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 匹配缓存目录
    pub matches_folder: PathBuf,
    /// 图片索引
    pub idx: usize,
    /// 以 JSON 格式输出
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct NeighborMatches {
    neighbor: usize,
    n_matches: usize,
    pairs: Vec<(u32, u32)>,
}

impl SubCommandExtend for ShowCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let matches = matcher::read_match(&self.matches_folder, self.idx)?;

        if self.json {
            let result = matches
                .iter()
                .enumerate()
                .map(|(i, m)| NeighborMatches {
                    neighbor: i,
                    n_matches: m.nrows(),
                    pairs: m.rows().into_iter().map(|r| (r[0], r[1])).collect(),
                })
                .collect::<Vec<_>>();
            println!("{}", serde_json::to_string_pretty(&result)?);
        } else {
            for (i, m) in matches.iter().enumerate() {
                println!("邻居 {}: {} 对匹配", i, m.nrows());
                for row in m.rows() {
                    println!("\t{} -> {}", row[0], row[1]);
                }
            }
        }
        Ok(())
    }
}
