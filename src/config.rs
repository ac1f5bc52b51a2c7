use clap::{Parser, Subcommand};

use crate::cli::*;

#[derive(Parser, Debug, Clone)]
#[command(name = "linematch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 为邻居图中的所有图片对计算线段匹配
    MatchAll(MatchAllCommand),
    /// 查看一张图片的匹配缓存
    Show(ShowCommand),
}
