use anyhow::Result;
use clap::Parser;
use linematch::cli::SubCommandExtend;
use linematch::config::{Opts, SubCommand};

fn main() -> Result<()> {
    env_logger::init();

    let opts = Opts::parse();
    match &opts.subcmd {
        SubCommand::MatchAll(cmd) => cmd.run(&opts),
        SubCommand::Show(cmd) => cmd.run(&opts),
    }
}
