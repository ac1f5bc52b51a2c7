pub mod cli;
pub mod config;
pub mod extractor;
pub mod matcher;
pub mod neighbors;
pub mod utils;

pub use config::Opts;
pub use extractor::{DescInfo, DescInfoReader, NpyDescInfoReader};
pub use matcher::{LineMatcher, MatcherEngine, MatcherEngineBuilder, PairMatches};
