use anyhow::Result;
use clap::Parser;

use crate::IMDB;
use crate::cli::SubCommandExtend;
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 图片 ID
    pub id: String,
}

impl SubCommandExtend for ShowCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = IMDB::open(&opts.data_dir, opts.map_size_bytes())?;
        let record = db.get(&self.id)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        Ok(())
    }
}
