use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::hash::HashComputer;
use crate::matcher::classify;
use crate::utils::read_image_file;

#[derive(Parser, Debug, Clone)]
pub struct DiffCommand {
    /// 第一张图片
    pub image1: PathBuf,
    /// 第二张图片
    pub image2: PathBuf,
    /// 汉明距离不超过该值时认为相似
    #[arg(short, long, default_value_t = 10, allow_negative_numbers = true)]
    pub tolerance: i64,
}

impl SubCommandExtend for DiffCommand {
    async fn run(&self, _opts: &Opts) -> Result<()> {
        // 直接对比不需要打开数据库
        let computer = HashComputer::new();
        let h1 = computer.phash(&HashComputer::decode(&read_image_file(&self.image1)?)?)?;
        let h2 = computer.phash(&HashComputer::decode(&read_image_file(&self.image2)?)?)?;
        let result = classify(&h1, &h2, self.tolerance)?;
        println!("{}", serde_json::to_string(&result)?);
        Ok(())
    }
}
