use anyhow::Result;
use clap::{Parser, ValueEnum};

use crate::IMDB;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::hash::HashFamily;
use crate::matcher::{CancelToken, Similarities};

#[derive(Parser, Debug, Clone)]
pub struct SimilarCommand {
    /// 查询图片 ID
    pub id: String,
    /// 使用的哈希算法
    #[arg(short = 'H', long, default_value_t = HashFamily::default())]
    pub hash: HashFamily,
    /// 最大距离
    #[arg(short = 'm', long, default_value_t = 10.)]
    pub max_distance: f64,
    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    /// 每行一条：距离、ID、添加时间
    Table,
    /// 与 HTTP 接口相同的 JSON
    Json,
}

impl SubCommandExtend for SimilarCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let db = IMDB::open(&opts.data_dir, opts.map_size_bytes())?;
        let result = tokio::task::block_in_place(|| {
            db.find_similar(&self.id, self.hash, self.max_distance, &CancelToken::new())
        })?;
        print_result(&result, self.output_format)
    }
}

fn print_result(result: &Similarities, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for (distance, records) in result {
                for record in records {
                    println!("{}\t{}\t{}", distance, record.image_id, record.inserted_at.to_rfc3339());
                }
            }
        }
    }
    Ok(())
}
