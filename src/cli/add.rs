use std::path::PathBuf;

use clap::Parser;
use indicatif::{ParallelProgressIterator, ProgressBar};
use log::info;
use rayon::prelude::*;
use walkdir::WalkDir;

use crate::IMDB;
use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::utils::{pb_style, read_image_file, suffix_regex};

#[derive(Parser, Debug, Clone)]
pub struct AddCommand {
    /// 图片所在目录
    pub path: PathBuf,
    /// 扫描的文件后缀名，多个后缀用逗号分隔
    #[arg(short, long, default_value = "jpg,jpeg,png,webp,gif,bmp")]
    pub suffix: String,
}

impl SubCommandExtend for AddCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let re_suf = suffix_regex(&self.suffix)?;
        let db = IMDB::open(&opts.data_dir, opts.map_size_bytes())?;

        let files = WalkDir::new(&self.path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| {
                path.extension().map(|s| re_suf.is_match(&s.to_string_lossy())).unwrap_or(false)
            })
            .collect::<Vec<_>>();
        info!("扫描到 {} 张图片", files.len());

        let pb = ProgressBar::new(files.len() as u64).with_style(pb_style());
        let (ok, err) = tokio::task::block_in_place(|| {
            files
                .par_iter()
                .progress_with(pb.clone())
                .map(|path| {
                    let result = read_image_file(path)
                        .and_then(|bytes| Ok(db.add_image(&bytes)?))
                        .map(|record| record.image_id);
                    match &result {
                        Ok(id) => pb.suspend(|| println!("[OK] {} {}", id, path.display())),
                        Err(e) => pb.suspend(|| println!("[ERR] {}: {}", path.display(), e)),
                    }
                    result.is_ok()
                })
                .fold(|| (0usize, 0usize), |(ok, err), r| if r { (ok + 1, err) } else { (ok, err + 1) })
                .reduce(|| (0, 0), |a, b| (a.0 + b.0, a.1 + b.1))
        });

        pb.finish_with_message("图片添加完成");
        info!("成功 {} 张，失败 {} 张", ok, err);

        Ok(())
    }
}
