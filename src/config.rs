use std::convert::Infallible;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static DATA_DIR: LazyLock<DataDir> = LazyLock::new(|| {
    let path = match ProjectDirs::from("", "", "imdedup") {
        Some(proj_dirs) => proj_dirs.config_dir().to_path_buf(),
        None => PathBuf::from(".imdedup"),
    };
    DataDir { path }
});

fn default_data_dir() -> &'static DataDir {
    &DATA_DIR
}

#[derive(Parser, Debug, Clone)]
#[command(name = "imdedup", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// imdedup 数据目录
    #[arg(short, long, default_value_t = default_data_dir().clone())]
    pub data_dir: DataDir,
    /// LMDB 最大映射大小，单位为 MiB
    #[arg(long, value_name = "MIB", default_value_t = 65536)]
    pub map_size: usize,
}

impl Opts {
    /// 映射大小（字节）
    pub fn map_size_bytes(&self) -> usize {
        self.map_size.saturating_mul(1 << 20)
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 启动 HTTP 服务
    Server(ServerCommand),
    /// 扫描目录并添加图片到数据库
    Add(AddCommand),
    /// 查找与指定图片相似的图片
    Similar(SimilarCommand),
    /// 显示一张图片的记录
    Show(ShowCommand),
    /// 直接对比两张图片
    Diff(DiffCommand),
}

#[derive(Debug, Clone)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 返回数据库目录的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("images.lmdb")
    }
}

impl FromStr for DataDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

impl fmt::Display for DataDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_opts() {
        let opts = Opts::try_parse_from(["imdedup", "-d", "/tmp/db", "show", "0000000000000001"]).unwrap();
        assert_eq!(opts.data_dir.database(), PathBuf::from("/tmp/db/images.lmdb"));
        assert_eq!(opts.map_size_bytes(), 65536 << 20);
        assert!(matches!(opts.subcmd, SubCommand::Show(_)));
    }

    #[test]
    fn test_server_defaults() {
        let opts = Opts::try_parse_from(["imdedup", "server"]).unwrap();
        let SubCommand::Server(server) = opts.subcmd else { panic!("expected server") };
        assert_eq!(server.addr, "127.0.0.1:6969");
        assert_eq!(server.body_limit, 10);
        assert_eq!(server.max_distance, 10.);
        assert_eq!(server.tolerance, 10);
    }
}
