use clap::Parser;
use log::info;
use tokio::net::TcpListener;

use crate::cli::SubCommandExtend;
use crate::{IMDB, Opts, server};

#[derive(Parser, Debug, Clone)]
pub struct ServerCommand {
    /// 监听地址
    #[arg(long, default_value = "127.0.0.1:6969")]
    pub addr: String,
    /// 上传大小限制，单位为 MiB
    #[arg(long, value_name = "MIB", default_value_t = 10)]
    pub body_limit: usize,
    /// 相似查询默认的最大距离
    #[arg(long, value_name = "DISTANCE", default_value_t = 10.)]
    pub max_distance: f64,
    /// 直接对比时默认的容差
    #[arg(long, value_name = "N", default_value_t = 10, allow_negative_numbers = true)]
    pub tolerance: i64,
}

impl SubCommandExtend for ServerCommand {
    async fn run(&self, opts: &Opts) -> anyhow::Result<()> {
        let db = IMDB::open(&opts.data_dir, opts.map_size_bytes())?;
        info!("数据库中共有 {} 张图片", db.count()?);

        // 创建应用状态
        let state = server::AppState::new(db, self.clone());

        // 创建应用
        let app = server::create_app(state);

        // 启动服务器
        info!("服务器启动：http://{}", &self.addr);
        let listener = TcpListener::bind(&self.addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}
