mod add;
mod diff;
pub mod server;
mod show;
mod similar;

pub use add::*;
pub use diff::*;
pub use server::*;
pub use show::*;
pub use similar::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> impl std::future::Future<Output = anyhow::Result<()>> + Send;
}
