use clap::Parser;
use ct_viewer::cli::{self, Cli};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = cli::run(Cli::parse()).await {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}
