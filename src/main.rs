use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use nocache_server::cli::Cli;
use nocache_server::config::{AppState, Config};
use nocache_server::error::ServerError;
use nocache_server::logger;
use nocache_server::server::{self, Server};

fn main() -> ExitCode {
    match run(&Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logger::log_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), ServerError> {
    let cfg = Config::load(cli)?;
    logger::init(&cfg)?;

    // Worker threads default to the number of CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build().map_err(ServerError::Runtime)?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let state = Arc::new(AppState::new(cfg));
    let server = Server::bind(state)?;

    logger::log_server_start(server.local_addr().port(), server.state());
    server.run_until(server::shutdown_signal()).await;
    Ok(())
}
