use std::process::ExitCode;

use coi_serve::{logger, server, Config, Server, ServerError};

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // The subscriber may not be installed yet (config or logger failure)
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), ServerError> {
    let cfg = Config::load()?;
    logger::init(&cfg.logging)?;

    // Create the Tokio runtime, sizing the worker pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    let workers = cfg.server.worker_threads();
    if let Some(n) = workers {
        runtime_builder.worker_threads(n);
    }
    logger::log_worker_threads(workers);

    let runtime = runtime_builder.build()?;
    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), ServerError> {
    let server = Server::bind(&cfg)?;
    let addr = server.local_addr()?;

    logger::log_document_root(server.handler().root());
    logger::log_server_start(&addr);

    server.run_until(server::shutdown_signal()).await?;

    logger::log_server_stopped();
    Ok(())
}
