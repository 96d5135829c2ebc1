// storefront-fetch: fetch one storefront endpoint through the resilient client.
// Payload goes to stdout; retry notices, logs and errors go to stderr.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use serde_json::Value;
use tracing::debug;

use storefront_client::api::{ApiClient, CancelToken, OnRetry, RetryEvent};
use storefront_client::cli::{Cli, format_delay};
use storefront_client::error::Result;
use storefront_client::logging;
use storefront_client::state::LoadState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cancel = CancelToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut state = LoadState::default();
    state.start();
    if !state.resolve(run(&cli, cancel).await) {
        eprintln!("cancelled");
        return ExitCode::from(130);
    }

    match state {
        LoadState::Loaded(payload) => match serde_json::to_string_pretty(&payload) {
            Ok(text) => {
                println!("{}", text);
                ExitCode::SUCCESS
            }
            Err(err) => {
                eprintln!("error: {}", err);
                ExitCode::FAILURE
            }
        },
        other => {
            if let Some(line) = other.status_line() {
                eprintln!("error: {}", line);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, cancel: CancelToken) -> Result<Value> {
    let config = cli.client_config(|name| std::env::var(name).ok())?;
    debug!(
        base_url = %config.base_url,
        durable = config.cache_dir.is_some(),
        "client configured"
    );

    let client = ApiClient::from_config(&config)?;
    if cli.clear_cache {
        client.clear();
    }

    let on_retry: OnRetry = Arc::new(|event: &RetryEvent<'_>| {
        let mut notice: LoadState<Value> = LoadState::Loading;
        notice.on_retry(event);
        if let Some(line) = notice.status_line() {
            eprintln!("{} Next attempt in {}.", line, format_delay(event.delay));
        }
    });

    match &cli.post {
        Some(body) => {
            let options = cli.mutation_options().on_retry(on_retry).cancel(cancel);
            client.post(&cli.endpoint, body, options).await
        }
        None => {
            let options = cli.get_options().on_retry(on_retry).cancel(cancel);
            client.get(&cli.endpoint, &cli.query_params(), options).await
        }
    }
}
