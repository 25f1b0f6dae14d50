use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use clap::Parser;
use m_temple::config::{apply_env, load_config, Backend, Config};
use m_temple::from_config;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[clap(name = "m-temple", author, version)]
struct Args {
    /// toml config file.
    #[clap(long)]
    config: Option<PathBuf>,

    /// memory or mongo; wins over the config file.
    #[clap(long)]
    backend: Option<Backend>,
}

fn get_config(args: &Args) -> ::anyhow::Result<Config> {
    let config = match &args.config {
        Some(p) => load_config(p)?,
        None => Config::default(),
    };
    let mut config = apply_env(config)?;

    if let Some(b) = args.backend {
        config.store.backend = b;
    }

    Ok(config)
}

async fn async_main(config: Config) {
    let conductor = match from_config(&config).await {
        Ok(c) => c,
        Err(e) => return eprintln!("cannot build conductor: {:#}", e),
    };

    println!("M-Temple shell. type `help` for commands, `exit` to quit.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = match lines.next_line().await {
            Ok(Some(l)) => l,
            Ok(None) => break,
            Err(e) => {
                tracing::error!("cannot read stdin: {}", e);
                break;
            },
        };
        if matches!(line.trim(), "exit" | "quit") {
            break;
        }

        let resps = match conductor.conduct_line(&line).await {
            Some(r) => r,
            None => continue,
        };
        resps.iter().for_each(|r| println!("{}", r));
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match get_config(&Args::parse()) {
        Ok(c) => c,
        Err(e) => return eprintln!("{:#}", e),
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name_fn(|| {
            let num = NUM.fetch_add(1, Ordering::SeqCst);
            format!("m-temple-worker-{}", num)
        })
        .build()
    {
        Ok(r) => r,
        Err(e) => return eprintln!("{}", e),
    };

    rt.block_on(async_main(config))
}

static NUM: AtomicU32 = AtomicU32::new(0);
