//! Serve TCP until SIGINT/SIGTERM, then release everything under a deadline.
//!
//! ```text
//! cargo run --example listener -- --bind 127.0.0.1:7000 --timeout-ms 2000 --pool-drain-ms 500
//! ```

use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser;
use deathwatch_core::{
    BoxError, Closeable, CloseableRef, ResourceLabel, ShutdownController, Signal, init_tracing,
};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Address to accept connections on
    #[arg(long, default_value = "127.0.0.1:7000")]
    bind: SocketAddr,

    /// Time allowed for all resources to release
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u64,

    /// How long the fake connection pool takes to drain
    #[arg(long, default_value_t = 250)]
    pool_drain_ms: u64,
}

/// Accept loop that stops when closed.
struct Server {
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    async fn start(bind: SocketAddr) -> std::io::Result<Self> {
        let listener = TcpListener::bind(bind).await?;
        info!(address = %bind, "Listening");

        let stop = CancellationToken::new();
        let accept_stop = stop.clone();
        let task = tokio::spawn(async move {
            while let Some(accepted) = accept_stop.run_until_cancelled(listener.accept()).await {
                match accepted {
                    Ok((_, peer)) => info!(%peer, "Accepted connection"),
                    Err(e) => error!(error = %e, "Accept failed"),
                }
            }
        });

        Ok(Self {
            stop,
            task: Mutex::new(Some(task)),
        })
    }
}

#[async_trait]
impl Closeable for Server {
    async fn close(&self) -> Result<(), BoxError> {
        self.stop.cancel();
        if let Some(task) = self.task.lock().await.take() {
            task.await?;
        }
        Ok(())
    }
}

/// Stand-in for a connection pool that needs time to drain.
struct Pool {
    drain: Duration,
}

#[async_trait]
impl Closeable for Pool {
    async fn close(&self) -> Result<(), BoxError> {
        tokio::time::sleep(self.drain).await;
        Ok(())
    }

    fn describe(&self) -> ResourceLabel {
        ResourceLabel::new("Pool", "demo::db")
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let args = Args::parse();

    let controller = match ShutdownController::new(&Signal::default_set()) {
        Ok(controller) => controller.with_timeout(Duration::from_millis(args.timeout_ms)),
        Err(e) => {
            eprintln!("Failed to install signal handlers: {e}");
            return ExitCode::FAILURE;
        }
    };

    let server = match Server::start(args.bind).await {
        Ok(server) => server,
        Err(e) => {
            eprintln!("Failed to bind {}: {e}", args.bind);
            return ExitCode::FAILURE;
        }
    };
    let pool = Pool {
        drain: Duration::from_millis(args.pool_drain_ms),
    };

    let resources: Vec<CloseableRef> = vec![Arc::new(server), Arc::new(pool)];
    match controller.wait_for_death(resources).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
