//! syncline daemon: wires the stores, the remote repositories and the
//! reconcilers together and serves events until shutdown.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use syncline_controller::controller::{Controller, Remotes, ResourceKind, Stores};
use syncline_controller::memory::{MemorySecretStore, MemoryStore};
use syncline_controller::remote::{
    ApiContextRemote, ApiPolicyRemote, ApiRunRemote, ApiSpaceRemote, ApiStackRemote,
    HttpTransport, RemoteTransport,
};
use syncline_core::ResourceKey;

#[derive(Parser, Debug)]
#[command(name = "synclined", about = "Declarative-to-remote IaC sync daemon")]
struct Args {
    /// Account root of the remote backend, e.g. https://acme.backend.example.com
    #[arg(long, env = "SYNCLINE_API_URL")]
    api_url: String,

    /// API token used as a bearer credential.
    #[arg(long, env = "SYNCLINE_API_TOKEN", hide_env_values = true)]
    api_token: String,

    /// Emit logs as JSON instead of human-readable lines.
    #[arg(long)]
    json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let transport: Arc<dyn RemoteTransport> =
        Arc::new(HttpTransport::new(&args.api_url, &args.api_token));

    let stores = Stores {
        spaces: Arc::new(MemoryStore::new()),
        stacks: Arc::new(MemoryStore::new()),
        runs: Arc::new(MemoryStore::new()),
        contexts: Arc::new(MemoryStore::new()),
        policies: Arc::new(MemoryStore::new()),
        secrets: Arc::new(MemorySecretStore::new()),
    };
    let remotes = Remotes {
        spaces: Arc::new(ApiSpaceRemote::new(transport.clone())),
        stacks: Arc::new(ApiStackRemote::new(transport.clone())),
        runs: Arc::new(ApiRunRemote::new(transport.clone())),
        contexts: Arc::new(ApiContextRemote::new(transport.clone())),
        policies: Arc::new(ApiPolicyRemote::new(transport)),
    };
    let controller = Arc::new(Controller::new(stores, remotes));

    // Reconcile keys arrive over this channel; the event source that watches
    // the desired-state store and enforces per-key serialization holds the
    // sender and is wired in by the embedding environment.
    let (events, mut queue) = mpsc::channel::<(ResourceKind, ResourceKey)>(64);
    let serve = {
        let controller = controller.clone();
        tokio::spawn(async move {
            while let Some((kind, key)) = queue.recv().await {
                // Dispatch logs failures itself; honoring a RequeueAfter
                // outcome is the sender's job.
                let _ = controller.dispatch(kind, &key).await;
            }
        })
    };

    info!(api_url = %args.api_url, "syncline controller ready");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    drop(events);
    serve.await?;
    Ok(())
}
