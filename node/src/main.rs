use std::{path::Path, sync::Arc, time::Duration};

use anyhow::Result;
use argh::FromArgs;

mod handler;
mod util;

use dashmap::DashMap;
use static_init::dynamic;
use tokio::{net::TcpListener, sync::RwLock, time::interval};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::util::{NodeState, StateFiles};

// ids of unexpired signed calls already seen, with their last valid height
#[dynamic]
pub static SEEN_CALLS: DashMap<Uuid, u64> = DashMap::new();

#[derive(FromArgs)]
/// Mineable token node
struct Args {
    #[argh(option, default = "9000")]
    /// port number
    port: u16,

    #[argh(option, default = "String::from(\".token.cbor\")")]
    /// token state file path
    state_file: String,

    #[argh(option, default = "String::from(\".chain.cbor\")")]
    /// simulated chain file path
    chain_file: String,

    #[argh(option, default = "String::from(\".calls.cbor\")")]
    /// seen signed call ids file path
    calls_file: String,

    #[argh(option)]
    /// owner public key (PEM), required when no state file exists yet
    owner_key_file: Option<String>,

    #[argh(option, default = "12")]
    /// seconds between simulated host blocks
    block_time: u64,

    #[argh(option)]
    /// initial gas price limit for a new token
    gas_price_limit: Option<u64>,

    #[argh(option)]
    /// solutions per difficulty period for a new token
    epoch_length: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Args = argh::from_env();
    let files = StateFiles {
        token: args.state_file.clone(),
        chain: args.chain_file.clone(),
        calls: args.calls_file.clone(),
    };

    let state = if Path::new(&files.token).exists() {
        util::load_state(&files)?
    } else {
        info!("state file is missing, creating a new token");
        let mut config = tokenlib::config::TokenConfig::default();
        if let Some(limit) = args.gas_price_limit {
            config.gas_price_limit = limit;
        }
        if let Some(epoch_length) = args.epoch_length {
            config.epoch_length = epoch_length;
        }
        util::create_state(config, args.owner_key_file.as_deref())?
    };
    state.save(&files)?;
    util::load_seen_calls(&SEEN_CALLS, &files.calls)?;
    util::prune_seen_calls(&SEEN_CALLS, state.chain.height());

    let state = Arc::new(RwLock::new(state));
    tokio::spawn(run_block_clock(
        state.clone(),
        Duration::from_secs(args.block_time.max(1)),
        files.clone(),
    ));

    let listener = TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!(port = args.port, "listening");

    loop {
        let (socket, peer) = listener.accept().await?;
        info!(%peer, "connection accepted");
        tokio::spawn(handler::handle_connection(
            socket,
            state.clone(),
            files.clone(),
        ));
    }
}

async fn run_block_clock(
    state: Arc<RwLock<NodeState>>,
    block_time: Duration,
    files: StateFiles,
) {
    let mut ticker = interval(block_time);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;
        let mut state = state.write().await;
        match state.chain.advance() {
            Ok(block) => {
                debug!(height = block.height, "new block");
                if let Err(e) = util::save_chain(&state.chain, &files.chain) {
                    error!("failed to save chain: {e}");
                }

                let pruned = util::prune_seen_calls(&SEEN_CALLS, block.height);
                if pruned > 0 {
                    debug!(pruned, "expired calls forgotten");
                    if let Err(e) = util::save_seen_calls(&SEEN_CALLS, &files.calls) {
                        error!("failed to save seen calls: {e}");
                    }
                }
            }
            Err(e) => error!("failed to advance chain: {e}"),
        }
    }
}
