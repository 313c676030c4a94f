use std::sync::Arc;

use tokenlib::{
    error::TokenError,
    network::{Message, SignedCall},
    types::{CallContext, Event},
};
use tokio::{net::TcpStream, sync::RwLock};
use tracing::{error, info, warn};

use crate::util::{self, NodeState, StateFiles};

pub async fn handle_connection(
    mut socket: TcpStream,
    state: Arc<RwLock<NodeState>>,
    files: StateFiles,
) {
    loop {
        let message = match Message::receive_async(&mut socket).await {
            Ok(message) => message,
            Err(e) => {
                info!("connection closed: {e}");
                return;
            }
        };

        let response = match message {
            Message::FetchMiningInfo => {
                let state = state.read().await;
                Message::MiningInfo {
                    info: state.token.mining_info(),
                    height: state.chain.height(),
                }
            }
            Message::FetchBalance(address) => {
                let state = state.read().await;
                Message::Balance(state.token.balance_of(address))
            }
            Message::SubmitCall(signed) => {
                Message::CallResult(apply_call(&state, &signed, &files).await)
            }
            m => {
                warn!("unexpected message from client: {m:?}");
                return;
            }
        };

        if let Err(e) = response.send_async(&mut socket).await {
            warn!("failed to send response: {e}");
            return;
        }
    }
}

async fn apply_call(
    state: &RwLock<NodeState>,
    signed: &SignedCall,
    files: &StateFiles,
) -> Result<Vec<Event>, TokenError> {
    let sender = signed.verify()?;

    let mut state = state.write().await;
    let block = state.chain.head();
    signed.check_window(block.height)?;
    if crate::SEEN_CALLS
        .insert(signed.id, signed.valid_until)
        .is_some()
    {
        return Err(TokenError::DuplicateCall);
    }
    if let Err(e) = util::save_seen_calls(&crate::SEEN_CALLS, &files.calls) {
        error!("failed to persist seen calls: {e}");
    }

    let ctx = CallContext::new(sender, signed.gas_price, block).with_value(signed.value);
    let result = signed.call.apply(&mut state.token, &ctx);

    match &result {
        Ok(events) => {
            info!(%sender, call = ?signed.call, events = events.len(), "call applied");
            if let Err(e) = util::save_token(&state.token, &files.token) {
                error!("token state on disk is behind memory: {e}");
            }
        }
        Err(e) => info!(%sender, call = ?signed.call, "call refused: {e}"),
    }

    result
}
