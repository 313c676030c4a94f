use anyhow::{Result, anyhow};
use dashmap::DashMap;
use std::{fs::File, path::Path};
use tokenlib::{
    config::TokenConfig,
    crypto::PublicKey,
    types::{Chain, MineableToken},
    util::Saveable,
};
use tracing::info;
use uuid::Uuid;

/// Where the node keeps its persistent state.
#[derive(Clone, Debug)]
pub struct StateFiles {
    pub token: String,
    pub chain: String,
    pub calls: String,
}

pub struct NodeState {
    pub chain: Chain,
    pub token: MineableToken,
}

impl NodeState {
    pub fn save(&self, files: &StateFiles) -> Result<()> {
        save_token(&self.token, &files.token)?;
        save_chain(&self.chain, &files.chain)
    }
}

pub fn load_state(files: &StateFiles) -> Result<NodeState> {
    info!(state_file = %files.token, "loading token state");
    let token = MineableToken::load_from_file(&files.token)?;

    let chain = if Path::new(&files.chain).exists() {
        Chain::load_from_file(&files.chain)?
    } else {
        // resume past the difficulty period start so elapsed blocks stay non-negative
        let mut chain = Chain::genesis()?;
        chain.advance_by(token.latest_difficulty_period_started())?;
        chain
    };

    info!(
        height = chain.height(),
        epoch_count = token.epoch_count(),
        reward_era = token.reward_era(),
        target = %token.mining_target(),
        "token state loaded"
    );
    Ok(NodeState { chain, token })
}

pub fn create_state(config: TokenConfig, owner_key_file: Option<&str>) -> Result<NodeState> {
    let owner_key_file =
        owner_key_file.ok_or_else(|| anyhow!("--owner-key-file is required for a new token"))?;
    let owner = PublicKey::load_from_file(owner_key_file)
        .map_err(|e| anyhow!("Error reading owner public key: {e}"))?
        .address()?;

    let chain = Chain::genesis()?;
    let token = MineableToken::new(config, owner, &chain.head())?;
    info!(
        %owner,
        name = token.name(),
        supply = %token.total_supply(),
        "token created"
    );

    Ok(NodeState { chain, token })
}

pub fn save_token(token: &MineableToken, state_file: &str) -> Result<()> {
    token.save_to_file(state_file)?;
    Ok(())
}

pub fn save_chain(chain: &Chain, chain_file: &str) -> Result<()> {
    chain.save_to_file(chain_file)?;
    Ok(())
}

/// Forgets calls that expired before `height`, returning how many were dropped.
pub fn prune_seen_calls(seen: &DashMap<Uuid, u64>, height: u64) -> usize {
    let before = seen.len();
    seen.retain(|_, valid_until| *valid_until >= height);
    before - seen.len()
}

pub fn save_seen_calls(seen: &DashMap<Uuid, u64>, calls_file: &str) -> Result<()> {
    let entries: Vec<(Uuid, u64)> = seen
        .iter()
        .map(|entry| (*entry.key(), *entry.value()))
        .collect();
    ciborium::into_writer(&entries, File::create(calls_file)?)?;
    Ok(())
}

pub fn load_seen_calls(seen: &DashMap<Uuid, u64>, calls_file: &str) -> Result<()> {
    if !Path::new(calls_file).exists() {
        return Ok(());
    }
    let entries: Vec<(Uuid, u64)> = ciborium::from_reader(File::open(calls_file)?)?;
    info!(calls = entries.len(), "seen calls loaded");
    for (id, valid_until) in entries {
        seen.insert(id, valid_until);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_calls_are_pruned() {
        let seen = DashMap::new();
        let (old, edge, fresh) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        seen.insert(old, 9);
        seen.insert(edge, 10);
        seen.insert(fresh, 70);

        assert_eq!(prune_seen_calls(&seen, 10), 1);
        assert!(!seen.contains_key(&old));
        assert!(seen.contains_key(&edge));

        assert_eq!(prune_seen_calls(&seen, 11), 1);
        assert_eq!(prune_seen_calls(&seen, 11), 0);
        assert!(seen.contains_key(&fresh));
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn seen_calls_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.cbor");
        let path = path.to_str().unwrap();

        let seen = DashMap::new();
        let id = Uuid::new_v4();
        seen.insert(id, 42);
        save_seen_calls(&seen, path).unwrap();

        let restored = DashMap::new();
        load_seen_calls(&restored, path).unwrap();
        assert_eq!(restored.get(&id).map(|v| *v), Some(42));

        let missing = DashMap::new();
        load_seen_calls(&missing, dir.path().join("absent").to_str().unwrap()).unwrap();
        assert!(missing.is_empty());
    }
}
