use std::{env, process::exit};
use tokenlib::{
    config::TokenConfig,
    crypto::PublicKey,
    types::{Chain, MineableToken},
    util::Saveable,
};

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("Usage: genesis_gen <owner_public_key_file> <token_file> <chain_file>");
        exit(1);
    }

    let owner = PublicKey::load_from_file(&args[1]).expect("failed to load owner public key");
    let owner = owner.address().expect("failed to derive owner address");

    let chain = Chain::genesis().expect("failed to create genesis block");
    let token = MineableToken::new(TokenConfig::default(), owner, &chain.head())
        .expect("failed to create token");

    token.save_to_file(&args[2]).expect("Failed to save token");
    chain.save_to_file(&args[3]).expect("Failed to save chain");

    println!(
        "{} ({}) owned by {owner}, supply {}",
        token.name(),
        token.symbol(),
        token.total_supply()
    );
}
