use std::{env, fs::File, process::exit};
use tokenlib::{types::MineableToken, util::Saveable};

fn main() {
    let Some(path) = env::args().nth(1) else {
        eprintln!("Usage: state_print <token_file>");
        exit(1);
    };

    let Ok(file) = File::open(path) else {
        eprintln!("cannot open token file");
        exit(1);
    };

    let token = MineableToken::load(file).expect("failed to load token from file");
    println!("{} ({}), {} decimals", token.name(), token.symbol(), token.decimals());
    println!("owner:                 {}", token.owner());
    println!("paused:                {}", token.paused());
    println!("total supply:          {}", token.total_supply());
    println!("max supply for era:    {}", token.max_supply_for_era());
    println!("tokens minted:         {}", token.tokens_minted());
    println!("{:#?}", token.mining_info());
    println!(
        "difficulty period from: {}",
        token.latest_difficulty_period_started()
    );
}
