use std::{env, process::exit};
use tokenlib::{crypto::PrivateKey, util::Saveable};

fn main() {
    let Some(name) = env::args().nth(1) else {
        eprintln!("Usage: key_gen <name>");
        exit(1);
    };

    let private_key = PrivateKey::new_key();
    let public_key = private_key.public_key();
    let address = public_key.address().expect("failed to derive address");

    let public_key_file = name.clone() + ".pub.pem";
    let private_key_file = name + ".priv.cbor";

    private_key
        .save_to_file(&private_key_file)
        .expect("Error saving private key file");
    public_key
        .save_to_file(&public_key_file)
        .expect("Error saving public key file");

    println!("{address}");
}
