use std::{env, net::TcpStream, process::exit};
use tokenlib::{
    U256,
    crypto::{Address, PrivateKey},
    network::{CALL_LIFETIME, Call, Message, SignedCall},
    util::Saveable,
};

const USAGE: &str = "Usage: call_send <node_address> <private_key_file> <gas_price> <call> [args..]
calls:
  set-gas-price-limit <limit>
  transfer <to> <value>
  approve <spender> <value>
  transfer-from <from> <to> <value>
  pause | unpause
  transfer-ownership <new_owner>
  deposit <value>
  balance <address>
  info";

fn fail(message: &str) -> ! {
    eprintln!("{message}\n{USAGE}");
    exit(1);
}

fn address(arg: Option<&String>) -> Address {
    arg.and_then(|s| s.parse().ok())
        .unwrap_or_else(|| fail("expected an address"))
}

fn amount(arg: Option<&String>) -> U256 {
    arg.and_then(|s| U256::from_dec_str(s).ok())
        .unwrap_or_else(|| fail("expected a decimal amount"))
}

fn head_height(stream: &mut TcpStream) -> u64 {
    Message::FetchMiningInfo
        .send(stream)
        .expect("failed to send message");
    match Message::receive(stream).expect("failed to receive response") {
        Message::MiningInfo { height, .. } => height,
        m => fail(&format!("unexpected message: {m:?}")),
    }
}

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 5 {
        fail("missing arguments");
    }

    let mut private_key =
        PrivateKey::load_from_file(&args[2]).expect("failed to load private key");
    let gas_price: u64 = args[3]
        .parse()
        .unwrap_or_else(|_| fail("gas price must be an integer"));
    let rest = &args[5..];

    let mut stream = TcpStream::connect(&args[1]).expect("failed to connect to node");

    let mut value = U256::zero();
    let message = match args[4].as_str() {
        "balance" => Message::FetchBalance(address(rest.first())),
        "info" => Message::FetchMiningInfo,
        op => {
            let call = match op {
                // an unparsable limit is sent as missing and refused by the token
                "set-gas-price-limit" => {
                    Call::SetGasPriceLimit(rest.first().and_then(|s| s.parse().ok()))
                }
                "transfer" => Call::Transfer {
                    to: address(rest.first()),
                    value: amount(rest.get(1)),
                },
                "approve" => Call::Approve {
                    spender: address(rest.first()),
                    value: amount(rest.get(1)),
                },
                "transfer-from" => Call::TransferFrom {
                    from: address(rest.first()),
                    to: address(rest.get(1)),
                    value: amount(rest.get(2)),
                },
                "pause" => Call::Pause,
                "unpause" => Call::Unpause,
                "transfer-ownership" => Call::TransferOwnership(address(rest.first())),
                "deposit" => {
                    value = amount(rest.first());
                    Call::Deposit
                }
                op => fail(&format!("unknown call: {op}")),
            };
            let valid_until = head_height(&mut stream) + CALL_LIFETIME;
            let signed =
                SignedCall::with_value(call, gas_price, value, valid_until, &mut private_key)
                    .expect("failed to sign call");
            Message::SubmitCall(signed)
        }
    };

    message.send(&mut stream).expect("failed to send message");

    match Message::receive(&mut stream).expect("failed to receive response") {
        Message::CallResult(Ok(events)) => {
            for event in events {
                println!("{event:?}");
            }
        }
        Message::CallResult(Err(e)) => {
            eprintln!("call refused: {e}");
            exit(1);
        }
        Message::Balance(balance) => println!("{balance}"),
        Message::MiningInfo { info, height } => println!("height {height}\n{info:#?}"),
        m => {
            eprintln!("unexpected message: {m:?}");
            exit(1);
        }
    }
}
