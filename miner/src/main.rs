use anyhow::{Result, anyhow};
use std::sync::atomic::Ordering;
use std::{
    sync::{
        Arc, Mutex as StdMutex,
        atomic::{AtomicBool, AtomicU64},
    },
    thread,
    time::Duration,
};
use tokenlib::{
    U256,
    crypto::{Address, PrivateKey},
    network::{CALL_LIFETIME, Call, Message, SignedCall},
    sha256::Hash,
    types::{MiningInfo, search_nonce},
    util::Saveable,
};
use tokio::{net::TcpStream, sync::Mutex, time::interval};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use clap::Parser;

const ATOMIC_ORDERING: Ordering = Ordering::Relaxed;
// nonces tried before the worker looks for a newer challenge
const NONCES_PER_ROUND: u64 = 2_000_000;

#[derive(Parser)]
#[command(author, version, about, long_about=None)]
struct Cli {
    #[arg(short, long)]
    node_address: String,
    #[arg(short, long)]
    private_key_file: String,
    /// Gas price offered with each solution; must not exceed the token's limit
    #[arg(short, long, default_value_t = 1_000_000_000)]
    gas_price: u64,
}

#[derive(Clone, Copy, Debug)]
struct Job {
    challenge_number: Hash,
    target: U256,
}

struct Solution {
    challenge_number: Hash,
    nonce: u64,
    digest: Hash,
}

struct Miner {
    address: Address,
    private_key: StdMutex<PrivateKey>,
    gas_price: u64,
    stream: Mutex<TcpStream>,
    current_job: Arc<StdMutex<Option<Job>>>,
    mining: Arc<AtomicBool>,
    // host block height reported by the node on the last poll
    head_height: AtomicU64,
    solution_sender: flume::Sender<Solution>,
    solution_receiver: flume::Receiver<Solution>,
}

impl Miner {
    async fn new(address: String, private_key: PrivateKey, gas_price: u64) -> Result<Self> {
        let stream = TcpStream::connect(&address).await?;
        let (solution_sender, solution_receiver) = flume::unbounded();

        Ok(Self {
            address: private_key.public_key().address()?,
            private_key: StdMutex::new(private_key),
            gas_price,
            stream: Mutex::new(stream),
            current_job: Arc::new(StdMutex::new(None)),
            mining: Arc::new(AtomicBool::new(false)),
            head_height: AtomicU64::new(0),
            solution_sender,
            solution_receiver,
        })
    }

    async fn run(&self) -> Result<()> {
        let _ = self.spawn_mining_thread();
        let mut poll_interval = interval(Duration::from_secs(5));

        loop {
            let receiver = self.solution_receiver.clone();

            tokio::select! {
                _ = poll_interval.tick() => self.refresh_job().await?,
                Ok(solution) = receiver.recv_async() => {
                    self.submit_solution(solution).await?;
                    self.refresh_job().await?;
                }
            }
        }
    }

    fn spawn_mining_thread(&self) -> thread::JoinHandle<()> {
        let job = self.current_job.clone();
        let mining = self.mining.clone();
        let sender = self.solution_sender.clone();
        let address = self.address;

        thread::spawn(move || {
            let mut nonce: u64 = rand::random();
            loop {
                let current = *job.lock().unwrap_or_else(|e| e.into_inner());
                let Some(current) = current else {
                    thread::sleep(Duration::from_millis(100));
                    continue;
                };

                let found = search_nonce(
                    &current.challenge_number,
                    &address,
                    current.target,
                    nonce,
                    NONCES_PER_ROUND,
                );
                nonce = nonce.wrapping_add(NONCES_PER_ROUND);

                match found {
                    Ok(Some((solved, digest))) => {
                        info!(nonce = solved, %digest, "solution found");
                        // stop until the node hands out the next challenge
                        *job.lock().unwrap_or_else(|e| e.into_inner()) = None;
                        mining.store(false, ATOMIC_ORDERING);

                        let solution = Solution {
                            challenge_number: current.challenge_number,
                            nonce: solved,
                            digest,
                        };
                        if sender.send(solution).is_err() {
                            return;
                        }
                    }
                    Ok(None) => debug!("no solution in round"),
                    Err(e) => {
                        warn!("hashing failed: {e}");
                        thread::sleep(Duration::from_secs(1));
                    }
                }
            }
        })
    }

    async fn request(&self, message: Message) -> Result<Message> {
        let mut stream = self.stream.lock().await;
        message.send_async(&mut *stream).await?;
        Ok(Message::receive_async(&mut *stream).await?)
    }

    async fn refresh_job(&self) -> Result<()> {
        let info = match self.request(Message::FetchMiningInfo).await? {
            Message::MiningInfo { info, height } => {
                self.head_height.store(height, ATOMIC_ORDERING);
                info
            }
            m => return Err(anyhow!("Unexpected message when fetching mining info: {m:?}")),
        };

        if self.gas_price > info.gas_price_limit {
            warn!(
                gas_price = self.gas_price,
                limit = info.gas_price_limit,
                "gas price above the token's limit, solutions will be refused"
            );
        }

        self.update_job(&info);
        Ok(())
    }

    fn update_job(&self, info: &MiningInfo) {
        let mut job = self.current_job.lock().unwrap_or_else(|e| e.into_inner());
        let stale = job.is_none_or(|current| current.challenge_number != info.challenge_number);

        if stale || !self.mining.load(ATOMIC_ORDERING) {
            info!(
                challenge = %info.challenge_number,
                difficulty = %info.mining_difficulty,
                reward = %info.mining_reward,
                epoch_count = info.epoch_count,
                "mining new challenge"
            );
            *job = Some(Job {
                challenge_number: info.challenge_number,
                target: info.mining_target,
            });
            self.mining.store(true, ATOMIC_ORDERING);
        }
    }

    async fn submit_solution(&self, solution: Solution) -> Result<()> {
        info!(challenge = %solution.challenge_number, "submitting solution");
        let call = Call::Mint {
            nonce: solution.nonce,
            digest: solution.digest,
        };
        let valid_until = self.head_height.load(ATOMIC_ORDERING) + CALL_LIFETIME;
        let signed = {
            let mut private_key = self.private_key.lock().unwrap_or_else(|e| e.into_inner());
            SignedCall::new(call, self.gas_price, valid_until, &mut private_key)?
        };

        match self.request(Message::SubmitCall(signed)).await? {
            Message::CallResult(Ok(events)) => {
                info!(events = ?events, "solution accepted");
                Ok(())
            }
            Message::CallResult(Err(e)) => {
                warn!("solution refused: {e}");
                Ok(())
            }
            m => Err(anyhow!("Unexpected message when submitting solution: {m:?}")),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let private_key = PrivateKey::load_from_file(&cli.private_key_file)
        .map_err(|e| anyhow!("Error reading private key: {e}"))?;
    let miner = Miner::new(cli.node_address, private_key, cli.gas_price).await?;
    info!(address = %miner.address, "miner started");
    miner.run().await
}
