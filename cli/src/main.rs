use std::fs;
use std::path::{Path, PathBuf};

use borsh::BorshDeserialize;
use ledger::{find_derived_address, Address, Keypair, Ledger, Transaction, TransactionError};
use num_traits::FromPrimitive;
use program::{Escrow, RECORD_SEED, VAULT_SEED};
use structopt::StructOpt;

type Error = Box<dyn std::error::Error>;

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let opt = Opt::from_args();
    match opt.command {
        Command::Keygen { path } => do_keygen(&path),
        Command::Airdrop { address, amount } => do_airdrop(&opt.ledger, &address, amount),
        Command::Balance { address } => do_balance(&opt.ledger, &address),
        Command::Make {
            maker,
            taker,
            amount,
        } => do_make(&opt.ledger, &maker, &taker, amount),
        Command::Take { taker, maker } => do_take(&opt.ledger, &taker, &maker),
        Command::Refund { maker } => do_refund(&opt.ledger, &maker),
        Command::Show { maker } => do_show(&opt.ledger, &maker),
    }
}

#[derive(StructOpt)]
struct Opt {
    /// Ledger snapshot file.
    #[structopt(long, default_value = "escrow-ledger.bin")]
    ledger: PathBuf,
    #[structopt(subcommand)]
    command: Command,
}

#[derive(StructOpt)]
enum Command {
    /// Generate a keypair file and print its address
    Keygen { path: PathBuf },
    /// Credit an address from the test faucet
    Airdrop { address: Address, amount: u64 },
    /// Print the balance of an address
    Balance { address: Address },
    /// Open an escrow: deposit `amount` that only `taker` can collect
    Make {
        #[structopt(parse(try_from_str = read_keypair_file))]
        maker: Keypair,
        taker: Address,
        amount: u64,
    },
    /// Collect an open escrow as its designated taker
    Take {
        #[structopt(parse(try_from_str = read_keypair_file))]
        taker: Keypair,
        maker: Address,
    },
    /// Reclaim an open escrow as its maker
    Refund {
        #[structopt(parse(try_from_str = read_keypair_file))]
        maker: Keypair,
    },
    /// Show the open escrow record for a maker
    Show { maker: Address },
}

fn read_keypair_file(path: &str) -> Result<Keypair, Error> {
    let contents = fs::read_to_string(path)?;
    let bytes = hex::decode(contents.trim())?;
    let secret: [u8; 32] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| "keypair file must hold 32 hex-encoded bytes")?;
    Ok(Keypair::from_bytes(secret))
}

fn load_ledger(path: &Path) -> Result<Ledger, Error> {
    let mut ledger = if path.exists() {
        Ledger::restore(&fs::read(path)?)?
    } else {
        Ledger::new()
    };
    program::register(&mut ledger);
    Ok(ledger)
}

fn save_ledger(path: &Path, ledger: &Ledger) -> Result<(), Error> {
    fs::write(path, ledger.snapshot()?)?;
    Ok(())
}

fn execute(ledger: &mut Ledger, transaction: &Transaction) -> Result<(), Error> {
    ledger.execute(transaction).map_err(explain)
}

/// Unwraps custom program error codes back into their named kind.
fn explain(error: TransactionError) -> Error {
    if let TransactionError::Custom(code) = error {
        if let Some(program_error) = program::Error::from_u32(code) {
            return Box::new(program_error);
        }
    }
    Box::new(error)
}

fn do_keygen(path: &Path) -> Result<(), Error> {
    let keypair = Keypair::generate();
    fs::write(path, hex::encode(keypair.to_bytes()))?;
    println!("{}", keypair.address());
    Ok(())
}

fn do_airdrop(ledger_path: &Path, address: &Address, amount: u64) -> Result<(), Error> {
    let mut ledger = load_ledger(ledger_path)?;
    ledger.airdrop(address, amount);
    save_ledger(ledger_path, &ledger)?;
    println!("{} now holds {}", address, ledger.balance(address));
    Ok(())
}

fn do_balance(ledger_path: &Path, address: &Address) -> Result<(), Error> {
    let ledger = load_ledger(ledger_path)?;
    println!("{}", ledger.balance(address));
    Ok(())
}

fn do_make(ledger_path: &Path, maker: &Keypair, taker: &Address, amount: u64) -> Result<(), Error> {
    let mut ledger = load_ledger(ledger_path)?;
    let mut transaction = program::make(&maker.address(), taker, amount);
    transaction.sign(maker);
    execute(&mut ledger, &transaction)?;
    save_ledger(ledger_path, &ledger)?;
    let (record, _) = find_derived_address(RECORD_SEED, &maker.address(), &program::id());
    println!("Opened escrow {}", record);
    Ok(())
}

fn do_take(ledger_path: &Path, taker: &Keypair, maker: &Address) -> Result<(), Error> {
    let mut ledger = load_ledger(ledger_path)?;
    let mut transaction = program::take(&taker.address(), maker);
    transaction.sign(taker);
    execute(&mut ledger, &transaction)?;
    save_ledger(ledger_path, &ledger)?;
    println!(
        "Collected escrow; {} now holds {}",
        taker.address(),
        ledger.balance(&taker.address())
    );
    Ok(())
}

fn do_refund(ledger_path: &Path, maker: &Keypair) -> Result<(), Error> {
    let mut ledger = load_ledger(ledger_path)?;
    let mut transaction = program::refund(&maker.address());
    transaction.sign(maker);
    execute(&mut ledger, &transaction)?;
    save_ledger(ledger_path, &ledger)?;
    println!(
        "Refunded escrow; {} now holds {}",
        maker.address(),
        ledger.balance(&maker.address())
    );
    Ok(())
}

fn do_show(ledger_path: &Path, maker: &Address) -> Result<(), Error> {
    let ledger = load_ledger(ledger_path)?;
    let (record_address, _) = find_derived_address(RECORD_SEED, maker, &program::id());
    let account = ledger
        .account(&record_address)
        .ok_or("no open escrow for this maker")?;
    let record = Escrow::try_from_slice(&account.data)?;
    let (vault_address, _) = find_derived_address(VAULT_SEED, &record_address, &program::id());
    println!("record: {}", record_address);
    println!("maker:  {}", record.maker);
    println!("taker:  {}", record.taker);
    println!("amount: {}", record.amount);
    println!(
        "vault:  {} (balance {})",
        vault_address,
        ledger.balance(&vault_address)
    );
    Ok(())
}
