//! Command-line tasks against the deployed vault contracts. Mirrors the UI
//! workflow for scripting: claim, authorize, stake, withdraw, and decrypting
//! the caller's own encrypted state.

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use homora_vault_ui::abi::Address;
use homora_vault_ui::config;
use homora_vault_ui::units;
use homora_vault_ui::{build_eth_client, build_orchestrator, AppOrchestrator};

#[derive(Parser)]
#[command(name = "homora-tasks", about = "Tasks against the Homora vault contracts")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print contract and RPC configuration
    Address,
    /// Print vault state for an account
    Status {
        /// Account to inspect instead of the node's first wallet account
        #[arg(long)]
        address: Option<String>,
    },
    /// Decrypt the confidential balance
    DecryptBalance {
        #[arg(long)]
        address: Option<String>,
    },
    /// Decrypt the staked amount
    DecryptStake {
        #[arg(long)]
        address: Option<String>,
    },
    /// One-time faucet claim
    Claim,
    /// Authorize the vault to move encrypted tokens
    SetOperator {
        /// Operator window in days
        #[arg(long, default_value_t = 365, value_parser = positive_u64)]
        days: u64,
    },
    /// Place an encrypted stake
    Stake {
        /// Amount in base units
        #[arg(long, value_parser = positive_u64)]
        amount: u64,
        /// Lock duration in seconds
        #[arg(long, default_value_t = 86_400, value_parser = positive_u64)]
        duration: u64,
    },
    /// Withdraw an unlocked stake
    Withdraw,
}

fn positive_u64(input: &str) -> Result<u64, String> {
    match input.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err("must be a positive integer".to_string()),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();
    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Address => {
            println!("token:    {}", config::token_address());
            println!("vault:    {}", config::vault_address());
            println!("verifier: {}", config::decryption_verifier());
            println!("rpc:      {}", config::rpc_url());
            Ok(())
        }
        Command::Status { address } => {
            let (orch, account) = connect(address.as_deref()).await?;
            print_view(&orch, account);
            Ok(())
        }
        Command::DecryptBalance { address } => {
            let (orch, account) = connect(address.as_deref()).await?;
            let handle = orch
                .balance_handle(account)
                .await
                .map_err(|e| e.to_string())?;
            println!("handle: {handle}");
            let clear = orch
                .decrypt_handle(handle, config::token_address())
                .await
                .map_err(|e| e.to_string())?;
            print_clear(clear);
            Ok(())
        }
        Command::DecryptStake { address } => {
            let (orch, account) = connect(address.as_deref()).await?;
            let stake = orch.stake_view(account).await.map_err(|e| e.to_string())?;
            println!("handle: {}", stake.handle);
            let clear = orch
                .decrypt_handle(stake.handle, config::vault_address())
                .await
                .map_err(|e| e.to_string())?;
            print_clear(clear);
            Ok(())
        }
        Command::Claim => {
            let (orch, account) = connect(None).await?;
            orch.claim().await;
            print_view(&orch, account);
            Ok(())
        }
        Command::SetOperator { days } => {
            let (orch, account) = connect(None).await?;
            orch.authorize_operator(&days.to_string()).await;
            print_view(&orch, account);
            Ok(())
        }
        Command::Stake { amount, duration } => {
            let (orch, account) = connect(None).await?;
            orch.stake_units(amount, duration).await;
            print_view(&orch, account);
            Ok(())
        }
        Command::Withdraw => {
            let (orch, account) = connect(None).await?;
            orch.withdraw().await;
            print_view(&orch, account);
            Ok(())
        }
    }
}

/// Build the clients, resolve the acting account, and load vault state.
async fn connect(address: Option<&str>) -> Result<(AppOrchestrator, Address), String> {
    let eth = build_eth_client();
    let orch = build_orchestrator(eth.clone());

    let account = match address {
        Some(s) => Address::from_hex(s).map_err(|e| e.to_string())?,
        None => {
            let accounts = tokio::task::spawn_blocking(move || eth.accounts())
                .await
                .map_err(|e| e.to_string())?
                .map_err(|e| e.to_string())?;
            *accounts
                .first()
                .ok_or("no wallet accounts available over RPC")?
        }
    };

    orch.set_account(Some(account)).await;
    let view = orch.snapshot();
    if view.has_claimed.is_none() {
        return Err(view
            .status
            .unwrap_or_else(|| "failed to load onchain state".to_string()));
    }
    Ok((orch, account))
}

fn print_view(orch: &AppOrchestrator, account: Address) {
    let vs = orch.snapshot();
    println!("account:     {account}");
    println!(
        "balance:     {}",
        units::format_token_amount(vs.balance, config::TOKEN_DECIMALS)
    );
    println!(
        "staked:      {}",
        units::format_token_amount(vs.stake_amount, config::TOKEN_DECIMALS)
    );
    println!(
        "unlock:      {}",
        units::format_timestamp(vs.stake_active.then_some(vs.stake_unlock_time).flatten())
    );
    println!("claimed:     {}", flag_text(vs.has_claimed));
    println!("operator:    {}", flag_text(vs.is_operator));
    println!("withdrawable: {}", vs.withdrawable);
    if let Some(msg) = vs.status {
        println!("status:      {msg}");
    }
}

fn print_clear(clear: Option<u64>) {
    match clear {
        Some(value) => println!(
            "clear:  {}",
            units::format_units(value, config::TOKEN_DECIMALS)
        ),
        None => println!("clear:  unavailable (wallet or relayer not ready)"),
    }
}

fn flag_text(value: Option<bool>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "unknown".to_string(),
    }
}
