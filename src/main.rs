//! token-vault CLI
//!
//! 스케줄러(cron, 작업 스케줄러)에서 주기적으로 `token-vault rotate <identity>`를 호출하는 용도.

use std::io::{BufRead, Write};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use token_vault::{
    ErrorReport, OAuthRefreshProvider, ProviderConfig, TokenManager, VaultConfig, VaultError,
    VaultResult,
};

#[derive(Debug, Parser)]
#[command(name = "token-vault", version, about = "Local vault for rotating OAuth2 bearer tokens")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Store a token read from the first line of stdin
    Store { identity: String },
    /// Print the stored token
    Retrieve { identity: String },
    /// Exchange the stored token at the configured token endpoint and store the replacement
    Rotate { identity: String },
    /// List identities with a stored key
    List,
}

fn main() -> ExitCode {
    // .env 파일이 없어도 무시
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("token_vault=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = ErrorReport::from(&err);
            match serde_json::to_string(&report) {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("{}", err),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> VaultResult<()> {
    let mut manager = TokenManager::open(VaultConfig::from_env()?)?;

    match cli.command {
        Command::Store { identity } => {
            let token = read_token()?;
            manager.store(&identity, &token)?;
        }
        Command::Retrieve { identity } => {
            let token = manager.retrieve(&identity)?;
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{}", token.as_str())?;
        }
        Command::Rotate { identity } => {
            let provider = OAuthRefreshProvider::new(ProviderConfig::from_env()?)?;
            let receipt = manager.rotate(&identity, &provider)?;
            println!("{}", serde_json::to_string(&receipt)?);
        }
        Command::List => {
            for identity in manager.identities() {
                println!("{}", identity);
            }
        }
    }

    Ok(())
}

fn read_token() -> VaultResult<Zeroizing<String>> {
    let mut line = Zeroizing::new(String::new());
    std::io::stdin().lock().read_line(&mut line)?;
    parse_token_line(&line)
}

/// stdin 첫 줄에서 앞뒤 공백/개행을 제거한 토큰
fn parse_token_line(line: &str) -> VaultResult<Zeroizing<String>> {
    let token = line.trim();
    if token.is_empty() {
        return Err(VaultError::Config("expected a token on stdin".to_string()));
    }
    Ok(Zeroizing::new(token.to_string()))
}
