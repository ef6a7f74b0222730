use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "rates-cli")]
#[command(about = "Management CLI for the rate gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080", env = "RATES_GATEWAY_URL")]
    url: String,

    /// Admin API key
    #[arg(short, long, default_value = "", env = "RATES_ADMIN_API_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the current rate for a currency
    Get {
        currency: String,
        /// Skip the gateway cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Show gateway status
    Status,
    /// List circuit breakers and their state
    Circuits,
    /// Force every circuit breaker closed
    ResetCircuits,
    /// Drop the cached quote for a currency
    Invalidate { currency: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut admin = HeaderMap::new();
    admin.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = match cli.command {
        Commands::Get { currency, no_cache } => {
            let mut req = client.get(format!("{base}/exchange/{currency}"));
            if no_cache {
                req = req.header("no-cache", "true");
            }
            req.send().await?
        }
        Commands::Status => {
            client
                .get(format!("{base}/admin/status"))
                .headers(admin)
                .send()
                .await?
        }
        Commands::Circuits => {
            client
                .get(format!("{base}/admin/circuits"))
                .headers(admin)
                .send()
                .await?
        }
        Commands::ResetCircuits => {
            client
                .post(format!("{base}/admin/circuits/reset"))
                .headers(admin)
                .send()
                .await?
        }
        Commands::Invalidate { currency } => {
            client
                .delete(format!("{base}/admin/cache/{currency}"))
                .headers(admin)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        if !text.is_empty() {
            eprintln!("Response: {}", text);
        }
        std::process::exit(1);
    }

    if text.is_empty() {
        println!("{}", status);
        return Ok(());
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
