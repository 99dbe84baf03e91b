use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Management CLI for the API gateway", long_about = None)]
struct Cli {
    /// Admin API base URL.
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    /// Admin API key.
    #[arg(short, long, env = "GATEWAY_ADMIN_KEY", default_value = "CHANGE_ME_IN_PRODUCTION")]
    key: String,

    /// Gateway base URL, for commands that talk to the public surface.
    #[arg(short, long, default_value = "http://localhost:5000")]
    gateway_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway status and store reachability
    Status,
    /// List upstream instances with request and failure counters
    Upstreams,
    /// Call the gateway liveness endpoint
    Health,
    /// Clear the rate-limit window for this client
    ResetRateLimit {
        /// Bearer token whose user window should also be cleared.
        #[arg(short, long)]
        token: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut admin = HeaderMap::new();
    admin.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    match cli.command {
        Commands::Status => {
            let res = client
                .get(format!("{}/admin/status", cli.url))
                .headers(admin)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Upstreams => {
            let res = client
                .get(format!("{}/admin/upstreams", cli.url))
                .headers(admin)
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Health => {
            let res = client.get(format!("{}/", cli.gateway_url)).send().await?;
            print_response(res).await?;
        }
        Commands::ResetRateLimit { token } => {
            let mut req = client.post(format!("{}/reset_rate_limit", cli.gateway_url));
            if let Some(token) = token {
                req = req.bearer_auth(token);
            }
            print_response(req.send().await?).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: request returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
