use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Command line client for the Bridge API gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    /// Fixed API token sent as x-api-token
    #[arg(short, long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Gateway liveness
    Health,
    /// Gateway and upstream status
    Status,
    /// Generated endpoint documentation
    Docs,
    /// GET a gateway path, e.g. /api/customers?limit=5
    Get { path: String },
    /// POST a JSON body to a gateway path
    Post {
        path: String,
        body: String,
        /// Idempotency key to reuse across repeated invocations
        #[arg(long)]
        idempotency_key: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = &cli.token {
        headers.insert("x-api-token", HeaderValue::from_str(token)?);
    }

    let res = match cli.command {
        Commands::Health => client.get(format!("{base}/health")).headers(headers).send().await?,
        Commands::Status => client.get(format!("{base}/api/status")).headers(headers).send().await?,
        Commands::Docs => client.get(format!("{base}/api/docs")).headers(headers).send().await?,
        Commands::Get { path } => client.get(format!("{base}{path}")).headers(headers).send().await?,
        Commands::Post {
            path,
            body,
            idempotency_key,
        } => {
            let body: Value = serde_json::from_str(&body)?;
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            if let Some(key) = idempotency_key {
                headers.insert("idempotency-key", HeaderValue::from_str(&key)?);
            }
            client
                .post(format!("{base}{path}"))
                .headers(headers)
                .body(body.to_string())
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = match serde_json::from_str::<Value>(&text) {
        Ok(json) => serde_json::to_string_pretty(&json)?,
        Err(_) => text,
    };

    if status.is_success() {
        println!("{rendered}");
    } else {
        eprintln!("Error: gateway returned status {status}");
        eprintln!("{rendered}");
        std::process::exit(1);
    }
    Ok(())
}
