use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "categories-cli")]
#[command(about = "Command-line client for the Categories API", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:10000")]
    url: String,

    /// Bearer token from `login`.
    #[arg(short, long, env = "CATEGORIES_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service and database health
    Health,
    /// Create an account
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
    },
    /// Log in and print a token
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Show the account behind the token
    Me,
    /// Check whether the token is still valid
    Verify,
    /// List all categories
    List,
    /// Show one category
    Get { id: i32 },
    /// Create a category
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        inactive: bool,
    },
    /// Change fields of a category; omitted flags are left untouched
    Update {
        id: i32,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a category
    Delete { id: i32 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let mut headers = HeaderMap::new();
    if let Some(token) = &cli.token {
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))?,
        );
    }

    let req = match cli.command {
        Commands::Health => client.get(format!("{}/health", base)),
        Commands::Register {
            email,
            password,
            full_name,
        } => client
            .post(format!("{}/auth/register", base))
            .json(&json!({ "email": email, "password": password, "full_name": full_name })),
        Commands::Login { email, password } => client
            .post(format!("{}/auth/login", base))
            .json(&json!({ "email": email, "password": password })),
        Commands::Me => client.get(format!("{}/auth/me", base)),
        Commands::Verify => client.get(format!("{}/auth/verify", base)),
        Commands::List => client.get(format!("{}/categories", base)),
        Commands::Get { id } => client.get(format!("{}/categories/{}", base, id)),
        Commands::Create {
            name,
            description,
            inactive,
        } => client.post(format!("{}/categories", base)).json(&json!({
            "name": name,
            "description": description,
            "is_active": !inactive,
        })),
        Commands::Update {
            id,
            name,
            description,
            active,
        } => {
            let mut body = Map::new();
            if let Some(name) = name {
                body.insert("name".into(), Value::String(name));
            }
            if let Some(description) = description {
                body.insert("description".into(), Value::String(description));
            }
            if let Some(active) = active {
                body.insert("is_active".into(), Value::Bool(active));
            }
            client
                .put(format!("{}/categories/{}", base, id))
                .json(&Value::Object(body))
        }
        Commands::Delete { id } => client.delete(format!("{}/categories/{}", base, id)),
    };

    let res = req.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => {
            let pretty = serde_json::to_string_pretty(&json)?;
            if status.is_success() {
                println!("{}", pretty);
            } else {
                eprintln!("Error: API returned status {}", status);
                eprintln!("{}", pretty);
                std::process::exit(1);
            }
        }
        Err(_) => {
            eprintln!("Error: API returned status {} with a non-JSON body", status);
            eprintln!("{}", text);
            std::process::exit(1);
        }
    }
    Ok(())
}
