use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "hub-cli")]
#[command(about = "Drive a selenese-hub from the command line", long_about = None)]
struct Cli {
    /// Hub base URL including the mount prefix.
    #[arg(short, long, default_value = "http://127.0.0.1:4444/hub")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show hub status
    Status,
    /// List open sessions
    Sessions,
    /// Open a new browser session
    NewSession {
        /// Capabilities as a JSON object
        #[arg(short, long, default_value = "{}")]
        capabilities: String,
    },
    /// Run one Selenese command
    Run {
        session: String,
        command: String,
        args: Vec<String>,
    },
    /// Cancel the session's running command
    Interrupt { session: String },
    /// Close a session
    End { session: String },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/status", base)),
        Commands::Sessions => client.get(format!("{}/sessions", base)),
        Commands::NewSession { capabilities } => {
            let capabilities: Value = serde_json::from_str(&capabilities)?;
            client
                .post(format!("{}/session", base))
                .json(&json!({ "capabilities": capabilities }))
        }
        Commands::Run { session, command, args } => client
            .post(format!("{}/session/{}/selenium/{}", base, session, command))
            .json(&json!({ "args": args })),
        Commands::Interrupt { session } => client.post(format!("{}/session/{}/interrupt", base, session)),
        Commands::End { session } => client.delete(format!("{}/session/{}", base, session)),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

    if !status.is_success() {
        eprintln!("Error: hub returned status {}", status);
        eprintln!("{}", serde_json::to_string_pretty(&body)?);
        std::process::exit(1);
    }

    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(())
}
