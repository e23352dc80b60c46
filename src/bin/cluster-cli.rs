use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use serde_json::Value;

use cluster_state_api::client::{ClusterClient, Collection};

#[derive(Parser)]
#[command(name = "cluster-cli")]
#[command(about = "Query and follow cluster state from the cluster state API", long_about = None)]
struct Cli {
    /// API base URL including the prefix.
    #[arg(short, long, default_value = "http://localhost:3000/v1")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Container instances
    Instances {
        #[command(subcommand)]
        action: Action,
    },
    /// Tasks
    Tasks {
        #[command(subcommand)]
        action: Action,
    },
}

#[derive(Subcommand)]
enum Action {
    /// Show one resource by ARN
    Get { arn: String },
    /// List resources, optionally filtered on one dimension
    List(Filters),
    /// Follow changes until the server closes the stream
    Stream,
}

#[derive(Args)]
struct Filters {
    /// Filter on status
    #[arg(long)]
    status: Option<String>,
    /// Filter on cluster ARN (instances only)
    #[arg(long)]
    cluster: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = ClusterClient::new(&cli.url);

    let (collection, action) = match cli.command {
        Commands::Instances { action } => (Collection::Instances, action),
        Commands::Tasks { action } => (Collection::Tasks, action),
    };

    match action {
        Action::Get { arn } => print_json(&client.get(collection, &arn).await?)?,
        Action::List(filters) => {
            let mut params = Vec::new();
            if let Some(status) = filters.status.as_deref() {
                params.push(("status", status));
            }
            if let Some(cluster) = filters.cluster.as_deref() {
                params.push(("cluster", cluster));
            }
            let resources = client.query(collection, &params).await?;
            print_json(&Value::Array(resources))?;
        }
        Action::Stream => {
            let mut documents = client.stream(collection).await?;
            while let Some(document) = documents.next().await {
                let document = document?;
                // Mid-stream failures arrive as error documents.
                if document.get("code").is_some() && document.get("message").is_some() {
                    eprintln!("Error: stream failed: {}", document["message"]);
                    break;
                }
                print_json(&document)?;
            }
        }
    }

    Ok(())
}

fn print_json(value: &Value) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
