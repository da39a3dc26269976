// src/main.rs
use clap::{Parser, Subcommand};
use std::{
    fs,
    io::{self, Read},
    sync::Arc,
};
use tracing::{info, warn};

use cluster_console::{
    app::{Console, ProfileView},
    config::{ConsoleConfig, DEFAULT_CONFIG_PATH},
    objects::{Member, ObjectGroups, RouteSummary},
    profile,
    utils::init_logging,
    web::{self, DEFAULT_LOG_TAIL},
};

#[derive(Parser)]
#[command(name = "cluster-console", version, about = "Administrative console backend for a cluster")]
pub struct Args {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
    #[arg(short, long)]
    pub debug: bool,
    /// Use this cluster instead of the profile's selection.
    #[arg(long, global = true)]
    pub cluster: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(short, long)]
        port: Option<u16>,
        /// Open the API docs in a browser once listening.
        #[arg(long)]
        open: bool,
    },
    /// Check a descriptor file without installing it.
    Validate { file: String },
    /// Install a descriptor file as the active profile.
    Import { file: String },
    /// List the clusters of the active profile.
    Clusters,
    Members,
    Objects,
    /// Per-node status of an object.
    Status { name: String },
    /// Mermaid flow chart of a pipeline.
    Flow { name: String },
    /// Create an object from YAML (`-` reads stdin).
    Create { file: String },
    Update { name: String, file: String },
    Delete { name: String },
    Logs {
        #[arg(short, long, default_value_t = DEFAULT_LOG_TAIL)]
        tail: usize,
    },
}

fn other<E: std::fmt::Display>(e: E) -> io::Error {
    io::Error::new(io::ErrorKind::Other, e.to_string())
}

fn read_input(file: &str) -> io::Result<String> {
    if file == "-" {
        let mut text = String::new();
        io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        fs::read_to_string(shellexpand::tilde(file).into_owned())
    }
}

fn print_profile(view: &ProfileView) {
    println!("profile: {:?}", view.state);
    for cluster in &view.clusters {
        let marker = if cluster.name == view.selected { "*" } else { " " };
        let mut flags = Vec::new();
        if cluster.uses_tls {
            flags.push("tls");
        }
        if cluster.client_certificate {
            flags.push("client-cert");
        }
        if cluster.basic_auth {
            flags.push("basic-auth");
        }
        println!(
            "{} {}\t{}\t{}",
            marker,
            cluster.name,
            cluster.base_url,
            flags.join(",")
        );
        if let Some(ca) = &cluster.certificate_authority {
            println!("    ca: {} (expires {})", ca.subject, ca.not_after.to_rfc3339());
        }
    }
    // The default cluster is used when the selection is missing from the list.
    if !view.clusters.iter().any(|c| c.name == view.selected) {
        println!("* {} (default)", view.selected);
    }
}

fn print_members(members: &[Member]) {
    let now = chrono::Utc::now();
    for member in members {
        let age = member
            .heartbeat_age(now)
            .map(|d| format!("{}s ago", d.num_seconds()))
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}\t{}\t{}\t{}\theartbeat {}",
            member.name(),
            member.options.cluster_role,
            member.etcd.state,
            member.options.api_addr,
            age
        );
    }
}

fn print_objects(groups: &ObjectGroups) {
    println!("Pipelines:");
    for pipeline in &groups.pipelines {
        println!("  {} ({} filters)", pipeline.name, pipeline.filters.len());
    }
    println!("HTTP servers:");
    for server in &groups.http_servers {
        println!("  {} :{}", server.name, server.port);
        for route in server.routes() {
            println!("    {}", route);
        }
    }
    println!("gRPC servers:");
    for server in &groups.grpc_servers {
        println!("  {} :{}", server.name, server.port);
        for route in server.routes() {
            println!("    {}", route);
        }
    }
    println!("Others:");
    for object in &groups.others {
        println!("  {} ({})", object.name, object.kind);
    }
}

async fn serve(console: Arc<Console>, port: u16, open: bool) -> io::Result<()> {
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let mut server = tokio::spawn(web::start_web_server(Arc::clone(&console), port, shutdown_rx));

    if open {
        console.open_web_ui(port);
    }

    tokio::select! {
        result = &mut server => return result.map_err(other)?,
        signal = tokio::signal::ctrl_c() => {
            signal?;
            info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(());
    server.await.map_err(other)?
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();

    let config = ConsoleConfig::load_or_init(&args.config)?;
    config.validate()?;

    let log_path = config.log_path();
    let _flusher = init_logging(log_path.as_deref(), args.debug)?;

    if let Command::Validate { file } = &args.command {
        let text = read_input(file)?;
        let (_, resolved) = profile::load(&text).map_err(other)?;
        println!("descriptor is valid");
        for cluster in &resolved.clusters {
            println!("  {}\t{}", cluster.name, cluster.base_url);
        }
        return Ok(());
    }

    let (console, _warnings) = Console::new(config);
    let console = Arc::new(console);

    if let Some(name) = &args.cluster {
        console.select(name).map_err(other)?;
    }

    match args.command {
        Command::Validate { .. } => {}
        Command::Serve { port, open } => {
            let port = port.unwrap_or(console.config().port);
            serve(Arc::clone(&console), port, open).await?;
        }
        Command::Import { file } => {
            let text = read_input(&file)?;
            let view = console.import(&text).map_err(other)?;
            print_profile(&view);
        }
        Command::Clusters => print_profile(&console.profile()),
        Command::Members => {
            let members = console.client().map_err(other)?.members().await.map_err(other)?;
            print_members(&members);
        }
        Command::Objects => {
            let groups = console.client().map_err(other)?.objects().await.map_err(other)?;
            if groups.is_empty() {
                warn!("no objects on cluster {}", console.profile().selected);
            }
            print_objects(&groups);
        }
        Command::Status { name } => {
            let statuses = console
                .client()
                .map_err(other)?
                .object_status(&name)
                .await
                .map_err(other)?;
            println!(
                "{}",
                serde_json::to_string_pretty(&statuses).map_err(other)?
            );
        }
        Command::Flow { name } => {
            print!("{}", console.flow_chart(&name).await.map_err(other)?);
        }
        Command::Create { file } => {
            let text = read_input(&file)?;
            console
                .client()
                .map_err(other)?
                .create_object(&text)
                .await
                .map_err(other)?;
            println!("created");
        }
        Command::Update { name, file } => {
            let text = read_input(&file)?;
            console
                .client()
                .map_err(other)?
                .update_object(&name, &text)
                .await
                .map_err(other)?;
            println!("updated {}", name);
        }
        Command::Delete { name } => {
            console
                .client()
                .map_err(other)?
                .delete_object(&name)
                .await
                .map_err(other)?;
            println!("deleted {}", name);
        }
        Command::Logs { tail } => {
            print!("{}", console.client().map_err(other)?.logs(tail).await.map_err(other)?);
        }
    }

    Ok(())
}
