// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use chroma_admin::chroma::metadata::metadata_from_pairs;
use chroma_admin::chroma::{MetadataPair, NewDocument, ValidationError};
use chroma_admin::config::{storage_paths_from_env, ConfigError, HostConfig};
use chroma_admin::error::ApiError;
use chroma_admin::logging::init_tracing;
use chroma_admin::router::{Navigation, RouteTable, HOME_PATH, LOGIN_PATH};
use chroma_admin::session::{AuthMethod, Protocol, SessionError};
use chroma_admin::state::{AppState, BootstrapError};
use chroma_admin::storage::StoragePaths;

#[derive(Parser)]
#[command(name = "chroma-admin")]
#[command(version, about = "Administer a Chroma vector database server", long_about = None)]
struct Cli {
    /// Default server for a fresh session [default: $CHROMA_HOST or http://localhost:8000]
    #[arg(long, global = true)]
    host: Option<String>,

    /// Directory for the session database and settings [default: $CHROMA_ADMIN_DATA_DIR or ~/.chroma-admin]
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Probe a server and remember the session
    Login {
        /// Server address (host:port or a full URL); defaults to the last used server
        server: Option<String>,
        /// Scheme for an address given without one
        #[arg(long)]
        protocol: Option<Protocol>,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        database: Option<String>,
        /// Bearer token
        #[arg(long, conflicts_with_all = ["username", "password"])]
        token: Option<String>,
        /// Basic auth user name
        #[arg(long, requires = "password")]
        username: Option<String>,
        /// Basic auth password
        #[arg(long, requires = "username")]
        password: Option<String>,
    },
    /// Forget the stored session
    Logout,
    /// Show the current session
    Status,
    /// List collections
    Collections,
    /// Create a collection
    Create { name: String },
    /// Delete a collection
    Delete { name: String },
    /// List the documents of a collection
    Documents { collection: String },
    /// Add a document to a collection
    Add {
        collection: String,
        /// Document content
        content: String,
        /// Document id; generated when omitted
        #[arg(long)]
        id: Option<String>,
        /// Metadata as key=value or key:type=value (string, integer, float, boolean)
        #[arg(long = "meta", short = 'm')]
        metadata: Vec<MetadataPair>,
    },
    /// Delete a document from a collection
    RemoveDocument { collection: String, id: String },
}

impl Command {
    /// Route the command acts on, if it needs one.
    fn route(&self) -> Option<String> {
        match self {
            Command::Login { .. } => Some(LOGIN_PATH.to_string()),
            Command::Logout | Command::Status => None,
            Command::Collections | Command::Create { .. } | Command::Delete { .. } => {
                Some(HOME_PATH.to_string())
            }
            Command::Documents { collection }
            | Command::Add { collection, .. }
            | Command::RemoveDocument { collection, .. } => {
                Some(RouteTable::collection_path(collection))
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Not logged in. Run `chroma-admin login <server>` first.")]
    NotLoggedIn,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let state = match open_state(&cli).await {
        Ok(state) => state,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let result = run(&state, cli.command).await;

    for notification in state.notifications.drain() {
        eprintln!("[{}] {}", notification.kind, notification.message);
    }

    let local_error = state.chroma.error().await;
    match result {
        Ok(()) if local_error.is_none() => ExitCode::SUCCESS,
        Ok(()) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn open_state(cli: &Cli) -> Result<AppState, CliError> {
    let host = match &cli.host {
        Some(raw) => HostConfig::parse(raw)?,
        None => HostConfig::from_env()?,
    };
    let paths = match &cli.data_dir {
        Some(dir) => StoragePaths::new(dir),
        None => storage_paths_from_env(),
    };
    Ok(AppState::bootstrap(&paths, host).await?)
}

async fn run(state: &AppState, command: Command) -> Result<(), CliError> {
    if let Some(route) = command.route() {
        match state.guard.before_each(&route).await {
            Navigation::Redirect(target) if target == LOGIN_PATH => return Err(CliError::NotLoggedIn),
            Navigation::Redirect(target) => {
                if let Command::Login { server: None, .. } = command {
                    println!("Already logged in to {}", state.session.base_url().await);
                    println!("Last view: {target}");
                    return Ok(());
                }
            }
            Navigation::Proceed => {}
        }
    } else {
        state.session.restore_once().await;
    }

    match command {
        Command::Login {
            server,
            protocol,
            tenant,
            database,
            token,
            username,
            password,
        } => {
            let mut form = state.session.login_defaults();
            if let Some(server) = server {
                form.server_url = server;
            }
            if let Some(protocol) = protocol {
                form.protocol = protocol;
            }
            form.tenant = tenant.or(form.tenant);
            form.database = database.or(form.database);
            form.auth = match (token, username, password) {
                (Some(token), _, _) => AuthMethod::Token { token },
                (None, Some(username), Some(password)) => AuthMethod::Basic { username, password },
                _ => AuthMethod::None,
            };

            state.session.login(form).await?;
            let session = state.session.snapshot().await;
            println!(
                "Logged in to {} (tenant {}, database {})",
                session.base_url(),
                session.tenant,
                session.database
            );
        }

        Command::Logout => {
            state.session.logout().await;
            println!("Logged out");
        }

        Command::Status => {
            let session = state.session.snapshot().await;
            if session.is_authenticated() {
                println!("Logged in to {}", session.base_url());
                println!("  tenant:   {}", session.tenant);
                println!("  database: {}", session.database);
                println!("  auth:     {}", session.auth.kind());
                if let Some(route) = state.session.last_route().await {
                    println!("  last view: {route}");
                }
            } else {
                println!("Not logged in (default server {})", session.base_url());
            }
        }

        Command::Collections => {
            state.chroma.fetch_collections().await?;
            for collection in state.chroma.collections().await {
                println!("{}\t{}", collection.name, collection.id);
            }
        }

        Command::Create { name } => {
            state.chroma.fetch_collections().await?;
            state.chroma.create_collection(&name).await?;
        }

        Command::Delete { name } => {
            state.chroma.fetch_collections().await?;
            state.chroma.delete_collection(&name).await?;
        }

        Command::Documents { collection } => {
            state.chroma.fetch_collections().await?;
            state.chroma.fetch_collection_documents(&collection).await?;
            for document in state.chroma.documents().await {
                let metadata = serde_json::to_string(&document.metadata).unwrap_or_default();
                println!("{}\t{}\t{}", document.id, document.document, metadata);
            }
        }

        Command::Add {
            collection,
            content,
            id,
            metadata,
        } => {
            let metadata = metadata_from_pairs(&metadata)?;
            let mut document = NewDocument::new(content).with_metadata(metadata);
            document.id = id;

            state.chroma.fetch_collections().await?;
            if let Some(id) = state.chroma.add_document(&collection, document).await? {
                println!("{id}");
            }
        }

        Command::RemoveDocument { collection, id } => {
            state.chroma.fetch_collections().await?;
            state.chroma.delete_document(&collection, &id).await?;
        }
    }

    Ok(())
}
