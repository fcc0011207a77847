mod cli;
mod client;
mod commands;
mod config;
mod endpoints;
mod error;
mod filter;
mod normalize;
mod output;
mod session;
mod store;
mod types;

use std::error::Error;
use std::io;

use clap::{CommandFactory, Parser};
use clap_complete::generate;

use cli::{Cli, Commands, TicketCommands};
use client::ApiClient;
use config::Config;
use error::Result;
use session::SessionStore;
use store::TicketStore;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let verbose = cli.verbose;
    output::set_json_output(cli.json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");

        if verbose {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("Caused by: {cause}");
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        // Commands that don't require config/client
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "helpdesk", &mut io::stdout());
            Ok(())
        }
        Commands::Init => commands::init::run().await,
        // Commands that require config and client
        command => {
            let config = Config::load()?;
            let session = SessionStore::new(Config::session_path().ok());
            let client = ApiClient::new(config.api_url()?, session);
            let store = TicketStore::new(client.clone());

            match command {
                Commands::SignIn { username } => {
                    commands::auth::sign_in(&client, &username).await
                }
                Commands::SignUp(args) => commands::auth::sign_up(&client, args).await,
                Commands::SignOut => commands::auth::sign_out(&client).await,
                Commands::Whoami => commands::auth::whoami(&client),
                Commands::Tickets(args) => {
                    commands::tickets::list(&store, &config, args).await
                }
                Commands::Ticket { action } => match action {
                    TicketCommands::List(args) => {
                        commands::tickets::list(&store, &config, args).await
                    }
                    TicketCommands::View { id } => {
                        commands::tickets::view(&store, &config, &id).await
                    }
                    TicketCommands::Create(args) => {
                        commands::tickets::create(&store, args).await
                    }
                    TicketCommands::Status { id, status } => {
                        commands::tickets::set_status(&store, &id, &status).await
                    }
                    TicketCommands::Assign { id, manager } => {
                        commands::tickets::assign(&store, &id, &manager).await
                    }
                    TicketCommands::Watch(args) => {
                        commands::tickets::watch(&store, args).await
                    }
                },
                Commands::Dashboard => commands::dashboard::run(&store).await,
                Commands::Catalogs { action } => {
                    commands::catalogs::run(&store, action).await
                }
                Commands::Completions { .. } | Commands::Init => {
                    // Already handled above
                    Ok(())
                }
            }
        }
    }
}
