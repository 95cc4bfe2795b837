mod args;
mod commands;
mod init;

use args::{Cli, Commands};
use clap::Parser;
use zerotier_ctl::executor::ExecOptions;
use zerotier_ctl::session::Session;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init::init_tracing();

    let cli = Cli::parse();

    // Completions need no elevation and no backend.
    if let Commands::Completions { shell } = &cli.command {
        commands::completions::cmd_completions(*shell);
        return Ok(());
    }

    let mut options = ExecOptions::from_env();
    if cli.host_direct {
        options.sandbox_hop = false;
    }

    let session = Session::establish(options).await?;

    match cli.command {
        Commands::Networks => commands::networks::cmd_networks(&session).await?,
        Commands::Info { network_id } => {
            commands::networks::cmd_info(&session, &network_id).await?
        }
        Commands::Join { network_id } => {
            commands::networks::cmd_join(&session, &network_id).await?
        }
        Commands::Leave { network_id } => {
            commands::networks::cmd_leave(&session, &network_id).await?
        }
        Commands::Set {
            network_id,
            option,
            value,
        } => commands::networks::cmd_set(&session, &network_id, &option, &value).await?,
        Commands::Peers => commands::peers::cmd_peers(&session).await?,
        Commands::Paths { address } => commands::peers::cmd_paths(&session, &address).await?,
        Commands::Status => commands::status::cmd_status(&session).await?,
        Commands::Interface { device, state } => {
            commands::networks::cmd_interface(&session, &device, state).await?
        }
        Commands::Service { action } => commands::service::cmd_service(&session, action).await?,
        Commands::Doctor { yes } => commands::doctor::cmd_doctor(&session, yes).await?,
        Commands::Completions { .. } => unreachable!("handled before authentication"),
    }

    Ok(())
}
