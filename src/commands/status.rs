use anyhow::Result;
use console::style;
use zerotier_ctl::backend::BackendCli;
use zerotier_ctl::service::ServiceController;
use zerotier_ctl::session::Session;

pub(crate) async fn cmd_status(session: &Session) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    match backend.node_status().await? {
        Some(status) => {
            println!("{:<25}{}", "My ZeroTier Address:", status.address);
            println!("{:<25}{}", "ZeroTier Version:", status.version);
            println!("{:<25}{}", "Status:", status.status);
        }
        None => println!("{}", style("Backend disabled or returned no status.").yellow()),
    }

    let controller = ServiceController::new(session.executor());
    println!("{:<25}{}", "Service Status:", controller.state().await?);
    Ok(())
}
