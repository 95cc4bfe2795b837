use crate::args::LinkState;
use anyhow::{bail, Context, Result};
use console::style;
use zerotier_ctl::backend::BackendCli;
use zerotier_ctl::model::Network;
use zerotier_ctl::session::Session;

pub(crate) async fn cmd_networks(session: &Session) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let networks = backend.networks().await?;
    if networks.is_empty() {
        println!("No joined networks.");
        return Ok(());
    }

    // Interface states are decoration; a failure here must not hide the list.
    let interfaces = backend.interface_addrs().await.unwrap_or_else(|err| {
        tracing::warn!(error = %err, "Could not read interface states");
        Vec::new()
    });

    println!(
        "{}",
        style(format!(
            "{:<18} {:<28} {:<12} {}",
            "Network ID", "Name", "Status", "Device"
        ))
        .bold()
    );
    for network in &networks {
        let device = network.port_device_name.as_deref().unwrap_or("-");
        let down = interfaces
            .iter()
            .any(|addr| addr.ifname == device && addr.is_down());
        let mut line = format!(
            "{:<18} {:<28} {:<12} {}",
            network.network_id(),
            network.display_name(),
            network.status.as_deref().unwrap_or("-"),
            device,
        );
        if down {
            line = format!("{} {}", line, style("(interface down)").red());
        }
        println!("{}", line);
    }
    Ok(())
}

pub(crate) async fn cmd_info(session: &Session, network_id: &str) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let network = find_network(&backend, network_id).await?;

    let device = network.port_device_name.as_deref().unwrap_or("-");
    let state = backend
        .interface_state(device)
        .await
        .unwrap_or_else(|_| "UNKNOWN".to_string());

    println!("{:<25}{}", "Name:", network.display_name());
    println!("{:<25}{}", "Network ID:", network.network_id());
    if network.assigned_addresses.is_empty() {
        println!("{:<25}-", "Assigned Addresses:");
    } else {
        println!(
            "{:<25}{}",
            "Assigned Addresses:", network.assigned_addresses[0]
        );
        for address in &network.assigned_addresses[1..] {
            println!("{:<25}{}", "", address);
        }
    }
    println!("{:<25}{}", "Status:", network.status.as_deref().unwrap_or("-"));
    println!("{:<25}{}", "State:", state);
    println!("{:<25}{}", "Type:", network.kind.as_deref().unwrap_or("-"));
    println!("{:<25}{}", "Device:", device);
    println!("{:<25}{}", "Bridge:", opt_bool(network.bridge));
    println!("{:<25}{}", "MAC Address:", network.mac.as_deref().unwrap_or("-"));
    println!(
        "{:<25}{}",
        "MTU:",
        network.mtu.map_or_else(|| "-".to_string(), |m| m.to_string())
    );
    println!("{:<25}{}", "DHCP:", opt_bool(network.dhcp));
    println!("{:<25}{}", "Allow Default Route:", opt_bool(network.allow_default));
    println!("{:<25}{}", "Allow Global IP:", opt_bool(network.allow_global));
    println!("{:<25}{}", "Allow Managed IP:", opt_bool(network.allow_managed));
    println!("{:<25}{}", "Allow DNS:", opt_bool(network.allow_dns));
    Ok(())
}

pub(crate) async fn cmd_join(session: &Session, network_id: &str) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let joined = backend.networks().await?;
    if joined.iter().any(|n| n.network_id() == network_id) {
        println!("You're already a member of this network.");
        return Ok(());
    }
    backend
        .join(network_id)
        .await
        .with_context(|| format!("Could not join \"{}\" (invalid network ID?)", network_id))?;
    println!(
        "{} Successfully joined network {}",
        style("✓").green(),
        network_id
    );
    Ok(())
}

pub(crate) async fn cmd_leave(session: &Session, network_id: &str) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    backend
        .leave(network_id)
        .await
        .with_context(|| format!("Could not leave \"{}\"", network_id))?;
    println!(
        "{} Successfully left network {}",
        style("✓").green(),
        network_id
    );
    Ok(())
}

pub(crate) async fn cmd_set(
    session: &Session,
    network_id: &str,
    option: &str,
    value: &str,
) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let output = backend.set(network_id, option, value).await?;
    let output = output.trim();
    if !output.is_empty() {
        println!("{}", output);
    }
    Ok(())
}

pub(crate) async fn cmd_interface(session: &Session, device: &str, state: LinkState) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    backend
        .set_interface_up(device, matches!(state, LinkState::Up))
        .await
        .with_context(|| format!("Could not change link state of {}", device))?;
    let reported = backend
        .interface_state(device)
        .await
        .unwrap_or_else(|_| "UNKNOWN".to_string());
    println!("{:<25}{}", "Interface:", device);
    println!("{:<25}{}", "State:", reported);
    Ok(())
}

async fn find_network<R: zerotier_ctl::CommandRunner>(
    backend: &BackendCli<'_, R>,
    network_id: &str,
) -> Result<Network> {
    let networks = backend.networks().await?;
    match networks.into_iter().find(|n| n.network_id() == network_id) {
        Some(network) => Ok(network),
        None => bail!("Not joined to network \"{}\"", network_id),
    }
}

fn opt_bool(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "true",
        Some(false) => "false",
        None => "-",
    }
}
