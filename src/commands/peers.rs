use anyhow::{bail, Result};
use console::style;
use zerotier_ctl::backend::BackendCli;
use zerotier_ctl::session::Session;

pub(crate) async fn cmd_peers(session: &Session) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let peers = backend.peers().await?;
    if peers.is_empty() {
        println!("No known peers.");
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<12} {:<12} {:<8} {}",
            "ZT Address", "Version", "Role", "Latency"
        ))
        .bold()
    );
    for peer in &peers {
        println!(
            "{:<12} {:<12} {:<8} {}",
            peer.address.as_deref().unwrap_or("-"),
            peer.display_version(),
            peer.role.as_deref().unwrap_or("-"),
            peer.latency.map_or_else(|| "-".to_string(), |l| l.to_string()),
        );
    }
    Ok(())
}

pub(crate) async fn cmd_paths(session: &Session, address: &str) -> Result<()> {
    let backend = BackendCli::new(session.executor());
    let peers = backend.peers().await?;
    let Some(peer) = peers
        .iter()
        .find(|p| p.address.as_deref() == Some(address))
    else {
        bail!("No peer with address \"{}\"", address);
    };

    if peer.paths.is_empty() {
        println!("Peer {} has no known paths.", address);
        return Ok(());
    }

    println!(
        "{}",
        style(format!(
            "{:<8} {:<28} {:<8} {:<14} {:<14} {:<10} {}",
            "Active", "Address", "Expired", "Last Receive", "Last Send", "Preferred", "Trusted Path ID"
        ))
        .bold()
    );
    for path in &peer.paths {
        println!(
            "{:<8} {:<28} {:<8} {:<14} {:<14} {:<10} {}",
            opt(path.active),
            path.address.as_deref().unwrap_or("-"),
            opt(path.expired),
            opt(path.last_receive),
            opt(path.last_send),
            opt(path.preferred),
            opt(path.trusted_path_id),
        );
    }
    Ok(())
}

fn opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
