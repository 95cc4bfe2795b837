use crate::args::ServiceVerb;
use anyhow::Result;
use zerotier_ctl::service::{ServiceAction, ServiceController};
use zerotier_ctl::session::Session;

pub(crate) async fn cmd_service(session: &Session, verb: ServiceVerb) -> Result<()> {
    let controller = ServiceController::new(session.executor());

    let action = match verb {
        ServiceVerb::Start => ServiceAction::Start,
        ServiceVerb::Stop => ServiceAction::Stop,
        ServiceVerb::Enable => ServiceAction::Enable,
        ServiceVerb::Disable => ServiceAction::Disable,
        ServiceVerb::Show => {
            let dump = controller.manage(ServiceAction::Show).await?;
            print!("{}", dump);
            return Ok(());
        }
        ServiceVerb::IsActive => {
            println!("{}", controller.active_state().await?);
            return Ok(());
        }
        ServiceVerb::Toggle => {
            let state = controller.state().await?;
            if state.is_running() {
                ServiceAction::Stop
            } else {
                ServiceAction::Start
            }
        }
    };

    controller.manage(action).await?;
    println!("Service Status: {}", controller.state().await?);
    Ok(())
}
