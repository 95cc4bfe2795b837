use anyhow::{bail, Result};
use console::style;
use dialoguer::Confirm;
use zerotier_ctl::backend::BackendCli;
use zerotier_ctl::install::ScriptInstaller;
use zerotier_ctl::recovery::{Operator, Recovery};
use zerotier_ctl::service::ServiceController;
use zerotier_ctl::session::Session;

/// Terminal-backed operator: unclassified failures are shown and confirmed
/// interactively; `--yes` answers every prompt affirmatively.
pub(crate) struct ConsoleOperator {
    assume_yes: bool,
}

impl ConsoleOperator {
    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
            return false;
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

impl Operator for ConsoleOperator {
    fn confirm_reinstall(&self, detail: &str) -> bool {
        eprintln!("{} {}", style("error:").red().bold(), detail);
        self.confirm("Try re-installing the backend?")
    }

    fn confirm_disable_duplicate(&self) -> bool {
        eprintln!(
            "{} A duplicate backend service is running at system scope; \
             leaving it enabled can conflict with the managed one.",
            style("warning:").yellow().bold()
        );
        self.confirm("Disable the duplicate service?")
    }

    fn notify(&self, message: &str) {
        println!("{} {}", style("•").cyan(), message);
    }
}

pub(crate) async fn cmd_doctor(session: &Session, yes: bool) -> Result<()> {
    let runner = session.executor();
    let operator = ConsoleOperator { assume_yes: yes };
    let installer = ScriptInstaller::new(runner);
    let service = ServiceController::new(runner);
    let backend = BackendCli::new(runner);
    let recovery = Recovery::new(service, backend, &installer, &operator);

    // A root-level install left behind by another package manager competes
    // with the managed unit; offer to disable it before diagnosing.
    if let Err(err) = recovery.disable_duplicate_unit().await {
        tracing::warn!(error = %err, "Duplicate-unit check failed");
    }

    let report = recovery.run().await;

    let path: Vec<String> = report.transitions.iter().map(|s| s.to_string()).collect();
    println!("Diagnosis path: {}", path.join(" → "));

    if report.resolved() {
        println!("{} Backend is usable.", style("✓").green());
        Ok(())
    } else {
        bail!(
            "{}",
            report
                .failure
                .unwrap_or_else(|| "recovery could not repair the backend".to_string())
        )
    }
}
