use crate::backend::BackendCli;
use crate::error::BackendError;
use crate::executor::CommandRunner;
use crate::install::InstallProcedure;
use crate::service::{ServiceAction, ServiceController, ServiceState};
use std::time::Duration;
use tracing::{error, info, warn};

/// Reinstall attempts allowed within one recovery run before giving up.
pub const DEFAULT_MAX_REINSTALLS: u32 = 3;

/// `systemctl` exit status for a unit that could not be loaded. Benign
/// during pre-reinstall cleanup: there is simply nothing to stop.
const UNIT_NOT_LOADED: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Probing,
    StartingService,
    Reinstalling,
    Resolved,
    Fatal,
}

impl std::fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Probing => "probing",
            Self::StartingService => "starting-service",
            Self::Reinstalling => "reinstalling",
            Self::Resolved => "resolved",
            Self::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// What one recovery run did, sufficient to reconstruct the diagnosis path.
#[derive(Debug)]
pub struct RecoveryReport {
    pub outcome: RecoveryState,
    pub transitions: Vec<RecoveryState>,
    pub reinstall_attempts: u32,
    /// Detail for a `Fatal` outcome: what was attempted and what failed.
    pub failure: Option<String>,
}

impl RecoveryReport {
    pub fn resolved(&self) -> bool {
        self.outcome == RecoveryState::Resolved
    }
}

/// Decisions and messages that need a human. The CLI front-end backs this
/// with terminal prompts; tests script it.
pub trait Operator {
    /// An unclassified probe failure: reinstall, or stop here?
    fn confirm_reinstall(&self, detail: &str) -> bool;
    /// A competing system-scope unit is running: disable it?
    fn confirm_disable_duplicate(&self) -> bool;
    fn notify(&self, message: &str);
}

/// Startup diagnosis and self-repair. The only component that sequences
/// multi-step remediation; every step logs its outcome.
pub struct Recovery<'a, R, I, O> {
    service: ServiceController<'a, R>,
    backend: BackendCli<'a, R>,
    installer: &'a I,
    operator: &'a O,
    max_reinstalls: u32,
    backoff_base: Duration,
}

impl<'a, R, I, O> Recovery<'a, R, I, O>
where
    R: CommandRunner,
    I: InstallProcedure,
    O: Operator,
{
    pub fn new(
        service: ServiceController<'a, R>,
        backend: BackendCli<'a, R>,
        installer: &'a I,
        operator: &'a O,
    ) -> Self {
        Self {
            service,
            backend,
            installer,
            operator,
            max_reinstalls: DEFAULT_MAX_REINSTALLS,
            backoff_base: Duration::from_secs(1),
        }
    }

    pub fn with_max_reinstalls(mut self, max: u32) -> Self {
        self.max_reinstalls = max;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    /// Drive the state machine from `Probing` to a terminal state.
    pub async fn run(&self) -> RecoveryReport {
        let mut state = RecoveryState::Probing;
        let mut transitions = vec![state];
        let mut attempts = 0u32;
        let mut failure: Option<String> = None;

        loop {
            let next = match state {
                RecoveryState::Probing => self.step_probe(&mut failure).await,
                RecoveryState::StartingService => self.step_start_service().await,
                RecoveryState::Reinstalling => {
                    attempts += 1;
                    if attempts > self.max_reinstalls {
                        let detail = format!(
                            "backend still unusable after {} reinstall attempts",
                            self.max_reinstalls
                        );
                        error!(attempts = self.max_reinstalls, "Giving up on reinstalling");
                        self.operator.notify(&detail);
                        failure = Some(detail);
                        RecoveryState::Fatal
                    } else {
                        if attempts > 1 {
                            let delay = self.backoff_base * 2u32.pow(attempts - 2);
                            info!(delay = ?delay, "Backing off before the next reinstall attempt");
                            tokio::time::sleep(delay).await;
                        }
                        self.step_reinstall(attempts, &mut failure).await
                    }
                }
                RecoveryState::Resolved | RecoveryState::Fatal => break,
            };
            state = next;
            transitions.push(state);
        }

        let reinstall_attempts = attempts.min(self.max_reinstalls);
        info!(outcome = %state, reinstalls = reinstall_attempts, "Recovery finished");
        RecoveryReport {
            outcome: state,
            transitions,
            reinstall_attempts,
            failure,
        }
    }

    /// Probe the backend with a harmless listing command and classify the
    /// failure into the next state.
    async fn step_probe(&self, failure: &mut Option<String>) -> RecoveryState {
        info!("Probing backend");
        match self.backend.run(&["listnetworks"]).await {
            Ok(_) => {
                info!("Probe succeeded, backend is usable");
                RecoveryState::Resolved
            }
            Err(err) => {
                warn!(error = %err, "Probe failed");
                self.classify_probe_failure(err, failure)
            }
        }
    }

    fn classify_probe_failure(
        &self,
        err: BackendError,
        failure: &mut Option<String>,
    ) -> RecoveryState {
        match &err {
            BackendError::NoAuthorization { .. } => {
                self.operator
                    .notify("This user doesn't have access to the backend. Re-installing it.");
                RecoveryState::Reinstalling
            }
            BackendError::BinaryMissing { .. } | BackendError::DirectoryMissing(_) => {
                self.operator
                    .notify("The backend isn't installed. Re-installing it.");
                RecoveryState::Reinstalling
            }
            BackendError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                self.operator
                    .notify("The backend isn't installed. Re-installing it.");
                RecoveryState::Reinstalling
            }
            BackendError::ServiceUnavailable { .. } => {
                self.operator
                    .notify("The backend service isn't running. Starting it.");
                RecoveryState::StartingService
            }
            _ => {
                let mut detail = format!("backend probe failed: {}", err);
                if let Some(output) = err.output() {
                    if !output.trim().is_empty() {
                        detail = format!("{}: {}", detail, output.trim());
                    }
                }
                if self.operator.confirm_reinstall(&detail) {
                    info!("Operator elected to reinstall after an unclassified failure");
                    RecoveryState::Reinstalling
                } else {
                    *failure = Some(detail);
                    RecoveryState::Fatal
                }
            }
        }
    }

    /// Start the unit, confirm it came up, then re-validate with a probe.
    async fn step_start_service(&self) -> RecoveryState {
        info!(unit = %self.service.unit(), "Starting backend service");
        if let Err(err) = self.service.manage(ServiceAction::Start).await {
            warn!(error = %err, "Service start failed");
        }

        match self.service.active_state().await {
            Ok(state @ (ServiceState::Inactive | ServiceState::Failed)) => {
                warn!(state = %state, "Unit did not come up, falling back to reinstall");
                self.operator
                    .notify("Failed to start the backend service. Re-installing it.");
                return RecoveryState::Reinstalling;
            }
            Ok(state) => info!(state = %state, "Unit reported state after start"),
            Err(err) => warn!(error = %err, "Could not query unit state after start"),
        }

        match self.backend.run(&["listnetworks"]).await {
            Ok(_) => {
                info!("Backend usable after service start");
                self.operator.notify("Successfully started the backend service.");
                RecoveryState::Resolved
            }
            Err(err) => {
                warn!(error = %err, "Probe still failing after service start, reinstalling");
                RecoveryState::Reinstalling
            }
        }
    }

    /// Stop/disable the existing unit best-effort, run the external install
    /// procedure, then bring the unit back up and re-validate.
    async fn step_reinstall(&self, attempt: u32, failure: &mut Option<String>) -> RecoveryState {
        info!(attempt = attempt, max = self.max_reinstalls, "Re-installing backend");

        self.cleanup_unit(ServiceAction::Stop).await;
        self.cleanup_unit(ServiceAction::Disable).await;

        if let Err(err) = self.installer.install().await {
            let detail = format!("backend reinstall failed: {}", err);
            error!(error = %err, "Install procedure failed");
            self.operator.notify(&format!(
                "Failed to re-install the backend: {}. \
                 Delete the backend data directory and re-run the installer.",
                err
            ));
            *failure = Some(detail);
            return RecoveryState::Fatal;
        }

        for action in [ServiceAction::Enable, ServiceAction::Start] {
            if let Err(err) = self.service.manage(action).await {
                warn!(action = %action, error = %err, "Post-install service action failed");
            }
        }

        info!("Reinstall finished, re-validating");
        self.operator
            .notify("Successfully re-installed the backend.");
        RecoveryState::Probing
    }

    /// Pre-reinstall cleanup: an unloadable unit is not an error, anything
    /// else is logged and skipped rather than aborting the reinstall.
    async fn cleanup_unit(&self, action: ServiceAction) {
        match self.service.manage(action).await {
            Ok(_) => {}
            Err(err) if err.exit_code() == Some(UNIT_NOT_LOADED) => {
                info!(action = %action, "Unit could not be loaded, nothing to clean up");
            }
            Err(err) => {
                warn!(action = %action, error = %err,
                      "Cleanup action failed, proceeding with reinstall anyway");
            }
        }
    }

    /// Detect a competing system-scope copy of the unit and, with operator
    /// consent, disable it. Returns whether a duplicate was disabled.
    pub async fn disable_duplicate_unit(&self) -> crate::error::Result<bool> {
        let state = self.service.system_state().await?;
        if !state.is_running() {
            return Ok(false);
        }
        info!(unit = %self.service.unit(), "Duplicate system-scope unit is running");
        if !self.operator.confirm_disable_duplicate() {
            return Ok(false);
        }
        self.service.manage_system(ServiceAction::Disable).await?;
        self.service.manage_system(ServiceAction::Stop).await?;
        self.operator
            .notify("The duplicate backend service has been disabled.");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::testutil::MockRunner;
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::Mutex;

    struct MockInstall {
        script: Mutex<VecDeque<Result<()>>>,
        runs: Mutex<u32>,
    }

    impl MockInstall {
        fn new() -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                runs: Mutex::new(0),
            }
        }

        fn push_ok(&self) {
            self.script.lock().unwrap().push_back(Ok(()));
        }

        fn push_fail(&self, message: &str) {
            self.script.lock().unwrap().push_back(Err(
                std::io::Error::other(message.to_string()).into(),
            ));
        }

        fn runs(&self) -> u32 {
            *self.runs.lock().unwrap()
        }
    }

    impl InstallProcedure for MockInstall {
        fn install(&self) -> impl Future<Output = Result<()>> + Send {
            *self.runs.lock().unwrap() += 1;
            let outcome = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected install invocation");
            async move { outcome }
        }
    }

    struct ScriptedOperator {
        accept_reinstall: bool,
        notices: Mutex<Vec<String>>,
    }

    impl ScriptedOperator {
        fn new(accept_reinstall: bool) -> Self {
            Self {
                accept_reinstall,
                notices: Mutex::new(Vec::new()),
            }
        }

        fn notices(&self) -> Vec<String> {
            self.notices.lock().unwrap().clone()
        }
    }

    impl Operator for ScriptedOperator {
        fn confirm_reinstall(&self, _detail: &str) -> bool {
            self.accept_reinstall
        }

        fn confirm_disable_duplicate(&self) -> bool {
            true
        }

        fn notify(&self, message: &str) {
            self.notices.lock().unwrap().push(message.to_string());
        }
    }

    fn recovery<'a>(
        runner: &'a MockRunner,
        installer: &'a MockInstall,
        operator: &'a ScriptedOperator,
    ) -> Recovery<'a, MockRunner, MockInstall, ScriptedOperator> {
        let service = ServiceController::with_unit(runner, "zerotier-one", "/");
        let backend = BackendCli::with_paths(runner, "/", "/nonexistent/settings.json");
        Recovery::new(service, backend, installer, operator)
            .with_backoff_base(Duration::ZERO)
    }

    // Scripted happy reinstall: stop/disable at user scope, install, enable,
    // start, then a successful probe.
    fn script_reinstall_then_ok(runner: &MockRunner, installer: &MockInstall) {
        runner.push_ok(""); // stop
        runner.push_ok(""); // disable
        installer.push_ok();
        runner.push_ok(""); // enable
        runner.push_ok(""); // start
        runner.push_ok("200 listnetworks\n"); // probe
    }

    #[tokio::test]
    async fn probe_success_resolves_immediately() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_ok("200 listnetworks\n");

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(
            report.transitions,
            [RecoveryState::Probing, RecoveryState::Resolved]
        );
        assert_eq!(report.reinstall_attempts, 0);
        assert_eq!(installer.runs(), 0);
    }

    #[tokio::test]
    async fn no_authorization_probe_reinstalls() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(2, "missing authtoken.secret");
        script_reinstall_then_ok(&runner, &installer);

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(
            report.transitions,
            [
                RecoveryState::Probing,
                RecoveryState::Reinstalling,
                RecoveryState::Probing,
                RecoveryState::Resolved
            ]
        );
        assert_eq!(report.reinstall_attempts, 1);
        assert_eq!(installer.runs(), 1);
    }

    #[tokio::test]
    async fn missing_data_directory_reinstalls() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_err(BackendError::DirectoryMissing("/home/u/.zerotier-one".into()));
        script_reinstall_then_ok(&runner, &installer);

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(report.transitions[1], RecoveryState::Reinstalling);
        assert_eq!(installer.runs(), 1);
    }

    #[tokio::test]
    async fn service_down_probe_starts_service() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(1, "cannot connect to service");
        runner.push_ok(""); // start (user scope)
        runner.push_ok("active\n"); // is-active
        runner.push_ok("200 listnetworks\n"); // re-probe

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(
            report.transitions,
            [
                RecoveryState::Probing,
                RecoveryState::StartingService,
                RecoveryState::Resolved
            ]
        );
        assert_eq!(installer.runs(), 0);
    }

    #[tokio::test]
    async fn failed_unit_after_start_falls_back_to_reinstall() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(1, "cannot connect to service");
        runner.push_ok(""); // start
        runner.push_ok("failed\n"); // is-active reports failed
        script_reinstall_then_ok(&runner, &installer);

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(
            report.transitions,
            [
                RecoveryState::Probing,
                RecoveryState::StartingService,
                RecoveryState::Reinstalling,
                RecoveryState::Probing,
                RecoveryState::Resolved
            ]
        );
        assert_eq!(installer.runs(), 1);
    }

    #[tokio::test]
    async fn missing_binary_end_to_end_with_benign_cleanup_failures() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(127, "sh: ./zerotier-cli: not found");
        // stop: both tiers fail, system tier with the benign "not loaded" code
        runner.push_fail(1, "Failed to connect to user systemd");
        runner.push_fail(5, "Unit zerotier-one.service could not be loaded.");
        // disable: same shape
        runner.push_fail(1, "Failed to connect to user systemd");
        runner.push_fail(5, "Unit zerotier-one.service could not be loaded.");
        installer.push_ok();
        runner.push_ok(""); // enable
        runner.push_ok(""); // start
        runner.push_ok("200 listnetworks\n"); // probe succeeds now

        let report = recovery(&runner, &installer, &operator).run().await;
        assert!(report.resolved());
        assert_eq!(
            report.transitions,
            [
                RecoveryState::Probing,
                RecoveryState::Reinstalling,
                RecoveryState::Probing,
                RecoveryState::Resolved
            ]
        );
        assert_eq!(report.reinstall_attempts, 1);
        assert_eq!(installer.runs(), 1);
    }

    #[tokio::test]
    async fn unclassified_failure_stops_when_operator_declines() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(86, "unexpected internal error");

        let report = recovery(&runner, &installer, &operator).run().await;
        assert_eq!(report.outcome, RecoveryState::Fatal);
        assert_eq!(
            report.transitions,
            [RecoveryState::Probing, RecoveryState::Fatal]
        );
        let failure = report.failure.expect("fatal detail");
        assert!(failure.contains("unexpected internal error"));
        assert_eq!(installer.runs(), 0);
    }

    #[tokio::test]
    async fn unclassified_failure_reinstalls_when_operator_accepts() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(true);
        runner.push_fail(86, "unexpected internal error");
        runner.push_ok(""); // stop
        runner.push_ok(""); // disable
        installer.push_fail("download unreachable");

        let report = recovery(&runner, &installer, &operator).run().await;
        assert_eq!(report.outcome, RecoveryState::Fatal);
        assert_eq!(
            report.transitions,
            [
                RecoveryState::Probing,
                RecoveryState::Reinstalling,
                RecoveryState::Fatal
            ]
        );
        assert!(report.failure.unwrap().contains("reinstall failed"));
        assert!(operator
            .notices()
            .iter()
            .any(|n| n.contains("Failed to re-install")));
    }

    #[tokio::test]
    async fn reinstall_attempts_are_bounded() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        // Two full reinstall rounds that still leave the backend broken.
        runner.push_fail(2, "missing authtoken.secret");
        for _ in 0..2 {
            runner.push_ok(""); // stop
            runner.push_ok(""); // disable
            installer.push_ok();
            runner.push_ok(""); // enable
            runner.push_ok(""); // start
            runner.push_fail(2, "missing authtoken.secret"); // probe again
        }

        let report = recovery(&runner, &installer, &operator)
            .with_max_reinstalls(2)
            .run()
            .await;
        assert_eq!(report.outcome, RecoveryState::Fatal);
        assert_eq!(report.reinstall_attempts, 2);
        assert_eq!(installer.runs(), 2);
        assert!(report.failure.unwrap().contains("after 2 reinstall attempts"));
    }

    #[tokio::test]
    async fn duplicate_unit_is_disabled_with_consent() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_ok("active\n"); // system is-active
        runner.push_ok(""); // system disable
        runner.push_ok(""); // system stop

        let engine = recovery(&runner, &installer, &operator);
        assert!(engine.disable_duplicate_unit().await.unwrap());

        let calls = runner.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.privileged));
        assert_eq!(calls[1].argv, ["systemctl", "disable", "zerotier-one"]);
        assert_eq!(calls[2].argv, ["systemctl", "stop", "zerotier-one"]);
    }

    #[tokio::test]
    async fn no_duplicate_when_system_unit_is_inactive() {
        let runner = MockRunner::new();
        let installer = MockInstall::new();
        let operator = ScriptedOperator::new(false);
        runner.push_fail(3, "inactive\n");

        let engine = recovery(&runner, &installer, &operator);
        assert!(!engine.disable_duplicate_unit().await.unwrap());
        assert_eq!(runner.spawn_count(), 1);
    }
}
