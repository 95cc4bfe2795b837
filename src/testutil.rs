//! Scripted command runner for exercising the control layers without
//! spawning real processes.

use crate::error::{BackendError, Result};
use crate::executor::{CommandResult, CommandRunner, CommandSpec};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

pub(crate) struct MockRunner {
    script: Mutex<VecDeque<Result<CommandResult>>>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn push_ok(&self, stdout: &str) {
        self.script.lock().unwrap().push_back(Ok(CommandResult {
            exit_code: 0,
            stdout: stdout.to_string(),
            stderr: String::new(),
        }));
    }

    pub fn push_fail(&self, code: i32, output: &str) {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(BackendError::Process {
                code,
                output: output.to_string(),
            }));
    }

    pub fn push_err(&self, err: BackendError) {
        self.script.lock().unwrap().push_back(Err(err));
    }

    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    pub fn spawn_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, spec: CommandSpec) -> impl Future<Output = Result<CommandResult>> + Send {
        let response = self.script.lock().unwrap().pop_front();
        self.calls.lock().unwrap().push(spec.clone());
        async move {
            match response {
                Some(response) => response,
                None => panic!("unexpected command: {:?}", spec.argv),
            }
        }
    }
}
