//! Shared test doubles: a recording `RemoteServices` and a recording operator.

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use fixloop::edit::{CrossCheckReport, Edit, EditSet, Overall, TestOutcome, TestStatus};
use fixloop::errors::ServiceError;
use fixloop::orchestrator::{Orchestrator, WorkflowSettings};
use fixloop::presenter::ReportSurface;
use fixloop::services::{
    AnalyzeRequest, CrossCheckRequest, FixRequest, FixResult, RemoteServices, RunOutput,
    VisionRequest, VisionResult,
};
use fixloop::status::StatusSignal;
use fixloop::ui::{Notice, NoticeLevel, Operator};

/// A remote call as the services saw it.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Analyze(AnalyzeRequest),
    Apply { code: String, edits: EditSet },
    CrossCheck(CrossCheckRequest),
    Fix(FixRequest),
    Vision(VisionRequest),
    Run(String),
}

impl Call {
    pub fn name(&self) -> &'static str {
        match self {
            Call::Analyze(_) => "analyze",
            Call::Apply { .. } => "apply",
            Call::CrossCheck(_) => "crosscheck",
            Call::Fix(_) => "fix_from_crosscheck",
            Call::Vision(_) => "vision_analyze",
            Call::Run(_) => "run",
        }
    }
}

type Scripted<T> = Mutex<Result<T, String>>;

fn rejected(service: &'static str, message: &str) -> ServiceError {
    ServiceError::Rejected {
        service,
        message: message.to_string(),
    }
}

/// Records every call and answers from scripted responses.
///
/// Apply appends `APPLIED_MARKER` to the code it receives so tests can tell
/// applied text apart from the original.
pub struct MockServices {
    calls: Mutex<Vec<Call>>,
    analyze: Scripted<EditSet>,
    apply: Mutex<Option<String>>,
    cross_check: Scripted<CrossCheckReport>,
    fix: Scripted<FixResult>,
    vision: Scripted<VisionResult>,
    run: Scripted<RunOutput>,
    gate: Option<Arc<Notify>>,
    watched: Option<StatusSignal>,
    statuses: Mutex<Vec<Option<String>>>,
}

pub const APPLIED_MARKER: &str = "# applied\n";

impl Default for MockServices {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            analyze: Mutex::new(Ok(EditSet::default())),
            apply: Mutex::new(None),
            cross_check: Mutex::new(Ok(passing_report())),
            fix: Mutex::new(Ok(FixResult::default())),
            vision: Mutex::new(Ok(VisionResult::default())),
            run: Mutex::new(Ok(RunOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            })),
            gate: None,
            watched: None,
            statuses: Mutex::new(Vec::new()),
        }
    }
}

impl MockServices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_analyze(self, response: Result<EditSet, String>) -> Self {
        *self.analyze.lock().unwrap() = response;
        self
    }

    /// Make apply fail with `message`.
    pub fn failing_apply(self, message: &str) -> Self {
        *self.apply.lock().unwrap() = Some(message.to_string());
        self
    }

    pub fn with_cross_check(self, response: Result<CrossCheckReport, String>) -> Self {
        *self.cross_check.lock().unwrap() = response;
        self
    }

    pub fn with_fix(self, response: Result<FixResult, String>) -> Self {
        *self.fix.lock().unwrap() = response;
        self
    }

    pub fn with_vision(self, response: Result<VisionResult, String>) -> Self {
        *self.vision.lock().unwrap() = response;
        self
    }

    pub fn with_run(self, response: Result<RunOutput, String>) -> Self {
        *self.run.lock().unwrap() = response;
        self
    }

    /// Hold every analyze call until the gate is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Note the status message on display as each call arrives.
    pub fn watching(mut self, status: StatusSignal) -> Self {
        self.watched = Some(status);
        self
    }

    /// Status messages seen by each call, in call order.
    pub fn statuses(&self) -> Vec<Option<String>> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls().iter().map(Call::name).collect()
    }

    fn record(&self, call: Call) {
        if let Some(status) = &self.watched {
            self.statuses.lock().unwrap().push(status.current());
        }
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteServices for MockServices {
    async fn analyze(&self, request: &AnalyzeRequest) -> Result<EditSet, ServiceError> {
        self.record(Call::Analyze(request.clone()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let response = self.analyze.lock().unwrap().clone();
        response.map_err(|m| rejected("analyze", &m))
    }

    async fn apply_edits(&self, code: &str, edits: &EditSet) -> Result<String, ServiceError> {
        self.record(Call::Apply {
            code: code.to_string(),
            edits: edits.clone(),
        });
        match self.apply.lock().unwrap().clone() {
            Some(message) => Err(rejected("apply", &message)),
            None => Ok(format!("{}{}", code, APPLIED_MARKER)),
        }
    }

    async fn cross_check(
        &self,
        request: &CrossCheckRequest,
    ) -> Result<CrossCheckReport, ServiceError> {
        self.record(Call::CrossCheck(request.clone()));
        let response = self.cross_check.lock().unwrap().clone();
        response.map_err(|m| rejected("crosscheck", &m))
    }

    async fn fix_from_cross_check(&self, request: &FixRequest) -> Result<FixResult, ServiceError> {
        self.record(Call::Fix(request.clone()));
        let response = self.fix.lock().unwrap().clone();
        response.map_err(|m| rejected("fix_from_crosscheck", &m))
    }

    async fn vision_analyze(&self, request: &VisionRequest) -> Result<VisionResult, ServiceError> {
        self.record(Call::Vision(request.clone()));
        let response = self.vision.lock().unwrap().clone();
        response.map_err(|m| rejected("vision_analyze", &m))
    }

    async fn run(&self, code: &str) -> Result<RunOutput, ServiceError> {
        self.record(Call::Run(code.to_string()));
        let response = self.run.lock().unwrap().clone();
        response.map_err(|m| rejected("run", &m))
    }
}

/// Records everything the operator would have been shown.
#[derive(Default)]
pub struct RecordingOperator {
    pub notices: Mutex<Vec<Notice>>,
    pub edits: Mutex<Vec<EditSet>>,
    pub run_outputs: Mutex<Vec<RunOutput>>,
    pub reports: Mutex<Vec<ReportSurface>>,
}

impl RecordingOperator {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn messages_at(&self, level: NoticeLevel) -> Vec<String> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .map(|n| n.message)
            .collect()
    }

    pub fn saw(&self, text: &str) -> bool {
        self.notices().iter().any(|n| n.message.contains(text))
    }

    pub fn reports(&self) -> Vec<ReportSurface> {
        self.reports.lock().unwrap().clone()
    }
}

impl Operator for RecordingOperator {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }

    fn show_edits(&self, edits: &EditSet) {
        self.edits.lock().unwrap().push(edits.clone());
    }

    fn show_run_output(&self, output: &RunOutput) {
        self.run_outputs.lock().unwrap().push(output.clone());
    }

    fn show_report(&self, surface: &ReportSurface) {
        self.reports.lock().unwrap().push(surface.clone());
    }
}

pub fn settings() -> WorkflowSettings {
    WorkflowSettings {
        model: "gemini-2.5-pro".to_string(),
        timeout_secs: 60,
        filename: "snippet.py".to_string(),
    }
}

pub fn test_outcome(name: &str, status: TestStatus) -> TestOutcome {
    TestOutcome {
        name: name.to_string(),
        description: format!("checks {}", name),
        status,
        reason: String::new(),
    }
}

pub fn passing_report() -> CrossCheckReport {
    CrossCheckReport::new(
        Overall::Pass,
        "All checks pass.",
        vec![test_outcome("t1", TestStatus::Pass)],
    )
}

pub fn failing_report() -> CrossCheckReport {
    CrossCheckReport::new(
        Overall::Fail,
        "Division by zero is not handled.",
        vec![
            test_outcome("normal input", TestStatus::Pass),
            test_outcome("zero divisor", TestStatus::Fail),
        ],
    )
}

pub fn edit_set(count: usize) -> EditSet {
    EditSet {
        explanation: Some("guard division".to_string()),
        edits: (0..count)
            .map(|i| Edit::new(serde_json::json!({"line": i + 1, "text": "pass"})))
            .collect(),
        ..EditSet::default()
    }
}

pub struct Harness {
    pub services: Arc<MockServices>,
    pub operator: Arc<RecordingOperator>,
    pub status: StatusSignal,
    pub orchestrator: Orchestrator,
}

pub fn harness(services: MockServices, code: &str) -> Harness {
    harness_with_status(services, code, StatusSignal::hidden())
}

/// Like [`harness`], but on a status signal the caller may share.
pub fn harness_with_status(services: MockServices, code: &str, status: StatusSignal) -> Harness {
    let services = Arc::new(services);
    let operator = Arc::new(RecordingOperator::default());
    let orchestrator = Orchestrator::new(
        services.clone(),
        operator.clone(),
        status.clone(),
        code,
        settings(),
    );
    Harness {
        services,
        operator,
        status,
        orchestrator,
    }
}
