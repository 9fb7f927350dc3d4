//! The workflow engine.
//!
//! Each public action starts one [`WorkflowRun`] and drives the chain of
//! remote calls that action implies:
//!
//! ```text
//! analyze ──(edits)──▶ apply ──▶ cross-check
//!    └──(no edits)─────────────▶ cross-check
//! fix ──────────────────────────▶ cross-check
//! vision analyze ───────────────▶ cross-check
//! submit: run ─▶ vision ─(edits)─▶ apply ──▶ cross-check
//! run
//! ```
//!
//! Remote failures are reported to the operator and recorded in the
//! [`RunSummary`]; only local problems (overlap, no report, bad edit text)
//! come back as `Err`.

use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use super::run::{RunSlot, RunSummary, Step, Verification, WorkflowRun};
use super::source::{SourceText, lock};
use crate::capture::ImageInput;
use crate::edit::{CrossCheckReport, EditSet};
use crate::errors::{ServiceError, WorkflowError};
use crate::presenter::{Presenter, ReportSurface};
use crate::services::{
    AnalyzeRequest, CrossCheckRequest, FixRequest, RemoteServices, VisionRequest,
};
use crate::session::SessionStore;
use crate::status::StatusSignal;
use crate::ui::{Notice, Operator};

pub const NO_CHANGES_MESSAGE: &str = "No changes suggested";

/// Values forwarded with model-backed requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub model: String,
    pub timeout_secs: u64,
    pub filename: String,
}

pub struct Orchestrator {
    services: Arc<dyn RemoteServices>,
    operator: Arc<dyn Operator>,
    status: StatusSignal,
    source: SourceText,
    presenter: Mutex<Presenter>,
    retained: Mutex<Option<CrossCheckReport>>,
    settings: WorkflowSettings,
    slot: RunSlot,
    session: Option<SessionStore>,
}

impl Orchestrator {
    pub fn new(
        services: Arc<dyn RemoteServices>,
        operator: Arc<dyn Operator>,
        status: StatusSignal,
        code: impl Into<String>,
        settings: WorkflowSettings,
    ) -> Self {
        Self {
            services,
            operator,
            status,
            source: SourceText::new(code),
            presenter: Mutex::new(Presenter::new()),
            retained: Mutex::new(None),
            settings,
            slot: RunSlot::new(),
            session: None,
        }
    }

    /// Mirror source text and reports to `store`. A saved report is restored
    /// only when it was produced for the current source text.
    pub fn with_session(mut self, store: SessionStore) -> Self {
        let code = self.source.snapshot();
        let (report, surface) = store.load().take_report_for(&code);
        if report.is_none() && surface.is_none() {
            debug!(path = %store.path().display(), "no saved report for this source");
        }
        if let Some(report) = report {
            self = self.with_retained_report(report);
        }
        if let Some(surface) = surface {
            self = self.with_surface(surface);
        }
        store.save_code(&code);
        self.source = SourceText::new(code).with_session(store.clone());
        self.session = Some(store);
        self
    }

    pub fn with_retained_report(self, report: CrossCheckReport) -> Self {
        *lock(&self.retained) = Some(report);
        self
    }

    pub fn with_surface(self, surface: ReportSurface) -> Self {
        *lock(&self.presenter) = Presenter::from_surface(surface);
        self
    }

    pub fn source(&self) -> String {
        self.source.snapshot()
    }

    pub fn retained_report(&self) -> Option<CrossCheckReport> {
        lock(&self.retained).clone()
    }

    pub fn surface(&self) -> ReportSurface {
        lock(&self.presenter).surface().clone()
    }

    /// Change the displayed report panel in place.
    pub fn edit_surface(&self, edit: impl FnOnce(&mut ReportSurface)) {
        edit(lock(&self.presenter).surface_mut());
    }

    /// Forget the retained report so the displayed panel is used instead.
    pub fn forget_report(&self) {
        lock(&self.retained).take();
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn is_busy(&self) -> bool {
        self.slot.is_busy()
    }

    fn begin(&self, action: Step) -> Result<WorkflowRun, WorkflowError> {
        let run = WorkflowRun::begin(action, self.source.snapshot(), &self.slot, &self.status)?;
        info!(run = %run.id(), %action, "workflow run started");
        Ok(run)
    }

    fn end(&self, run: WorkflowRun) -> RunSummary {
        let changed = run.initial() != self.source.snapshot();
        debug!(run = %run.id(), changed, "source after run");
        let summary = run.finish();
        info!(
            run = %summary.id,
            action = %summary.action,
            failed = summary.failed(),
            verification = ?summary.verification,
            "workflow run finished"
        );
        summary
    }

    /// Ask for edits, apply them if there are any, then cross-check.
    pub async fn analyze(&self) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::Analyze)?;
        if let Some(edits) = self.request_analyze(&mut run).await {
            if edits.is_empty() {
                debug!(run = %run.id(), "no edits proposed");
                self.request_cross_check(&mut run).await;
            } else if self.request_apply(&mut run, &edits).await {
                self.request_cross_check(&mut run).await;
            }
        }
        Ok(self.end(run))
    }

    /// Apply an edit set, then cross-check the result.
    pub async fn apply(&self, edits: &EditSet) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::ApplyEdits)?;
        if self.request_apply(&mut run, edits).await {
            self.request_cross_check(&mut run).await;
        }
        Ok(self.end(run))
    }

    /// Apply operator-supplied edit text. Invalid text fails locally.
    pub async fn apply_text(&self, text: &str) -> Result<RunSummary, WorkflowError> {
        let edits = EditSet::parse(text)?;
        self.apply(&edits).await
    }

    pub async fn cross_check(&self) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::CrossCheck)?;
        self.request_cross_check(&mut run).await;
        Ok(self.end(run))
    }

    /// Repair the code against the last report, then cross-check again.
    ///
    /// The retained report is used when there is one; otherwise the report
    /// is read back from the open report panel.
    pub async fn fix_from_cross_check(&self) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::FixFromCrossCheck)?;
        let report = self.report_for_fix().ok_or(WorkflowError::NoReport)?;

        run.enter(Step::FixFromCrossCheck);
        let request = FixRequest {
            code: self.source.snapshot(),
            crosscheck: report,
            model: self.settings.model.clone(),
            timeout: self.settings.timeout_secs,
        };
        match self.services.fix_from_cross_check(&request).await {
            Ok(result) => {
                if let Some(code) = result.code {
                    self.replace_source(&mut run, code);
                }
                if let Some(edits) = result.edits.filter(|e| !e.is_empty()) {
                    self.operator.show_edits(&edits);
                }
                run.completed(Step::FixFromCrossCheck);
                self.request_cross_check(&mut run).await;
            }
            Err(e) => self.halt(&mut run, Step::FixFromCrossCheck, e),
        }
        Ok(self.end(run))
    }

    /// Compare the code against a screenshot, take the returned code, then
    /// cross-check.
    pub async fn vision_analyze(
        &self,
        prompt: &str,
        image: Option<ImageInput>,
    ) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::VisionAnalyze)?;
        run.attach_image(image);
        run.enter(Step::VisionAnalyze);
        match self.services.vision_analyze(&self.vision_request(&run, prompt)).await {
            Ok(result) => {
                if let Some(code) = result.code {
                    self.replace_source(&mut run, code);
                }
                if !result.edits.is_empty() {
                    self.operator.show_edits(&result.edits);
                }
                run.completed(Step::VisionAnalyze);
                self.request_cross_check(&mut run).await;
            }
            Err(e) => self.halt(&mut run, Step::VisionAnalyze, e),
        }
        Ok(self.end(run))
    }

    /// Run the code, then ask for vision edits and apply them.
    ///
    /// The run outcome only updates the status message and never stops the
    /// submission. Without edits the run ends with no cross-check.
    pub async fn vision_submit(
        &self,
        prompt: &str,
        image: Option<ImageInput>,
    ) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::VisionSubmit)?;
        run.attach_image(image);

        run.enter(Step::Run);
        let run_status = match self.services.run(&self.source.snapshot()).await {
            Ok(output) => {
                if output.exit_code == 0 {
                    run.completed(Step::Run);
                } else {
                    run.tolerated(Step::Run, format!("exit code {}", output.exit_code));
                }
                format!("Run exited with code {}", output.exit_code)
            }
            Err(e) => {
                warn!(run = %run.id(), error = %e, "pre-submit run failed; continuing");
                run.tolerated(Step::Run, e.to_string());
                format!("Run failed: {}", e)
            }
        };

        run.enter(Step::VisionAnalyze);
        run.show_status(format!(
            "{}. {}",
            run_status,
            Step::VisionAnalyze.status_message()
        ));
        match self.services.vision_analyze(&self.vision_request(&run, prompt)).await {
            Ok(result) if result.edits.is_empty() => {
                run.completed(Step::VisionAnalyze);
                run.show_status(NO_CHANGES_MESSAGE);
                self.operator.notify(Notice::info(NO_CHANGES_MESSAGE));
            }
            Ok(result) => {
                run.completed(Step::VisionAnalyze);
                if self.request_apply(&mut run, &result.edits).await {
                    self.request_cross_check(&mut run).await;
                }
            }
            Err(e) => self.halt(&mut run, Step::VisionAnalyze, e),
        }
        Ok(self.end(run))
    }

    /// Execute the code and show what it printed.
    pub async fn run_code(&self) -> Result<RunSummary, WorkflowError> {
        let mut run = self.begin(Step::Run)?;
        run.enter(Step::Run);
        match self.services.run(&self.source.snapshot()).await {
            Ok(output) => {
                run.rendering();
                self.operator.show_run_output(&output);
                run.completed(Step::Run);
            }
            Err(e) => self.halt(&mut run, Step::Run, e),
        }
        Ok(self.end(run))
    }

    fn vision_request(&self, run: &WorkflowRun, prompt: &str) -> VisionRequest {
        VisionRequest {
            code: self.source.snapshot(),
            prompt: prompt.to_string(),
            image: run.image().cloned(),
            model: self.settings.model.clone(),
            timeout: self.settings.timeout_secs,
        }
    }

    fn report_for_fix(&self) -> Option<CrossCheckReport> {
        if let Some(report) = lock(&self.retained).clone() {
            return Some(report);
        }
        let presenter = lock(&self.presenter);
        presenter
            .surface()
            .is_open()
            .then(|| presenter.extract())
    }

    fn replace_source(&self, run: &mut WorkflowRun, code: String) {
        self.source.replace(code);
        run.mark_mutated();
    }

    fn halt(&self, run: &mut WorkflowRun, step: Step, error: ServiceError) {
        warn!(run = %run.id(), %step, error = %error, "step failed; halting run");
        self.operator.notify(Notice::error(error.to_string()));
        run.failed(step, error.to_string());
    }

    async fn request_analyze(&self, run: &mut WorkflowRun) -> Option<EditSet> {
        run.enter(Step::Analyze);
        let request = AnalyzeRequest {
            code: self.source.snapshot(),
            filename: self.settings.filename.clone(),
            model: self.settings.model.clone(),
            timeout: self.settings.timeout_secs,
        };
        match self.services.analyze(&request).await {
            Ok(edits) => {
                debug!(run = %run.id(), edits = edits.len(), "analysis returned");
                if let Some(explanation) = edits.explanation.as_deref().filter(|e| !e.is_empty()) {
                    self.operator.notify(Notice::info(explanation));
                }
                run.completed(Step::Analyze);
                Some(edits)
            }
            Err(e) => {
                self.halt(run, Step::Analyze, e);
                None
            }
        }
    }

    /// Returns whether the edits were applied.
    async fn request_apply(&self, run: &mut WorkflowRun, edits: &EditSet) -> bool {
        run.enter(Step::ApplyEdits);
        let code = self.source.snapshot();
        match self.services.apply_edits(&code, edits).await {
            Ok(new_code) => {
                self.replace_source(run, new_code);
                run.completed(Step::ApplyEdits);
                true
            }
            Err(e) => {
                self.halt(run, Step::ApplyEdits, e);
                false
            }
        }
    }

    /// Cross-check the current source. Failure never halts the run and leaves
    /// the source untouched.
    async fn request_cross_check(&self, run: &mut WorkflowRun) {
        run.enter(Step::CrossCheck);
        let request = CrossCheckRequest {
            code: self.source.snapshot(),
            model: self.settings.model.clone(),
            timeout: self.settings.timeout_secs,
        };
        match self.services.cross_check(&request).await {
            Ok(report) => {
                run.rendering();
                let surface = {
                    let mut presenter = lock(&self.presenter);
                    presenter.render(&report);
                    presenter.surface().clone()
                };
                self.operator.show_report(&surface);
                if let Some(store) = &self.session {
                    store.save_report(&report, &surface, &request.code);
                }
                run.set_verification(Verification::Verified(report.overall));
                run.completed(Step::CrossCheck);
                *lock(&self.retained) = Some(report);
            }
            Err(e) => {
                warn!(run = %run.id(), error = %e, "cross-check failed");
                let message = if run.mutated() {
                    format!("Verification failed: {}", e)
                } else {
                    format!("Cross-check failed: {}", e)
                };
                self.operator.notify(Notice::warning(message));
                run.set_verification(Verification::Failed);
                run.tolerated(Step::CrossCheck, e.to_string());
            }
        }
    }
}
