//! The observe → prompt → validate → execute loop.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::actions::{self, strip_code_fence};
use crate::brain::{Brain, LanguageModel, build_prompt};
use crate::chunk::chunk_text;
use crate::config::{AgentConfig, BrowserConfig};
use crate::dom::PageStateExtractor;
use crate::hands::{self, ChromePage, PageHandle};
use crate::types::{
    ActionHistory, AgentEvent, Goal, PageSnapshot, SessionEvent, SessionId, SessionReport,
    SessionStatus, StepResult,
};

/// Everything one run owns. Dropped when the run returns.
#[derive(Debug)]
struct Session {
    id: SessionId,
    goal: Goal,
    history: ActionHistory,
    snapshot: PageSnapshot,
    step: usize,
}

impl Session {
    fn new(id: SessionId, goal: Goal) -> Self {
        Self {
            id,
            goal,
            history: ActionHistory::new(),
            snapshot: PageSnapshot::default(),
            step: 0,
        }
    }
}

/// Drives a browser toward a goal, one model-chosen step at a time.
///
/// Holds no per-session state, so one instance serves any number of
/// concurrent sessions.
pub struct AgentLoop<M> {
    brain: Brain<M>,
    extractor: PageStateExtractor,
    config: AgentConfig,
    events: Option<broadcast::Sender<SessionEvent>>,
}

impl<M: LanguageModel> AgentLoop<M> {
    pub fn new(brain: Brain<M>, config: AgentConfig) -> Self {
        Self {
            brain,
            extractor: PageStateExtractor::from_config(&config),
            config,
            events: None,
        }
    }

    /// Publishes progress on `events` as sessions run. Every event is
    /// stamped with its session's id; subscribers filter on it.
    pub fn with_events(mut self, events: broadcast::Sender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Launches Chrome and runs one session on it.
    pub async fn run_in_chrome(
        &self,
        browser: &BrowserConfig,
        session: SessionId,
        goal: Goal,
    ) -> SessionReport {
        match ChromePage::launch(browser).await {
            Ok(page) => self.run_as(session, page, goal).await,
            Err(e) => {
                warn!("browser launch failed: {}", e);
                let report = SessionReport {
                    status: SessionStatus::BrowserError(e.to_string()),
                    history: ActionHistory::new(),
                };
                self.emit(
                    &session,
                    AgentEvent::Finished {
                        status: report.status_text(),
                        transcript: String::new(),
                    },
                );
                report
            }
        }
    }

    /// Runs one session on `page` under a fresh id.
    pub async fn run<P: PageHandle>(&self, page: P, goal: Goal) -> SessionReport {
        self.run_as(SessionId::random(), page, goal).await
    }

    /// Runs one session on `page` and closes it before returning.
    ///
    /// The page is owned by this future. If the future is dropped early the
    /// page is dropped with it, so its `Drop` must release the browser.
    pub async fn run_as<P: PageHandle>(
        &self,
        id: SessionId,
        mut page: P,
        goal: Goal,
    ) -> SessionReport {
        info!(session = %id, goal = %goal, "session started");
        self.emit(
            &id,
            AgentEvent::SessionStarted {
                goal: goal.to_string(),
            },
        );

        let mut session = Session::new(id, goal);
        let status = self.drive(&mut page, &mut session).await;

        if let Err(e) = page.close().await {
            warn!("closing browser failed: {}", e);
        }

        info!(steps = session.step, status = %status, "session finished");
        let report = SessionReport {
            status,
            history: session.history,
        };
        self.emit(
            &session.id,
            AgentEvent::Finished {
                status: report.status_text(),
                transcript: report.transcript(),
            },
        );
        report
    }

    async fn drive<P: PageHandle>(&self, page: &mut P, session: &mut Session) -> SessionStatus {
        if let Err(e) = self.open(page, session).await {
            warn!("initial page load failed: {}", e);
            return SessionStatus::BrowserError(e.to_string());
        }

        for step in 1..=self.config.max_steps {
            session.step = step;
            let status = match self.step(page, session).await {
                StepResult::Continue(snapshot) => {
                    session.snapshot = snapshot;
                    continue;
                }
                StepResult::Done(reply) => SessionStatus::Done(reply),
                StepResult::EmptyReply => SessionStatus::EmptyOutput,
                StepResult::Rejected(reason) => SessionStatus::Rejected(reason),
                StepResult::ExecutionError(detail) => SessionStatus::ExecutionError { step, detail },
                StepResult::ModelError(detail) => SessionStatus::ModelError { step, detail },
                StepResult::BrowserError(detail) => SessionStatus::BrowserError(detail),
            };
            return status;
        }

        info!(max_steps = self.config.max_steps, "step budget exhausted");
        SessionStatus::MaxStepsReached
    }

    async fn open<P: PageHandle>(
        &self,
        page: &mut P,
        session: &mut Session,
    ) -> Result<(), crate::error::BrowserError> {
        info!(url = %self.config.target_url, "opening target site");
        page.navigate(&self.config.target_url).await?;
        page.wait_for_load().await?;
        session.snapshot = self.extractor.extract(page).await?;
        debug!(chars = session.snapshot.len_chars(), "initial snapshot");
        Ok(())
    }

    async fn step<P: PageHandle>(&self, page: &mut P, session: &mut Session) -> StepResult {
        let step = session.step;
        let chunks = chunk_text(&session.snapshot.text, self.config.chunk_max_chars);
        debug!(step, chunks = chunks.len(), "building prompt");
        let prompt = build_prompt(&session.goal, &session.history, chunks);

        self.emit(&session.id, AgentEvent::Thinking { step });
        let reply = match self.brain.send(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(step, "model failed: {}", e);
                return StepResult::ModelError(e.to_string());
            }
        };

        let text = strip_code_fence(&reply);
        if text.is_empty() {
            info!(step, "model returned empty output");
            return StepResult::EmptyReply;
        }
        if actions::is_terminal(&text) {
            info!(step, reply = %text, "model reports done");
            return StepResult::Done(text);
        }

        let script = match actions::parse_script(&text, self.config.max_actions_per_step) {
            Ok(script) => script,
            Err(rejection) => {
                warn!(step, %rejection, "rejecting generated script");
                return StepResult::Rejected(rejection.to_string());
            }
        };

        let description = script
            .actions()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        info!(step, actions = %description, "executing step");
        self.emit(
            &session.id,
            AgentEvent::Step {
                number: step,
                description,
            },
        );

        if let Err(e) = hands::execute(page, &script).await {
            warn!(step, "step failed: {}", e);
            self.emit(
                &session.id,
                AgentEvent::StepError {
                    message: e.to_string(),
                },
            );
            return StepResult::ExecutionError(e.to_string());
        }
        session.history.extend(script.texts());

        if script.has_navigation() {
            hands::settle(page, self.config.settle_delay).await;
        }
        match self.extractor.extract(page).await {
            Ok(snapshot) => {
                debug!(step, chars = snapshot.len_chars(), "page re-observed");
                StepResult::Continue(snapshot)
            }
            Err(e) => StepResult::BrowserError(e.to_string()),
        }
    }

    fn emit(&self, session: &SessionId, event: AgentEvent) {
        if let Some(events) = &self.events {
            // No subscribers is fine.
            let _ = events.send(SessionEvent {
                session: session.clone(),
                event,
            });
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
