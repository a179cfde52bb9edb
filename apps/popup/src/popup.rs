//! Popup controller: one analysis cycle at a time, status published on every transition.
//!
//! IDLE → EXTRACTING → REQUESTING → DONE | FAILED. Failures never escape the cycle;
//! they become an `Error: ...` status line.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{watch, Mutex};
use tracing::{error, info, warn};

use crate::errors::AnalysisError;
use crate::extractor::get_active_tab_text;
use crate::scoring::{parse_experience, ScoreRequest, ScoringClient};
use crate::store::{CachedState, LocalStore};
use crate::tab::TabProvider;

pub const STATUS_RESUME_REQUIRED: &str = "Resume text is required.";
pub const STATUS_EXTRACTING: &str = "Extracting JD from active tab...";
pub const STATUS_SCORING: &str = "Scoring against local Resumelytics API...";

/// What the popup shows and remembers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopupState {
    pub status: String,
    pub last_resume_text: Option<String>,
    pub last_result: Option<Value>,
}

/// How a trigger ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// A cycle was already outstanding; nothing happened.
    Busy,
    ResumeRequired,
    Done(Value),
    Failed(AnalysisError),
}

/// Held for the whole cycle; dropping it re-enables the trigger.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Pretty JSON with two-space indentation, as the result pane shows it.
pub fn render_result(result: &Value) -> String {
    serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
}

pub struct Popup {
    scoring: ScoringClient,
    tabs: Arc<dyn TabProvider>,
    store: LocalStore,
    state: Mutex<PopupState>,
    busy: AtomicBool,
    status_tx: watch::Sender<String>,
}

impl Popup {
    pub fn new(scoring: ScoringClient, tabs: Arc<dyn TabProvider>, store: LocalStore) -> Self {
        let (status_tx, _) = watch::channel(String::new());
        Self {
            scoring,
            tabs,
            store,
            state: Mutex::new(PopupState::default()),
            busy: AtomicBool::new(false),
            status_tx,
        }
    }

    /// Receives every status change.
    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.status_tx.subscribe()
    }

    pub async fn state(&self) -> PopupState {
        self.state.lock().await.clone()
    }

    #[allow(dead_code)]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Reads the cached outcome once and prefills the popup from it.
    /// An unreadable store is treated as empty.
    pub async fn initialize(&self) -> CachedState {
        let cached = match self.store.load_cached_state().await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Ignoring unreadable store {}: {e}", self.store.path().display());
                CachedState::default()
            }
        };

        {
            let mut state = self.state.lock().await;
            state.last_resume_text = cached
                .last_resume_text
                .clone()
                .filter(|text| !text.is_empty());
            state.last_result = cached.last_result.clone();
        }

        if let Some(result) = &cached.last_result {
            self.set_status(render_result(result)).await;
        }

        cached
    }

    /// Runs one full cycle. Re-entrant calls while a cycle is outstanding are no-ops.
    pub async fn run_analysis(&self, resume_input: &str, experience_input: &str) -> CycleOutcome {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            info!("Analysis already in progress; ignoring trigger");
            return CycleOutcome::Busy;
        };

        let resume_text = resume_input.trim();
        if resume_text.is_empty() {
            self.set_status(STATUS_RESUME_REQUIRED).await;
            return CycleOutcome::ResumeRequired;
        }

        match self.extract_and_score(resume_text, experience_input).await {
            Ok(result) => {
                self.set_status(render_result(&result)).await;
                self.remember(resume_text, &result).await;
                CycleOutcome::Done(result)
            }
            Err(e) => {
                error!("Analysis failed: {e:?}");
                self.set_status(e.user_message()).await;
                CycleOutcome::Failed(e)
            }
        }
    }

    async fn extract_and_score(
        &self,
        resume_text: &str,
        experience_input: &str,
    ) -> Result<Value, AnalysisError> {
        self.set_status(STATUS_EXTRACTING).await;
        let jd_text = get_active_tab_text(self.tabs.as_ref()).await?;
        if jd_text.trim().is_empty() {
            return Err(AnalysisError::EmptyExtraction);
        }

        self.set_status(STATUS_SCORING).await;
        let request = ScoreRequest {
            resume_text,
            jd_text: &jd_text,
            candidate_experience: parse_experience(experience_input),
        };
        self.scoring.score(&request).await
    }

    /// Overwrites the cached outcome. A failed write is logged; the cycle still succeeded.
    async fn remember(&self, resume_text: &str, result: &Value) {
        {
            let mut state = self.state.lock().await;
            state.last_resume_text = Some(resume_text.to_string());
            state.last_result = Some(result.clone());
        }
        if let Err(e) = self.store.save_outcome(resume_text, result).await {
            error!("Failed to persist last result: {e}");
        }
    }

    async fn set_status(&self, status: impl Into<String>) {
        let status = status.into();
        self.state.lock().await.status = status.clone();
        self.status_tx.send_replace(status);
    }
}
