//! One live session: the engine behind a turn mutex, wired to the
//! project store through the debounced snapshot writer.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use coplan_core::domain::WizardContext;
use coplan_core::engine::{CancelHandle, SessionEngine, TurnReply};
use coplan_core::errors::ApplicationError;
use coplan_core::gating::derive_current_stage;
use coplan_core::generate::ContentGenerator;
use coplan_db::{DebouncedSaver, ProjectStore};

pub struct SessionRuntime<G: ContentGenerator> {
    engine: Mutex<SessionEngine<G>>,
    saver: DebouncedSaver,
    cancel: CancelHandle,
}

impl<G: ContentGenerator> SessionRuntime<G> {
    /// Loads the project snapshot (or starts fresh) and opens the session.
    /// Returns the runtime together with the opening assistant messages.
    pub async fn open(
        project_id: &str,
        wizard: WizardContext,
        generator: G,
        store: Arc<dyn ProjectStore>,
        save_debounce: Duration,
    ) -> Result<(Self, TurnReply), ApplicationError> {
        let snapshot = store
            .load_project(project_id)
            .await
            .map_err(|error| ApplicationError::Persistence(error.to_string()))?;

        let mut engine = match snapshot {
            Some(snapshot) => {
                let derived = derive_current_stage(&snapshot.captured);
                if let Some(hint) = snapshot.stage_hint {
                    if hint != derived {
                        tracing::debug!(
                            project_id,
                            ?hint,
                            ?derived,
                            "stored stage hint disagrees with derived stage, using derived"
                        );
                    }
                }
                tracing::info!(project_id, "resuming project from stored snapshot");
                SessionEngine::from_snapshot(snapshot, generator)
            }
            None => {
                tracing::info!(project_id, "starting a new project");
                SessionEngine::new(project_id, wizard, generator)
            }
        };

        let cancel = engine.cancel_handle();
        let opening = engine.open_session().await?;
        let saver = DebouncedSaver::spawn(store, save_debounce);

        Ok((Self { engine: Mutex::new(engine), saver, cancel }, opening))
    }

    /// Processes one user turn. The mutex serializes turns; a second turn
    /// arriving mid-generation waits its turn rather than interleaving.
    pub async fn turn(&self, text: &str) -> Result<TurnReply, ApplicationError> {
        let mut engine = self.engine.lock().await;
        let reply = engine.handle_turn(text).await?;
        if reply.captured_changed || reply.stage_advanced {
            self.saver.queue(engine.snapshot());
        }
        Ok(reply)
    }

    /// Handle that invalidates in-flight generation without waiting for
    /// the turn lock, so an interrupt arriving mid-generation takes
    /// effect at once. Clonable into a signal listener task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Final flush and writer teardown.
    pub async fn shutdown(self) {
        let snapshot = self.engine.lock().await.snapshot();
        self.saver.queue(snapshot);
        self.saver.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use coplan_core::domain::{CapturedData, Ideation, Phase, Stage};
    use coplan_core::flows::{AdjustKind, DeliverableComponent, DeliverablesProposal};
    use coplan_core::generate::GenerationError;
    use coplan_db::InMemoryProjectStore;

    use super::*;

    struct CannedGenerator;

    #[async_trait]
    impl ContentGenerator for CannedGenerator {
        async fn propose_phases(
            &self,
            _wizard: &WizardContext,
            _ideation: &Ideation,
            _adjust: Option<AdjustKind>,
        ) -> Result<Vec<Phase>, GenerationError> {
            Ok(vec![Phase::named("Investigate"), Phase::named("Create"), Phase::named("Share")])
        }

        async fn propose_deliverables(
            &self,
            _wizard: &WizardContext,
            _captured: &CapturedData,
        ) -> Result<DeliverablesProposal, GenerationError> {
            Ok(DeliverablesProposal::default())
        }

        async fn regenerate_component(
            &self,
            _component: DeliverableComponent,
            _wizard: &WizardContext,
            _captured: &CapturedData,
        ) -> Result<DeliverablesProposal, GenerationError> {
            Ok(DeliverablesProposal::default())
        }

        async fn suggest_options(
            &self,
            _stage: Stage,
            _wizard: &WizardContext,
            _captured: &CapturedData,
        ) -> Result<Vec<String>, GenerationError> {
            Ok(vec!["Systems shape daily life".to_string()])
        }
    }

    #[tokio::test]
    async fn captures_are_flushed_and_resumable() {
        let store = Arc::new(InMemoryProjectStore::default());
        let (runtime, _opening) = SessionRuntime::open(
            "proj-rt",
            WizardContext::default(),
            CannedGenerator,
            store.clone(),
            Duration::from_millis(10),
        )
        .await
        .expect("open");

        let reply = runtime
            .turn("Systems thinking reveals hidden connections")
            .await
            .expect("turn");
        assert!(reply.captured_changed);

        runtime.shutdown().await;

        let stored = store.load_project("proj-rt").await.expect("load").expect("present");
        assert_eq!(
            stored.captured.ideation.big_idea.as_deref(),
            Some("Systems thinking reveals hidden connections")
        );

        // Resuming re-derives the stage from the stored snapshot.
        let (runtime, _opening) = SessionRuntime::open(
            "proj-rt",
            WizardContext::default(),
            CannedGenerator,
            store.clone(),
            Duration::from_millis(10),
        )
        .await
        .expect("reopen");
        let reply = runtime.turn("what have we got so far").await.expect("turn");
        assert_eq!(reply.stage, Stage::EssentialQuestion);
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn cancel_handle_works_without_the_turn_lock() {
        let store = Arc::new(InMemoryProjectStore::default());
        let (runtime, _opening) = SessionRuntime::open(
            "proj-cancel",
            WizardContext::default(),
            CannedGenerator,
            store,
            Duration::from_millis(10),
        )
        .await
        .expect("open");

        // Must not deadlock or panic even with no generation in flight.
        runtime.cancel_handle().cancel();
        let reply = runtime.turn("never mind").await.expect("turn");
        assert!(!reply.messages.is_empty());
        runtime.shutdown().await;
    }

    #[tokio::test]
    async fn stored_stage_hint_is_never_trusted_over_derived_stage() {
        let store = Arc::new(InMemoryProjectStore::default());
        let mut snapshot =
            SessionEngine::new("proj-hint", WizardContext::default(), CannedGenerator).snapshot();
        snapshot.captured.ideation.big_idea =
            Some("Systems thinking reveals hidden connections".to_string());
        // A lying hint: the data only supports the essential question.
        snapshot.stage_hint = Some(Stage::Deliverables);
        store.save_project(&snapshot).await.expect("seed");

        let (runtime, _opening) = SessionRuntime::open(
            "proj-hint",
            WizardContext::default(),
            CannedGenerator,
            store,
            Duration::from_millis(10),
        )
        .await
        .expect("open");

        let reply = runtime.turn("what have we got so far").await.expect("turn");
        assert_eq!(reply.stage, Stage::EssentialQuestion);
        runtime.shutdown().await;
    }
}
