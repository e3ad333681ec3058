use std::{collections::BTreeSet, sync::Arc, time::Duration};

use shared::{
    domain::{EnrollmentId, SectionId, SectionMember, UserId},
    protocol::{AddToSectionRequest, FailedUser, RemoveFromSectionForm, UserToAdd},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{info, warn};

use crate::{
    backend::RosterBackend,
    counts::CountDisplay,
    error::{Result, RosterError},
    fragment::FragmentParser,
    message::{self, FlashMessage, OperationResult},
    render::{render, RosterView},
    view_model::{OverlayState, RosterViewModel, SyncPhase},
};

/// How long the overlay keeps fading out after an add batch completes before
/// input is accepted again.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub settle_delay: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum RosterEvent {
    MembersRendered { count: usize },
    CandidatesRendered { count: usize },
    SelectionChanged(CountDisplay),
    PanelChanged { open: bool },
    MessageShown(FlashMessage),
    MessageCleared,
    OverlayChanged(OverlayState),
    PhaseChanged(SyncPhase),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(SectionMember),
    Failed { member: SectionMember, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// The server answered; `result` says how many of the batch it could add.
    Applied(OperationResult),
    /// Transport failure. The whole batch is reported as failed.
    BatchFailed { submitted: usize, reason: String },
}

pub struct SectionRosterController {
    backend: Arc<dyn RosterBackend>,
    parser: FragmentParser,
    section_id: SectionId,
    options: ControllerOptions,
    inner: Mutex<RosterViewModel>,
    events: broadcast::Sender<RosterEvent>,
}

impl SectionRosterController {
    pub fn new(
        backend: Arc<dyn RosterBackend>,
        section_id: SectionId,
        options: ControllerOptions,
    ) -> Result<Arc<Self>> {
        let (events, _) = broadcast::channel(256);
        Ok(Arc::new(Self {
            backend,
            parser: FragmentParser::new()?,
            section_id,
            options,
            inner: Mutex::new(RosterViewModel::default()),
            events,
        }))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<RosterEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> RosterViewModel {
        self.inner.lock().await.clone()
    }

    pub async fn render(&self) -> RosterView {
        render(&*self.inner.lock().await)
    }

    pub async fn counts(&self) -> CountDisplay {
        self.inner.lock().await.counts()
    }

    fn emit(&self, event: RosterEvent) {
        let _ = self.events.send(event);
    }

    async fn set_phase(&self, phase: SyncPhase) {
        self.inner.lock().await.phase = phase.clone();
        self.emit(RosterEvent::PhaseChanged(phase));
    }

    async fn set_overlay(&self, overlay: OverlayState) {
        self.inner.lock().await.overlay = overlay;
        self.emit(RosterEvent::OverlayChanged(overlay));
    }

    async fn show_message(&self, flash: FlashMessage) {
        self.inner.lock().await.message = Some(flash.clone());
        self.emit(RosterEvent::MessageShown(flash));
    }

    fn busy(model: &RosterViewModel) -> Result<()> {
        if model.phase.is_idle() && !model.overlay.blocks_input() {
            return Ok(());
        }
        Err(RosterError::Busy {
            phase: model.phase.clone(),
        })
    }

    /// Fetches the member fragment and replaces the member list with it.
    pub async fn load_members(&self) -> Result<usize> {
        let html = self.backend.fetch_member_fragment(self.section_id).await?;
        let members = self.parser.parse_members(&html);
        let count = members.len();
        self.inner.lock().await.replace_members(members);

        info!(section_id = self.section_id.0, count, "roster: members loaded");
        self.emit(RosterEvent::MembersRendered { count });
        Ok(count)
    }

    /// Fetches the candidate fragment, replaces the candidate list and resets
    /// the selection.
    pub async fn load_candidates(&self) -> Result<usize> {
        let html = self
            .backend
            .fetch_candidate_fragment(self.section_id)
            .await?;
        let candidates = self.parser.parse_candidates(&html);
        let count = candidates.len();
        let counts = {
            let mut guard = self.inner.lock().await;
            guard.replace_candidates(candidates);
            guard.counts()
        };

        info!(section_id = self.section_id.0, count, "roster: candidates loaded");
        self.emit(RosterEvent::CandidatesRendered { count });
        self.emit(RosterEvent::SelectionChanged(counts));
        Ok(count)
    }

    /// Reloads the requested lists concurrently. Failures are reported as
    /// events; the caller always ends up back in an interactive state.
    async fn reconcile(&self, members: bool, candidates: bool) {
        let (members_result, candidates_result) = futures::join!(
            async {
                if members {
                    Some(self.load_members().await)
                } else {
                    None
                }
            },
            async {
                if candidates {
                    Some(self.load_candidates().await)
                } else {
                    None
                }
            }
        );

        for result in [members_result, candidates_result].into_iter().flatten() {
            if let Err(err) = result {
                warn!(section_id = self.section_id.0, error = %err, "roster: reload failed");
                self.emit(RosterEvent::Error(err.to_string()));
            }
        }
    }

    /// Opens the candidate pane and loads the candidates into it. Returns
    /// `false` when the pane was already open.
    pub async fn open_panel(&self) -> Result<bool> {
        {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            if !guard.open_panel() {
                return Ok(false);
            }
        }
        self.emit(RosterEvent::PanelChanged { open: true });
        self.emit(RosterEvent::MessageCleared);

        if let Err(err) = self.load_candidates().await {
            self.emit(RosterEvent::Error(err.to_string()));
            return Err(err);
        }
        Ok(true)
    }

    pub async fn close_panel(&self) -> Result<bool> {
        let counts = {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            if !guard.close_panel() {
                return Ok(false);
            }
            guard.counts()
        };
        self.emit(RosterEvent::PanelChanged { open: false });
        self.emit(RosterEvent::MessageCleared);
        self.emit(RosterEvent::SelectionChanged(counts));
        Ok(true)
    }

    pub async fn set_candidate_selected(
        &self,
        user_id: UserId,
        selected: bool,
    ) -> Result<CountDisplay> {
        let counts = {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            guard.set_selected(user_id, selected)?;
            guard.counts()
        };
        self.emit(RosterEvent::SelectionChanged(counts));
        Ok(counts)
    }

    pub async fn toggle_candidate(&self, user_id: UserId) -> Result<bool> {
        let (selected, counts) = {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            let selected = guard.toggle_selected(user_id)?;
            (selected, guard.counts())
        };
        self.emit(RosterEvent::SelectionChanged(counts));
        Ok(selected)
    }

    /// Opens the confirmation gate for removing one member and returns the
    /// prompt to show. Nothing is sent until [`Self::confirm_remove`].
    pub async fn request_remove(&self, enrollment_id: EnrollmentId) -> Result<String> {
        let phase = {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            let member = guard
                .find_member(enrollment_id)
                .cloned()
                .ok_or(RosterError::UnknownMember(enrollment_id))?;
            guard.phase = SyncPhase::ConfirmPending {
                enrollment_id,
                member,
            };
            guard.phase.clone()
        };

        let prompt = phase
            .pending_member()
            .map(message::confirm_remove_prompt)
            .unwrap_or_default();
        self.emit(RosterEvent::PhaseChanged(phase));
        Ok(prompt)
    }

    pub async fn cancel_remove(&self) -> Result<()> {
        {
            let mut guard = self.inner.lock().await;
            if guard.phase.pending_member().is_none() {
                return Err(RosterError::NoPendingConfirmation);
            }
            guard.phase = SyncPhase::Idle;
        }
        self.emit(RosterEvent::PhaseChanged(SyncPhase::Idle));
        Ok(())
    }

    /// Sends the pending removal, then reloads both lists whatever the outcome.
    pub async fn confirm_remove(&self) -> Result<RemoveOutcome> {
        let (enrollment_id, member) = {
            let mut guard = self.inner.lock().await;
            let pending = match &guard.phase {
                SyncPhase::ConfirmPending {
                    enrollment_id,
                    member,
                } => (*enrollment_id, member.clone()),
                SyncPhase::Idle => return Err(RosterError::NoPendingConfirmation),
                other => {
                    return Err(RosterError::Busy {
                        phase: other.clone(),
                    })
                }
            };
            guard.phase = SyncPhase::InFlight;
            pending
        };
        self.emit(RosterEvent::PhaseChanged(SyncPhase::InFlight));

        let form = RemoveFromSectionForm {
            user_section_id: enrollment_id,
            section_id: self.section_id,
        };
        let outcome = match self.backend.remove_from_section(&form).await {
            Ok(()) => {
                info!(
                    section_id = self.section_id.0,
                    enrollment_id = enrollment_id.0,
                    "roster: member removed"
                );
                self.inner.lock().await.remove_member(enrollment_id);
                RemoveOutcome::Removed(member)
            }
            Err(err) => {
                warn!(
                    section_id = self.section_id.0,
                    enrollment_id = enrollment_id.0,
                    error = %err,
                    "roster: member removal failed"
                );
                RemoveOutcome::Failed {
                    member,
                    reason: err.to_string(),
                }
            }
        };

        self.set_phase(SyncPhase::Reconciling).await;
        self.reconcile(true, true).await;

        if let RemoveOutcome::Failed { member, .. } = &outcome {
            self.show_message(message::remove_failed(member)).await;
        }
        self.set_phase(SyncPhase::Idle).await;
        Ok(outcome)
    }

    /// Submits every selected candidate as one batch.
    pub async fn add_selected_members(&self) -> Result<AddOutcome> {
        let selected = {
            let mut guard = self.inner.lock().await;
            Self::busy(&guard)?;
            if !guard.panel.is_open() {
                return Err(RosterError::PanelClosed);
            }
            let selected = guard.selected_candidates();
            if selected.is_empty() {
                return Err(RosterError::NothingSelected);
            }
            guard.message = None;
            guard.overlay = OverlayState::Shown;
            guard.phase = SyncPhase::InFlight;
            selected
        };
        self.emit(RosterEvent::MessageCleared);
        self.emit(RosterEvent::OverlayChanged(OverlayState::Shown));
        self.emit(RosterEvent::PhaseChanged(SyncPhase::InFlight));

        let request = AddToSectionRequest {
            section_id: self.section_id,
            users_to_add: selected.iter().map(UserToAdd::from).collect(),
        };
        let submitted = request.users_to_add.len();

        let outcome = match self.backend.add_to_section(&request).await {
            Ok(response) => {
                let failed_user_ids = response
                    .failed
                    .iter()
                    .filter_map(FailedUser::user_id)
                    .collect();
                let result = OperationResult::new(submitted, failed_user_ids, response.failed.len());
                if let Some(added) = response.added {
                    if added != result.succeeded_count {
                        warn!(
                            reported = added,
                            derived = result.succeeded_count,
                            "roster: server added count disagrees with failed list"
                        );
                    }
                }
                info!(
                    section_id = self.section_id.0,
                    added = result.succeeded_count,
                    failed = result.failed_count,
                    "roster: add batch applied"
                );

                let submitted_ids: BTreeSet<UserId> =
                    selected.iter().map(|candidate| candidate.user_id).collect();
                let remaining = {
                    let mut guard = self.inner.lock().await;
                    guard.remove_candidates(&submitted_ids);
                    guard.close_panel();
                    guard.candidates.len()
                };
                self.emit(RosterEvent::CandidatesRendered { count: remaining });
                self.emit(RosterEvent::PanelChanged { open: false });

                self.set_phase(SyncPhase::Reconciling).await;
                self.reconcile(true, false).await;
                self.show_message(result.to_message()).await;
                AddOutcome::Applied(result)
            }
            Err(err) => {
                // The server may still have applied part of the batch; the
                // reload below shows its state but the message cannot know.
                warn!(
                    section_id = self.section_id.0,
                    submitted,
                    error = %err,
                    "roster: add batch failed"
                );
                self.set_phase(SyncPhase::Reconciling).await;
                self.reconcile(true, true).await;
                self.show_message(message::add_batch_failed(submitted)).await;
                AddOutcome::BatchFailed {
                    submitted,
                    reason: err.to_string(),
                }
            }
        };

        self.set_overlay(OverlayState::FadingOut).await;
        if !self.options.settle_delay.is_zero() {
            tokio::time::sleep(self.options.settle_delay).await;
        }
        self.set_overlay(OverlayState::Hidden).await;
        self.set_phase(SyncPhase::Idle).await;
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
