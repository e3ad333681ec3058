use std::{collections::BTreeSet, fmt};

use shared::domain::{CandidateUser, EnrollmentId, SectionMember, UserId};

use crate::{
    counts::CountDisplay,
    error::{Result, RosterError},
    message::FlashMessage,
    panel::PanelState,
};

/// Where the controller is in a mutation. Anything other than `Idle` blocks new
/// mutations, which stands in for disabling the triggering controls.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncPhase {
    #[default]
    Idle,
    ConfirmPending {
        enrollment_id: EnrollmentId,
        member: SectionMember,
    },
    InFlight,
    Reconciling,
}

impl SyncPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn pending_member(&self) -> Option<&SectionMember> {
        match self {
            Self::ConfirmPending { member, .. } => Some(member),
            _ => None,
        }
    }
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::ConfirmPending { member, .. } => {
                write!(f, "awaiting confirmation to remove {}", member.display_name)
            }
            Self::InFlight => f.write_str("request in flight"),
            Self::Reconciling => f.write_str("reloading lists"),
        }
    }
}

/// Page-covering overlay used while an add batch is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlayState {
    #[default]
    Hidden,
    Shown,
    FadingOut,
}

impl OverlayState {
    pub fn blocks_input(self) -> bool {
        !matches!(self, Self::Hidden)
    }
}

/// Everything the roster page shows. The server stays the source of truth;
/// the lists here are replaced wholesale on every reload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterViewModel {
    pub members: Vec<SectionMember>,
    pub candidates: Vec<CandidateUser>,
    pub selection: BTreeSet<UserId>,
    pub panel: PanelState,
    pub message: Option<FlashMessage>,
    pub overlay: OverlayState,
    pub phase: SyncPhase,
}

impl RosterViewModel {
    pub fn counts(&self) -> CountDisplay {
        CountDisplay::derive(self)
    }

    pub fn replace_members(&mut self, members: Vec<SectionMember>) {
        self.members = members;
    }

    /// Replaces the candidate list and drops the selection with it.
    pub fn replace_candidates(&mut self, candidates: Vec<CandidateUser>) {
        self.candidates = candidates;
        self.selection.clear();
    }

    pub fn find_member(&self, enrollment_id: EnrollmentId) -> Option<&SectionMember> {
        self.members
            .iter()
            .find(|member| member.enrollment_id == Some(enrollment_id))
    }

    pub fn remove_member(&mut self, enrollment_id: EnrollmentId) -> bool {
        let before = self.members.len();
        self.members
            .retain(|member| member.enrollment_id != Some(enrollment_id));
        self.members.len() != before
    }

    pub fn set_selected(&mut self, user_id: UserId, selected: bool) -> Result<()> {
        if !self
            .candidates
            .iter()
            .any(|candidate| candidate.user_id == user_id)
        {
            return Err(RosterError::UnknownCandidate(user_id));
        }
        if selected {
            self.selection.insert(user_id);
        } else {
            self.selection.remove(&user_id);
        }
        Ok(())
    }

    /// Flips the selection of one candidate and returns the new state.
    pub fn toggle_selected(&mut self, user_id: UserId) -> Result<bool> {
        let selected = !self.selection.contains(&user_id);
        self.set_selected(user_id, selected)?;
        Ok(selected)
    }

    /// Selected candidates in list order.
    pub fn selected_candidates(&self) -> Vec<CandidateUser> {
        self.candidates
            .iter()
            .filter(|candidate| self.selection.contains(&candidate.user_id))
            .cloned()
            .collect()
    }

    pub fn remove_candidates(&mut self, user_ids: &BTreeSet<UserId>) {
        self.candidates
            .retain(|candidate| !user_ids.contains(&candidate.user_id));
        self.selection.retain(|user_id| !user_ids.contains(user_id));
    }

    /// Opens the candidate pane. Returns `false` if it was already open.
    pub fn open_panel(&mut self) -> bool {
        let opened = self.panel.open();
        if opened {
            self.message = None;
        }
        opened
    }

    /// Closes the candidate pane and drops its selection. Returns `false` if it
    /// was already closed.
    pub fn close_panel(&mut self) -> bool {
        let closed = self.panel.close();
        if closed {
            self.message = None;
            self.selection.clear();
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use crate::message::{MessageTarget, Severity};

    use super::*;

    fn candidate(id: i64) -> CandidateUser {
        CandidateUser {
            user_id: UserId(id),
            display_name: format!("User {id}"),
            enrollment_role: "Student".into(),
            enrollment_type: "StudentEnrollment".into(),
        }
    }

    fn notice() -> FlashMessage {
        FlashMessage {
            target: MessageTarget::SectionUsers,
            severity: Severity::Success,
            text: "done".into(),
        }
    }

    #[test]
    fn reloading_candidates_clears_selection() {
        let mut model = RosterViewModel::default();
        model.replace_candidates(vec![candidate(1), candidate(2)]);
        model.toggle_selected(UserId(1)).expect("select");
        assert_eq!(model.selection.len(), 1);

        model.replace_candidates(vec![candidate(1), candidate(2)]);
        assert!(model.selection.is_empty());
        assert!(!model.counts().add_selected_enabled);
    }

    #[test]
    fn selecting_unknown_candidate_is_rejected() {
        let mut model = RosterViewModel::default();
        model.replace_candidates(vec![candidate(1)]);
        let err = model.set_selected(UserId(5), true).expect_err("unknown");
        assert!(matches!(err, RosterError::UnknownCandidate(UserId(5))));
    }

    #[test]
    fn toggle_flips_selection() {
        let mut model = RosterViewModel::default();
        model.replace_candidates(vec![candidate(1)]);
        assert!(model.toggle_selected(UserId(1)).expect("on"));
        assert!(!model.toggle_selected(UserId(1)).expect("off"));
        assert!(model.selection.is_empty());
    }

    #[test]
    fn selected_candidates_follow_list_order() {
        let mut model = RosterViewModel::default();
        model.replace_candidates(vec![candidate(3), candidate(1), candidate(2)]);
        model.set_selected(UserId(2), true).expect("select");
        model.set_selected(UserId(3), true).expect("select");
        let ids: Vec<_> = model
            .selected_candidates()
            .into_iter()
            .map(|candidate| candidate.user_id)
            .collect();
        assert_eq!(ids, vec![UserId(3), UserId(2)]);
    }

    #[test]
    fn panel_transitions_clear_messages() {
        let mut model = RosterViewModel::default();
        model.message = Some(notice());
        assert!(model.open_panel());
        assert!(model.message.is_none());

        model.message = Some(notice());
        assert!(!model.open_panel());
        assert!(model.message.is_some());

        assert!(model.close_panel());
        assert!(model.message.is_none());
        assert!(model.panel.toggle_visible());
    }

    #[test]
    fn closing_panel_drops_selection() {
        let mut model = RosterViewModel::default();
        model.replace_candidates(vec![candidate(1), candidate(2)]);
        model.open_panel();
        model.set_selected(UserId(2), true).expect("select");

        assert!(model.close_panel());
        assert!(model.selection.is_empty());
        assert_eq!(model.candidates.len(), 2);
    }

    #[test]
    fn remove_member_matches_enrollment_id() {
        let mut model = RosterViewModel::default();
        model.replace_members(vec![SectionMember {
            enrollment_id: Some(EnrollmentId(40)),
            display_name: "Ada".into(),
            role: "Student".into(),
            enrollment_type: None,
        }]);
        assert!(model.find_member(EnrollmentId(40)).is_some());
        assert!(!model.remove_member(EnrollmentId(41)));
        assert!(model.remove_member(EnrollmentId(40)));
        assert!(model.members.is_empty());
    }
}
