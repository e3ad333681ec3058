use std::fmt;

use shared::domain::{EnrollmentId, UserId};

use crate::{
    counts::CountDisplay,
    message::FlashMessage,
    view_model::{OverlayState, RosterViewModel},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberRow {
    pub enrollment_id: Option<EnrollmentId>,
    pub label: String,
    pub removable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRow {
    pub user_id: UserId,
    pub label: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePane {
    pub header: String,
    pub rows: Vec<CandidateRow>,
    pub add_selected_enabled: bool,
}

/// Projection of the view-model onto what a surface displays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterView {
    pub member_header: String,
    pub member_rows: Vec<MemberRow>,
    pub empty_section_notice: bool,
    pub candidate_pane: Option<CandidatePane>,
    pub message: Option<FlashMessage>,
    pub add_people_visible: bool,
    pub responsive_layout: bool,
    pub overlay: OverlayState,
    pub confirmation: Option<String>,
}

pub fn render(model: &RosterViewModel) -> RosterView {
    let counts = CountDisplay::derive(model);

    let member_rows = model
        .members
        .iter()
        .map(|member| MemberRow {
            enrollment_id: member.enrollment_id,
            label: format!("{} ({})", member.display_name, member.role),
            removable: member.enrollment_id.is_some(),
        })
        .collect();

    let candidate_pane = model.panel.is_open().then(|| CandidatePane {
        header: format!(
            "{} user{} selected",
            counts.selection_count, counts.selection_suffix
        ),
        rows: model
            .candidates
            .iter()
            .map(|candidate| CandidateRow {
                user_id: candidate.user_id,
                label: format!("{} ({})", candidate.display_name, candidate.enrollment_role),
                selected: model.selection.contains(&candidate.user_id),
            })
            .collect(),
        add_selected_enabled: counts.add_selected_enabled,
    });

    RosterView {
        member_header: format!(
            "{} user{} in this section",
            counts.member_count, counts.member_suffix
        ),
        member_rows,
        empty_section_notice: counts.show_empty_section_notice,
        candidate_pane,
        message: model.message.clone(),
        add_people_visible: model.panel.toggle_visible(),
        responsive_layout: model.panel.responsive_layout_flag(),
        overlay: model.overlay,
        confirmation: model
            .phase
            .pending_member()
            .map(crate::message::confirm_remove_prompt),
    }
}

impl fmt::Display for RosterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(message) = &self.message {
            writeln!(f, "[{}] {}", message.severity.label(), message.text)?;
        }

        writeln!(f, "{}", self.member_header)?;
        if self.empty_section_notice {
            writeln!(f, "  This section has no members yet.")?;
        }
        for row in &self.member_rows {
            match (row.removable, row.enrollment_id) {
                (true, Some(id)) => writeln!(f, "  {}  [remove: {}]", row.label, id)?,
                _ => writeln!(f, "  {}", row.label)?,
            }
        }

        if let Some(pane) = &self.candidate_pane {
            writeln!(f)?;
            writeln!(
                f,
                "Add to section: {}{}",
                pane.header,
                if pane.add_selected_enabled {
                    ""
                } else {
                    " (add selected disabled)"
                }
            )?;
            for row in &pane.rows {
                let mark = if row.selected { "x" } else { " " };
                writeln!(f, "  [{mark}] {}  [user: {}]", row.label, row.user_id)?;
            }
        }

        if let Some(prompt) = &self.confirmation {
            writeln!(f)?;
            writeln!(f, "{prompt}")?;
        }
        Ok(())
    }
}
