use crate::view_model::RosterViewModel;

/// Plural suffix for `count` items: empty for exactly one, `"s"` otherwise.
pub fn plural_suffix(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Counts shown in the pane headers. Never stored; derived from the view-model
/// after every load and selection change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountDisplay {
    pub member_count: usize,
    pub member_suffix: &'static str,
    pub selection_count: usize,
    pub selection_suffix: &'static str,
    pub add_selected_enabled: bool,
    pub show_empty_section_notice: bool,
}

impl CountDisplay {
    pub fn derive(model: &RosterViewModel) -> Self {
        let member_count = model.members.len();
        let selection_count = model
            .candidates
            .iter()
            .filter(|candidate| model.selection.contains(&candidate.user_id))
            .count();

        Self {
            member_count,
            member_suffix: plural_suffix(member_count),
            selection_count,
            selection_suffix: plural_suffix(selection_count),
            add_selected_enabled: selection_count > 0 && model.phase.is_idle(),
            show_empty_section_notice: member_count == 0,
        }
    }
}
