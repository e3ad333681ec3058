use shared::domain::{SectionMember, UserId};

use crate::counts::plural_suffix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageTarget {
    /// Message area above the member pane.
    SectionUsers,
    /// Message area above the candidate pane.
    FullClassList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "error",
        }
    }
}

/// Transient, dismissible message. At most one is visible at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashMessage {
    pub target: MessageTarget,
    pub severity: Severity,
    pub text: String,
}

/// Outcome of an add batch that the server answered with a 2xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub succeeded_count: usize,
    pub failed_user_ids: Vec<UserId>,
    pub failed_count: usize,
}

impl OperationResult {
    pub fn new(submitted: usize, failed_user_ids: Vec<UserId>, failed_count: usize) -> Self {
        let failed_count = failed_count.min(submitted);
        Self {
            succeeded_count: submitted - failed_count,
            failed_user_ids,
            failed_count,
        }
    }

    pub fn is_partial(&self) -> bool {
        self.failed_count > 0
    }

    pub fn to_message(&self) -> FlashMessage {
        let mut text = format!(
            "{} user{} been added to this section.",
            self.succeeded_count,
            if self.succeeded_count == 1 { " has" } else { "s have" }
        );
        if self.is_partial() {
            text.push_str(&format!(
                " {} user{} could not be added to this section.",
                self.failed_count,
                plural_suffix(self.failed_count)
            ));
        }

        FlashMessage {
            target: MessageTarget::SectionUsers,
            severity: if self.is_partial() {
                Severity::Warning
            } else {
                Severity::Success
            },
            text,
        }
    }
}

pub fn add_batch_failed(submitted: usize) -> FlashMessage {
    FlashMessage {
        target: MessageTarget::FullClassList,
        severity: Severity::Danger,
        text: format!(
            "Error: {submitted} user{} not been added to this section.",
            if submitted == 1 { " has" } else { "s have" }
        ),
    }
}

pub fn remove_failed(member: &SectionMember) -> FlashMessage {
    FlashMessage {
        target: MessageTarget::SectionUsers,
        severity: Severity::Danger,
        text: format!(
            "Error: {} with role {} has not been deleted from this section.",
            member.display_name, member.role
        ),
    }
}

pub fn confirm_remove_prompt(member: &SectionMember) -> String {
    format!("Remove {} from this section?", member.display_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_success_reports_zero_failures_as_success() {
        let result = OperationResult::new(3, Vec::new(), 0);
        let message = result.to_message();
        assert_eq!(result.succeeded_count, 3);
        assert_eq!(message.severity, Severity::Success);
        assert_eq!(message.text, "3 users have been added to this section.");
    }

    #[test]
    fn single_addition_uses_singular_wording() {
        let message = OperationResult::new(1, Vec::new(), 0).to_message();
        assert_eq!(message.text, "1 user has been added to this section.");
    }

    #[test]
    fn partial_failure_is_a_warning_with_both_counts() {
        let result = OperationResult::new(4, vec![UserId(9)], 1);
        let message = result.to_message();
        assert_eq!(message.severity, Severity::Warning);
        assert_eq!(
            message.text,
            "3 users have been added to this section. 1 user could not be added to this section."
        );
    }

    #[test]
    fn failure_count_never_exceeds_submission() {
        let result = OperationResult::new(2, Vec::new(), 5);
        assert_eq!(result.succeeded_count, 0);
        assert_eq!(result.failed_count, 2);
    }

    #[test]
    fn batch_failure_targets_candidate_pane() {
        let message = add_batch_failed(1);
        assert_eq!(message.target, MessageTarget::FullClassList);
        assert_eq!(message.text, "Error: 1 user has not been added to this section.");
        assert_eq!(
            add_batch_failed(3).text,
            "Error: 3 users have not been added to this section."
        );
    }

    #[test]
    fn remove_failure_names_user_and_role() {
        let member = SectionMember {
            enrollment_id: None,
            display_name: "Lovelace, Ada".into(),
            role: "TA".into(),
            enrollment_type: None,
        };
        assert_eq!(
            remove_failed(&member).text,
            "Error: Lovelace, Ada with role TA has not been deleted from this section."
        );
        assert_eq!(confirm_remove_prompt(&member), "Remove Lovelace, Ada from this section?");
    }
}
