use serde::{Deserialize, Serialize};

use crate::domain::{CandidateUser, EnrollmentId, SectionId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserToAdd {
    pub enrollment_user_id: UserId,
    pub enrollment_role: String,
    pub enrollment_type: String,
}

impl From<&CandidateUser> for UserToAdd {
    fn from(candidate: &CandidateUser) -> Self {
        Self {
            enrollment_user_id: candidate.user_id,
            enrollment_role: candidate.enrollment_role.clone(),
            enrollment_type: candidate.enrollment_type.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToSectionRequest {
    pub section_id: SectionId,
    pub users_to_add: Vec<UserToAdd>,
}

/// Form body of the remove endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveFromSectionForm {
    pub user_section_id: EnrollmentId,
    pub section_id: SectionId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdValue {
    Number(i64),
    Text(String),
}

impl IdValue {
    pub fn as_user_id(&self) -> Option<UserId> {
        match self {
            Self::Number(raw) => Some(UserId(*raw)),
            Self::Text(raw) => raw.parse().ok(),
        }
    }
}

/// One entry of the `failed` list. Servers either echo the submitted user
/// object or send the bare user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailedUser {
    Echoed {
        enrollment_user_id: IdValue,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enrollment_role: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        enrollment_type: Option<String>,
    },
    Id(IdValue),
}

impl FailedUser {
    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Echoed {
                enrollment_user_id, ..
            } => enrollment_user_id.as_user_id(),
            Self::Id(id) => id.as_user_id(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToSectionResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added: Option<usize>,
    #[serde(default)]
    pub failed: Vec<FailedUser>,
}
