use super::transport::{CostAllocationTag, TagStatus};

/// Overall activation state derived from a snapshot of tag statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationState {
    Active,
    Inactive,
}

impl ActivationState {
    /// Active iff the snapshot is non-empty and every tag is Active
    pub fn from_tags(tags: &[CostAllocationTag]) -> Self {
        if !tags.is_empty() && tags.iter().all(|tag| tag.status == TagStatus::Active) {
            Self::Active
        } else {
            Self::Inactive
        }
    }

    pub fn is_active(self) -> bool {
        self == Self::Active
    }
}
