use serde::{Deserialize, Serialize};

/// Incoming and outgoing edge counts for one user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowStats {
    pub followers: u64,
    pub following: u64,
}
