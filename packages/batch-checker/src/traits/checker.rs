//! The seam between the scheduler and whatever answers existence checks.

use async_trait::async_trait;

use crate::types::{group::Group, result::CheckResult};

/// Checks one group against the remote API.
///
/// Implementations never fail: every problem is reported as data, one result
/// per identifier in the group. The scheduler still reconciles the returned
/// list against the group, so a short or long answer cannot break a run.
#[async_trait]
pub trait GroupChecker: Send + Sync {
    async fn check_group(&self, group: &Group) -> Vec<CheckResult>;
}

#[async_trait]
impl<T: GroupChecker + ?Sized> GroupChecker for std::sync::Arc<T> {
    async fn check_group(&self, group: &Group) -> Vec<CheckResult> {
        (**self).check_group(group).await
    }
}
