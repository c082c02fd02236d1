//! Port for rendering notification text.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::models::MergeRequest;

/// Pure text rendering of notifications. The reconciler never inspects the output.
pub trait MessageRenderer: Send + Sync {
    /// Text announcing a merge request.
    fn render_message(&self, mr: &MergeRequest) -> String;

    /// Announcement text extended with newly unresolved threads and the
    /// current up-voters. Empty collections render no block.
    fn render_update(
        &self,
        mr: &MergeRequest,
        new_threads: &BTreeMap<String, String>,
        up_voters: &BTreeSet<String>,
    ) -> String;
}
