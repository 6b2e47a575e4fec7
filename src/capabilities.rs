//! Optional capabilities attached to translatable items.
//!
//! Items are plain records; draft, lock, revision, workflow and sub-route
//! behaviour is attached as independent capability state and queried by
//! tag at runtime.

use crate::routing::RouteTable;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Runtime tag for a capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityTag {
    Draftable,
    Lockable,
    Revisable,
    Workflowed,
    Routable,
}

/// Publication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftState {
    pub live: bool,
    #[serde(default)]
    pub has_unpublished_changes: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_published_at: Option<DateTime<Utc>>,
}

impl DraftState {
    /// A published item.
    pub fn published(at: DateTime<Utc>) -> Self {
        Self {
            live: true,
            has_unpublished_changes: false,
            last_published_at: Some(at),
        }
    }

    /// An item that has never been published.
    pub fn draft() -> Self {
        Self {
            live: false,
            has_unpublished_changes: true,
            last_published_at: None,
        }
    }
}

/// Editing lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockState {
    pub locked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

/// Revision bookkeeping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_revision_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    InProgress,
    Approved,
    Rejected,
    Cancelled,
}

/// Moderation workflow state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub workflow_name: String,
    pub status: WorkflowStatus,
}

/// The capability set of one item. Absent capabilities are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock: Option<LockState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<RevisionState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<WorkflowState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<RouteTable>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_draft(mut self, draft: DraftState) -> Self {
        self.draft = Some(draft);
        self
    }

    pub fn with_lock(mut self, lock: LockState) -> Self {
        self.lock = Some(lock);
        self
    }

    pub fn with_revision(mut self, revision: RevisionState) -> Self {
        self.revision = Some(revision);
        self
    }

    pub fn with_workflow(mut self, workflow: WorkflowState) -> Self {
        self.workflow = Some(workflow);
        self
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Some(routes);
        self
    }

    /// Check whether a capability is attached.
    pub fn has(&self, tag: CapabilityTag) -> bool {
        match tag {
            CapabilityTag::Draftable => self.draft.is_some(),
            CapabilityTag::Lockable => self.lock.is_some(),
            CapabilityTag::Revisable => self.revision.is_some(),
            CapabilityTag::Workflowed => self.workflow.is_some(),
            CapabilityTag::Routable => self.routes.is_some(),
        }
    }

    /// Tags of all attached capabilities.
    pub fn tags(&self) -> Vec<CapabilityTag> {
        [
            CapabilityTag::Draftable,
            CapabilityTag::Lockable,
            CapabilityTag::Revisable,
            CapabilityTag::Workflowed,
            CapabilityTag::Routable,
        ]
        .into_iter()
        .filter(|tag| self.has(*tag))
        .collect()
    }

    /// Items without a draft state are always public.
    pub fn is_live(&self) -> bool {
        self.draft.as_ref().map_or(true, |d| d.live)
    }

    pub fn is_locked(&self) -> bool {
        self.lock.as_ref().is_some_and(|l| l.locked)
    }

    /// Last modification time reported to crawlers: last publication,
    /// else the latest revision.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.draft
            .as_ref()
            .and_then(|d| d.last_published_at)
            .or_else(|| {
                self.revision
                    .as_ref()
                    .and_then(|r| r.latest_revision_created_at)
            })
    }
}
