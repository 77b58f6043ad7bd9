//! Units of provisioning work and their outcomes.

use std::fmt;

use reminder_core::{AlarmEvent, ScheduleExpression, ScheduleKey};

use crate::error::ProvisionError;

/// Everything the remote scheduler needs to create one schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSpec {
    pub expression: ScheduleExpression,
    pub timezone: String,
    pub message: String,
    pub owner_id: String,
}

impl ScheduleSpec {
    /// Payload delivered to the alarm executor when the schedule fires.
    pub fn event(&self) -> AlarmEvent {
        AlarmEvent {
            user_id: self.owner_id.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    CreateSchedule,
    DeleteSchedule,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::CreateSchedule => write!(f, "create"),
            TaskKind::DeleteSchedule => write!(f, "delete"),
        }
    }
}

/// One remote schedule to create or delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task {
    Create { key: ScheduleKey, spec: ScheduleSpec },
    Delete { key: ScheduleKey },
}

impl Task {
    /// Creation task under a freshly generated key.
    pub fn create(spec: ScheduleSpec) -> Self {
        Task::Create {
            key: ScheduleKey::generate(),
            spec,
        }
    }

    pub fn delete(key: impl Into<ScheduleKey>) -> Self {
        Task::Delete { key: key.into() }
    }

    pub fn key(&self) -> &ScheduleKey {
        match self {
            Task::Create { key, .. } | Task::Delete { key } => key,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Create { .. } => TaskKind::CreateSchedule,
            Task::Delete { .. } => TaskKind::DeleteSchedule,
        }
    }

    pub(crate) fn into_key(self) -> ScheduleKey {
        match self {
            Task::Create { key, .. } | Task::Delete { key } => key,
        }
    }
}

/// How a batch treats a "schedule not found" answer from the provisioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Every error, absence included, fails the batch.
    #[default]
    FailFast,
    /// Absence counts as success, so deletions stay idempotent.
    TolerateNotFound,
}

/// What one unit of work produced. Exactly one per task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Created {
        key: ScheduleKey,
        expression: ScheduleExpression,
    },
    Deleted {
        key: ScheduleKey,
    },
    /// Delete target was already gone and the batch tolerates that.
    AlreadyAbsent {
        key: ScheduleKey,
    },
    /// The batch was cancelled before this unit reached the provisioner.
    Skipped {
        key: ScheduleKey,
    },
    Failed {
        key: ScheduleKey,
        error: ProvisionError,
    },
}

impl TaskOutcome {
    pub fn key(&self) -> &ScheduleKey {
        match self {
            TaskOutcome::Created { key, .. }
            | TaskOutcome::Deleted { key }
            | TaskOutcome::AlreadyAbsent { key }
            | TaskOutcome::Skipped { key }
            | TaskOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TaskOutcome::Created { .. } | TaskOutcome::Deleted { .. } | TaskOutcome::AlreadyAbsent { .. }
        )
    }

    /// Short label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            TaskOutcome::Created { .. } => "created",
            TaskOutcome::Deleted { .. } => "deleted",
            TaskOutcome::AlreadyAbsent { .. } => "already_absent",
            TaskOutcome::Skipped { .. } => "skipped",
            TaskOutcome::Failed { .. } => "failed",
        }
    }
}
