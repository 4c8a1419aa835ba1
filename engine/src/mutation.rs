//! Mutation types.
//!
//! Every change to the catalog goes through two phases. The local phase
//! applies the change optimistically and hands back a [`Pending`] ticket
//! describing what must be mirrored remotely. Once the remote call resolves,
//! the ticket is either committed or rolled back, producing an [`Outcome`].

use crate::{BookChanges, BookId, BookRecord};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of an unresolved mutation.
pub type Ticket = u64;

/// Which kind of change a mutation makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationKind::Create => write!(f, "create"),
            MutationKind::Update => write!(f, "update"),
            MutationKind::Delete => write!(f, "delete"),
        }
    }
}

/// The change to mirror against the remote collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mutation {
    /// A new record, carrying its provisional id
    Create { record: BookRecord },
    /// Changed fields of an existing record
    Update { id: BookId, changes: BookChanges },
    /// Removal of an existing record
    Delete { id: BookId },
}

impl Mutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Create { .. } => MutationKind::Create,
            Mutation::Update { .. } => MutationKind::Update,
            Mutation::Delete { .. } => MutationKind::Delete,
        }
    }

    /// The record this mutation targets (provisional id for creates).
    pub fn id(&self) -> &BookId {
        match self {
            Mutation::Create { record } => &record.id,
            Mutation::Update { id, .. } => id,
            Mutation::Delete { id } => id,
        }
    }
}

/// A mutation that has been applied locally and awaits its remote outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    /// Ticket to pass back to `commit` or `rollback`
    pub ticket: Ticket,
    /// What to mirror
    pub mutation: Mutation,
}

impl Pending {
    pub fn kind(&self) -> MutationKind {
        self.mutation.kind()
    }

    pub fn id(&self) -> &BookId {
        self.mutation.id()
    }
}

/// What happened to a provisional id when a create was committed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Reconciliation {
    /// The provisional id was replaced by the server-assigned one.
    Replaced { provisional: BookId },
    /// The server id already belongs to another record; the provisional id
    /// was kept.
    #[serde(rename_all = "camelCase")]
    Conflict { server_id: BookId },
}

/// Terminal state of a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Outcome {
    /// Optimistic state retained, remote acknowledged.
    Committed {
        kind: MutationKind,
        id: BookId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reconciliation: Option<Reconciliation>,
    },
    /// Pre-mutation state restored, remote rejected or unreachable.
    RolledBack { kind: MutationKind, id: BookId },
    /// The target record did not exist; nothing was applied or mirrored.
    NoOp,
}

impl Outcome {
    pub fn is_committed(&self) -> bool {
        matches!(self, Outcome::Committed { .. })
    }

    pub fn is_rolled_back(&self) -> bool {
        matches!(self, Outcome::RolledBack { .. })
    }
}
