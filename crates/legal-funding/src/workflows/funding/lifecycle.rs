//! Status state machine for funding applications.
//!
//! Planning is pure: it takes a snapshot of the record and returns the record that should be
//! written, plus the disbursement transaction for funding. Persisting the plan atomically is the
//! record store's job (see [`RecordStore::commit_transition`]).
//!
//! [`RecordStore::commit_transition`]: super::repository::RecordStore::commit_transition

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::access::Capability;
use super::domain::{
    Application, ApplicationStatus, Timestamp, Transaction, TransactionId, TransactionStatus,
    TransactionType, UserId,
};
use super::numbering;

/// Transition verbs accepted by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Approve,
    Reject,
    Fund,
}

impl ActionKind {
    pub const fn label(self) -> &'static str {
        match self {
            ActionKind::Approve => "approve",
            ActionKind::Reject => "reject",
            ActionKind::Fund => "fund",
        }
    }

    pub const fn capability(self) -> Capability {
        match self {
            ActionKind::Approve | ActionKind::Reject => Capability::ReviewApplication,
            ActionKind::Fund => Capability::FundApplication,
        }
    }

    /// Message returned when the record is not in the action's source state.
    pub const fn guard_message(self) -> &'static str {
        match self {
            ActionKind::Approve | ActionKind::Reject => "Application has already been reviewed",
            ActionKind::Fund => "Application must be approved before funding",
        }
    }
}

/// Transition table. Statuses without an entry are terminal for every action.
pub const fn next_status(from: ApplicationStatus, action: ActionKind) -> Option<ApplicationStatus> {
    match (from, action) {
        (ApplicationStatus::PendingReview, ActionKind::Approve) => Some(ApplicationStatus::Approved),
        (ApplicationStatus::PendingReview, ActionKind::Reject) => Some(ApplicationStatus::Rejected),
        (ApplicationStatus::Approved, ActionKind::Fund) => Some(ApplicationStatus::Funded),
        _ => None,
    }
}

/// Lender instructions for releasing funds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FundingInstruction {
    pub transfer_method: String,
    pub confirmed: bool,
    pub notes: Option<String>,
}

/// A requested transition with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Approve { notes: Option<String> },
    Reject { notes: Option<String> },
    Fund(FundingInstruction),
}

impl Action {
    pub const fn kind(&self) -> ActionKind {
        match self {
            Action::Approve { .. } => ActionKind::Approve,
            Action::Reject { .. } => ActionKind::Reject,
            Action::Fund(_) => ActionKind::Fund,
        }
    }

    /// Payload checks that do not depend on the stored record.
    pub fn validate(&self) -> Result<(), Vec<FieldViolation>> {
        let Action::Fund(instruction) = self else {
            return Ok(());
        };

        let mut violations = Vec::new();
        if instruction.transfer_method.trim().is_empty() {
            violations.push(FieldViolation::new(
                "transfer_method",
                "Transfer method is required",
            ));
        }
        if !instruction.confirmed {
            violations.push(FieldViolation::new("confirm", "Confirmation is required"));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Input problem tied to a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// The record's status does not admit the requested action.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct GuardViolation {
    pub status: ApplicationStatus,
    pub action: ActionKind,
    pub message: &'static str,
}

impl GuardViolation {
    pub fn new(status: ApplicationStatus, action: ActionKind) -> Self {
        Self {
            status,
            action,
            message: action.guard_message(),
        }
    }
}

/// Writes produced by a single transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTransition {
    pub source_status: ApplicationStatus,
    pub application: Application,
    pub transaction: Option<Transaction>,
}

/// Compute the record a transition should leave behind.
///
/// Stamps never precede the latest stamp already on the record, so a clock step backwards
/// cannot reorder the history.
pub fn plan<R: Rng + ?Sized>(
    current: &Application,
    action: &Action,
    actor: UserId,
    now: Timestamp,
    rng: &mut R,
) -> Result<PlannedTransition, GuardViolation> {
    let kind = action.kind();
    let target = next_status(current.status, kind)
        .ok_or_else(|| GuardViolation::new(current.status, kind))?;

    let stamp = now.max(current.latest_stamp());
    let mut application = current.clone();
    application.status = target;

    let transaction = match action {
        Action::Approve { notes } => {
            application.reviewer_id = Some(actor);
            application.review_notes = notes.clone();
            application.reviewed_at = Some(stamp);
            application.approved_at = Some(stamp);
            None
        }
        Action::Reject { notes } => {
            application.reviewer_id = Some(actor);
            application.review_notes = notes.clone();
            application.reviewed_at = Some(stamp);
            application.rejected_at = Some(stamp);
            None
        }
        Action::Fund(instruction) => {
            application.funded_at = Some(stamp);
            Some(disbursement(current, instruction, stamp, rng))
        }
    };

    Ok(PlannedTransition {
        source_status: current.status,
        application,
        transaction,
    })
}

fn disbursement<R: Rng + ?Sized>(
    application: &Application,
    instruction: &FundingInstruction,
    stamp: Timestamp,
    rng: &mut R,
) -> Transaction {
    let method = instruction.transfer_method.trim();
    Transaction {
        id: TransactionId::new(),
        transaction_number: numbering::transaction_number(rng, stamp),
        application_id: application.id,
        kind: TransactionType::Disbursement,
        amount: application.amount,
        status: TransactionStatus::Completed,
        description: format!(
            "Funding for application {} via {}",
            application.application_number, method
        ),
        provider: method.to_ascii_uppercase(),
        notes: instruction
            .notes
            .as_ref()
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty()),
        created_at: stamp,
        completed_at: Some(stamp),
    }
}
