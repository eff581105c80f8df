use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::LendingConfig;

use super::access::{Capability, Identity};
use super::document::{
    format_amount, AgreementSnapshot, DocumentRenderer, RenderError, RenderedDocument,
};
use super::domain::{
    Application, ApplicationId, ApplicationRequest, ApplicationStatus, Timestamp, Transaction,
};
use super::identity::IdentityError;
use super::lifecycle::{
    self, Action, ActionKind, FieldViolation, FundingInstruction, GuardViolation,
};
use super::numbering;
use super::repository::{ApplicationQuery, RecordStore, RepositoryError, TransitionCommit};

/// Owns the application state machine and the checks guarding it.
///
/// Holds no lock of its own. Every status change is planned from a snapshot and committed
/// through [`RecordStore::commit_transition`], which rejects the write when the status moved
/// underneath it.
pub struct LifecycleManager<S, D> {
    store: Arc<S>,
    renderer: Arc<D>,
    lending: LendingConfig,
    clock: fn() -> Timestamp,
}

/// An application together with the fund movements recorded against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplicationDetail {
    #[serde(flatten)]
    pub application: Application,
    pub transactions: Vec<Transaction>,
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub application: Application,
    pub transaction: Option<Transaction>,
}

impl<S, D> LifecycleManager<S, D>
where
    S: RecordStore + 'static,
    D: DocumentRenderer + 'static,
{
    pub fn new(store: Arc<S>, renderer: Arc<D>, lending: LendingConfig) -> Self {
        Self {
            store,
            renderer,
            lending,
            clock: Utc::now,
        }
    }

    /// Replace the wall clock, mostly for tests that pin timestamps.
    pub fn with_clock(mut self, clock: fn() -> Timestamp) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn lending(&self) -> &LendingConfig {
        &self.lending
    }

    /// File a new application for the caller's own firm.
    pub fn create(
        &self,
        identity: &Identity,
        request: ApplicationRequest,
    ) -> Result<Application, LifecycleError> {
        require(identity, Capability::SubmitApplication)?;
        let request = self.validate_request(request)?;

        let account = self
            .store
            .default_bank_account(&identity.tenant_id)?
            .ok_or(LifecycleError::NoDefaultAccount)?;

        let mut rng = rand::thread_rng();
        for attempt in 1..=self.lending.number_attempts {
            let now = (self.clock)();
            let application = Application {
                id: ApplicationId::new(),
                application_number: numbering::application_number(&mut rng, now),
                tenant_id: identity.tenant_id,
                amount: request.amount,
                purpose: request.purpose.clone(),
                case: request.case.clone(),
                bank_account_id: account.id,
                status: ApplicationStatus::PendingReview,
                reviewer_id: None,
                review_notes: None,
                submitted_at: now,
                reviewed_at: None,
                approved_at: None,
                rejected_at: None,
                funded_at: None,
            };

            match self.store.insert_application(application) {
                Ok(stored) => {
                    info!(
                        application = %stored.application_number,
                        tenant_id = %stored.tenant_id,
                        amount = stored.amount,
                        "application submitted"
                    );
                    return Ok(stored);
                }
                Err(RepositoryError::Conflict) => {
                    warn!(attempt, "application number already taken; retrying");
                }
                Err(other) => return Err(other.into()),
            }
        }

        Err(LifecycleError::Conflict)
    }

    /// Lender roles see the cross-firm review queue; borrower roles see their own firm.
    pub fn list(
        &self,
        identity: &Identity,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<Application>, LifecycleError> {
        let query = if identity.can(Capability::ViewAllTenants) {
            let statuses: Vec<ApplicationStatus> = ApplicationStatus::REVIEW_QUEUE
                .into_iter()
                .filter(|queued| status.map_or(true, |wanted| wanted == *queued))
                .collect();
            if statuses.is_empty() {
                return Ok(Vec::new());
            }
            ApplicationQuery {
                tenant_id: None,
                statuses,
            }
        } else if identity.can(Capability::ViewOwnTenant) {
            ApplicationQuery {
                tenant_id: Some(identity.tenant_id),
                statuses: status.into_iter().collect(),
            }
        } else {
            return Ok(Vec::new());
        };

        Ok(self.store.applications(&query)?)
    }

    pub fn get(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
    ) -> Result<ApplicationDetail, LifecycleError> {
        let application = self.visible_application(identity, application_id)?;
        let transactions = self.store.transactions_for(&application.id)?;
        Ok(ApplicationDetail {
            application,
            transactions,
        })
    }

    /// Approve or reject. `decision` is the raw verb supplied by the caller.
    pub fn review(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
        decision: &str,
        notes: Option<String>,
    ) -> Result<Application, LifecycleError> {
        require(identity, Capability::ReviewApplication)?;

        let notes = notes
            .map(|notes| notes.trim().to_string())
            .filter(|notes| !notes.is_empty());
        let action = match decision.trim().to_ascii_lowercase().as_str() {
            "approve" => Action::Approve { notes },
            "reject" => Action::Reject { notes },
            _ => {
                return Err(LifecycleError::ValidationFailed(vec![FieldViolation::new(
                    "action",
                    "Invalid action",
                )]))
            }
        };

        self.transition(identity, application_id, action)
            .map(|outcome| outcome.application)
    }

    /// Release funds for an approved application.
    pub fn fund(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
        instruction: FundingInstruction,
    ) -> Result<(Application, Transaction), LifecycleError> {
        let outcome = self.transition(identity, application_id, Action::Fund(instruction))?;
        match outcome.transaction {
            Some(transaction) => Ok((outcome.application, transaction)),
            None => Err(internal(
                "fund",
                "funding transition committed without a transaction",
            )),
        }
    }

    /// Apply a single lifecycle action.
    ///
    /// Checks run in a fixed order: capability, payload, existence, source status. A lost race
    /// with another writer is reported exactly like a stale request.
    pub fn transition(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
        action: Action,
    ) -> Result<TransitionOutcome, LifecycleError> {
        let kind = action.kind();
        require(identity, kind.capability())?;
        action.validate().map_err(LifecycleError::ValidationFailed)?;

        let current = self
            .store
            .application(application_id)?
            .ok_or(LifecycleError::NotFound {
                entity: "application",
            })?;

        let planned = lifecycle::plan(
            &current,
            &action,
            identity.user_id,
            (self.clock)(),
            &mut rand::thread_rng(),
        )?;

        let number = planned.application.application_number.clone();
        let commit = TransitionCommit {
            expected_status: planned.source_status,
            application: planned.application,
            transaction: planned.transaction.clone(),
        };

        let application = match self.store.commit_transition(commit) {
            Ok(application) => application,
            Err(RepositoryError::StatusMismatch { current }) => {
                info!(
                    application = %number,
                    action = kind.label(),
                    status = %current,
                    "transition lost a concurrent race"
                );
                return Err(GuardViolation::new(current, kind).into());
            }
            Err(other) => return Err(other.into()),
        };

        info!(
            application = %application.application_number,
            action = kind.label(),
            from = %planned.source_status,
            to = %application.status,
            actor = %identity.user_id,
            "application transitioned"
        );

        Ok(TransitionOutcome {
            application,
            transaction: planned.transaction,
        })
    }

    /// Render the loan agreement for an approved application.
    pub fn render_agreement(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
    ) -> Result<RenderedDocument, LifecycleError> {
        let application = self.visible_application(identity, application_id)?;
        if application.status != ApplicationStatus::Approved {
            return Err(LifecycleError::InvalidState {
                message: "Application must be approved to generate agreement",
            });
        }

        let borrower = self
            .store
            .tenant(&application.tenant_id)?
            .ok_or_else(|| internal("render_agreement", "application references a missing firm"))?;
        let disbursement_account = self.store.bank_account(&application.bank_account_id)?;
        let reviewer_name = match application.reviewer_id {
            Some(reviewer_id) => self.store.user(&reviewer_id)?.map(|user| user.name),
            None => None,
        };

        let snapshot = AgreementSnapshot {
            generated_on: (self.clock)().date_naive(),
            application,
            borrower,
            disbursement_account,
            reviewer_name,
        };

        Ok(self.renderer.render(&snapshot)?)
    }

    fn visible_application(
        &self,
        identity: &Identity,
        application_id: &ApplicationId,
    ) -> Result<Application, LifecycleError> {
        let application = self
            .store
            .application(application_id)?
            .ok_or(LifecycleError::NotFound {
                entity: "application",
            })?;
        if !identity.can_view(&application.tenant_id) {
            return Err(LifecycleError::Forbidden);
        }
        Ok(application)
    }

    fn validate_request(
        &self,
        request: ApplicationRequest,
    ) -> Result<ApplicationRequest, LifecycleError> {
        let purpose = request.purpose.trim().to_string();
        let mut violations = Vec::new();

        if request.amount < self.lending.minimum_amount {
            violations.push(FieldViolation::new(
                "amount",
                format!(
                    "Amount must be at least {}",
                    format_amount(self.lending.minimum_amount)
                ),
            ));
        }
        if purpose.chars().count() < self.lending.minimum_purpose_chars {
            violations.push(FieldViolation::new(
                "purpose",
                format!(
                    "Purpose must be at least {} characters",
                    self.lending.minimum_purpose_chars
                ),
            ));
        }

        if !violations.is_empty() {
            return Err(LifecycleError::ValidationFailed(violations));
        }

        Ok(ApplicationRequest {
            amount: request.amount,
            purpose,
            case: request.case.normalized(),
        })
    }
}

pub(crate) fn require(identity: &Identity, capability: Capability) -> Result<(), LifecycleError> {
    if identity.can(capability) {
        Ok(())
    } else {
        warn!(
            user_id = %identity.user_id,
            role = %identity.role,
            capability = capability.label(),
            "capability denied"
        );
        Err(LifecycleError::Forbidden)
    }
}

pub(crate) fn internal(operation: &'static str, detail: impl std::fmt::Display) -> LifecycleError {
    error!(operation, error = %detail, "lifecycle operation failed");
    LifecycleError::InternalFailure(detail.to_string())
}

/// Error raised by the lifecycle manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden")]
    Forbidden,
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("validation failed")]
    ValidationFailed(Vec<FieldViolation>),
    #[error("{message}")]
    InvalidTransition {
        status: ApplicationStatus,
        action: ActionKind,
        message: &'static str,
    },
    #[error("No default bank account found. Please set up your bank account first.")]
    NoDefaultAccount,
    #[error("{message}")]
    InvalidState { message: &'static str },
    #[error("conflicting write; please retry")]
    Conflict,
    #[error("internal failure: {0}")]
    InternalFailure(String),
}

impl From<GuardViolation> for LifecycleError {
    fn from(violation: GuardViolation) -> Self {
        LifecycleError::InvalidTransition {
            status: violation.status,
            action: violation.action,
            message: violation.message,
        }
    }
}

impl From<RepositoryError> for LifecycleError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict => LifecycleError::Conflict,
            RepositoryError::NotFound => LifecycleError::NotFound { entity: "record" },
            other => internal("repository", other),
        }
    }
}

impl From<IdentityError> for LifecycleError {
    fn from(error: IdentityError) -> Self {
        match error {
            IdentityError::Unauthenticated => LifecycleError::Unauthenticated,
            other => internal("identity", other),
        }
    }
}

impl From<RenderError> for LifecycleError {
    fn from(error: RenderError) -> Self {
        internal("render", error)
    }
}
