//! Funding application lifecycle: intake, review, disbursement, and loan agreements.
//!
//! Borrower firms file applications against their default bank account, lender firms move them
//! through review and funding, and approved applications render into a loan agreement PDF.

pub mod access;
pub mod document;
pub mod domain;
pub mod identity;
pub mod lifecycle;
pub mod memory;
pub(crate) mod numbering;
pub mod repository;
pub mod router;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use access::{capabilities, permits, Capability, Identity};
pub use document::{
    AgreementRenderer, AgreementSnapshot, DocumentRenderer, RenderError, RenderedDocument,
};
pub use domain::{
    AccountType, Application, ApplicationId, ApplicationRequest, ApplicationStatus, BankAccount,
    BankAccountId, CaseDetails, FirmType, Role, Tenant, TenantId, Transaction, TransactionId,
    User, UserId,
};
pub use identity::{IdentityError, IdentityProvider, Session, SessionDirectory};
pub use lifecycle::{Action, ActionKind, FieldViolation, FundingInstruction};
pub use memory::InMemoryRecordStore;
pub use repository::{ApplicationQuery, RecordStore, RepositoryError, TransitionCommit};
pub use router::{funding_router, FundingState};
pub use seed::{seed_demo, seed_records, DemoSeed, SeedError, DEMO_PASSWORD};
pub use service::{ApplicationDetail, LifecycleError, LifecycleManager, TransitionOutcome};
