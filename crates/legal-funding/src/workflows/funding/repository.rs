use super::domain::{
    Application, ApplicationId, ApplicationStatus, BankAccount, BankAccountId, Tenant, TenantId,
    Transaction, User, UserId,
};

/// Filter for application listings. Results are ordered newest submission first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationQuery {
    /// Restrict to a single firm; `None` lists across firms.
    pub tenant_id: Option<TenantId>,
    /// Accepted statuses; empty means any status.
    pub statuses: Vec<ApplicationStatus>,
}

impl ApplicationQuery {
    pub fn matches(&self, application: &Application) -> bool {
        let tenant_ok = self
            .tenant_id
            .map_or(true, |tenant_id| application.tenant_id == tenant_id);
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&application.status);
        tenant_ok && status_ok
    }
}

/// Every write belonging to a single lifecycle transition.
#[derive(Debug, Clone)]
pub struct TransitionCommit {
    /// Status the record must still hold for the commit to land.
    pub expected_status: ApplicationStatus,
    pub application: Application,
    pub transaction: Option<Transaction>,
}

/// Storage abstraction for firms, users, accounts, applications, and transactions.
///
/// `commit_transition` is the single serialization point for status changes: it compares the
/// stored status with `expected_status` and applies every write of the commit, or none of them.
pub trait RecordStore: Send + Sync {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError>;
    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError>;

    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    fn insert_bank_account(&self, account: BankAccount) -> Result<BankAccount, RepositoryError>;
    fn bank_account(&self, id: &BankAccountId) -> Result<Option<BankAccount>, RepositoryError>;
    fn default_bank_account(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<BankAccount>, RepositoryError>;
    /// Account management hook; clears the flag on the firm's other accounts.
    fn set_default_bank_account(&self, id: &BankAccountId) -> Result<BankAccount, RepositoryError>;

    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;
    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError>;
    fn applications(&self, query: &ApplicationQuery) -> Result<Vec<Application>, RepositoryError>;
    fn commit_transition(&self, commit: TransitionCommit) -> Result<Application, RepositoryError>;

    fn transactions_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Transaction>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record violates a unique constraint")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("record status changed to {current} before the write landed")]
    StatusMismatch { current: ApplicationStatus },
    #[error("record rejected: {0}")]
    Invariant(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
