use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::access::role_fits_tenant;
use super::domain::{
    Application, ApplicationId, BankAccount, BankAccountId, Tenant, TenantId, Transaction, User,
    UserId,
};
use super::repository::{ApplicationQuery, RecordStore, RepositoryError, TransitionCommit};

#[derive(Debug, Default)]
struct Tables {
    tenants: HashMap<TenantId, Tenant>,
    users: HashMap<UserId, User>,
    bank_accounts: HashMap<BankAccountId, BankAccount>,
    applications: HashMap<ApplicationId, Application>,
    transactions: Vec<Transaction>,
}

/// Process-local record store. One mutex guards every table, so each call is atomic.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record store lock poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_tenant(&self, tenant: Tenant) -> Result<Tenant, RepositoryError> {
        if !tenant.is_consistent() {
            return Err(RepositoryError::Invariant(
                "lender flag disagrees with firm type".to_string(),
            ));
        }

        let mut tables = self.lock()?;
        let duplicate = tables.tenants.contains_key(&tenant.id)
            || tables
                .tenants
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&tenant.email));
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables.tenants.insert(tenant.id, tenant.clone());
        Ok(tenant)
    }

    fn tenant(&self, id: &TenantId) -> Result<Option<Tenant>, RepositoryError> {
        Ok(self.lock()?.tenants.get(id).cloned())
    }

    fn insert_user(&self, user: User) -> Result<User, RepositoryError> {
        let mut tables = self.lock()?;
        let tenant = tables
            .tenants
            .get(&user.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        if !role_fits_tenant(user.role, tenant) {
            return Err(RepositoryError::Invariant(format!(
                "role {} does not fit firm {}",
                user.role, tenant.name
            )));
        }

        let duplicate = tables.users.contains_key(&user.id)
            || tables
                .users
                .values()
                .any(|existing| existing.email.eq_ignore_ascii_case(&user.email));
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn user(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    fn user_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let email = email.trim();
        Ok(self
            .lock()?
            .users
            .values()
            .find(|user| user.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn insert_bank_account(&self, account: BankAccount) -> Result<BankAccount, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.tenants.contains_key(&account.tenant_id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.bank_accounts.contains_key(&account.id) {
            return Err(RepositoryError::Conflict);
        }
        if account.is_default {
            clear_default(&mut tables, &account.tenant_id);
        }
        tables.bank_accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn bank_account(&self, id: &BankAccountId) -> Result<Option<BankAccount>, RepositoryError> {
        Ok(self.lock()?.bank_accounts.get(id).cloned())
    }

    fn default_bank_account(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<BankAccount>, RepositoryError> {
        Ok(self
            .lock()?
            .bank_accounts
            .values()
            .find(|account| account.tenant_id == *tenant_id && account.is_default)
            .cloned())
    }

    fn set_default_bank_account(&self, id: &BankAccountId) -> Result<BankAccount, RepositoryError> {
        let mut tables = self.lock()?;
        let tenant_id = tables
            .bank_accounts
            .get(id)
            .map(|account| account.tenant_id)
            .ok_or(RepositoryError::NotFound)?;
        clear_default(&mut tables, &tenant_id);

        let account = tables
            .bank_accounts
            .get_mut(id)
            .ok_or(RepositoryError::NotFound)?;
        account.is_default = true;
        Ok(account.clone())
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.lock()?;
        let duplicate = tables.applications.contains_key(&application.id)
            || tables
                .applications
                .values()
                .any(|existing| existing.application_number == application.application_number);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }

        let account_matches = tables
            .bank_accounts
            .get(&application.bank_account_id)
            .is_some_and(|account| account.tenant_id == application.tenant_id);
        if !account_matches {
            return Err(RepositoryError::Invariant(
                "disbursement account must belong to the applying firm".to_string(),
            ));
        }

        tables.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn application(&self, id: &ApplicationId) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(id).cloned())
    }

    fn applications(&self, query: &ApplicationQuery) -> Result<Vec<Application>, RepositoryError> {
        let tables = self.lock()?;
        let mut matches: Vec<Application> = tables
            .applications
            .values()
            .filter(|application| query.matches(application))
            .cloned()
            .collect();
        matches.sort_by(|left, right| {
            right
                .submitted_at
                .cmp(&left.submitted_at)
                .then_with(|| right.application_number.cmp(&left.application_number))
        });
        Ok(matches)
    }

    fn commit_transition(&self, commit: TransitionCommit) -> Result<Application, RepositoryError> {
        let TransitionCommit {
            expected_status,
            application,
            transaction,
        } = commit;

        let mut tables = self.lock()?;
        let current = tables
            .applications
            .get(&application.id)
            .map(|stored| stored.status)
            .ok_or(RepositoryError::NotFound)?;
        if current != expected_status {
            return Err(RepositoryError::StatusMismatch { current });
        }

        // Validate every write before applying any of them.
        if let Some(transaction) = &transaction {
            let duplicate = tables.transactions.iter().any(|existing| {
                existing.id == transaction.id
                    || existing.transaction_number == transaction.transaction_number
            });
            if duplicate {
                return Err(RepositoryError::Conflict);
            }
        }

        if let Some(transaction) = transaction {
            tables.transactions.push(transaction);
        }
        tables.applications.insert(application.id, application.clone());
        Ok(application)
    }

    fn transactions_for(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        Ok(self
            .lock()?
            .transactions
            .iter()
            .filter(|transaction| transaction.application_id == *application_id)
            .cloned()
            .collect())
    }
}

fn clear_default(tables: &mut Tables, tenant_id: &TenantId) {
    tables
        .bank_accounts
        .values_mut()
        .filter(|account| account.tenant_id == *tenant_id)
        .for_each(|account| account.is_default = false);
}
