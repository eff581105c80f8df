//! Demo firms, users, and applications for local runs.

use chrono::{Duration, Utc};
use tracing::info;

use super::domain::{
    AccountType, Application, ApplicationId, ApplicationStatus, BankAccount, BankAccountId,
    CaseDetails, FirmType, Role, Tenant, User, UserId,
};
use super::identity::{hash_password, IdentityError};
use super::repository::{RecordStore, RepositoryError};

pub const DEMO_PASSWORD: &str = "password123";

/// Handles to the records created by [`seed_demo`].
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub lender: Tenant,
    pub borrower: Tenant,
    pub users: Vec<User>,
    pub trust_account: BankAccount,
    pub applications: Vec<Application>,
}

impl DemoSeed {
    pub fn user(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|user| user.email == email)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

/// Insert the demo lender, borrower, their users, a trust account, and sample applications.
pub fn seed_demo<S: RecordStore + ?Sized>(store: &S) -> Result<DemoSeed, SeedError> {
    let password_hash = hash_password(DEMO_PASSWORD)?;
    seed_records(store, &password_hash)
}

/// Same records as [`seed_demo`] with a precomputed hash shared by every demo user.
pub fn seed_records<S: RecordStore + ?Sized>(
    store: &S,
    password_hash: &str,
) -> Result<DemoSeed, SeedError> {
    let now = Utc::now();

    let mut lender = Tenant::new(
        "Capital Legal Funding",
        FirmType::Lender,
        "info@capitallegal.com",
    );
    lender.phone = Some("555-0100".to_string());
    lender.address = Some("123 Financial District, New York, NY 10005".to_string());
    let lender = store.insert_tenant(lender)?;

    let mut borrower = Tenant::new("Smith & Associates", FirmType::Borrower, "contact@smithlaw.com");
    borrower.phone = Some("555-0200".to_string());
    borrower.address = Some("456 Main Street, Boston, MA 02108".to_string());
    let borrower = store.insert_tenant(borrower)?;

    let people = [
        ("lender@lawfirm.com", "John Lender", Role::LenderAdmin, lender.id),
        ("reviewer@lawfirm.com", "Jane Reviewer", Role::LenderReviewer, lender.id),
        ("borrower@lawfirm.com", "Bob Borrower", Role::BorrowerAdmin, borrower.id),
        ("user@lawfirm.com", "Alice User", Role::BorrowerUser, borrower.id),
    ];
    let mut users = Vec::with_capacity(people.len());
    for (email, name, role, tenant_id) in people {
        users.push(store.insert_user(User {
            id: UserId::new(),
            tenant_id,
            email: email.to_string(),
            name: name.to_string(),
            role,
            password_hash: password_hash.to_string(),
        })?);
    }
    let lender_admin = users[0].id;
    let reviewer = users[1].id;

    let trust_account = store.insert_bank_account(BankAccount {
        id: BankAccountId::new(),
        tenant_id: borrower.id,
        account_name: "Smith & Associates Trust Account".to_string(),
        account_number: "7890".to_string(),
        routing_number: "021000021".to_string(),
        bank_name: "Chase Bank".to_string(),
        account_type: AccountType::Checking,
        is_default: true,
        is_trust: true,
    })?;

    let base = |number: &str, amount: u64, purpose: &str, case: CaseDetails, days_ago: i64| {
        Application {
            id: ApplicationId::new(),
            application_number: number.to_string(),
            tenant_id: borrower.id,
            amount,
            purpose: purpose.to_string(),
            case,
            bank_account_id: trust_account.id,
            status: ApplicationStatus::PendingReview,
            reviewer_id: None,
            review_notes: None,
            submitted_at: now - Duration::days(days_ago),
            reviewed_at: None,
            approved_at: None,
            rejected_at: None,
            funded_at: None,
        }
    };

    let mut under_review = base(
        "APP-2024-001",
        50_000,
        "Case expenses and expert witness fees",
        case_details(
            "CV-2024-12345",
            "Smith v. Johnson Corp.",
            "Superior Court of Massachusetts",
            "Massachusetts",
            "12 months",
            "18 months",
            "Case filed, discovery in progress. Funding needed for expert witness testimony.",
        ),
        4,
    );
    under_review.status = ApplicationStatus::UnderReview;
    under_review.reviewer_id = Some(reviewer);
    under_review.reviewed_at = Some(now - Duration::days(1));

    let pending = base(
        "APP-2024-002",
        75_000,
        "Trial expenses and court fees",
        case_details(
            "CV-2024-23456",
            "Williams v. City of Boston",
            "US District Court, District of Massachusetts",
            "Federal",
            "18 months",
            "24 months",
            "Complex litigation requiring significant trial preparation.",
        ),
        2,
    );

    let mut approved = base(
        "APP-2024-003",
        35_000,
        "Settlement negotiation expenses",
        case_details(
            "CV-2024-34567",
            "Davis v. Tech Startup Inc.",
            "Superior Court of California",
            "California",
            "6 months",
            "12 months",
            "Case likely to settle soon. Funding for final negotiations.",
        ),
        5,
    );
    approved.status = ApplicationStatus::Approved;
    approved.reviewer_id = Some(lender_admin);
    approved.reviewed_at = Some(now);
    approved.approved_at = Some(now);

    let mut applications = Vec::new();
    for application in [under_review, pending, approved] {
        applications.push(store.insert_application(application)?);
    }

    info!(
        users = users.len(),
        applications = applications.len(),
        "demo records seeded"
    );

    Ok(DemoSeed {
        lender,
        borrower,
        users,
        trust_account,
        applications,
    })
}

fn case_details(
    number: &str,
    name: &str,
    court: &str,
    jurisdiction: &str,
    duration: &str,
    term: &str,
    notes: &str,
) -> CaseDetails {
    CaseDetails {
        case_number: Some(number.to_string()),
        case_name: Some(name.to_string()),
        court_name: Some(court.to_string()),
        jurisdiction: Some(jurisdiction.to_string()),
        estimated_duration: Some(duration.to_string()),
        requested_term: Some(term.to_string()),
        notes: Some(notes.to_string()),
    }
}
