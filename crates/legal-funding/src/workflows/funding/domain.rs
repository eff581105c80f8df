use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type Timestamp = DateTime<Utc>;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim()).map(Self)
            }
        }
    };
}

record_id!(
    /// Law firm identifier.
    TenantId
);
record_id!(UserId);
record_id!(BankAccountId);
record_id!(
    /// Record identifier for a funding application, distinct from its human facing number.
    ApplicationId
);
record_id!(TransactionId);

/// Which side of the market a firm operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FirmType {
    Lender,
    Borrower,
}

/// A law firm account. Either lends to, or borrows from, the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub firm_type: FirmType,
    pub is_lender: bool,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl Tenant {
    pub fn new(name: impl Into<String>, firm_type: FirmType, email: impl Into<String>) -> Self {
        Self {
            id: TenantId::new(),
            name: name.into(),
            firm_type,
            is_lender: firm_type == FirmType::Lender,
            email: email.into(),
            phone: None,
            address: None,
        }
    }

    /// `is_lender` must mirror the firm type.
    pub fn is_consistent(&self) -> bool {
        self.is_lender == (self.firm_type == FirmType::Lender)
    }
}

/// Closed set of platform roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    LenderAdmin,
    LenderReviewer,
    BorrowerAdmin,
    BorrowerUser,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::LenderAdmin,
        Role::LenderReviewer,
        Role::BorrowerAdmin,
        Role::BorrowerUser,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Role::LenderAdmin => "LENDER_ADMIN",
            Role::LenderReviewer => "LENDER_REVIEWER",
            Role::BorrowerAdmin => "BORROWER_ADMIN",
            Role::BorrowerUser => "BORROWER_USER",
        }
    }

    /// Market side the role acts for.
    pub const fn side(self) -> FirmType {
        match self {
            Role::LenderAdmin | Role::LenderReviewer => FirmType::Lender,
            Role::BorrowerAdmin | Role::BorrowerUser => FirmType::Borrower,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.label() == value.trim())
            .ok_or_else(|| UnknownVariant(value.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown value '{0}'")]
pub struct UnknownVariant(pub String);

/// Platform user. Always belongs to exactly one firm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: TenantId,
    pub email: String,
    pub name: String,
    pub role: Role,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    Checking,
    Savings,
}

impl AccountType {
    pub const fn label(self) -> &'static str {
        match self {
            AccountType::Checking => "CHECKING",
            AccountType::Savings => "SAVINGS",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    pub id: BankAccountId,
    pub tenant_id: TenantId,
    pub account_name: String,
    /// Trailing digits only; full numbers never enter the platform.
    pub account_number: String,
    pub routing_number: String,
    pub bank_name: String,
    pub account_type: AccountType,
    pub is_default: bool,
    pub is_trust: bool,
}

/// Lifecycle status for a funding application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    PendingReview,
    UnderReview,
    Approved,
    Rejected,
    FundingInProgress,
    Funded,
    Repaid,
    Defaulted,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::PendingReview,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
        ApplicationStatus::Rejected,
        ApplicationStatus::FundingInProgress,
        ApplicationStatus::Funded,
        ApplicationStatus::Repaid,
        ApplicationStatus::Defaulted,
    ];

    /// Statuses lenders work from when triaging incoming requests.
    pub const REVIEW_QUEUE: [ApplicationStatus; 3] = [
        ApplicationStatus::PendingReview,
        ApplicationStatus::UnderReview,
        ApplicationStatus::Approved,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::PendingReview => "PENDING_REVIEW",
            ApplicationStatus::UnderReview => "UNDER_REVIEW",
            ApplicationStatus::Approved => "APPROVED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::FundingInProgress => "FUNDING_IN_PROGRESS",
            ApplicationStatus::Funded => "FUNDED",
            ApplicationStatus::Repaid => "REPAID",
            ApplicationStatus::Defaulted => "DEFAULTED",
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ApplicationStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_uppercase();
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.label() == normalized)
            .ok_or_else(|| UnknownVariant(value.to_string()))
    }
}

/// Optional litigation details attached by the borrower.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseDetails {
    #[serde(default)]
    pub case_number: Option<String>,
    #[serde(default)]
    pub case_name: Option<String>,
    #[serde(default)]
    pub court_name: Option<String>,
    #[serde(default)]
    pub jurisdiction: Option<String>,
    #[serde(default)]
    pub estimated_duration: Option<String>,
    #[serde(default)]
    pub requested_term: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CaseDetails {
    /// Blank strings are treated as absent.
    pub fn normalized(self) -> Self {
        fn clean(value: Option<String>) -> Option<String> {
            value
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        }

        Self {
            case_number: clean(self.case_number),
            case_name: clean(self.case_name),
            court_name: clean(self.court_name),
            jurisdiction: clean(self.jurisdiction),
            estimated_duration: clean(self.estimated_duration),
            requested_term: clean(self.requested_term),
            notes: clean(self.notes),
        }
    }
}

/// Borrower supplied fields for a new application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationRequest {
    pub amount: u64,
    pub purpose: String,
    #[serde(flatten)]
    pub case: CaseDetails,
}

/// A borrower's funding request against a litigation case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub application_number: String,
    pub tenant_id: TenantId,
    pub amount: u64,
    pub purpose: String,
    #[serde(flatten)]
    pub case: CaseDetails,
    /// Snapshot of the firm's default account when the request was filed.
    pub bank_account_id: BankAccountId,
    pub status: ApplicationStatus,
    pub reviewer_id: Option<UserId>,
    pub review_notes: Option<String>,
    pub submitted_at: Timestamp,
    pub reviewed_at: Option<Timestamp>,
    pub approved_at: Option<Timestamp>,
    pub rejected_at: Option<Timestamp>,
    pub funded_at: Option<Timestamp>,
}

impl Application {
    /// Latest lifecycle stamp present on the record.
    pub fn latest_stamp(&self) -> Timestamp {
        [
            self.reviewed_at,
            self.approved_at,
            self.rejected_at,
            self.funded_at,
        ]
        .into_iter()
        .flatten()
        .fold(self.submitted_at, Timestamp::max)
    }

    /// Checks that the decision stamps agree with the status.
    pub fn stamps_consistent(&self) -> bool {
        let reviewed = self.reviewed_at.is_some();
        let approved = self.approved_at.is_some();
        let rejected = self.rejected_at.is_some();
        let funded = self.funded_at.is_some();

        match self.status {
            ApplicationStatus::PendingReview => !reviewed && !approved && !rejected && !funded,
            ApplicationStatus::UnderReview => !approved && !rejected && !funded,
            ApplicationStatus::Approved | ApplicationStatus::FundingInProgress => {
                reviewed && approved && !rejected && !funded
            }
            ApplicationStatus::Rejected => reviewed && rejected && !approved && !funded,
            ApplicationStatus::Funded | ApplicationStatus::Repaid | ApplicationStatus::Defaulted => {
                reviewed && approved && !rejected && funded
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Disbursement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Completed,
}

/// Immutable record of a fund movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub transaction_number: String,
    pub application_id: ApplicationId,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub amount: u64,
    pub status: TransactionStatus,
    pub description: String,
    pub provider: String,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub completed_at: Option<Timestamp>,
}
