use std::sync::{Arc, OnceLock};

use axum::http::StatusCode;
use axum::response::Response;
use chrono::{TimeZone, Utc};
use serde_json::Value;

use crate::config::LendingConfig;
use crate::workflows::funding::access::Identity;
use crate::workflows::funding::document::AgreementRenderer;
use crate::workflows::funding::domain::{
    AccountType, Application, ApplicationRequest, ApplicationStatus, BankAccount, BankAccountId,
    CaseDetails, FirmType, Role, Tenant, Timestamp, User, UserId,
};
use crate::workflows::funding::identity::{hash_password, SessionDirectory};
use crate::workflows::funding::lifecycle::FundingInstruction;
use crate::workflows::funding::memory::InMemoryRecordStore;
use crate::workflows::funding::repository::RecordStore;
use crate::workflows::funding::router::{funding_router, FundingState};
use crate::workflows::funding::seed::{seed_records, DemoSeed, DEMO_PASSWORD};
use crate::workflows::funding::service::LifecycleManager;

pub(super) type Manager = LifecycleManager<InMemoryRecordStore, AgreementRenderer>;

pub(super) const LENDER_ADMIN: &str = "lender@lawfirm.com";
pub(super) const REVIEWER: &str = "reviewer@lawfirm.com";
pub(super) const BORROWER_ADMIN: &str = "borrower@lawfirm.com";
pub(super) const BORROWER_USER: &str = "user@lawfirm.com";

/// Argon2 is slow in debug builds; hash the demo password once per test binary.
pub(super) fn demo_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| hash_password(DEMO_PASSWORD).expect("demo password hashes"))
}

pub(super) struct Fixture {
    pub store: Arc<InMemoryRecordStore>,
    pub manager: Arc<Manager>,
    pub sessions: Arc<SessionDirectory<InMemoryRecordStore>>,
    pub seed: DemoSeed,
}

impl Fixture {
    pub fn identity(&self, email: &str) -> Identity {
        let user = self.seed.user(email).expect("seeded user");
        Identity {
            user_id: user.id,
            role: user.role,
            tenant_id: user.tenant_id,
        }
    }

    pub fn seeded(&self, number: &str) -> Application {
        self.seed
            .applications
            .iter()
            .find(|application| application.application_number == number)
            .cloned()
            .expect("seeded application")
    }

    pub fn router(&self) -> axum::Router {
        funding_router(FundingState {
            manager: Arc::clone(&self.manager),
            sessions: Arc::clone(&self.sessions),
        })
    }

    pub fn token(&self, email: &str) -> String {
        self.sessions
            .sign_in(email, DEMO_PASSWORD)
            .expect("demo sign in")
            .token
    }

    /// A fresh PENDING_REVIEW application filed by the borrower admin.
    pub fn pending(&self, amount: u64) -> Application {
        self.manager
            .create(&self.identity(BORROWER_ADMIN), request(amount, "Expert witness retainer"))
            .expect("application created")
    }

    pub fn approved(&self, amount: u64) -> Application {
        let pending = self.pending(amount);
        self.manager
            .review(&self.identity(REVIEWER), &pending.id, "approve", None)
            .expect("approval succeeds")
    }
}

pub(super) fn fixture() -> Fixture {
    fixture_with(LendingConfig::default())
}

pub(super) fn fixture_with(lending: LendingConfig) -> Fixture {
    let store = Arc::new(InMemoryRecordStore::new());
    let seed = seed_records(store.as_ref(), demo_hash()).expect("demo records seed");
    let renderer = Arc::new(AgreementRenderer::new(lending.clone()));
    let manager = Arc::new(LifecycleManager::new(Arc::clone(&store), renderer, lending));
    let sessions = Arc::new(SessionDirectory::new(Arc::clone(&store)));

    Fixture {
        store,
        manager,
        sessions,
        seed,
    }
}

pub(super) fn request(amount: u64, purpose: &str) -> ApplicationRequest {
    ApplicationRequest {
        amount,
        purpose: purpose.to_string(),
        case: CaseDetails {
            case_number: Some("CV-2025-00042".to_string()),
            case_name: Some("Smith v. Acme Logistics".to_string()),
            court_name: Some("Suffolk Superior Court".to_string()),
            jurisdiction: Some("Massachusetts".to_string()),
            estimated_duration: None,
            requested_term: Some("  ".to_string()),
            notes: None,
        },
    }
}

pub(super) fn wire() -> FundingInstruction {
    FundingInstruction {
        transfer_method: "wire".to_string(),
        confirmed: true,
        notes: Some("Release to trust account".to_string()),
    }
}

/// Borrower firm with a user but no bank accounts on file.
pub(super) fn accountless_borrower(store: &InMemoryRecordStore) -> Identity {
    let tenant = store
        .insert_tenant(Tenant::new(
            "Doe Litigation Group",
            FirmType::Borrower,
            "intake@doelitigation.test",
        ))
        .expect("tenant inserted");
    let user = store
        .insert_user(User {
            id: UserId::new(),
            tenant_id: tenant.id,
            email: "paralegal@doelitigation.test".to_string(),
            name: "Pat Paralegal".to_string(),
            role: Role::BorrowerUser,
            password_hash: demo_hash().to_string(),
        })
        .expect("user inserted");
    Identity {
        user_id: user.id,
        role: user.role,
        tenant_id: tenant.id,
    }
}

pub(super) fn savings_account(tenant: &Tenant, is_default: bool) -> BankAccount {
    BankAccount {
        id: BankAccountId::new(),
        tenant_id: tenant.id,
        account_name: format!("{} Operating", tenant.name),
        account_number: "4321".to_string(),
        routing_number: "011000138".to_string(),
        bank_name: "Eastern Bank".to_string(),
        account_type: AccountType::Savings,
        is_default,
        is_trust: false,
    }
}

pub(super) fn fixed_now() -> Timestamp {
    Utc.with_ymd_and_hms(2025, 6, 2, 15, 0, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn assert_status(application: &Application, status: ApplicationStatus) {
    assert_eq!(application.status, status);
    assert!(
        application.stamps_consistent(),
        "stamps disagree with {status}: {application:?}"
    );
}

pub(super) fn assert_error_status(response: &Response, status: StatusCode) {
    assert_eq!(response.status(), status);
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
