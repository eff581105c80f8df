//! Loan agreement documents for approved applications.

mod agreement;
mod layout;

pub use agreement::{format_amount, AgreementRenderer};
pub use layout::{Element, FontStyle, BODY_LIMIT_MM};

use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{Application, BankAccount, Tenant};

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// Everything the agreement template reads. Built by the lifecycle manager from store records.
#[derive(Debug, Clone, Serialize)]
pub struct AgreementSnapshot {
    pub application: Application,
    pub borrower: Tenant,
    pub disbursement_account: Option<BankAccount>,
    pub reviewer_name: Option<String>,
    pub generated_on: NaiveDate,
}

/// Rendered output ready to stream to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Pure transformation from snapshot to document bytes.
pub trait DocumentRenderer: Send + Sync {
    fn render(&self, snapshot: &AgreementSnapshot) -> Result<RenderedDocument, RenderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("pdf encoding failed: {0}")]
    Pdf(String),
}
