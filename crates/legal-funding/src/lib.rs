//! Loan-application lifecycle for legal-funding firms.
//!
//! Borrower firms submit funding requests against litigation cases, lender firms review and
//! fund them, and approved applications can be rendered into a loan agreement document.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
