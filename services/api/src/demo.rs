use crate::infra::funding_state;
use clap::Args;
use legal_funding::config::AppConfig;
use legal_funding::error::AppError;
use legal_funding::workflows::funding::document::format_amount;
use legal_funding::workflows::funding::{
    seed_demo, ApplicationRequest, CaseDetails, DemoSeed, FundingInstruction, Identity,
    InMemoryRecordStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Requested amount in whole dollars for the sample application.
    #[arg(long, default_value_t = 60_000)]
    pub(crate) amount: u64,
    /// Write the rendered loan agreement PDF to this path.
    #[arg(long)]
    pub(crate) write_agreement: Option<PathBuf>,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        amount,
        write_agreement,
    } = args;

    let config = AppConfig::load()?;
    let store = Arc::new(InMemoryRecordStore::new());
    let seed = seed_demo(store.as_ref())?;
    let state = funding_state(Arc::clone(&store), config.lending.clone());
    let manager = state.manager;

    println!("Legal funding lifecycle demo");
    println!(
        "- Lender {} | borrower {} | {} seeded applications",
        seed.lender.name,
        seed.borrower.name,
        seed.applications.len()
    );
    for application in &seed.applications {
        println!(
            "  - {} {} {}",
            application.application_number,
            format_amount(application.amount),
            application.status
        );
    }

    let (Some(borrower), Some(reviewer), Some(lender)) = (
        demo_identity(&seed, "borrower@lawfirm.com"),
        demo_identity(&seed, "reviewer@lawfirm.com"),
        demo_identity(&seed, "lender@lawfirm.com"),
    ) else {
        println!("  Demo users missing from seed; nothing to walk through");
        return Ok(());
    };

    let request = ApplicationRequest {
        amount,
        purpose: "Expert witness fees and deposition transcripts".to_string(),
        case: CaseDetails {
            case_number: Some("CV-2025-00412".to_string()),
            case_name: Some("Smith v. Harbor Freight Lines".to_string()),
            court_name: Some("Suffolk County Superior Court".to_string()),
            requested_term: Some("18 months".to_string()),
            ..CaseDetails::default()
        },
    };

    println!("\nIntake");
    let created = match manager.create(&borrower, request) {
        Ok(application) => application,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- {} filed for {} -> {}",
        created.application_number,
        format_amount(created.amount),
        created.status
    );

    println!("\nReview");
    let approved = match manager.review(
        &reviewer,
        &created.id,
        "approve",
        Some("Liability well documented".to_string()),
    ) {
        Ok(application) => application,
        Err(err) => {
            println!("  Review failed: {err}");
            return Ok(());
        }
    };
    println!(
        "- {} -> {} by {}",
        approved.application_number,
        approved.status,
        seed.user("reviewer@lawfirm.com")
            .map(|user| user.name.as_str())
            .unwrap_or("reviewer")
    );
    if let Err(err) = manager.review(&lender, &created.id, "reject", None) {
        println!("  Second review refused: {err}");
    }

    let agreement = manager.render_agreement(&borrower, &created.id)?;
    println!(
        "- Agreement {} rendered ({} bytes)",
        agreement.file_name,
        agreement.bytes.len()
    );
    if let Some(path) = write_agreement {
        std::fs::write(&path, &agreement.bytes)?;
        println!("  Written to {}", path.display());
    }

    println!("\nFunding");
    let instruction = FundingInstruction {
        transfer_method: "wire".to_string(),
        confirmed: true,
        notes: Some("Same-day wire".to_string()),
    };
    let (funded, transaction) = match manager.fund(&lender, &created.id, instruction) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("  Funding failed: {err}");
            return Ok(());
        }
    };
    println!(
        "- {} -> {} via {} ({})",
        funded.application_number,
        funded.status,
        transaction.transaction_number,
        format_amount(transaction.amount)
    );

    let detail = manager.get(&borrower, &created.id)?;
    println!(
        "- Borrower view: {} with {} transaction(s)",
        detail.application.status,
        detail.transactions.len()
    );
    if let Err(err) = manager.render_agreement(&borrower, &created.id) {
        println!("  Agreement no longer available: {err}");
    }

    Ok(())
}

fn demo_identity(seed: &DemoSeed, email: &str) -> Option<Identity> {
    seed.user(email).map(|user| Identity {
        user_id: user.id,
        role: user.role,
        tenant_id: user.tenant_id,
    })
}
