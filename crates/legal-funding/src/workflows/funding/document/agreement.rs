use tracing::debug;

use crate::config::LendingConfig;

use super::layout::{
    encode_pdf, wrap, Element, FontStyle, PageBuilder, MARGIN_MM, PAGE_HEIGHT_MM, PAGE_WIDTH_MM,
};
use super::{
    AgreementSnapshot, DocumentRenderer, RenderError, RenderedDocument, PDF_CONTENT_TYPE,
};

const RIGHT_EDGE: f32 = PAGE_WIDTH_MM - MARGIN_MM;
const VALUE_COLUMN: f32 = MARGIN_MM + 100.0;
const TERMS_WRAP_CHARS: usize = 95;
const VALUE_WRAP_CHARS: usize = 40;

/// Lays out the loan agreement and encodes it with lopdf.
#[derive(Debug, Clone)]
pub struct AgreementRenderer {
    lending: LendingConfig,
}

impl AgreementRenderer {
    pub fn new(lending: LendingConfig) -> Self {
        Self { lending }
    }

    pub fn file_name(application_number: &str) -> String {
        format!("loan-agreement-{application_number}.pdf")
    }

    /// Page-by-page drawing instructions for the agreement.
    pub fn layout(&self, snapshot: &AgreementSnapshot) -> Vec<Vec<Element>> {
        let application = &snapshot.application;
        let borrower = &snapshot.borrower;
        let rate = self.lending.rate_label();
        let mut page = PageBuilder::new();

        page.font(24.0, FontStyle::Bold)
            .text(MARGIN_MM, MARGIN_MM, "LOAN AGREEMENT")
            .text_right(
                RIGHT_EDGE,
                MARGIN_MM,
                format!("#{}", application.application_number),
            )
            .font(10.0, FontStyle::Regular)
            .text_right(
                RIGHT_EDGE,
                MARGIN_MM + 10.0,
                format!("Generated: {}", snapshot.generated_on.format("%m/%d/%Y")),
            )
            .rule(MARGIN_MM, RIGHT_EDGE, MARGIN_MM + 20.0);

        let mut y = MARGIN_MM + 30.0;
        page.font(14.0, FontStyle::Bold).text(MARGIN_MM, y, "LENDER");
        y += 10.0;
        page.font(11.0, FontStyle::Regular)
            .text(MARGIN_MM, y, self.lending.lender_name.as_str());
        for line in &self.lending.lender_address {
            y += 7.0;
            page.text(MARGIN_MM, y, line.as_str());
        }

        y += 16.0;
        page.font(14.0, FontStyle::Bold).text(MARGIN_MM, y, "BORROWER");
        y += 10.0;
        page.font(11.0, FontStyle::Regular)
            .text(MARGIN_MM, y, borrower.name.as_str())
            .text(MARGIN_MM, y + 7.0, borrower.email.as_str())
            .text(MARGIN_MM, y + 14.0, borrower.address.clone().unwrap_or_default());
        y += 30.0;

        let term = application
            .case
            .requested_term
            .clone()
            .unwrap_or_else(|| self.lending.default_term.clone());
        let loan_details = [
            ("Principal Amount", format_amount(application.amount)),
            ("Interest Rate", format!("{rate} per annum")),
            ("Term", term),
            ("Purpose", application.purpose.clone()),
        ];
        y = section(&mut page, y, "LOAN DETAILS");
        y = rows(&mut page, y, &loan_details);

        let na = |value: &Option<String>| value.clone().unwrap_or_else(|| "N/A".to_string());
        let case_details = [
            ("Case Number", na(&application.case.case_number)),
            ("Case Name", na(&application.case.case_name)),
            ("Court", na(&application.case.court_name)),
            ("Jurisdiction", na(&application.case.jurisdiction)),
        ];
        y = section(&mut page, y + 10.0, "CASE INFORMATION");
        y = rows(&mut page, y, &case_details);

        let account = snapshot.disbursement_account.as_ref();
        let bank = account.map_or("N/A", |account| account.bank_name.as_str());
        let account_type = match account {
            Some(account) if account.is_trust => {
                format!("{} (Trust Account)", account.account_type.label())
            }
            Some(account) => account.account_type.label().to_string(),
            None => "N/A".to_string(),
        };
        let ending = account.map_or("N/A", |account| account.account_number.as_str());

        y = section(&mut page, y + 10.0, "DISBURSEMENT");
        y = page.reserve(y, 24.0);
        page.text(MARGIN_MM, y, "Funds will be disbursed to:");
        y += 10.0;
        page.text(MARGIN_MM + 5.0, y, format!("Bank: {bank}"))
            .text(MARGIN_MM + 5.0, y + 7.0, format!("Account Type: {account_type}"))
            .text(
                MARGIN_MM + 5.0,
                y + 14.0,
                format!("Account Ending: ****{ending}"),
            );
        y += 25.0;

        y = section(&mut page, y, "TERMS AND CONDITIONS");
        page.font(10.0, FontStyle::Regular);
        for term in terms(&rate) {
            for line in wrap(&term, TERMS_WRAP_CHARS) {
                y = page.reserve(y, 5.0);
                page.text(MARGIN_MM, y, line);
                y += 5.0;
            }
            y += 5.0;
        }

        y = section(&mut page, y + 10.0, "SIGNATURES");
        y = page.reserve(y + 5.0, 32.0);
        let middle = PAGE_WIDTH_MM / 2.0;
        page.font(11.0, FontStyle::Regular)
            .text(MARGIN_MM, y, "Lender Signature:")
            .rule(MARGIN_MM, MARGIN_MM + 80.0, y + 15.0)
            .text(MARGIN_MM, y + 25.0, self.lending.lender_name.as_str())
            .text(MARGIN_MM, y + 32.0, "Date: _________________")
            .text(middle, y, "Borrower Signature:")
            .rule(middle, RIGHT_EDGE, y + 15.0)
            .text(middle, y + 25.0, borrower.name.as_str())
            .text(middle, y + 32.0, "Date: _________________");

        page.font(8.0, FontStyle::Italic);
        let footer = page.text_element(
            MARGIN_MM,
            PAGE_HEIGHT_MM - 15.0,
            "This is a digitally generated document for prototype purposes only.",
        );
        page.on_every_page(footer);

        page.finish()
    }
}

impl DocumentRenderer for AgreementRenderer {
    fn render(&self, snapshot: &AgreementSnapshot) -> Result<RenderedDocument, RenderError> {
        let pages = self.layout(snapshot);
        let bytes = encode_pdf(&pages)?;
        debug!(
            application = %snapshot.application.application_number,
            pages = pages.len(),
            bytes = bytes.len(),
            "agreement rendered"
        );

        Ok(RenderedDocument {
            file_name: Self::file_name(&snapshot.application.application_number),
            content_type: PDF_CONTENT_TYPE,
            bytes,
        })
    }
}

/// Bold heading with a rule beneath it. Returns the baseline of the first body row.
fn section(page: &mut PageBuilder, y: f32, heading: &str) -> f32 {
    let y = page.reserve(y, 25.0);
    page.font(14.0, FontStyle::Bold)
        .text(MARGIN_MM, y, heading)
        .rule(MARGIN_MM, RIGHT_EDGE, y + 8.0)
        .font(11.0, FontStyle::Regular);
    y + 15.0
}

/// Label/value rows; long values wrap within the value column and continue on the next page.
fn rows(page: &mut PageBuilder, mut y: f32, rows: &[(&str, String)]) -> f32 {
    for (label, value) in rows {
        y = page.reserve(y, 10.0);
        page.text(MARGIN_MM, y, *label);
        for (index, line) in wrap(value, VALUE_WRAP_CHARS).into_iter().enumerate() {
            if index > 0 {
                y = page.reserve(y + 5.0, 5.0);
            }
            page.text(VALUE_COLUMN, y, line);
        }
        y += 10.0;
    }
    y
}

fn terms(rate: &str) -> [String; 7] {
    [
        format!("1. Borrower agrees to repay the principal amount plus accrued interest at rate of {rate} per annum."),
        "2. Repayment shall be made according to schedule mutually agreed upon by both parties.".to_string(),
        "3. Borrower warrants that the loan will be used exclusively for case-related expenses.".to_string(),
        "4. Lender may require proof of proper use of funds upon reasonable request.".to_string(),
        "5. This agreement is governed by laws of jurisdiction specified in the application.".to_string(),
        "6. Borrower agrees to sign all necessary documents to disburse funds.".to_string(),
        "7. Any default in payment may result in additional fees and legal action.".to_string(),
    ]
}

/// `$50,000` style whole-unit amount.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("${grouped}")
}
