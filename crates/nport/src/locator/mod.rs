//! Filing locator: CIK to latest N-PORT-P filing.
//!
//! Reads the issuer's submissions index from `data.sec.gov` and picks the
//! most recent `NPORT-P` (or `NPORT-P/A`) entry. Ties on filing date go to
//! the highest accession number, since accession numbers are issued in
//! increasing order.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{debug, info};

use crate::client::EdgarClient;
use crate::errors::NportError;
use crate::models::{Cik, FilingLocation};

/// Form types that carry a public portfolio holdings schedule.
const NPORT_FORMS: &[&str] = &["NPORT-P", "NPORT-P/A"];

/// Top level of `submissions/CIK##########.json`.
#[derive(Debug, Deserialize)]
pub struct SubmissionsIndex {
    /// Registrant name
    pub name: Option<String>,
    pub filings: Option<SubmissionsFilings>,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionsFilings {
    pub recent: Option<RecentFilings>,
}

/// The `recent` block: one array per column, indexed in parallel.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    #[serde(default)]
    pub accession_number: Vec<String>,
    #[serde(default)]
    pub filing_date: Vec<String>,
    #[serde(default)]
    pub report_date: Vec<String>,
    #[serde(default)]
    pub form: Vec<String>,
    #[serde(default)]
    pub primary_document: Vec<String>,
}

impl RecentFilings {
    /// Check that every column present lines up with the `form` column.
    fn validate(&self) -> Result<(), NportError> {
        let rows = self.form.len();
        if self.accession_number.len() != rows {
            return Err(NportError::MalformedIndex(format!(
                "{} forms but {} accession numbers",
                rows,
                self.accession_number.len()
            )));
        }
        for (column, len) in [
            ("filingDate", self.filing_date.len()),
            ("reportDate", self.report_date.len()),
            ("primaryDocument", self.primary_document.len()),
        ] {
            if len != 0 && len != rows {
                return Err(NportError::MalformedIndex(format!(
                    "{} forms but {} {} entries",
                    rows, len, column
                )));
            }
        }
        Ok(())
    }
}

/// Parse a submissions index body.
pub fn parse_submissions(body: &str) -> Result<SubmissionsIndex, NportError> {
    serde_json::from_str(body).map_err(|e| NportError::MalformedIndex(e.to_string()))
}

/// Select the latest N-PORT-P filing from the `recent` block.
///
/// Returns `Ok(None)` when the issuer has no qualifying filing.
pub fn pick_latest_nport(recent: &RecentFilings) -> Result<Option<FilingLocation>, NportError> {
    recent.validate()?;

    let column = |values: &[String], i: usize| -> Option<String> {
        values
            .get(i)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let latest = recent
        .form
        .iter()
        .enumerate()
        .filter(|(_, form)| {
            let form = form.trim();
            NPORT_FORMS.iter().any(|f| f.eq_ignore_ascii_case(form))
        })
        .map(|(i, form)| FilingLocation {
            accession_number: recent.accession_number[i].trim().to_string(),
            form: form.trim().to_ascii_uppercase(),
            filing_date: column(&recent.filing_date, i)
                .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
            report_date: column(&recent.report_date, i),
            primary_document: column(&recent.primary_document, i).unwrap_or_default(),
        })
        .max_by(|a, b| {
            a.filing_date
                .cmp(&b.filing_date)
                .then_with(|| a.accession_number.cmp(&b.accession_number))
        });

    Ok(latest)
}

/// What the locator learned about the issuer and its latest filing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocatedFiling {
    pub location: FilingLocation,
    /// Registrant name from the submissions index
    pub registrant_name: Option<String>,
}

/// Resolves a CIK to its latest N-PORT-P filing.
pub struct FilingLocator {
    client: Arc<EdgarClient>,
}

impl FilingLocator {
    pub fn new(client: Arc<EdgarClient>) -> Self {
        Self { client }
    }

    /// Find the latest N-PORT-P filing for an issuer.
    ///
    /// # Errors
    ///
    /// - `NotFound` if SEC has no index for the CIK or no qualifying filing
    /// - `MalformedIndex` if the index does not have the expected shape
    /// - `UpstreamUnavailable` / `RateLimited` / `Rejected` from the client
    pub async fn locate(&self, cik: &Cik) -> Result<LocatedFiling, NportError> {
        let url = self.client.endpoints().submissions_url(cik);
        let body = self.client.get_text(&url).await.map_err(|err| match err {
            NportError::NotFound(_) => {
                NportError::NotFound(format!("No SEC filings index exists for CIK {}.", cik))
            }
            other => other,
        })?;

        let index = parse_submissions(&body)?;
        let recent = index
            .filings
            .and_then(|f| f.recent)
            .ok_or_else(|| NportError::MalformedIndex("missing filings.recent".to_string()))?;

        let location = pick_latest_nport(&recent)?.ok_or_else(|| {
            NportError::NotFound("No public NPORT-P filings found for this CIK.".to_string())
        })?;

        debug!(
            cik = %cik,
            candidates = recent.form.len(),
            "Scanned submissions index"
        );
        info!(
            cik = %cik,
            accession = %location.accession_number,
            form = %location.form,
            "Located latest N-PORT filing"
        );

        Ok(LocatedFiling {
            location,
            registrant_name: index.name.filter(|n| !n.trim().is_empty()),
        })
    }
}
