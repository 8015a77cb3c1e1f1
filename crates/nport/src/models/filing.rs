use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::cik::Cik;
use super::holding::Holding;

/// Where the latest N-PORT-P filing of an issuer lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilingLocation {
    /// Accession number, dashed form (`0001752724-25-211156`)
    pub accession_number: String,
    /// `NPORT-P` or `NPORT-P/A`
    pub form: String,
    /// Date SEC accepted the filing
    pub filing_date: Option<NaiveDate>,
    /// End of the reporting period, as listed in the submissions index
    pub report_date: Option<String>,
    /// Primary document name as listed in the submissions index
    pub primary_document: String,
}

impl FilingLocation {
    /// Display date for the filing: the report period, else the filing date.
    pub fn as_of(&self) -> Option<String> {
        self.report_date
            .clone()
            .filter(|d| !d.is_empty())
            .or_else(|| self.filing_date.map(|d| d.to_string()))
    }

    /// Accession number without dashes, as used in Archives folder names.
    pub fn accession_folder(&self) -> String {
        self.accession_number.replace('-', "")
    }

    /// File name of the raw XML document inside the filing folder.
    ///
    /// The submissions index usually points at the XSL-rendered view
    /// (`xslFormNPORT-P_X01/primary_doc.xml`); the raw document shares its
    /// file name at the folder root. Non-XML primaries fall back to the
    /// conventional `primary_doc.xml`.
    pub fn raw_document_name(&self) -> String {
        let file_name = self
            .primary_document
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .trim();
        if file_name.to_ascii_lowercase().ends_with(".xml") {
            file_name.to_string()
        } else {
            "primary_doc.xml".to_string()
        }
    }
}

/// The normalized holdings of one filing: the unit cached and returned.
///
/// Immutable once built; a refresh replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingResult {
    pub cik: Cik,
    /// Report period date (display string)
    pub as_of: Option<String>,
    pub count: usize,
    pub holdings: Vec<Holding>,
    pub accession: String,
    pub form: String,
    pub filing_date: Option<NaiveDate>,
    pub fund_name: Option<String>,
    pub document_url: String,
    /// Sum of `value_usd` over all holdings; `None` when the sum overflows
    pub total_value_usd: Option<Decimal>,
    /// Net assets reported in the fund information section
    pub net_assets: Option<Decimal>,
}
