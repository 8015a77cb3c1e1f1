use chrono::NaiveDate;
use nport_holdings::{FilingResult, Holding};
use rust_decimal::Decimal;
use serde::Serialize;

/// Body of `GET /api/holdings/{cik}`.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsResponse {
    pub cik: String,
    pub as_of: Option<String>,
    pub count: usize,
    pub holdings: Vec<Holding>,
    pub fund_name: Option<String>,
    pub form: String,
    pub accession: String,
    pub filing_date: Option<NaiveDate>,
    pub document_url: String,
    pub total_value_usd: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_assets: Option<Decimal>,
}

impl From<&FilingResult> for HoldingsResponse {
    fn from(r: &FilingResult) -> Self {
        Self {
            cik: r.cik.to_string(),
            as_of: r.as_of.clone(),
            count: r.count,
            holdings: r.holdings.clone(),
            fund_name: r.fund_name.clone(),
            form: r.form.clone(),
            accession: r.accession.clone(),
            filing_date: r.filing_date,
            document_url: r.document_url.clone(),
            total_value_usd: r.total_value_usd,
            net_assets: r.net_assets,
        }
    }
}
