use rust_decimal::Decimal;
use serde::Serialize;

/// One security position reported in Part C of an N-PORT filing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    /// CUSIP; empty for instruments filed without one
    pub cusip: String,

    /// Issuer name, or the security title when the issuer is not given
    pub name: String,

    /// Shares, principal or contracts held; `None` when not reported
    pub balance: Option<Decimal>,

    /// Fair value in US dollars
    pub value_usd: Decimal,

    /// Share of the filing's total value, in percent.
    /// `None` when the filing's total value is zero.
    pub percent_value: Option<Decimal>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lei: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub isin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,

    /// Unit of `balance` (NS = shares, PA = principal amount, NC = contracts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Currency the position is denominated in
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    /// Asset category code (EC = equity common, DBT = debt, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_category: Option<String>,

    /// Percent of net assets as stated by the filer (`pctVal`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reported_percent: Option<Decimal>,
}

impl Holding {
    /// Create a holding with only the core columns populated.
    pub fn new(cusip: String, name: String, balance: Option<Decimal>, value_usd: Decimal) -> Self {
        Self {
            cusip,
            name,
            balance,
            value_usd,
            percent_value: None,
            title: None,
            lei: None,
            isin: None,
            ticker: None,
            units: None,
            currency: None,
            asset_category: None,
            reported_percent: None,
        }
    }
}

/// Sum of `value_usd` over a set of holdings, or `None` if it does not fit
/// in a `Decimal`.
pub fn total_value(holdings: &[Holding]) -> Option<Decimal> {
    holdings
        .iter()
        .try_fold(Decimal::ZERO, |total, h| total.checked_add(h.value_usd))
}

/// Fill in `percent_value` for every holding against the set's total value.
///
/// When the total is zero, or too large to represent, the percentage is
/// undefined and left as `None` rather than reported as zero.
pub fn assign_percentages(holdings: &mut [Holding]) {
    let total = match total_value(holdings) {
        Some(total) if !total.is_zero() => total,
        _ => {
            for holding in holdings.iter_mut() {
                holding.percent_value = None;
            }
            return;
        }
    };

    let hundred = Decimal::ONE_HUNDRED;
    for holding in holdings.iter_mut() {
        holding.percent_value = holding
            .value_usd
            .checked_mul(hundred)
            .and_then(|scaled| scaled.checked_div(total));
    }
}
