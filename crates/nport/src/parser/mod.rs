//! Holdings parser for the N-PORT XML schema.
//!
//! Streams the primary document once, collecting every
//! `invstOrSecs/invstOrSec` position plus the few header fields the result
//! needs (`genInfo/repPdDate`, series/registrant names, `fundInfo/netAssets`).
//! Element matching uses local names, so namespace prefixes are irrelevant.
//!
//! Row-level defects never fail the document: unparsable numbers degrade to
//! zero or `None`, and rows without any name or identifier are skipped. Only
//! malformed XML or a missing `invstOrSecs` container is an error.

mod money;

pub use money::{parse_money, parse_quantity};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use rust_decimal::Decimal;
use tracing::debug;

use crate::errors::NportError;
use crate::models::{assign_percentages, Holding};

const CONTAINER: &str = "invstOrSecs";
const POSITION: &str = "invstOrSec";

/// Result of parsing one primary document.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParsedDocument {
    /// Positions in document order, with `percent_value` assigned
    pub holdings: Vec<Holding>,
    /// `genInfo/repPdDate`
    pub report_date: Option<String>,
    /// `genInfo/seriesName`, else `genInfo/regName`
    pub fund_name: Option<String>,
    /// `fundInfo/netAssets`
    pub net_assets: Option<Decimal>,
    /// Rows skipped for having neither a name nor an identifier
    pub dropped_rows: usize,
}

/// Parse an N-PORT primary XML document into normalized holdings.
///
/// # Errors
///
/// `MalformedDocument` when the body is not well-formed XML or has no
/// `invstOrSecs` element. An empty `invstOrSecs` yields zero holdings.
pub fn parse_holdings(xml: &str) -> Result<ParsedDocument, NportError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut builder = DocumentBuilder::default();
    let mut path: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = local_name(&e);
                builder.open(&path, &name, &e);
                path.push(name);
            }
            Ok(Event::Empty(e)) => {
                let name = local_name(&e);
                builder.open(&path, &name, &e);
                builder.close(&path, &name);
            }
            Ok(Event::End(_)) => {
                if let Some(name) = path.pop() {
                    builder.close(&path, &name);
                }
            }
            Ok(Event::Text(t)) => {
                let text = match t.unescape() {
                    Ok(text) => text.into_owned(),
                    // Unknown entities (e.g. &nbsp;) keep their raw form.
                    Err(_) => String::from_utf8_lossy(&t).into_owned(),
                };
                builder.text.push_str(&text);
            }
            Ok(Event::CData(c)) => {
                builder.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(NportError::MalformedDocument(format!(
                    "invalid XML near byte {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
            Ok(_) => {}
        }
    }

    if let Some(open) = path.last() {
        return Err(NportError::MalformedDocument(format!(
            "document ended inside <{}>",
            open
        )));
    }

    builder.finish()
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Option<String> {
    element
        .try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Whitespace-collapsed text, `None` when empty or a filler value.
fn clean_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() || is_placeholder(&collapsed) {
        None
    } else {
        Some(collapsed)
    }
}

/// Identifier text, `None` for filler such as `N/A` or `000000000`.
fn clean_identifier(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || is_placeholder(trimmed) || trimmed.chars().all(|c| c == '0' || c == '-')
    {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn is_placeholder(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "N/A" | "NA" | "NONE" | "-"
    )
}

/// Raw field text of one `invstOrSec` element.
#[derive(Debug, Default)]
struct HoldingDraft {
    name: String,
    title: String,
    lei: String,
    cusip: String,
    isin: String,
    ticker: String,
    other_identifier: String,
    balance: String,
    units: String,
    currency: String,
    value_usd: String,
    percent: String,
    asset_category: String,
}

impl HoldingDraft {
    fn set_field(&mut self, field: &str, text: String) {
        let slot = match field {
            "name" => &mut self.name,
            "title" => &mut self.title,
            "lei" => &mut self.lei,
            "cusip" => &mut self.cusip,
            "balance" => &mut self.balance,
            "units" => &mut self.units,
            "curCd" => &mut self.currency,
            "valUSD" => &mut self.value_usd,
            "pctVal" => &mut self.percent,
            "assetCat" => &mut self.asset_category,
            _ => return,
        };
        *slot = text;
    }

    fn set_identifier(&mut self, kind: &str, value: String) {
        match kind {
            "isin" => self.isin = value,
            "ticker" => self.ticker = value,
            "other" if self.other_identifier.is_empty() => self.other_identifier = value,
            _ => {}
        }
    }

    /// Normalize into a holding, or `None` for a row with no name and no
    /// identifier at all.
    fn finish(self) -> Option<Holding> {
        let cusip = clean_identifier(&self.cusip);
        let isin = clean_identifier(&self.isin);
        let lei = clean_identifier(&self.lei);
        let ticker = clean_identifier(&self.ticker);
        let other = clean_identifier(&self.other_identifier);
        let title = clean_text(&self.title);

        let name = clean_text(&self.name).or_else(|| title.clone());
        let fallback_label = cusip
            .clone()
            .or_else(|| isin.clone())
            .or_else(|| ticker.clone())
            .or_else(|| lei.clone())
            .or(other);
        let name = match (name, fallback_label) {
            (Some(name), _) => name,
            (None, Some(label)) => label,
            (None, None) => return None,
        };

        let mut holding = Holding::new(
            cusip.unwrap_or_default(),
            name,
            parse_quantity(&self.balance),
            parse_money(&self.value_usd),
        );
        holding.title = title;
        holding.lei = lei;
        holding.isin = isin;
        holding.ticker = ticker;
        holding.units = clean_text(&self.units);
        holding.currency = clean_text(&self.currency);
        holding.asset_category = clean_text(&self.asset_category);
        holding.reported_percent = parse_quantity(&self.percent);
        Some(holding)
    }
}

#[derive(Debug, Default)]
struct DocumentBuilder {
    saw_container: bool,
    current: Option<HoldingDraft>,
    holdings: Vec<Holding>,
    dropped_rows: usize,
    report_date: Option<String>,
    series_name: Option<String>,
    registrant_name: Option<String>,
    net_assets: Option<Decimal>,
    /// Character data of the element being read
    text: String,
}

impl DocumentBuilder {
    /// `parents` is the path leading to `name`, not including it.
    fn open(&mut self, parents: &[String], name: &str, element: &BytesStart<'_>) {
        self.text.clear();
        let parent = parents.last().map(String::as_str);

        match (parent, name) {
            (_, CONTAINER) => self.saw_container = true,
            (Some(CONTAINER), POSITION) => self.current = Some(HoldingDraft::default()),
            (Some("identifiers"), kind) if is_direct_child_of_position(parents) => {
                if let (Some(draft), Some(value)) = (self.current.as_mut(), attribute(element, "value")) {
                    draft.set_identifier(kind, value);
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, parents: &[String], name: &str) {
        let text = std::mem::take(&mut self.text);
        let parent = parents.last().map(String::as_str);

        match (parent, name) {
            (Some(CONTAINER), POSITION) => {
                if let Some(draft) = self.current.take() {
                    match draft.finish() {
                        Some(holding) => self.holdings.push(holding),
                        None => self.dropped_rows += 1,
                    }
                }
            }
            (Some(POSITION), field) => {
                if let Some(draft) = self.current.as_mut() {
                    draft.set_field(field, text);
                }
            }
            (Some("genInfo"), "repPdDate") => self.report_date = clean_text(&text),
            (Some("genInfo"), "seriesName") => self.series_name = clean_text(&text),
            (Some("genInfo"), "regName") => self.registrant_name = clean_text(&text),
            (Some("fundInfo"), "netAssets") => self.net_assets = parse_quantity(&text),
            _ => {}
        }
    }

    fn finish(self) -> Result<ParsedDocument, NportError> {
        if !self.saw_container {
            return Err(NportError::MalformedDocument(
                "no invstOrSecs holdings container".to_string(),
            ));
        }

        let mut holdings = self.holdings;
        assign_percentages(&mut holdings);

        debug!(
            holdings = holdings.len(),
            dropped = self.dropped_rows,
            "Parsed N-PORT holdings"
        );

        Ok(ParsedDocument {
            holdings,
            report_date: self.report_date,
            fund_name: self.series_name.or(self.registrant_name),
            net_assets: self.net_assets,
            dropped_rows: self.dropped_rows,
        })
    }
}

/// True when the path ends in `invstOrSec/identifiers`.
fn is_direct_child_of_position(parents: &[String]) -> bool {
    parents.len() >= 2 && parents[parents.len() - 2] == POSITION
}
