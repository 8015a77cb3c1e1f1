//! Test doubles and filing fixtures.
//!
//! Compiled for this crate's unit tests and, behind the `test-utils`
//! feature, for downstream test suites.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::StatusCode;
use tokio::time::Instant;

use crate::client::{HttpResponse, HttpTransport, TransportError};

pub const TEST_USER_AGENT: &str = "NPORT Holdings Tests (tests@example.com)";

pub const SAMPLE_CIK: &str = "0000884394";

pub const SAMPLE_SUBMISSIONS_URL: &str = "https://data.sec.gov/submissions/CIK0000884394.json";

pub const SAMPLE_DOCUMENT_URL: &str =
    "https://www.sec.gov/Archives/edgar/data/884394/000175272425211156/primary_doc.xml";

pub const SAMPLE_FOLDER_INDEX_URL: &str =
    "https://www.sec.gov/Archives/edgar/data/884394/000175272425211156/index.json";

/// Submissions index with an N-CEN, an older N-PORT-P and two N-PORT-P
/// filings sharing the latest filing date.
pub const SAMPLE_SUBMISSIONS_JSON: &str = r#"{
  "cik": "884394",
  "name": "SPDR S&P 500 ETF TRUST",
  "filings": {
    "recent": {
      "accessionNumber": [
        "0001752724-25-300001",
        "0001752724-25-211150",
        "0001752724-25-100000",
        "0001752724-25-211156"
      ],
      "filingDate": ["2025-08-01", "2025-07-30", "2025-05-30", "2025-07-30"],
      "reportDate": ["2025-08-01", "2025-06-30", "2025-03-31", "2025-06-30"],
      "form": ["N-CEN", "NPORT-P", "NPORT-P", "NPORT-P"],
      "primaryDocument": [
        "xslFormN-CEN_X01/primary_doc.xml",
        "xslFormNPORT-P_X01/primary_doc.xml",
        "xslFormNPORT-P_X01/primary_doc.xml",
        "xslFormNPORT-P_X01/primary_doc.xml"
      ]
    },
    "files": []
  }
}"#;

/// A trimmed-down N-PORT-P primary document with two equities and one
/// futures contract whose derivative section repeats `curCd`.
pub const SAMPLE_NPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<edgarSubmission xmlns="http://www.sec.gov/edgar/nport" xmlns:com="http://www.sec.gov/edgar/common">
  <headerData>
    <submissionType>NPORT-P</submissionType>
    <isConfidential>false</isConfidential>
  </headerData>
  <formData>
    <genInfo>
      <regName>SPDR S&amp;P 500 ETF TRUST</regName>
      <regCik>0000884394</regCik>
      <seriesName>SPDR S&amp;P 500 ETF TRUST</seriesName>
      <repPdEnd>2025-09-30</repPdEnd>
      <repPdDate>2025-06-30</repPdDate>
      <isFinalFiling>N</isFinalFiling>
    </genInfo>
    <fundInfo>
      <totAssets>3950000.00</totAssets>
      <totLiabs>25000.00</totLiabs>
      <netAssets>3925000.00</netAssets>
    </fundInfo>
    <invstOrSecs>
      <invstOrSec>
        <name>Apple Inc</name>
        <lei>HWUPKR0MPOU8FGXBT394</lei>
        <title>Apple Inc</title>
        <cusip>037833100</cusip>
        <identifiers>
          <isin value="US0378331005"/>
        </identifiers>
        <balance>10000.000000000000</balance>
        <units>NS</units>
        <curCd>USD</curCd>
        <valUSD>1900000.000000000000</valUSD>
        <pctVal>48.407643312101</pctVal>
        <payoffProfile>Long</payoffProfile>
        <assetCat>EC</assetCat>
        <issuerCat>CORP</issuerCat>
        <invCountry>US</invCountry>
      </invstOrSec>
      <invstOrSec>
        <name>Microsoft Corp</name>
        <lei>INR2EJN1ERAN0W5ZP974</lei>
        <title>Microsoft Corp</title>
        <cusip>594918104</cusip>
        <identifiers>
          <isin value="US5949181045"/>
        </identifiers>
        <balance>8000.000000000000</balance>
        <units>NS</units>
        <curCd>USD</curCd>
        <valUSD>2000000.000000000000</valUSD>
        <pctVal>50.955414012739</pctVal>
        <payoffProfile>Long</payoffProfile>
        <assetCat>EC</assetCat>
        <issuerCat>CORP</issuerCat>
        <invCountry>US</invCountry>
      </invstOrSec>
      <invstOrSec>
        <name>Chicago Mercantile Exchange</name>
        <lei>N/A</lei>
        <title>S&amp;P 500 E-Mini Future</title>
        <cusip>000000000</cusip>
        <identifiers>
          <ticker value="ESU5"/>
        </identifiers>
        <balance>10.000000000000</balance>
        <units>NC</units>
        <valUSD>25000.000000000000</valUSD>
        <pctVal>0.636942675159</pctVal>
        <payoffProfile>Long</payoffProfile>
        <assetCat>DE</assetCat>
        <derivativeInfo>
          <futrDeriv derivCat="FUT">
            <counterparties>
              <counterpartyName>Chicago Mercantile Exchange</counterpartyName>
            </counterparties>
            <payOffProf>Long</payOffProf>
            <expDate>2025-09-19</expDate>
            <notionalAmt>3100000.00</notionalAmt>
            <curCd>EUR</curCd>
            <unrealizedAppr>25000.00</unrealizedAppr>
          </futrDeriv>
        </derivativeInfo>
      </invstOrSec>
    </invstOrSecs>
  </formData>
</edgarSubmission>
"#;

/// One request seen by the scripted transport.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub url: String,
    pub user_agent: Option<String>,
    pub at: Instant,
}

/// In-memory transport answering from per-URL scripts.
///
/// Responses for a URL are consumed in order; the last one keeps answering
/// once the script runs dry. Unscripted URLs answer 404.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<HttpResponse, TransportError>>>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Duration,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport pre-loaded with the sample submissions index and document.
    pub fn with_sample_filing() -> Self {
        let transport = Self::new();
        transport.respond(SAMPLE_SUBMISSIONS_URL, StatusCode::OK, SAMPLE_SUBMISSIONS_JSON);
        transport.respond(SAMPLE_DOCUMENT_URL, StatusCode::OK, SAMPLE_NPORT_XML);
        transport
    }

    /// Delay every answer by `latency`, as a slow upstream would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn respond(&self, url: &str, status: StatusCode, body: &str) {
        self.push(url, Ok(HttpResponse::new(status, body)));
    }

    pub fn respond_with(&self, url: &str, response: HttpResponse) {
        self.push(url, Ok(response));
    }

    pub fn fail(&self, url: &str, error: TransportError) {
        self.push(url, Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls().iter().filter(|c| c.url == url).count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls().len()
    }

    fn push(&self, url: &str, outcome: Result<HttpResponse, TransportError>) {
        if let Ok(mut scripts) = self.scripts.lock() {
            scripts.entry(url.to_string()).or_default().push_back(outcome);
        }
    }

    fn next_outcome(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let mut scripts = match self.scripts.lock() {
            Ok(scripts) => scripts,
            Err(poisoned) => poisoned.into_inner(),
        };
        match scripts.get_mut(url) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(StatusCode::NOT_FOUND, ""))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Ok(HttpResponse::new(StatusCode::NOT_FOUND, ""))),
            None => Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<HttpResponse, TransportError> {
        let call = RecordedCall {
            url: url.to_string(),
            user_agent: headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            at: Instant::now(),
        };
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.next_outcome(url)
    }
}
