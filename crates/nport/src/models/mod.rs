//! N-PORT data models
//!
//! - `cik` - Normalized Central Index Key (Cik)
//! - `holding` - One portfolio position (Holding) and percent-of-total derivation
//! - `filing` - Filing location in EDGAR (FilingLocation) and the cached result (FilingResult)

mod cik;
mod filing;
mod holding;

pub use cik::Cik;
pub use filing::{FilingLocation, FilingResult};
pub use holding::{assign_percentages, total_value, Holding};
