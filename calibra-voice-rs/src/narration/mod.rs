//! Portuguese narration: spoken numbers, spoken dates and the announcement composer.
//!
//! Components:
//! - `numerals`: integers → cardinal words
//! - `dates`: `YYYY-MM-DD` → "dia … de … de …"
//! - `composer`: equipment snapshots → ordered utterances

pub mod composer;
pub mod dates;
pub mod numerals;

pub use composer::compose;
pub use dates::date_to_words;
pub use numerals::to_words;
