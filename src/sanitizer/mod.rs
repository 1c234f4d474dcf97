//! Sanitizer chains
//!
//! Stateless, composable cleaners: the URL chain turns raw discovered links
//! into article URLs, and the datetime chain turns byline strings into
//! timestamps. Both are immutable after construction and safe to share
//! between tasks.

mod datetime;
mod urls;

pub use datetime::{DateStrategy, DatetimeNormalizer};
pub use urls::{SanitizerChain, UrlSanitizer};
