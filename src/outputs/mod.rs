//! Output generation for the assembled digest.
//!
//! # Submodules
//!
//! - [`markdown`]: Renders a [`Digest`](crate::models::Digest) as the newsletter Markdown file
//! - [`json`]: Writes the same digest as JSON for other consumers
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── sachse_newsletter_20261019.md
//!
//! json_output_dir/
//! └── sachse_newsletter_20261019.json
//! ```

pub mod json;
pub mod markdown;

use crate::models::Digest;

/// File stem shared by every output of one run, e.g. `sachse_newsletter_20261019`.
pub fn file_stem(digest: &Digest) -> String {
    format!("sachse_newsletter_{}", digest.local_date.replace('-', ""))
}
