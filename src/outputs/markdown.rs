//! Markdown rendering of the newsletter.
//!
//! ```text
//! # Sachse Weekly Newsletter
//! *Generated on October 19, 2026*
//!
//! ## City Hall Updates
//!
//! <summary or placeholder>
//! ```
//!
//! Placeholder sections may carry a collapsed block with the per-strategy
//! failures so a reader can see why a source is missing.

use super::file_stem;
use crate::models::{Digest, Section, SectionBody};
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument};

pub const TITLE: &str = "# Sachse Weekly Newsletter";

fn section_to_markdown(section: &Section, with_diagnostics: bool) -> String {
    let mut md = format!("## {}\n\n", section.title);
    match &section.body {
        SectionBody::Summary { text, .. } => {
            md.push_str(text.trim_end());
            md.push('\n');
        }
        SectionBody::Placeholder { text, diagnostics } => {
            md.push_str(text);
            md.push('\n');
            if let (true, Some(details)) = (with_diagnostics, diagnostics) {
                md.push_str("\n<details><summary>Error details</summary>\n\n```text\n");
                md.push_str(details.trim_end());
                md.push_str("\n```\n\n</details>\n");
            }
        }
    }
    md
}

/// Render the digest. Diagnostics are included only when asked for.
pub fn digest_to_markdown(digest: &Digest, with_diagnostics: bool) -> String {
    let mut md = format!("{TITLE}\n*Generated on {}*\n", digest.display_date);
    for section in &digest.sections {
        md.push('\n');
        md.push_str(&section_to_markdown(section, with_diagnostics));
    }
    md
}

/// Write the newsletter into `output_dir` and return the file path.
#[instrument(level = "info", skip(digest))]
pub async fn write_newsletter(
    digest: &Digest,
    output_dir: &Path,
    with_diagnostics: bool,
) -> Result<PathBuf, Box<dyn Error>> {
    let path = output_dir.join(format!("{}.md", file_stem(digest)));
    fs::write(&path, digest_to_markdown(digest, with_diagnostics)).await?;
    info!(path = %path.display(), "Wrote newsletter Markdown");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceId;

    fn digest() -> Digest {
        Digest {
            local_date: "2026-10-19".into(),
            display_date: "October 19, 2026".into(),
            sections: vec![
                Section {
                    source: SourceId::Council,
                    title: "City Hall Updates".into(),
                    body: SectionBody::Summary {
                        text: "- Budget adopted\n".into(),
                        strategy: "packet-link".into(),
                    },
                },
                Section {
                    source: SourceId::Sports,
                    title: "Mustang Sports Minute".into(),
                    body: SectionBody::Placeholder {
                        text: "*Could not retrieve sports data. Please check back later.*".into(),
                        diagnostics: Some("[schedule-listing] timed out: GET /".into()),
                    },
                },
            ],
        }
    }

    #[test]
    fn test_markdown_layout() {
        let md = digest_to_markdown(&digest(), false);
        assert_eq!(
            md,
            "# Sachse Weekly Newsletter\n*Generated on October 19, 2026*\n\n\
             ## City Hall Updates\n\n- Budget adopted\n\n\
             ## Mustang Sports Minute\n\n*Could not retrieve sports data. Please check back later.*\n"
        );
    }

    #[test]
    fn test_diagnostics_block_is_optional() {
        let md = digest_to_markdown(&digest(), true);
        assert!(md.contains("<details><summary>Error details</summary>"));
        assert!(md.contains("[schedule-listing] timed out: GET /"));
    }

    #[tokio::test]
    async fn test_write_newsletter_uses_dated_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_newsletter(&digest(), dir.path(), false).await.unwrap();
        assert_eq!(path.file_name().unwrap(), "sachse_newsletter_20261019.md");
        let written = std::fs::read_to_string(path).unwrap();
        assert!(written.starts_with(TITLE));
    }
}
