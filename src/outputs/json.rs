//! JSON output of the digest.
//!
//! The file carries the same sections as the Markdown newsletter, plus the
//! winning strategy of each summarized section and the diagnostics of each
//! placeholder, for consumers that render the digest themselves.

use super::file_stem;
use crate::models::Digest;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write a [`Digest`] as `{json_output_dir}/sachse_newsletter_YYYYMMDD.json`.
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir.display()))]
pub async fn write_digest(digest: &Digest, json_output_dir: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(digest)?;

    if let Err(e) = fs::create_dir_all(json_output_dir).await {
        error!(error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = json_output_dir.join(format!("{}.json", file_stem(digest)));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON digest");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Section, SectionBody, SourceId};

    #[tokio::test]
    async fn test_write_digest_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("api");
        let digest = Digest {
            local_date: "2026-10-19".into(),
            display_date: "October 19, 2026".into(),
            sections: vec![Section {
                source: SourceId::SchoolBoard,
                title: "School Board Updates".into(),
                body: SectionBody::Summary {
                    text: "Calendar approved".into(),
                    strategy: "meeting-agenda-link".into(),
                },
            }],
        };

        let path = write_digest(&digest, &nested).await.unwrap();
        assert!(path.ends_with("sachse_newsletter_20261019.json"));

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains(r#""source": "school_board""#));
        let parsed: Digest = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.sections, digest.sections);
    }
}
