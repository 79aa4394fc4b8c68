//! Paginated-document handler.
//!
//! Agenda packets routinely run to hundreds of pages of scanned exhibits, but
//! the agenda itself is front-loaded, so pages are decoded in order and the
//! walk stops at `page_cap` (or earlier, once `size_cap` characters are in
//! hand).

use super::{ExtractLimits, finish};
use crate::error::{AcquisitionResult, Failure};
use lopdf::Document;
use tracing::{debug, instrument};

#[instrument(level = "debug", skip_all, fields(bytes = bytes.len(), page_cap = limits.page_cap))]
pub fn extract_pdf(bytes: &[u8], limits: &ExtractLimits) -> AcquisitionResult {
    let doc = Document::load_mem(bytes).map_err(|e| Failure::malformed(format!("PDF decode failed: {e}")))?;

    let pages = doc.get_pages();
    let total_pages = pages.len();
    let mut text = String::new();
    let mut consumed = 0usize;

    for &page_number in pages.keys().take(limits.page_cap) {
        consumed += 1;
        match doc.extract_text(&[page_number]) {
            Ok(page_text) => {
                text.push_str(&page_text);
                if !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            // Image-only pages and exotic font encodings are common in packets.
            Err(e) => debug!(page_number, error = %e, "Skipping undecodable page"),
        }
        if text.chars().count() >= limits.size_cap {
            break;
        }
    }

    debug!(total_pages, consumed, chars = text.len(), "Decoded PDF pages");
    finish(&text, bytes.len(), consumed, limits)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use lopdf::content::{Content, Operation};
    use lopdf::{Object, Stream, dictionary};

    /// Build a minimal PDF with one text line per page.
    pub(crate) fn build_pdf(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for line in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*line)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).unwrap();
        buf
    }

    fn limits(page_cap: usize, size_cap: usize) -> ExtractLimits {
        ExtractLimits {
            page_cap,
            size_cap,
            min_content: 5,
        }
    }

    #[test]
    fn test_page_cap_prefers_earliest_pages() {
        let bytes = build_pdf(&["Agenda call to order", "Item two zoning", "Exhibit never read"]);
        let out = extract_pdf(&bytes, &limits(2, 10_000)).unwrap();
        assert_eq!(out.pages_consumed, 2);
        assert!(out.content.contains("Agenda"));
        assert!(out.content.contains("zoning"));
        assert!(!out.content.contains("Exhibit"));
    }

    #[test]
    fn test_size_cap_truncates() {
        let bytes = build_pdf(&["Consent agenda items for approval by council"; 4]);
        let out = extract_pdf(&bytes, &limits(50, 30)).unwrap();
        assert!(out.content.chars().count() <= 30);
        assert!(out.pages_consumed <= 4);
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = extract_pdf(b"%PDF-1.4 this is not really a pdf", &limits(5, 100)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Malformed);
    }

    #[test]
    fn test_blank_pages_are_insufficient() {
        let bytes = build_pdf(&[" ", " "]);
        let err = extract_pdf(&bytes, &limits(5, 100)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientContent);
    }
}
