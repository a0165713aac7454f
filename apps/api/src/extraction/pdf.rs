//! PDF text extraction.
//!
//! `lopdf` validates the byte stream and counts pages; `pdf-extract` supplies the
//! text layer one page at a time. Pages are appended in order with no separator
//! beyond what the text layer emits.

use bytes::Bytes;
use tracing::warn;

use crate::extraction::{DocumentKind, ExtractError};
use crate::progress::StageReporter;

pub async fn extract(bytes: Bytes, progress: StageReporter) -> Result<String, ExtractError> {
    // pdf-extract is CPU-bound and may panic on malformed content streams.
    tokio::task::spawn_blocking(move || extract_pages(&bytes, &progress))
        .await
        .map_err(|e| {
            warn!("PDF extraction task aborted: {e}");
            corrupt(format!("the PDF text layer could not be read ({e})"))
        })?
}

fn extract_pages(bytes: &[u8], progress: &StageReporter) -> Result<String, ExtractError> {
    let document = lopdf::Document::load_mem(bytes).map_err(|e| corrupt(e.to_string()))?;
    if document.get_pages().is_empty() {
        return Ok(String::new());
    }

    let pages =
        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| corrupt(e.to_string()))?;

    let mut text = String::new();
    for (index, page) in pages.iter().enumerate() {
        text.push_str(page);
        progress.advance_fraction(index + 1, pages.len());
    }
    Ok(text)
}

fn corrupt(reason: String) -> ExtractError {
    ExtractError::CorruptDocument {
        kind: DocumentKind::Pdf,
        reason,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::{Progress, ProgressReporter, Stage};
    use crate::session::slot::SlotId;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    /// Builds a PDF with one page per entry, each showing its text in Courier.
    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
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
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![100.into(), 600.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
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
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        };
        doc.objects.insert(pages_id, Object::Dictionary(pages_dict));
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[tokio::test]
    async fn test_zero_page_pdf_is_empty_text() {
        let bytes = Bytes::from(pdf_with_pages(&[]));
        let text = extract(bytes, StageReporter::detached(Stage::Extracting(SlotId::A)))
            .await
            .unwrap();
        assert_eq!(text, "");
    }

    #[tokio::test]
    async fn test_pages_are_appended_in_order() {
        let bytes = Bytes::from(pdf_with_pages(&["Quotation", "Proposal"]));
        let text = extract(bytes, StageReporter::detached(Stage::Extracting(SlotId::A)))
            .await
            .unwrap();

        let first = text.find("Quotation").expect("first page text");
        let second = text.find("Proposal").expect("second page text");
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_page_progress_reaches_full() {
        let progress = ProgressReporter::new();
        let stage = progress.stage(Stage::Extracting(SlotId::B));
        stage.start();

        let bytes = Bytes::from(pdf_with_pages(&["one", "two"]));
        extract(bytes, stage).await.unwrap();

        assert_eq!(
            progress.current(),
            Progress::Advanced {
                stage: Stage::Extracting(SlotId::B),
                percent: 100
            }
        );
    }

    #[tokio::test]
    async fn test_truncated_pdf_is_corrupt() {
        let mut bytes = pdf_with_pages(&["Hello"]);
        bytes.truncate(12);
        let err = extract(
            Bytes::from(bytes),
            StageReporter::detached(Stage::Extracting(SlotId::A)),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractError::CorruptDocument { .. }));
    }
}
