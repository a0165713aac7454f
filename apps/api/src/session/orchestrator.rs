//! Drives one session: kind detection and extraction per slot, then exactly one
//! comparison per completed pair.

use std::time::Duration;

use tracing::{info, warn};

use crate::comparison::Comparator;
use crate::errors::AppError;
use crate::extraction::{Extractor, UploadedDocument};
use crate::llm_client::Credential;
use crate::progress::Stage;
use crate::session::slot::SlotId;
use crate::session::store::SessionEntry;
use crate::session::SessionView;

#[derive(Clone)]
pub struct Orchestrator {
    extractor: Extractor,
    comparator: Comparator,
    accept_images: bool,
    progress_tick: Duration,
}

impl Orchestrator {
    pub fn new(
        extractor: Extractor,
        comparator: Comparator,
        accept_images: bool,
        progress_tick: Duration,
    ) -> Self {
        Self {
            extractor,
            comparator,
            accept_images,
            progress_tick,
        }
    }

    /// Puts `document` into `slot`, extracts it, and compares once both slots are ready.
    ///
    /// A failure is recorded on the slot (or on the comparison) and also returned,
    /// so the caller can surface it. The other slot is never affected.
    pub async fn upload(
        &self,
        entry: &SessionEntry,
        slot: SlotId,
        document: UploadedDocument,
    ) -> Result<SessionView, AppError> {
        info!(
            "Slot {slot:?}: '{}' ({}, {} bytes)",
            document.filename,
            document.media_type,
            document.len()
        );

        let detected = {
            let mut session = entry.session.lock().await;
            let generation = session.upload(slot, document.clone());
            session
                .detect_kind(slot, generation, self.accept_images)
                .map(|kind| (generation, kind))
        };
        let Some((generation, kind)) = detected else {
            return Ok(entry.session.lock().await.view());
        };
        let kind = kind.map_err(|e| {
            warn!("Slot {slot:?} rejected: {e}");
            e
        })?;

        let stage = entry.progress.stage(Stage::Extracting(slot));
        stage.start();
        let extracted = self.extractor.extract(&document, kind, &stage).await;
        stage.done();

        let applied = entry
            .session
            .lock()
            .await
            .record_extraction(slot, generation, &extracted);

        match &extracted {
            Ok(text) if applied => {
                info!("Slot {slot:?}: extracted {} chars as {kind}", text.char_count())
            }
            Ok(_) => info!("Slot {slot:?}: upload replaced during extraction, result dropped"),
            Err(e) => warn!("Slot {slot:?}: extraction failed: {e}"),
        }
        extracted?;

        self.run_pending_comparison(entry).await?;
        Ok(entry.session.lock().await.view())
    }

    /// Stores the credential and runs the comparison if the pair was waiting on it
    /// or its last attempt failed.
    pub async fn set_credential(
        &self,
        entry: &SessionEntry,
        credential: Credential,
    ) -> Result<SessionView, AppError> {
        entry.session.lock().await.set_credential(Some(credential));
        info!("Session credential supplied");

        self.run_pending_comparison(entry).await?;
        Ok(entry.session.lock().await.view())
    }

    pub async fn clear_credential(&self, entry: &SessionEntry) -> SessionView {
        let mut session = entry.session.lock().await;
        session.set_credential(None);
        session.view()
    }

    async fn run_pending_comparison(&self, entry: &SessionEntry) -> Result<(), AppError> {
        let ticket = entry.session.lock().await.begin_comparison();
        let Some(ticket) = ticket else {
            return Ok(());
        };

        let stage = entry.progress.stage(Stage::Comparing);
        stage.start();
        let ticker = stage.spawn_fixed_schedule(self.progress_tick);

        let outcome = self
            .comparator
            .compare(&ticket.credential, &ticket.doc1, &ticket.doc2)
            .await;

        ticker.abort();
        stage.done();

        let applied = entry
            .session
            .lock()
            .await
            .finish_comparison(ticket.pair, &outcome);
        if !applied {
            info!("Comparison finished for a replaced pair, result dropped");
        }

        outcome.map(|_| ()).map_err(AppError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytes::Bytes;

    use super::*;
    use crate::comparison::prompts::render_comparison_prompt;
    use crate::extraction::docx::tests::docx_with_paragraphs;
    use crate::extraction::ocr::OcrEngine;
    use crate::extraction::pdf::tests::pdf_with_pages;
    use crate::extraction::DOCX_MEDIA_TYPE;
    use crate::llm_client::tests::StubModel;
    use crate::progress::Progress;
    use crate::session::store::SessionStore;
    use crate::session::ComparisonView;

    fn orchestrator(stub: Arc<StubModel>) -> Orchestrator {
        Orchestrator::new(
            Extractor::new(OcrEngine::new("/nonexistent/tesseract", Duration::from_secs(5))),
            Comparator::new(stub),
            true,
            Duration::from_millis(1),
        )
    }

    fn txt(body: &'static str) -> UploadedDocument {
        UploadedDocument::new("doc.txt", "text/plain", Bytes::from_static(body.as_bytes()))
    }

    async fn session_with_credential(
        store: &SessionStore,
        orchestrator: &Orchestrator,
    ) -> Arc<SessionEntry> {
        let entry = store.create().await;
        orchestrator
            .set_credential(&entry, Credential::new("sk-stub").unwrap())
            .await
            .unwrap();
        entry
    }

    #[tokio::test]
    async fn test_pdf_and_txt_pair_reaches_model_in_their_slots() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = session_with_credential(&store, &orchestrator).await;

        let pdf = UploadedDocument::new(
            "hello.pdf",
            "application/pdf",
            Bytes::from(pdf_with_pages(&["Hello"])),
        );
        orchestrator.upload(&entry, SlotId::A, pdf).await.unwrap();
        assert_eq!(stub.calls(), 0);

        let view = orchestrator
            .upload(&entry, SlotId::B, txt("World"))
            .await
            .unwrap();

        assert_eq!(stub.calls(), 1);
        let prompt = stub.last_prompt().unwrap();
        let doc1_at = prompt.find("Hello").expect("doc1 text in prompt");
        let doc2_at = prompt.find("Document 2:\n        World").expect("doc2 slot");
        assert!(prompt.find("Document 1:").unwrap() < doc1_at && doc1_at < doc2_at);

        match view.comparison {
            ComparisonView::Completed { result } => {
                assert_eq!(result.as_str(), StubModel::echo(&prompt))
            }
            other => panic!("expected completed comparison, got {other:?}"),
        }
        assert_eq!(
            entry.progress.current(),
            Progress::Done {
                stage: Stage::Comparing
            }
        );
    }

    #[tokio::test]
    async fn test_docx_pair_prompt_matches_template() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = session_with_credential(&store, &orchestrator).await;

        let docx = UploadedDocument::new(
            "form.docx",
            DOCX_MEDIA_TYPE,
            Bytes::from(docx_with_paragraphs(&["Signed", "Dated 1 May"])),
        );
        orchestrator.upload(&entry, SlotId::A, docx).await.unwrap();
        orchestrator
            .upload(&entry, SlotId::B, txt("Schedule"))
            .await
            .unwrap();

        assert_eq!(
            stub.last_prompt().unwrap(),
            render_comparison_prompt("Signed\nDated 1 May\n", "Schedule")
        );
    }

    #[tokio::test]
    async fn test_corrupt_pdf_withholds_comparison_and_spares_other_slot() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = session_with_credential(&store, &orchestrator).await;

        orchestrator
            .upload(&entry, SlotId::B, txt("World"))
            .await
            .unwrap();
        let broken = UploadedDocument::new(
            "broken.pdf",
            "application/pdf",
            Bytes::from_static(b"\x00\x01garbage"),
        );
        let err = orchestrator
            .upload(&entry, SlotId::A, broken)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::CorruptDocument(_)));
        assert_eq!(stub.calls(), 0);

        let view = entry.session.lock().await.view();
        assert_eq!(view.slots[0].state, "failed");
        assert!(view.slots[0].error.is_some());
        assert_eq!(view.slots[1].state, "extracted");
    }

    #[tokio::test]
    async fn test_no_credential_means_no_model_call() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = store.create().await;

        orchestrator
            .upload(&entry, SlotId::A, txt("Hello"))
            .await
            .unwrap();
        let view = orchestrator
            .upload(&entry, SlotId::B, txt("World"))
            .await
            .unwrap();

        assert_eq!(stub.calls(), 0);
        assert!(matches!(view.comparison, ComparisonView::AwaitingCredential));
        assert_eq!(view.slots[0].state, "extracted");
        assert_eq!(view.slots[1].state, "extracted");
    }

    #[tokio::test]
    async fn test_replaced_slot_is_compared_with_current_text_only() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = store.create().await;

        orchestrator
            .upload(&entry, SlotId::A, txt("stale proposal"))
            .await
            .unwrap();
        orchestrator
            .upload(&entry, SlotId::B, txt("schedule"))
            .await
            .unwrap();
        orchestrator
            .upload(&entry, SlotId::A, txt("fresh proposal"))
            .await
            .unwrap();
        assert_eq!(stub.calls(), 0);

        orchestrator
            .set_credential(&entry, Credential::new("sk-stub").unwrap())
            .await
            .unwrap();

        assert_eq!(stub.calls(), 1);
        let prompt = stub.last_prompt().unwrap();
        assert!(prompt.contains("fresh proposal"));
        assert!(!prompt.contains("stale proposal"));
    }

    #[tokio::test]
    async fn test_completed_pair_is_not_recompared() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = session_with_credential(&store, &orchestrator).await;

        orchestrator
            .upload(&entry, SlotId::A, txt("Hello"))
            .await
            .unwrap();
        orchestrator
            .upload(&entry, SlotId::B, txt("World"))
            .await
            .unwrap();
        orchestrator
            .set_credential(&entry, Credential::new("sk-other").unwrap())
            .await
            .unwrap();
        assert_eq!(stub.calls(), 1);

        orchestrator
            .upload(&entry, SlotId::B, txt("World v2"))
            .await
            .unwrap();
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_model_failure_is_surfaced_without_retry() {
        let stub = Arc::new(StubModel::failing(503));
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = session_with_credential(&store, &orchestrator).await;

        orchestrator
            .upload(&entry, SlotId::A, txt("Hello"))
            .await
            .unwrap();
        let err = orchestrator
            .upload(&entry, SlotId::B, txt("World"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::ComparisonUnavailable(_)));
        assert_eq!(stub.calls(), 1);

        let view = entry.session.lock().await.view();
        assert!(matches!(view.comparison, ComparisonView::Failed { .. }));

        orchestrator.clear_credential(&entry).await;
        assert_eq!(stub.calls(), 1);

        let err = orchestrator
            .set_credential(&entry, Credential::new("sk-again").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ComparisonUnavailable(_)));
        assert_eq!(stub.calls(), 2);
    }

    #[tokio::test]
    async fn test_unsupported_upload_is_rejected_before_extraction() {
        let stub = Arc::new(StubModel::default());
        let orchestrator = orchestrator(stub.clone());
        let store = SessionStore::default();
        let entry = store.create().await;

        let doc = UploadedDocument::new("sheet.csv", "text/csv", Bytes::from_static(b"a,b"));
        let err = orchestrator.upload(&entry, SlotId::A, doc).await.unwrap_err();

        assert!(matches!(err, AppError::UnsupportedFormat(_)));
        assert_eq!(entry.progress.current(), Progress::Idle);
    }
}
