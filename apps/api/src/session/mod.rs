// Session Orchestrator: explicit per-session state for the two upload slots,
// the credential, and the single comparison computed from the current pair.
// Nothing here is persisted; a session lives in memory until deleted or expired.

pub mod handlers;
pub mod orchestrator;
pub mod slot;
pub mod store;

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::comparison::{CompareError, ComparisonResult};
use crate::extraction::{DocumentKind, ExtractError, ExtractedText, UploadedDocument};
use crate::llm_client::Credential;
use crate::session::slot::{Slot, SlotId, SlotState};

/// Upload generations of slot A and slot B that a comparison was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairKey {
    pub a: u64,
    pub b: u64,
}

#[derive(Debug, Clone, Default)]
pub enum ComparisonState {
    #[default]
    NotStarted,
    InFlight {
        pair: PairKey,
    },
    Completed {
        pair: PairKey,
        result: ComparisonResult,
    },
    Failed {
        pair: PairKey,
        message: String,
    },
}

impl ComparisonState {
    fn pair(&self) -> Option<PairKey> {
        match self {
            ComparisonState::NotStarted => None,
            ComparisonState::InFlight { pair }
            | ComparisonState::Completed { pair, .. }
            | ComparisonState::Failed { pair, .. } => Some(*pair),
        }
    }
}

/// Everything needed to run one comparison outside the session lock.
pub struct ComparisonTicket {
    pub pair: PairKey,
    pub credential: Credential,
    pub doc1: ExtractedText,
    pub doc2: ExtractedText,
}

pub struct Session {
    id: Uuid,
    created_at: DateTime<Utc>,
    last_active: Instant,
    credential: Option<Credential>,
    slots: [Slot; 2],
    comparison: ComparisonState,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            last_active: Instant::now(),
            credential: None,
            slots: Default::default(),
            comparison: ComparisonState::NotStarted,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }

    /// A newly supplied credential re-opens a pair whose comparison failed,
    /// so a corrected key can be tried without re-uploading. A completed pair
    /// stays completed.
    pub fn set_credential(&mut self, credential: Option<Credential>) {
        if credential.is_some() && matches!(self.comparison, ComparisonState::Failed { .. }) {
            self.comparison = ComparisonState::NotStarted;
        }
        self.credential = credential;
    }

    pub fn has_credential(&self) -> bool {
        self.credential.is_some()
    }

    pub fn slot(&self, slot: SlotId) -> &Slot {
        &self.slots[slot.index()]
    }

    /// Replaces the slot's document. Any earlier extraction of that slot and any
    /// comparison built on it are invalidated. Returns the new generation.
    pub fn upload(&mut self, slot: SlotId, document: UploadedDocument) -> u64 {
        let entry = &mut self.slots[slot.index()];
        entry.generation += 1;
        entry.state = SlotState::Uploaded { document };
        self.comparison = ComparisonState::NotStarted;
        entry.generation
    }

    /// Detects the kind of the slot's pending upload from its declared media type.
    ///
    /// Returns `None` if `generation` is no longer the slot's current upload.
    /// An unrecognized type moves the slot to `Failed` before any extraction.
    pub fn detect_kind(
        &mut self,
        slot: SlotId,
        generation: u64,
        accept_images: bool,
    ) -> Option<Result<DocumentKind, ExtractError>> {
        let entry = &mut self.slots[slot.index()];
        if entry.generation != generation {
            return None;
        }
        let SlotState::Uploaded { document } = &entry.state else {
            return None;
        };
        let document = document.clone();

        let detected = DocumentKind::from_media_type(&document.media_type).and_then(|kind| {
            if kind == DocumentKind::Image && !accept_images {
                Err(ExtractError::UnsupportedFormat(document.media_type.clone()))
            } else {
                Ok(kind)
            }
        });

        entry.state = match &detected {
            Ok(kind) => SlotState::KindDetected {
                document,
                kind: *kind,
            },
            Err(e) => SlotState::Failed {
                document,
                kind: None,
                message: e.to_string(),
            },
        };
        Some(detected)
    }

    /// Stores an extraction outcome. Outcomes for a replaced upload are dropped.
    pub fn record_extraction(
        &mut self,
        slot: SlotId,
        generation: u64,
        outcome: &Result<ExtractedText, ExtractError>,
    ) -> bool {
        let entry = &mut self.slots[slot.index()];
        if entry.generation != generation {
            return false;
        }
        let SlotState::KindDetected { document, kind } = &entry.state else {
            return false;
        };
        let (document, kind) = (document.clone(), *kind);

        entry.state = match outcome {
            Ok(text) => SlotState::Extracted {
                document,
                kind,
                text: text.clone(),
            },
            Err(e) => SlotState::Failed {
                document,
                kind: Some(kind),
                message: e.to_string(),
            },
        };
        true
    }

    /// The current pair, once both slots hold extractions of their current uploads.
    pub fn extracted_pair(&self) -> Option<PairKey> {
        let [a, b] = &self.slots;
        match (&a.state, &b.state) {
            (SlotState::Extracted { .. }, SlotState::Extracted { .. }) => Some(PairKey {
                a: a.generation,
                b: b.generation,
            }),
            _ => None,
        }
    }

    /// Claims the single comparison for the current pair.
    ///
    /// Returns `None` without a credential, before both slots are extracted, or
    /// when this pair has already been attempted with the current credential.
    pub fn begin_comparison(&mut self) -> Option<ComparisonTicket> {
        let credential = self.credential.clone()?;
        let pair = self.extracted_pair()?;
        if self.comparison.pair() == Some(pair) {
            return None;
        }

        let doc1 = self.slots[SlotId::A.index()].state.text()?.clone();
        let doc2 = self.slots[SlotId::B.index()].state.text()?.clone();
        self.comparison = ComparisonState::InFlight { pair };

        Some(ComparisonTicket {
            pair,
            credential,
            doc1,
            doc2,
        })
    }

    /// Stores a comparison outcome if `pair` is still the one in flight.
    pub fn finish_comparison(
        &mut self,
        pair: PairKey,
        outcome: &Result<ComparisonResult, CompareError>,
    ) -> bool {
        if !matches!(self.comparison, ComparisonState::InFlight { pair: p } if p == pair) {
            return false;
        }
        self.comparison = match outcome {
            Ok(result) => ComparisonState::Completed {
                pair,
                result: result.clone(),
            },
            Err(e) => ComparisonState::Failed {
                pair,
                message: e.to_string(),
            },
        };
        true
    }

    pub fn view(&self) -> SessionView {
        let slots = SlotId::ALL
            .iter()
            .map(|&slot| self.slot_view(slot))
            .collect();

        let comparison = match &self.comparison {
            ComparisonState::InFlight { .. } => ComparisonView::InProgress,
            ComparisonState::Completed { result, .. } => ComparisonView::Completed {
                result: result.clone(),
            },
            ComparisonState::Failed { message, .. } => ComparisonView::Failed {
                message: message.clone(),
            },
            ComparisonState::NotStarted if self.extracted_pair().is_none() => {
                ComparisonView::AwaitingDocuments
            }
            ComparisonState::NotStarted if !self.has_credential() => {
                ComparisonView::AwaitingCredential
            }
            ComparisonState::NotStarted => ComparisonView::Ready,
        };

        SessionView {
            session_id: self.id,
            created_at: self.created_at,
            has_credential: self.has_credential(),
            slots,
            comparison,
        }
    }

    fn slot_view(&self, slot: SlotId) -> SlotView {
        let entry = self.slot(slot);
        let document = entry.state.document();

        let display = match (entry.state.kind(), entry.state.text()) {
            (Some(DocumentKind::Pdf | DocumentKind::Image), _) => Some(DisplayHint::Raw {
                url: format!(
                    "/api/v1/sessions/{}/slots/{}/raw",
                    self.id,
                    slot_path(slot)
                ),
            }),
            (Some(DocumentKind::Docx | DocumentKind::Txt), Some(text)) => Some(DisplayHint::Text {
                text: text.as_str().to_string(),
            }),
            _ => None,
        };

        let error = match &entry.state {
            SlotState::Failed { message, .. } => Some(message.clone()),
            _ => None,
        };

        SlotView {
            slot,
            label: slot.label(),
            generation: entry.generation,
            state: entry.state.name(),
            filename: document.map(|d| d.filename.clone()),
            media_type: document.map(|d| d.media_type.clone()),
            kind: entry.state.kind(),
            byte_len: document.map(UploadedDocument::len),
            error,
            display,
        }
    }
}

fn slot_path(slot: SlotId) -> &'static str {
    match slot {
        SlotId::A => "a",
        SlotId::B => "b",
    }
}

#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub has_credential: bool,
    pub slots: Vec<SlotView>,
    pub comparison: ComparisonView,
}

#[derive(Debug, Serialize)]
pub struct SlotView {
    pub slot: SlotId,
    pub label: &'static str,
    pub generation: u64,
    pub state: &'static str,
    pub filename: Option<String>,
    pub media_type: Option<String>,
    pub kind: Option<DocumentKind>,
    pub byte_len: Option<usize>,
    pub error: Option<String>,
    pub display: Option<DisplayHint>,
}

/// How the presentation layer should show the original document.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DisplayHint {
    /// Render the raw bytes (PDF pages, images).
    Raw { url: String },
    /// Show the extracted text in a text area.
    Text { text: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ComparisonView {
    AwaitingDocuments,
    AwaitingCredential,
    Ready,
    InProgress,
    Completed { result: ComparisonResult },
    Failed { message: String },
}
