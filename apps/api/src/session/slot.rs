use serde::{Deserialize, Serialize};

use crate::comparison::prompts::{DOC1_LABEL, DOC2_LABEL};
use crate::extraction::{DocumentKind, ExtractedText, UploadedDocument};

/// One of the two upload positions. `A` feeds `doc1`, `B` feeds `doc2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub const ALL: [SlotId; 2] = [SlotId::A, SlotId::B];

    pub(crate) fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SlotId::A => DOC1_LABEL,
            SlotId::B => DOC2_LABEL,
        }
    }
}

/// Per-slot lifecycle: `Empty → Uploaded → KindDetected → Extracted`.
///
/// `Failed` holds a user-visible message and stays until the slot is replaced.
#[derive(Debug, Clone, Default)]
pub enum SlotState {
    #[default]
    Empty,
    Uploaded {
        document: UploadedDocument,
    },
    KindDetected {
        document: UploadedDocument,
        kind: DocumentKind,
    },
    Extracted {
        document: UploadedDocument,
        kind: DocumentKind,
        text: ExtractedText,
    },
    Failed {
        document: UploadedDocument,
        kind: Option<DocumentKind>,
        message: String,
    },
}

impl SlotState {
    pub fn name(&self) -> &'static str {
        match self {
            SlotState::Empty => "empty",
            SlotState::Uploaded { .. } => "uploaded",
            SlotState::KindDetected { .. } => "kind_detected",
            SlotState::Extracted { .. } => "extracted",
            SlotState::Failed { .. } => "failed",
        }
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        match self {
            SlotState::Empty => None,
            SlotState::Uploaded { document }
            | SlotState::KindDetected { document, .. }
            | SlotState::Extracted { document, .. }
            | SlotState::Failed { document, .. } => Some(document),
        }
    }

    pub fn kind(&self) -> Option<DocumentKind> {
        match self {
            SlotState::KindDetected { kind, .. } | SlotState::Extracted { kind, .. } => Some(*kind),
            SlotState::Failed { kind, .. } => *kind,
            SlotState::Empty | SlotState::Uploaded { .. } => None,
        }
    }

    pub fn text(&self) -> Option<&ExtractedText> {
        match self {
            SlotState::Extracted { text, .. } => Some(text),
            _ => None,
        }
    }
}

/// A slot plus the generation of its current upload.
///
/// The generation is bumped on every upload, so results computed from an
/// older upload can be recognised and dropped.
#[derive(Debug, Clone, Default)]
pub struct Slot {
    pub generation: u64,
    pub state: SlotState,
}
