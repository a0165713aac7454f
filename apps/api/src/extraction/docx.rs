//! DOCX text extraction.
//!
//! A .docx file is a ZIP of XML parts; `docx-rs` gives a typed tree over it:
//! Document → Paragraph → Run → Text. Only top-level paragraphs are read.
//! Runs nested in hyperlinks and tracked insertions count as paragraph text;
//! tracked deletions do not. Tables, headers, footers and embedded objects are
//! left out.

use docx_rs::{DocumentChild, InsertChild, ParagraphChild, Run, RunChild};

use crate::extraction::{DocumentKind, ExtractError};

/// Each paragraph contributes its text followed by `\n`; an empty paragraph
/// contributes a bare newline.
pub fn extract(bytes: &[u8]) -> Result<String, ExtractError> {
    let docx = docx_rs::read_docx(bytes).map_err(|e| ExtractError::CorruptDocument {
        kind: DocumentKind::Docx,
        reason: format!("{e:?}"),
    })?;

    let mut text = String::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            push_paragraph_text(&mut text, &paragraph.children);
            text.push('\n');
        }
    }
    Ok(text)
}

/// Runs are concatenated with no separator; they belong to the same sentence.
fn push_paragraph_text(out: &mut String, children: &[ParagraphChild]) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run_text(out, run),
            ParagraphChild::Hyperlink(link) => push_paragraph_text(out, &link.children),
            ParagraphChild::Insert(insert) => {
                for ic in &insert.children {
                    if let InsertChild::Run(run) = ic {
                        push_run_text(out, run);
                    }
                }
            }
            _ => {}
        }
    }
}

fn push_run_text(out: &mut String, run: &Run) {
    for rc in &run.children {
        match rc {
            RunChild::Text(t) => out.push_str(&t.text),
            RunChild::Tab(_) => out.push('\t'),
            RunChild::Break(_) => out.push('\n'),
            _ => {}
        }
    }
}
