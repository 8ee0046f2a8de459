use anyhow::{Context, Result};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, Run, RunChild};

/// Paragraph texts joined by newlines. Tables and headers are not included.
pub fn extract(bytes: &[u8]) -> Result<String> {
    let document = read_docx(bytes).context("Failed to parse DOCX")?;

    let mut paragraphs = Vec::new();
    for child in &document.document.children {
        if let DocumentChild::Paragraph(p) = child {
            let mut text = String::new();
            push_paragraph_children(&p.children, &mut text);
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

// Hyperlinks wrap ordinary runs, so their text belongs to the paragraph.
fn push_paragraph_children(children: &[ParagraphChild], text: &mut String) {
    for child in children {
        match child {
            ParagraphChild::Run(run) => push_run(run, text),
            ParagraphChild::Hyperlink(link) => push_paragraph_children(&link.children, text),
            _ => {}
        }
    }
}

fn push_run(run: &Run, text: &mut String) {
    for node in &run.children {
        match node {
            RunChild::Text(t) => text.push_str(&t.text),
            RunChild::Tab(_) => text.push('\t'),
            RunChild::Break(_) => text.push('\n'),
            _ => {}
        }
    }
}
