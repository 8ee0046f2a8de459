use anyhow::{Context, Result};
use pdf_extract::extract_text_from_mem;

pub fn extract(bytes: &[u8]) -> Result<String> {
    let content = extract_text_from_mem(bytes).context("Failed to parse PDF")?;
    Ok(clean_text(&content))
}

// Line structure is kept for the splitter; other control characters are noise from the parser.
fn clean_text(content: &str) -> String {
    content.replace(|c: char| c.is_control() && c != '\n' && c != '\t', "")
}
