use anyhow::{Context, Result};

pub fn extract(bytes: &[u8]) -> Result<String> {
    let text = std::str::from_utf8(bytes).context("Text file is not valid UTF-8")?;
    Ok(text.to_string())
}
