use std::path::Path;

use rust_xlsxwriter::{Format, FormatAlign, Workbook};

use crate::chat::Talk;

/// Writes the conversation to an Excel workbook, one message per row.
pub fn export_transcript(history: &[Talk], path: &Path) -> anyhow::Result<()> {
    let mut workbook = Workbook::new();

    let worksheet = workbook.add_worksheet();

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center);

    for (col, title) in ["#", "Role", "Content", "Time"].iter().enumerate() {
        worksheet.write_string_with_format(0u32, col as u16, *title, &header_format)?;
    }

    for (i, talk) in history.iter().enumerate() {
        let row = (i + 1) as u32;
        worksheet.write_number(row, 0, row as f64)?;
        worksheet.write_string(row, 1, talk.role.as_str())?;
        worksheet.write_string(row, 2, &talk.content)?;
        worksheet.write_string(row, 3, &talk.at.format("%Y-%m-%d %H:%M:%S").to_string())?;
    }

    worksheet.autofit();

    workbook.save(path)?;
    Ok(())
}
