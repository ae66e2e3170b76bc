use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::table::{Table, cell_text};

/// `tennis_odds_{bookmaker}_{date}.{ext}`; an empty bookmaker reads `all`.
pub fn default_export_name(bookmaker: &str, date: &str, ext: &str) -> String {
    let book: String = bookmaker
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    let book = if book.is_empty() { "all".to_string() } else { book };
    format!("tennis_odds_{book}_{date}.{ext}")
}

pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(&table.columns)
        .context("write csv header")?;
    for (row_idx, row) in table.rows.iter().enumerate() {
        out.write_record(row.iter().map(cell_text))
            .with_context(|| format!("write csv row {row_idx}"))?;
    }
    out.flush().context("flush csv")?;
    Ok(())
}

pub fn export_csv(table: &Table, path: &Path) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    write_csv(table, file)
}

pub fn export_xlsx(table: &Table, path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Odds").context("name sheet")?;
        write_table(sheet, table)?;
    }
    workbook
        .save(path)
        .with_context(|| format!("save {}", path.display()))?;
    Ok(())
}

fn write_table(worksheet: &mut Worksheet, table: &Table) -> Result<()> {
    for (col_idx, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string(0, sheet_col(col_idx)?, name)
            .with_context(|| format!("write header {col_idx}"))?;
    }
    for (row_idx, row) in table.rows.iter().enumerate() {
        let sheet_row = u32::try_from(row_idx + 1)
            .with_context(|| format!("row {row_idx} exceeds the sheet"))?;
        for (col_idx, value) in row.iter().enumerate() {
            let col = sheet_col(col_idx)?;
            let written = match value.as_f64() {
                Some(n) => worksheet.write_number(sheet_row, col, n),
                None => worksheet.write_string(sheet_row, col, cell_text(value)),
            };
            written.with_context(|| format!("write cell ({sheet_row},{col_idx})"))?;
        }
    }
    Ok(())
}

fn sheet_col(col_idx: usize) -> Result<u16> {
    u16::try_from(col_idx).with_context(|| format!("column {col_idx} exceeds the sheet"))
}
