use rust_xlsxwriter::{Format, Workbook};

use super::{Cell, OutputTable, TableWriter};
use crate::error::Result;

/// Spreadsheet mirror of the master table, one worksheet
#[derive(Debug)]
pub struct XlsxTableWriter {
    pub sheet_name: String,
}

impl Default for XlsxTableWriter {
    fn default() -> Self {
        Self {
            sheet_name: "Grants".to_string(),
        }
    }
}

impl TableWriter for XlsxTableWriter {
    fn render(&self, table: &OutputTable) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col, header) in table.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (row_idx, row) in table.rows.iter().enumerate() {
            // rust_xlsxwriter uses 0-based row/col as u32/u16; row 0 is the header
            let r = (row_idx + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let c = col as u16;
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n)?;
                    }
                    Cell::Bool(b) => {
                        worksheet.write_boolean(r, c, *b)?;
                    }
                }
            }
        }

        Ok(workbook.save_to_buffer()?)
    }
}
