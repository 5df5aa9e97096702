use anyhow::{Result, anyhow};
use rust_xlsxwriter::{Format, Workbook};
use std::path::Path;

use crate::domain::records::EmailRow;

pub const HEADERS: [&str; 4] = ["Sender", "Date", "Subject", "Images"];

/// Cell text, header row first; no index column.
pub fn sheet_cells(rows: &[EmailRow]) -> Vec<[&str; 4]> {
    std::iter::once(HEADERS)
        .chain(rows.iter().map(|r| {
            [
                r.sender.as_str(),
                r.date.as_str(),
                r.subject.as_str(),
                r.images.as_str(),
            ]
        }))
        .collect()
}

/// Write `rows` under a bold header row.
pub fn write_workbook(rows: &[EmailRow], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    for (r, cells) in sheet_cells(rows).iter().enumerate() {
        for (c, text) in cells.iter().enumerate() {
            if r == 0 {
                sheet.write_string_with_format(0, c as u16, *text, &bold)?;
            } else {
                sheet.write_string(r as u32, c as u16, *text)?;
            }
        }
    }

    sheet.autofit();

    workbook
        .save(path)
        .map_err(|e| anyhow!("cannot write {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn header_row_then_one_row_per_email() {
        let rows = vec![
            EmailRow::new("Ann <ann@example.com>", "Tue, 5 Mar 2024", "Expo", &[]),
            EmailRow::new("bob@example.com", "Wed, 6 Mar 2024", "Re: Expo", &[]),
        ];

        let cells = sheet_cells(&rows);

        assert_eq!(cells.len(), 3);
        assert_eq!(cells[0], ["Sender", "Date", "Subject", "Images"]);
        assert_eq!(cells[1], ["Ann <ann@example.com>", "Tue, 5 Mar 2024", "Expo", "No image"]);
        assert_eq!(cells[2][0], "bob@example.com");
    }

    #[test]
    fn empty_sheet_still_has_headers() {
        assert_eq!(sheet_cells(&[]), vec![HEADERS]);
    }

    #[test]
    fn workbook_is_a_zip_container() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let rows = vec![EmailRow::new("a@x", "today", "hi", &[])];

        write_workbook(&rows, &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.xlsx");
        assert!(write_workbook(&[], &path).is_err());
    }
}
