pub mod excel;

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::domain::records::EmailRow;
use crate::download::save_image_attachments;
use crate::gmail::MailApi;

pub const DEFAULT_QUERY: &str = "is:unread";

/// One row per matching message, saving its image attachments into `dir` on the way.
pub fn collect_rows(
    api: &dyn MailApi,
    query: &str,
    dir: &Path,
    mark_read: bool,
) -> Result<Vec<EmailRow>> {
    let refs = api.list_messages(query)?;
    println!("Found {} unread emails.", refs.len());
    if refs.is_empty() {
        return Ok(Vec::new());
    }

    fs::create_dir_all(dir)?;
    let mut rows = Vec::with_capacity(refs.len());

    for r in &refs {
        let message = api.get_message(&r.id)?;
        let images = save_image_attachments(api, &message, dir)?;
        rows.push(EmailRow::new(
            message.sender(),
            message.date(),
            message.subject(),
            &images,
        ));

        if mark_read {
            api.mark_read(&r.id)?;
            log::debug!("marked {} as read", r.id);
        }
    }

    Ok(rows)
}

/// Stage 1b: unread mail summary into a spreadsheet. Returns the number of rows written.
pub fn run_export(
    api: &dyn MailApi,
    query: &str,
    download_dir: &Path,
    output: &Path,
    mark_read: bool,
) -> Result<usize> {
    let rows = collect_rows(api, query, download_dir, mark_read)?;
    if rows.is_empty() {
        println!("No unread emails found.");
        return Ok(0);
    }
    excel::write_workbook(&rows, output)?;
    println!("Saved results to {}", output.display());
    Ok(rows.len())
}
