pub mod form;
pub mod webdriver;

use anyhow::{Result, anyhow};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::config::UploadConfig;
use crate::domain::records::{FaceRecord, read_json};
use form::{
    DATE_INPUT, EMAIL_INPUT, FILE_INPUT, SUBMIT_BUTTON, TIME_INPUT, form_date, form_sender,
    form_time,
};
use webdriver::{FormBrowser, WebDriver};

#[derive(Debug, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub interrupted: bool,
}

fn pause(ms: u64) {
    if ms > 0 {
        thread::sleep(Duration::from_millis(ms));
    }
}

/// Fill and submit the form once for `item`.
pub fn upload_one(browser: &mut dyn FormBrowser, item: &FaceRecord, cfg: &UploadConfig) -> Result<()> {
    // the file input wants an absolute path
    let face = fs::canonicalize(&item.face_path)
        .map_err(|e| anyhow!("face image {} is missing: {e}", item.face_path.display()))?;

    browser.open(&cfg.form_url)?;
    pause(cfg.load_wait_ms);

    browser.type_into(FILE_INPUT, &face.to_string_lossy())?;
    pause(cfg.file_wait_ms);

    browser.type_into(EMAIL_INPUT, &form_sender(&item.sender, cfg.address_only))?;
    browser.type_into(DATE_INPUT, &form_date(&item.date))?;
    if cfg.fill_time
        && let Some(time) = form_time(&item.date)
    {
        browser.type_into(TIME_INPUT, &time)?;
    }

    browser.click(SUBMIT_BUTTON)?;
    Ok(())
}

/// Submit every face; a failed item is logged and the loop moves on.
/// Clearing `running` stops the loop before the next item.
pub fn upload_faces(
    browser: &mut dyn FormBrowser,
    faces: &[FaceRecord],
    cfg: &UploadConfig,
    running: &AtomicBool,
) -> UploadSummary {
    let mut summary = UploadSummary::default();

    for item in faces {
        if !running.load(Ordering::SeqCst) {
            summary.interrupted = true;
            break;
        }
        match upload_one(browser, item, cfg) {
            Ok(()) => {
                println!("Uploaded {} for {}", item.face_path.display(), item.sender);
                summary.uploaded += 1;
                pause(cfg.submit_wait_ms);
            }
            Err(e) => {
                log::error!("upload of {} failed: {e}", item.face_path.display());
                summary.failed += 1;
            }
        }
    }

    summary
}

/// Stage 3: read `cropped_meta.json` and submit each face through a WebDriver browser.
/// Clearing `running` (e.g. from a Ctrl-C handler) stops after the current item.
pub fn run_upload(cfg: &UploadConfig, input: &Path, running: &AtomicBool) -> Result<UploadSummary> {
    let faces: Vec<FaceRecord> = read_json(input)?;
    if faces.is_empty() {
        println!("No cropped faces to upload.");
        return Ok(UploadSummary::default());
    }

    let mut driver = WebDriver::start(&cfg.webdriver_url, cfg.headless)?;
    let summary = upload_faces(&mut driver, &faces, cfg, running);
    driver.quit()?;

    if summary.interrupted {
        println!("Interrupted; stopped after {} uploads.", summary.uploaded);
    }
    if summary.failed > 0 {
        println!("{} of {} uploads failed.", summary.failed, faces.len());
    }
    Ok(summary)
}
