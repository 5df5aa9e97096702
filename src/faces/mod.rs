pub mod crop;
pub mod detector;

use anyhow::Result;

use crate::config::Paths;
use crate::domain::records::{FaceRecord, ImageRecord, read_json, write_json};
use detector::FaceDetector;

/// Stage 2: read `image_meta.json`, crop faces, write `cropped_meta.json`.
pub fn run_crop(detector: &mut dyn FaceDetector, paths: &Paths) -> Result<Vec<FaceRecord>> {
    let records: Vec<ImageRecord> = read_json(&paths.image_meta)?;
    let faces = crop::crop_records(detector, &records, &paths.faces_dir)?;
    write_json(&paths.cropped_meta, &faces)?;
    println!(
        "Saved {} cropped faces to {}.",
        faces.len(),
        paths.cropped_meta.display()
    );
    Ok(faces)
}
