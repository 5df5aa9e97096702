use anyhow::{Result, anyhow};
use image::{DynamicImage, ImageFormat};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::records::{FaceRecord, ImageRecord};
use crate::download::unique_path_by;
use crate::faces::detector::{FaceBox, FaceDetector};

/// `<stem>_face<index>.jpg`, `index` starting at 1.
pub fn face_file_name(source: &Path, index: usize) -> String {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{stem}_face{index}.jpg")
}

pub fn crop_face(image: &DynamicImage, face: &FaceBox) -> DynamicImage {
    image.crop_imm(face.left, face.top, face.width(), face.height())
}

fn save_jpeg(face: &DynamicImage, path: &Path) -> Result<()> {
    // JPEG has no alpha channel
    face.to_rgb8()
        .save_with_format(path, ImageFormat::Jpeg)
        .map_err(|e| anyhow!("cannot save {}: {e}", path.display()))
}

/// Crop every detected face of every image into `out_dir`.
///
/// Images that cannot be decoded or contain no face are logged and skipped.
/// Sources sharing a stem (`photo.png`, `photo.jpg`) get distinct crop names.
pub fn crop_records(
    detector: &mut dyn FaceDetector,
    records: &[ImageRecord],
    out_dir: &Path,
) -> Result<Vec<FaceRecord>> {
    fs::create_dir_all(out_dir)?;
    let mut cropped = Vec::new();
    let mut written: HashSet<PathBuf> = HashSet::new();

    for item in records {
        let image = match image::open(&item.filepath) {
            Ok(img) => img,
            Err(e) => {
                eprintln!("Skipping {}: {e}", item.filepath.display());
                continue;
            }
        };

        let faces = detector.detect(&image);
        if faces.is_empty() {
            println!("No face found in {}", item.filepath.display());
            continue;
        }

        for (i, face) in faces.iter().enumerate() {
            let name = face_file_name(&item.filepath, i + 1);
            let out_path = unique_path_by(out_dir, &name, |p| written.contains(p));
            written.insert(out_path.clone());
            save_jpeg(&crop_face(&image, face), &out_path)?;
            println!("Cropped face saved to {}", out_path.display());
            cropped.push(FaceRecord::from_image(item, out_path));
        }
    }

    Ok(cropped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgb, RgbImage, Rgba, RgbaImage};

    /// Returns the same boxes for every image.
    struct FixedDetector(Vec<FaceBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&mut self, _image: &DynamicImage) -> Vec<FaceBox> {
            self.0.clone()
        }
    }

    fn record(path: PathBuf) -> ImageRecord {
        ImageRecord {
            filepath: path,
            sender: "Ann <ann@example.com>".into(),
            date: "Tue, 5 Mar 2024 10:15:00 +0000".into(),
            subject: "Expo".into(),
        }
    }

    fn face(top: u32, right: u32, bottom: u32, left: u32) -> FaceBox {
        FaceBox {
            top,
            right,
            bottom,
            left,
        }
    }

    #[test]
    fn face_names_follow_source_stem() {
        assert_eq!(face_file_name(Path::new("downloads/group photo.png"), 2), "group photo_face2.jpg");
        assert_eq!(face_file_name(Path::new("x"), 1), "x_face1.jpg");
    }

    #[test]
    fn crop_takes_rows_top_to_bottom_and_columns_left_to_right() {
        let mut img = RgbImage::new(10, 8);
        img.put_pixel(3, 2, Rgb([255, 0, 0]));
        let img = DynamicImage::ImageRgb8(img);

        let c = crop_face(&img, &face(2, 7, 6, 3));
        assert_eq!(c.dimensions(), (4, 4));
        assert_eq!(c.to_rgb8().get_pixel(0, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn every_face_becomes_a_record() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("pic.png");
        RgbImage::new(40, 30).save(&src).unwrap();
        let out = dir.path().join("cropped_faces");

        let mut det = FixedDetector(vec![face(0, 10, 10, 0), face(5, 30, 25, 10)]);
        let faces = crop_records(&mut det, &[record(src)], &out).unwrap();

        assert_eq!(faces.len(), 2);
        assert_eq!(faces[0].face_path, out.join("pic_face1.jpg"));
        assert_eq!(faces[1].face_path, out.join("pic_face2.jpg"));
        assert_eq!(faces[1].sender, "Ann <ann@example.com>");
        assert_eq!(faces[1].subject, "Expo");

        let second = image::open(&faces[1].face_path).unwrap();
        assert_eq!(second.dimensions(), (20, 20));
    }

    #[test]
    fn rgba_sources_are_saved_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("alpha.png");
        RgbaImage::from_pixel(8, 8, Rgba([1, 2, 3, 128])).save(&src).unwrap();

        let mut det = FixedDetector(vec![face(0, 8, 8, 0)]);
        let faces = crop_records(&mut det, &[record(src)], dir.path()).unwrap();
        assert_eq!(faces.len(), 1);
        assert!(faces[0].face_path.exists());
    }

    #[test]
    fn images_without_faces_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("empty.png");
        RgbImage::new(5, 5).save(&src).unwrap();

        let mut det = FixedDetector(vec![]);
        let faces = crop_records(&mut det, &[record(src)], dir.path()).unwrap();
        assert!(faces.is_empty());
    }

    #[test]
    fn undecodable_files_do_not_stop_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.jpg");
        fs::write(&bad, b"not an image").unwrap();
        let good = dir.path().join("good.png");
        RgbImage::new(6, 6).save(&good).unwrap();

        let mut det = FixedDetector(vec![face(1, 5, 5, 1)]);
        let faces = crop_records(&mut det, &[record(bad), record(good)], dir.path()).unwrap();
        assert_eq!(faces.len(), 1);
        assert_eq!(faces[0].face_path, dir.path().join("good_face1.jpg"));
    }

    #[test]
    fn same_stem_sources_keep_their_own_crops() {
        let dir = tempfile::tempdir().unwrap();
        let red = dir.path().join("photo.png");
        RgbImage::from_pixel(8, 8, Rgb([255, 0, 0])).save(&red).unwrap();
        let blue = dir.path().join("photo.jpg");
        RgbImage::from_pixel(8, 8, Rgb([0, 0, 255])).save(&blue).unwrap();
        let out = dir.path().join("faces");

        let mut alice = record(red);
        alice.sender = "alice@example.com".into();
        let mut bob = record(blue);
        bob.sender = "bob@example.com".into();

        let mut det = FixedDetector(vec![face(0, 8, 8, 0)]);
        let faces = crop_records(&mut det, &[alice, bob], &out).unwrap();

        assert_eq!(faces[0].face_path, out.join("photo_face1.jpg"));
        assert_eq!(faces[1].face_path, out.join("photo_face1_1.jpg"));

        let alice_px = *image::open(&faces[0].face_path).unwrap().to_rgb8().get_pixel(4, 4);
        let bob_px = *image::open(&faces[1].face_path).unwrap().to_rgb8().get_pixel(4, 4);
        assert!(alice_px[0] > 200 && alice_px[2] < 50, "{alice_px:?}");
        assert!(bob_px[2] > 200 && bob_px[0] < 50, "{bob_px:?}");
    }
}
