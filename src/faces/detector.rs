use anyhow::{Result, anyhow};
use image::{DynamicImage, GenericImageView};
use rustface::{Detector, ImageData};
use std::path::Path;

use crate::config::FaceConfig;

/// Face location in pixel coordinates; `bottom` and `right` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceBox {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceBox {
    /// Clamp an `(x, y, width, height)` detection to a `img_w` x `img_h` image.
    /// Returns `None` when nothing of it lies inside the image.
    pub fn from_rect(x: i64, y: i64, width: i64, height: i64, img_w: u32, img_h: u32) -> Option<Self> {
        let left = x.clamp(0, img_w as i64);
        let top = y.clamp(0, img_h as i64);
        let right = (x + width).clamp(0, img_w as i64);
        let bottom = (y + height).clamp(0, img_h as i64);
        if right <= left || bottom <= top {
            return None;
        }
        Some(Self {
            top: top as u32,
            right: right as u32,
            bottom: bottom as u32,
            left: left as u32,
        })
    }

    pub fn width(&self) -> u32 {
        self.right - self.left
    }

    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }
}

pub trait FaceDetector {
    fn detect(&mut self, image: &DynamicImage) -> Vec<FaceBox>;
}

/// SeetaFace frontal detector via `rustface`.
pub struct SeetaDetector {
    inner: Box<dyn Detector>,
}

impl SeetaDetector {
    pub fn from_config(cfg: &FaceConfig) -> Result<Self> {
        let model = cfg.model_path.as_deref().ok_or_else(|| {
            anyhow!("faces.model_path not set in config (download seeta_fd_frontal_v1.0.bin)")
        })?;
        Self::load(Path::new(model), cfg)
    }

    pub fn load(model: &Path, cfg: &FaceConfig) -> Result<Self> {
        let path = model
            .to_str()
            .ok_or_else(|| anyhow!("model path is not valid UTF-8: {}", model.display()))?;
        let mut inner = rustface::create_detector(path)
            .map_err(|e| anyhow!("cannot load face model {}: {e}", model.display()))?;

        inner.set_min_face_size(cfg.min_face_size);
        inner.set_score_thresh(cfg.score_thresh);
        inner.set_pyramid_scale_factor(0.8);
        inner.set_slide_window_step(4, 4);

        Ok(Self { inner })
    }
}

impl FaceDetector for SeetaDetector {
    fn detect(&mut self, image: &DynamicImage) -> Vec<FaceBox> {
        let (w, h) = image.dimensions();
        let gray = image.to_luma8();
        let mut data = ImageData::new(gray.as_raw(), w, h);

        self.inner
            .detect(&mut data)
            .into_iter()
            .filter_map(|face| {
                let b = face.bbox();
                FaceBox::from_rect(
                    b.x() as i64,
                    b.y() as i64,
                    b.width() as i64,
                    b.height() as i64,
                    w,
                    h,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_inside_image_is_kept() {
        let b = FaceBox::from_rect(10, 20, 30, 40, 100, 100).unwrap();
        assert_eq!(
            b,
            FaceBox {
                top: 20,
                right: 40,
                bottom: 60,
                left: 10
            }
        );
        assert_eq!((b.width(), b.height()), (30, 40));
    }

    #[test]
    fn rect_crossing_edges_is_clamped() {
        let b = FaceBox::from_rect(-5, -8, 20, 20, 12, 10).unwrap();
        assert_eq!((b.left, b.top, b.right, b.bottom), (0, 0, 12, 10));
    }

    #[test]
    fn rect_outside_image_is_dropped() {
        assert!(FaceBox::from_rect(200, 0, 10, 10, 100, 100).is_none());
        assert!(FaceBox::from_rect(-30, 0, 10, 10, 100, 100).is_none());
        assert!(FaceBox::from_rect(5, 5, 0, 10, 100, 100).is_none());
    }

    #[test]
    fn missing_model_path_is_reported() {
        let err = SeetaDetector::from_config(&FaceConfig::default()).err().unwrap();
        assert!(err.to_string().contains("model_path"));
    }

    #[test]
    fn unreadable_model_is_an_error() {
        let err = SeetaDetector::load(Path::new("/nonexistent/seeta.bin"), &FaceConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("cannot load face model"));
    }
}
