pub mod records;

pub use records::{EmailRow, FaceRecord, ImageRecord};
