mod image_repository;

pub use image_repository::{ImageRecord, ImageRepository, Label};
