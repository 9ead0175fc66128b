//! Validation modules

pub mod content_type;
pub mod filename;

pub use content_type::{content_type_matches, is_document_type, is_image_type};
pub use filename::{file_extension, is_valid_filename, sanitize_filename, split_extension};
