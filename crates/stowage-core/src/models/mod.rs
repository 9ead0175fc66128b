//! Data models for storage requests and responses

mod file_info;
mod upload;

pub use file_info::FileInfo;
pub use upload::{ByteSource, UploadRequest, UploadResponse};
