//! Storage abstractions for photo/object backends.

mod r2;

pub use r2::{photo_object_key, BlobStorage, R2Config, R2Storage};
