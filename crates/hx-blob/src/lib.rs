//! S3-compatible object storage client (Blob, spec §2 C2).
//!
//! This crate provides:
//! - Upload/download of bytes and files
//! - Presigned GET/PUT URL generation
//! - Deterministic key layout per purpose bucket (uploads, thumbnails,
//!   sidecars, enrollment photos)
//! - Object listing and deletion

pub mod client;
pub mod error;
pub mod keys;

pub use client::{ObjectInfo, R2Client, R2Config};
pub use error::{StorageError, StorageResult};
