//! Task Bus: Redis Streams carrying the two job payloads the pipeline and
//! face-enrollment workers consume (spec §2 C4, §6 "Task Bus messages").
//!
//! - `process_video` jobs drive the 8-stage indexing pipeline.
//! - `compute_face_embedding` jobs drive face-profile centroid recompute.
//!
//! Both ride separate streams behind one `JobQueue`, with per-stream
//! consumer groups, SET-NX idempotency dedup, and a DLQ stream apiece.

pub mod error;
pub mod job;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use job::{ComputeFaceEmbeddingJob, ProcessVideoJob, QueueJob};
pub use queue::{JobQueue, QueueConfig, Stream};
