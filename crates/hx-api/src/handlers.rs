//! Request handlers.

pub mod health;
pub mod people;
pub mod search;
pub mod upload;
pub mod videos;

pub use health::*;
pub use people::*;
pub use search::*;
pub use upload::*;
pub use videos::*;
