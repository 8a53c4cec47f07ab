//! Base model seam: request/response types and the capability-flagged trait
//! every backend adapter implements.

mod traits;
mod types;

pub use traits::{BaseModel, ChunkStream};
pub use types::{ChatOptions, ModelChunk, ModelError, ModelResponse, ResponseFormat};
