mod decoder;
mod links;
mod types;

pub use decoder::decode;
pub use links::{job_url, pipeline_url};
