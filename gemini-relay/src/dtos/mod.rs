pub mod generation;

pub use generation::{ImageEditRequest, InlineImage, TextCompletionRequest, TextCompletionResponse};
