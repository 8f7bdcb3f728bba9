pub mod fallback;
pub mod multipart;
pub mod providers;

pub use fallback::{FallbackError, ImageAttempt, ModelFallback};
pub use multipart::{ingest, IngestError, IngestedUpload, MultipartLimits};
pub use providers::{ContentProvider, GeneratedContent, ImagePart, Part, ProviderError};
