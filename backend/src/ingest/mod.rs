mod canonical;
mod loader;

pub use canonical::CanonicalImage;
pub use loader::{
    DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_IMAGE_SIZE, DEFAULT_MAX_PAYLOAD_BYTES, ImageLoader,
    IngestError, SUPPORTED_FORMATS,
};
