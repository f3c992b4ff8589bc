pub mod archive_extractor;
pub mod placement;

pub use archive_extractor::{ArchiveExtractor, ExtractionSummary};
pub use placement::write_atomically;
