pub mod segment;
pub mod transcript;

pub use segment::{Role, TranscriptSegment};
pub use transcript::Transcript;
