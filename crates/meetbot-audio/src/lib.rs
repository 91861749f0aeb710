pub mod chunk;
pub mod format;
pub mod io;

pub use chunk::AudioChunk;
pub use format::{convert_format, duration_ns, duration_seconds, AudioFormat};
pub use io::{AudioReader, AudioWriter, InMemoryReader, PacedWriter};
