/// A framed slice of PCM with a capture timestamp and optional speaker tag.
///
/// `data.len()` is always a whole number of samples at the owning
/// reader/writer's declared format.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub data: Vec<u8>,
    pub time_ns: u64,
    pub speaker: Option<String>,
}

impl AudioChunk {
    pub fn new(data: Vec<u8>, time_ns: u64, speaker: Option<String>) -> Self {
        Self {
            data,
            time_ns,
            speaker,
        }
    }
}
