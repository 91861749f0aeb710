use meetbot_audio::AudioFormat;

/// A fixed-size audio frame labelled by a VAD detector.
///
/// Invariant: `data.len() / format.byte_depth as usize ==
/// window_size_samples` for the emitting detector.
#[derive(Debug, Clone)]
pub struct VadWindow {
    pub data: Vec<u8>,
    pub time_ns: u64,
    pub is_speech: bool,
    pub speaker: Option<String>,
}

impl VadWindow {
    pub fn new(data: Vec<u8>, time_ns: u64, is_speech: bool, speaker: Option<String>) -> Self {
        Self {
            data,
            time_ns,
            is_speech,
            speaker,
        }
    }

    pub fn samples(&self, format: AudioFormat) -> usize {
        format.samples_in(self.data.len())
    }
}
