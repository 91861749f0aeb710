pub mod detector;
pub mod energy;
pub mod hybrid;
pub mod neural;
pub mod streamer;
pub mod types;

pub use detector::VadDetector;
pub use energy::{Aggressiveness, EnergyVad};
pub use hybrid::HybridVad;
pub use neural::NeuralVad;
pub use streamer::VadStreamer;
pub use types::VadWindow;
