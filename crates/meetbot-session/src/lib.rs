pub mod latch;
pub mod meeting_controller;
pub mod session;
pub mod speech_controller;
pub mod transcription_controller;

pub use latch::NoSpeechLatch;
pub use meeting_controller::{ChatMessage, MeetingController, Participant};
pub use session::{MeetingSession, SessionComposer};
pub use speech_controller::SpeechController;
pub use transcription_controller::TranscriptionController;
