use async_trait::async_trait;
use meetbot_vad::VadWindow;
use tokio::sync::mpsc;

use crate::error::SttUnavailable;
use crate::types::SttSegment;

/// `stream` hands the engine one utterance's worth of windows (possibly
/// with leading/trailing non-speech for context) and returns the finalized
/// segments it produces. The returned channel closes when the engine has
/// flushed its final result; a streaming engine should finalize promptly
/// once `windows` closes. Engines that require a single blob buffer the
/// windows internally — callers see no difference.
#[async_trait]
pub trait SttEngine: Send + Sync {
    async fn stream(
        &self,
        windows: mpsc::Receiver<VadWindow>,
    ) -> mpsc::Receiver<Result<SttSegment, SttUnavailable>>;
}
