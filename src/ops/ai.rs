// ============================================================================
// AI OPERATIONS — generative collaborators and the background job pipeline
// ============================================================================
//
// The generative backend (image generation, smart edit, video, chat, speech)
// lives outside this crate. Each service is a trait; the app plugs in a
// network client, tests plug in fakes. Jobs run on a dedicated thread and
// report back over a channel, so the canvas is only ever touched on the
// caller's thread when results are polled. A panicking service is reported
// as a failed job.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{CanvasError, CanvasResult};

/// Shown in place of a chat reply when the backend fails.
pub const CHAT_FALLBACK: &str = "Sorry, I couldn't come up with a reply just now. Please try again.";

// ============================================================================
// SERVICE TRAITS
// ============================================================================

/// Text-to-image. Returns encoded image bytes.
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> CanvasResult<Vec<u8>>;
}

/// Prompted edit of the current canvas. Receives and returns encoded bytes.
pub trait ImageEditor: Send + Sync {
    fn edit(&self, current_image: &[u8], prompt: &str) -> CanvasResult<Vec<u8>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AspectRatio {
    #[default]
    Landscape,
    Portrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VideoPoll {
    Pending,
    /// Download URI of the finished video.
    Ready(String),
}

/// A long-running video generation, polled until it finishes.
pub trait VideoOperation: Send {
    fn poll(&mut self) -> CanvasResult<VideoPoll>;
}

pub trait VideoGenerator: Send + Sync {
    fn start(
        &self,
        prompt: &str,
        reference_image: Option<&[u8]>,
        aspect: AspectRatio,
    ) -> CanvasResult<Box<dyn VideoOperation>>;
}

pub trait ChatBackend: Send + Sync {
    fn send(&self, message: &str) -> CanvasResult<String>;
}

/// Text-to-speech. Returns an audio clip in whatever format the sink plays.
pub trait SpeechBackend: Send + Sync {
    fn synthesize(&self, text: &str) -> CanvasResult<Vec<u8>>;
}

pub trait AudioSink: Send + Sync {
    fn play(&self, audio: &[u8]) -> CanvasResult<()>;
}

// ============================================================================
// PAYLOAD DECODING
// ============================================================================

/// Decode a base64 image payload, with or without a `data:` URI prefix.
pub fn decode_base64_image(payload: &str) -> CanvasResult<Vec<u8>> {
    let data = match payload.trim().split_once(";base64,") {
        Some((prefix, data)) if prefix.starts_with("data:") => data,
        _ => payload.trim(),
    };
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| CanvasError::invalid_image(format!("bad base64 payload: {e}")))?;
    if bytes.is_empty() {
        return Err(CanvasError::invalid_image("empty base64 payload"));
    }
    Ok(bytes)
}

// ============================================================================
// VIDEO
// ============================================================================

/// Poll `op` every `interval` until it is ready. There is no timeout; the
/// caller owns cancellation by dropping the job.
pub fn await_video(op: &mut dyn VideoOperation, interval: Duration) -> CanvasResult<String> {
    let mut polls = 0u32;
    loop {
        polls += 1;
        match op.poll()? {
            VideoPoll::Ready(uri) => {
                tracing::info!(polls, "video ready");
                return Ok(uri);
            }
            VideoPoll::Pending => {
                tracing::debug!(polls, "video still rendering");
                std::thread::sleep(interval);
            }
        }
    }
}

// ============================================================================
// CHAT & SPEECH
// ============================================================================

/// The assistant persona. Always answers with something displayable.
pub struct Assistant<C> {
    backend: C,
}

impl<C: ChatBackend> Assistant<C> {
    pub fn new(backend: C) -> Self {
        Self { backend }
    }

    pub fn ask(&self, message: &str) -> String {
        match self.backend.send(message) {
            Ok(reply) if !reply.trim().is_empty() => reply,
            Ok(_) => {
                tracing::warn!("chat backend returned an empty reply");
                CHAT_FALLBACK.to_string()
            }
            Err(e) => {
                tracing::warn!("chat failed: {e}");
                CHAT_FALLBACK.to_string()
            }
        }
    }
}

/// Speaks assistant replies. Failures are logged, never surfaced.
pub struct Narrator<S, A> {
    speech: S,
    sink: A,
}

impl<S: SpeechBackend, A: AudioSink> Narrator<S, A> {
    pub fn new(speech: S, sink: A) -> Self {
        Self { speech, sink }
    }

    pub fn speak(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let result = self
            .speech
            .synthesize(text)
            .and_then(|audio| self.sink.play(&audio));
        if let Err(e) = result {
            tracing::warn!("speech failed: {e}");
        }
    }
}

// ============================================================================
// JOB PIPELINE
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AiJobKind {
    /// Generated image to drop onto the canvas.
    AddImage,
    /// Edited version of the whole canvas.
    SmartEdit,
    Video,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AiOutput {
    Image(Vec<u8>),
    VideoUri(String),
}

/// A finished background job.
#[derive(Debug)]
pub struct AiJobResult {
    pub kind: AiJobKind,
    pub prompt: String,
    pub outcome: CanvasResult<AiOutput>,
}

/// Runs one external request at a time off the caller's thread.
pub struct AiJobs {
    sender: mpsc::Sender<AiJobResult>,
    receiver: mpsc::Receiver<AiJobResult>,
    /// When > 0, a background job is in progress; controls should be disabled.
    pending: usize,
    poll_interval: Duration,
}

impl Default for AiJobs {
    fn default() -> Self {
        Self::new()
    }
}

impl AiJobs {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: 0,
            poll_interval: Duration::from_secs(10),
        }
    }

    /// Interval between video status polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.pending > 0
    }

    pub fn submit_generate(&mut self, generator: Arc<dyn ImageGenerator>, prompt: impl Into<String>) -> CanvasResult<()> {
        let prompt = prompt.into();
        self.spawn(AiJobKind::AddImage, prompt, move |p| {
            generator.generate(p).map(AiOutput::Image)
        })
    }

    /// `current_image` should come from `export_for_editing` at request time.
    pub fn submit_edit(
        &mut self,
        editor: Arc<dyn ImageEditor>,
        current_image: Vec<u8>,
        prompt: impl Into<String>,
    ) -> CanvasResult<()> {
        let prompt = prompt.into();
        self.spawn(AiJobKind::SmartEdit, prompt, move |p| {
            editor.edit(&current_image, p).map(AiOutput::Image)
        })
    }

    pub fn submit_video(
        &mut self,
        generator: Arc<dyn VideoGenerator>,
        prompt: impl Into<String>,
        reference_image: Option<Vec<u8>>,
        aspect: AspectRatio,
    ) -> CanvasResult<()> {
        let prompt = prompt.into();
        let interval = self.poll_interval;
        self.spawn(AiJobKind::Video, prompt, move |p| {
            let mut op = generator.start(p, reference_image.as_deref(), aspect)?;
            await_video(op.as_mut(), interval).map(AiOutput::VideoUri)
        })
    }

    /// Drain finished jobs without blocking.
    pub fn poll(&mut self) -> Vec<AiJobResult> {
        let mut done = Vec::new();
        while let Ok(result) = self.receiver.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            done.push(result);
        }
        done
    }

    /// Block until the next job finishes. `None` when nothing is in flight.
    pub fn wait(&mut self) -> Option<AiJobResult> {
        if self.pending == 0 {
            return None;
        }
        let result = self.receiver.recv().ok()?;
        self.pending = self.pending.saturating_sub(1);
        Some(result)
    }

    fn spawn<F>(&mut self, kind: AiJobKind, prompt: String, job: F) -> CanvasResult<()>
    where
        F: FnOnce(&str) -> CanvasResult<AiOutput> + Send + 'static,
    {
        if self.is_busy() {
            return Err(CanvasError::Busy);
        }
        tracing::info!(?kind, prompt_len = prompt.len(), "ai job started");
        tracing::debug!(?kind, prompt = %prompt, "ai job prompt");

        // Jobs block on the network (and video polls sleep), so they get their
        // own thread instead of a rayon worker the filters need.
        let sender = self.sender.clone();
        std::thread::Builder::new()
            .name(format!("ai-{kind:?}").to_lowercase())
            .spawn(move || {
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| job(&prompt)))
                    .unwrap_or_else(|payload| Err(CanvasError::service(panic_message(payload.as_ref()))));
                if let Err(e) = &outcome {
                    tracing::warn!(?kind, "ai job failed: {e}");
                }
                let _ = sender.send(AiJobResult { kind, prompt, outcome });
            })?;
        self.pending += 1;
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    format!("service panicked: {detail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedImage(Vec<u8>);
    impl ImageGenerator for FixedImage {
        fn generate(&self, _prompt: &str) -> CanvasResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    struct Offline;
    impl ImageGenerator for Offline {
        fn generate(&self, _prompt: &str) -> CanvasResult<Vec<u8>> {
            Err(CanvasError::service("network unreachable"))
        }
    }
    impl ChatBackend for Offline {
        fn send(&self, _message: &str) -> CanvasResult<String> {
            Err(CanvasError::service("quota exceeded"))
        }
    }
    impl SpeechBackend for Offline {
        fn synthesize(&self, _text: &str) -> CanvasResult<Vec<u8>> {
            Err(CanvasError::service("auth"))
        }
    }

    struct Exploding;
    impl ImageGenerator for Exploding {
        fn generate(&self, _prompt: &str) -> CanvasResult<Vec<u8>> {
            panic!("decoder state corrupted")
        }
    }

    struct Echo;
    impl ChatBackend for Echo {
        fn send(&self, message: &str) -> CanvasResult<String> {
            Ok(format!("you said {message}"))
        }
    }
    impl SpeechBackend for Echo {
        fn synthesize(&self, text: &str) -> CanvasResult<Vec<u8>> {
            Ok(text.as_bytes().to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingSink(Mutex<Vec<Vec<u8>>>);
    impl AudioSink for RecordingSink {
        fn play(&self, audio: &[u8]) -> CanvasResult<()> {
            self.0.lock().unwrap().push(audio.to_vec());
            Ok(())
        }
    }

    struct CountdownVideo {
        remaining: usize,
        polls: Arc<AtomicUsize>,
    }
    impl VideoOperation for CountdownVideo {
        fn poll(&mut self) -> CanvasResult<VideoPoll> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.remaining == 0 {
                return Ok(VideoPoll::Ready("https://example.invalid/video.mp4".into()));
            }
            self.remaining -= 1;
            Ok(VideoPoll::Pending)
        }
    }

    struct CountdownGenerator(Arc<AtomicUsize>);
    impl VideoGenerator for CountdownGenerator {
        fn start(&self, _p: &str, reference: Option<&[u8]>, aspect: AspectRatio) -> CanvasResult<Box<dyn VideoOperation>> {
            assert_eq!(reference, Some(&b"ref"[..]));
            assert_eq!(aspect.as_str(), "9:16");
            Ok(Box::new(CountdownVideo {
                remaining: 3,
                polls: self.0.clone(),
            }))
        }
    }

    #[test]
    fn base64_payloads_decode() {
        assert_eq!(decode_base64_image("aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_base64_image("data:image/png;base64,aGVsbG8=").unwrap(), b"hello");
        assert!(matches!(decode_base64_image("***"), Err(CanvasError::InvalidImageData(_))));
        assert!(matches!(decode_base64_image(""), Err(CanvasError::InvalidImageData(_))));
    }

    #[test]
    fn assistant_always_answers() {
        assert_eq!(Assistant::new(Echo).ask("hi"), "you said hi");
        assert_eq!(Assistant::new(Offline).ask("hi"), CHAT_FALLBACK);
    }

    #[test]
    fn narrator_swallows_failures() {
        let sink = RecordingSink::default();
        let narrator = Narrator::new(Offline, sink);
        narrator.speak("hello");
        assert!(narrator.sink.0.lock().unwrap().is_empty());

        let narrator = Narrator::new(Echo, RecordingSink::default());
        narrator.speak("hello");
        narrator.speak("   ");
        assert_eq!(narrator.sink.0.lock().unwrap().as_slice(), &[b"hello".to_vec()]);
    }

    #[test]
    fn video_polls_until_ready() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut op = CountdownVideo {
            remaining: 2,
            polls: polls.clone(),
        };
        let uri = await_video(&mut op, Duration::ZERO).unwrap();
        assert!(uri.ends_with("video.mp4"));
        assert_eq!(polls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn jobs_report_back_and_refuse_overlap() {
        let mut jobs = AiJobs::new();
        assert!(!jobs.is_busy());
        assert!(jobs.wait().is_none());

        jobs.submit_generate(Arc::new(FixedImage(vec![1, 2, 3])), "a cat").unwrap();
        assert!(jobs.is_busy());
        let second = jobs.submit_generate(Arc::new(FixedImage(vec![])), "a dog");
        assert!(matches!(second, Err(CanvasError::Busy)));

        let result = jobs.wait().unwrap();
        assert_eq!(result.kind, AiJobKind::AddImage);
        assert_eq!(result.prompt, "a cat");
        assert_eq!(result.outcome.unwrap(), AiOutput::Image(vec![1, 2, 3]));
        assert!(!jobs.is_busy());
        assert!(jobs.poll().is_empty());
    }

    #[test]
    fn failed_jobs_carry_the_cause() {
        let mut jobs = AiJobs::new();
        jobs.submit_generate(Arc::new(Offline), "anything").unwrap();
        let result = jobs.wait().unwrap();
        let err = result.outcome.unwrap_err();
        assert!(err.to_string().contains("network unreachable"));
    }

    #[test]
    fn panicking_service_still_reports_back() {
        let mut jobs = AiJobs::new();
        jobs.submit_generate(Arc::new(Exploding), "boom").unwrap();
        let result = jobs.wait().unwrap();
        assert_eq!(result.kind, AiJobKind::AddImage);
        match result.outcome {
            Err(CanvasError::Service(msg)) => assert!(msg.contains("decoder state corrupted"), "{msg}"),
            other => panic!("expected service error, got {other:?}"),
        }
        assert!(!jobs.is_busy());

        jobs.submit_generate(Arc::new(FixedImage(vec![7])), "again").unwrap();
        assert_eq!(jobs.wait().unwrap().outcome.unwrap(), AiOutput::Image(vec![7]));
    }

    #[test]
    fn video_jobs_resolve_to_uri() {
        let polls = Arc::new(AtomicUsize::new(0));
        let mut jobs = AiJobs::new().with_poll_interval(Duration::ZERO);
        jobs.submit_video(
            Arc::new(CountdownGenerator(polls.clone())),
            "waves",
            Some(b"ref".to_vec()),
            AspectRatio::Portrait,
        )
        .unwrap();
        let result = jobs.wait().unwrap();
        assert_eq!(result.kind, AiJobKind::Video);
        assert!(matches!(result.outcome, Ok(AiOutput::VideoUri(_))));
        assert_eq!(polls.load(Ordering::SeqCst), 4);
    }
}
