//! Request parameters and result types for the recognition boundary.

/// Audio parameters sent with every recognition request.
///
/// These are configured per deployment, not derived from the uploaded file.
/// See `RecognitionSettings` in the config module for the caveat about
/// mismatched encodings.
#[derive(Debug, Clone)]
pub struct RecognitionConfig {
    /// Encoding identifier the service should assume (e.g. "LINEAR16")
    pub encoding: String,

    /// Sample rate in hertz
    pub sample_rate_hertz: u32,

    /// BCP-47 language code (e.g. "en-US")
    pub language_code: String,
}

/// One candidate transcript for a recognized segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentAlternative {
    pub transcript: String,

    /// Service-reported confidence in 0.0..=1.0, when provided
    pub confidence: Option<f32>,
}

/// One recognized stretch of speech, with its alternatives ordered from most
/// to least likely.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionSegment {
    pub alternatives: Vec<SegmentAlternative>,
}

/// Ordered recognition result for one audio payload.
///
/// An empty segment list is a valid, non-error outcome: the service found no
/// clear speech in the audio.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognitionOutcome {
    pub segments: Vec<RecognitionSegment>,
}

impl RecognitionOutcome {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}
