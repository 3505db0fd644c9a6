//! Utility modules supporting the pipeline.
//!
//! - [`HttpClient`]: shared `reqwest` client with timeouts and a user agent
//! - [`RetryPolicy`] and [`with_retry`]: bounded retries on rate limiting,
//!   honouring the service's "try again in" hint
//! - [`ProgressListener`]: progress reporting hooks with a few ready-made
//!   listeners

mod http;
mod progress;
mod retry;

pub use http::HttpClient;
pub use progress::{
    CallbackProgress, NoopProgress, ProgressEvent, ProgressListener, RecordingProgress, Stage,
};
pub use retry::{
    hint_from_secs, parse_retry_after, with_retry, AttemptError, RetryError, RetryPolicy,
    HINT_PADDING, MAX_RETRY_HINT,
};
