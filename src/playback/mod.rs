//! Stream playback: failover/retry session, controller and media stacks

pub mod controller;
pub mod external;
pub mod media;
pub mod session;

pub use controller::{PendingRetry, PlaybackController, PlaybackOptions, PlayerView};
pub use external::{ExternalPlayer, PlayerSettings};
pub use media::{MediaEvent, MediaStack, SourceKind, SourceRequest, SourceToken};
pub use session::{PlaybackState, MAX_RETRY, RETRY_DELAY};
