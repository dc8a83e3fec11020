//! Media preparation
//!
//! Everything that turns raw payload bytes into a prepared playback session:
//! container sniffing, the temp artifact the decoder reads from, and the
//! backend that builds the session.

pub mod artifact;
pub mod backend;
pub mod probe;
pub mod sniff;

pub use artifact::TempArtifact;
pub use backend::{MediaBackend, MediaInfo, PlaybackPolicy, PlaybackSession, PreparedSession};
pub use probe::SymphoniaBackend;
pub use sniff::{sniff, ContainerFormat, ImageFormat, PayloadKind};
