// Application layer - Use case interactors

pub mod container;
pub mod cut_interactor;
pub mod fallback;
pub mod feeder;
pub mod player;

// Re-export interactors
pub use cut_interactor::{CutInteractor, CutOutcome, CutRequest};
pub use fallback::{FallbackOutcome, PlaybackFallbackController};
pub use feeder::{ChunkedBufferFeeder, FeederOutcome, SessionSlot};
pub use player::PlayerView;
