// Application layer - Use case interactors

pub mod container;
pub mod engine_lifecycle;
pub mod segment_executor;
pub mod split_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use engine_lifecycle::{EngineLifecycle, EngineState, LogBuffer};
pub use segment_executor::SegmentExecutor;
pub use split_interactor::SplitInteractor;
