pub mod error;
pub mod event;
pub mod traits;

pub use error::{FetchError, GenerationError, TurnError};
pub use event::{TurnEvent, TurnEventKind, TurnPhase};
pub use traits::{LlmProvider, LlmRequest, LlmResponse, SourceRelay};
