pub mod api_key;
pub mod engine;
pub mod prompt;
pub mod providers;
pub mod session;
pub mod transcript;

pub use api_key::{ApiKeyState, ApiKeyView};
pub use engine::{ConversationEngine, TurnReply};
pub use prompt::{build_prompt, ContextBudget};
pub use session::{Session, SessionSnapshot, TurnOutcome};
pub use transcript::Transcript;
