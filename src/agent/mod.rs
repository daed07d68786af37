//! Orchestration: the task executor, the self-exploration loop and their
//! shared state.
pub mod executor;
pub mod explorer;
pub mod history;
pub mod interrupt;
pub mod prompts;
pub mod state;

pub use executor::TaskExecutor;
pub use explorer::SelfExplorer;
pub use interrupt::HumanOverride;
pub use state::{AddressMode, RunOutcome, RunReport};
