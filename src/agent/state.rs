//! Loop state shared by the executor and explorer.

/// Addressing scheme for the current round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressMode {
    Element,
    Grid,
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The model reported FINISH and the operator quit.
    Completed,
    /// The round budget ran out before the task finished.
    RoundBudget,
    /// Consecutive model failures exhausted the retry budget.
    Unexpected,
}

/// Final report for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: RunOutcome,
    pub rounds: u32,
    pub docs_written: u32,
}
