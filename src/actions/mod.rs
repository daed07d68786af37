//! Typed actions and the model-response grammar.
pub mod parser;
pub mod types;

pub use parser::{parse_explore_rsp, parse_grid_rsp, parse_reflect_rsp};
pub use types::{
    ParsedAction, ParsedResponse, ReflectDecision, ReflectOutcome, SwipeDirection, SwipeDistance,
};
