//! Typed actions produced by the response parser.
use std::str::FromStr;

use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::SubArea;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Up,
    Down,
    Left,
    Right,
}

impl FromStr for SwipeDirection {
    type Err = DroidClawError;

    fn from_str(s: &str) -> DroidClawResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(SwipeDirection::Up),
            "down" => Ok(SwipeDirection::Down),
            "left" => Ok(SwipeDirection::Left),
            "right" => Ok(SwipeDirection::Right),
            other => Err(DroidClawError::Parse(format!(
                "unknown swipe direction '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDistance {
    Short,
    Medium,
    Long,
}

impl FromStr for SwipeDistance {
    type Err = DroidClawError;

    fn from_str(s: &str) -> DroidClawResult<Self> {
        match s.trim().to_lowercase().as_str() {
            "short" => Ok(SwipeDistance::Short),
            "medium" => Ok(SwipeDistance::Medium),
            "long" => Ok(SwipeDistance::Long),
            other => Err(DroidClawError::Parse(format!(
                "unknown swipe distance '{other}'"
            ))),
        }
    }
}

/// Closed set of dispatchable actions. Element indices and grid areas are
/// 1-based exactly as they appear on the annotated image; range validation
/// against the current screen happens at dispatch time, not at parse time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedAction {
    Tap(usize),
    TapGrid(u32, SubArea),
    Text(String),
    LongPress(usize),
    LongPressGrid(u32, SubArea),
    Swipe {
        index: usize,
        direction: SwipeDirection,
        distance: SwipeDistance,
    },
    SwipeGrid {
        start_area: u32,
        start_subarea: SubArea,
        end_area: u32,
        end_subarea: SubArea,
    },
    EnterGrid,
    AskHuman(String),
    Finish,
}

/// Fully parsed model response. `summary` seeds the next round's
/// last-action context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedResponse {
    pub observation: Option<String>,
    pub thought: Option<String>,
    pub action: ParsedAction,
    pub summary: String,
}

/// Reflection verdict on the effect of an exploration action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReflectDecision {
    Back,
    Ineffective,
    Continue,
    Success,
}

impl FromStr for ReflectDecision {
    type Err = DroidClawError;

    fn from_str(s: &str) -> DroidClawResult<Self> {
        match s.trim().to_uppercase().as_str() {
            "BACK" => Ok(ReflectDecision::Back),
            "INEFFECTIVE" => Ok(ReflectDecision::Ineffective),
            "CONTINUE" => Ok(ReflectDecision::Continue),
            "SUCCESS" => Ok(ReflectDecision::Success),
            other => Err(DroidClawError::Parse(format!(
                "unknown reflect decision '{other}'"
            ))),
        }
    }
}

/// Parsed reflection response. `documentation` is present for every decision
/// except INEFFECTIVE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectOutcome {
    pub decision: ReflectDecision,
    pub thought: Option<String>,
    pub documentation: Option<String>,
}
