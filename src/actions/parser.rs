//! Free-text model response parsing.
//!
//! The model output is unconstrained prose around line-anchored fields
//! (`Observation:`, `Thought:`, `Action:`, `Summary:`). Fields are extracted
//! independently, but the contract is all-or-nothing: a missing `Action:` or
//! `Summary:` line, or an action body that fails its sub-grammar, fails the
//! whole parse. A half-parsed action is never returned.
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::actions::types::{
    ParsedAction, ParsedResponse, ReflectDecision, ReflectOutcome, SwipeDirection, SwipeDistance,
};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::perception::SubArea;

static RE_OBSERVATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Observation: ?(.*)$").unwrap());
static RE_THOUGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Thought: ?(.*)$").unwrap());
static RE_ACTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Action: ?(.*)$").unwrap());
static RE_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Summary: ?(.*)$").unwrap());
static RE_DECISION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Decision: ?(.*)$").unwrap());
static RE_DOCUMENTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^Documentation: ?(.*)$").unwrap());

static RE_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([A-Za-z_]\w*)\((.*)\)$").unwrap());

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .map(|c| c[1].trim().to_string())
        .filter(|s| !s.is_empty())
}

fn require(re: &Regex, text: &str, field: &str) -> DroidClawResult<String> {
    capture(re, text)
        .ok_or_else(|| DroidClawError::Parse(format!("missing '{field}:' line in response")))
}

/// Splits a call argument list at top-level commas; quoted segments keep
/// their commas intact.
fn split_args(args: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for ch in args.chars() {
        match quote {
            Some(q) if ch == q => {
                quote = None;
                current.push(ch);
            }
            Some(_) => current.push(ch),
            None => match ch {
                '"' | '\'' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                ',' => {
                    out.push(current.trim().to_string());
                    current.clear();
                }
                _ => current.push(ch),
            },
        }
    }
    let last = current.trim();
    if !last.is_empty() || !out.is_empty() {
        out.push(last.to_string());
    }
    out
}

fn strip_quotes(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(s)
        .to_string()
}

fn parse_index(s: &str, what: &str) -> DroidClawResult<usize> {
    s.trim()
        .parse::<usize>()
        .map_err(|_| DroidClawError::Parse(format!("{what} is not an integer: '{s}'")))
}

fn parse_area(s: &str) -> DroidClawResult<u32> {
    s.trim()
        .parse::<u32>()
        .map_err(|_| DroidClawError::Parse(format!("grid area is not an integer: '{s}'")))
}

fn parse_subarea(s: &str) -> DroidClawResult<SubArea> {
    SubArea::from_str(&strip_quotes(s))
}

fn arity_error(name: &str, args: &[String]) -> DroidClawError {
    DroidClawError::Parse(format!("{name} takes different arguments, got {args:?}"))
}

/// Parses the action field in element-addressing form.
fn parse_element_action(act: &str) -> DroidClawResult<ParsedAction> {
    // Terminal sentinel, independent of the call grammar.
    if act.contains("FINISH") {
        return Ok(ParsedAction::Finish);
    }
    let caps = RE_CALL
        .captures(act)
        .ok_or_else(|| DroidClawError::Parse(format!("action is not a call: '{act}'")))?;
    let name = &caps[1];
    let args = split_args(&caps[2]);

    match name {
        "tap" => match args.as_slice() {
            [idx] => Ok(ParsedAction::Tap(parse_index(idx, "element index")?)),
            _ => Err(arity_error(name, &args)),
        },
        "long_press" => match args.as_slice() {
            [idx] => Ok(ParsedAction::LongPress(parse_index(idx, "element index")?)),
            _ => Err(arity_error(name, &args)),
        },
        "text" => match args.as_slice() {
            [s] => Ok(ParsedAction::Text(strip_quotes(s))),
            _ => Err(arity_error(name, &args)),
        },
        "swipe" => match args.as_slice() {
            [idx, dir, dist] => Ok(ParsedAction::Swipe {
                index: parse_index(idx, "element index")?,
                direction: SwipeDirection::from_str(&strip_quotes(dir))?,
                distance: SwipeDistance::from_str(&strip_quotes(dist))?,
            }),
            _ => Err(arity_error(name, &args)),
        },
        "grid" => match args.as_slice() {
            [] => Ok(ParsedAction::EnterGrid),
            _ => Err(arity_error(name, &args)),
        },
        "ask_human" => match args.as_slice() {
            [q] => Ok(ParsedAction::AskHuman(strip_quotes(q))),
            _ => Err(arity_error(name, &args)),
        },
        other => Err(DroidClawError::UnknownAction(other.to_string())),
    }
}

/// Parses the action field in grid-addressing form: the same `tap`,
/// `long_press` and `swipe` spellings map to the grid variants.
fn parse_grid_action(act: &str) -> DroidClawResult<ParsedAction> {
    if act.contains("FINISH") {
        return Ok(ParsedAction::Finish);
    }
    let caps = RE_CALL
        .captures(act)
        .ok_or_else(|| DroidClawError::Parse(format!("action is not a call: '{act}'")))?;
    let name = &caps[1];
    let args = split_args(&caps[2]);

    match name {
        "tap" => match args.as_slice() {
            [area, sub] => Ok(ParsedAction::TapGrid(parse_area(area)?, parse_subarea(sub)?)),
            _ => Err(arity_error(name, &args)),
        },
        "long_press" => match args.as_slice() {
            [area, sub] => Ok(ParsedAction::LongPressGrid(
                parse_area(area)?,
                parse_subarea(sub)?,
            )),
            _ => Err(arity_error(name, &args)),
        },
        "swipe" => match args.as_slice() {
            [a1, s1, a2, s2] => Ok(ParsedAction::SwipeGrid {
                start_area: parse_area(a1)?,
                start_subarea: parse_subarea(s1)?,
                end_area: parse_area(a2)?,
                end_subarea: parse_subarea(s2)?,
            }),
            _ => Err(arity_error(name, &args)),
        },
        "grid" => match args.as_slice() {
            [] => Ok(ParsedAction::EnterGrid),
            _ => Err(arity_error(name, &args)),
        },
        "ask_human" => match args.as_slice() {
            [q] => Ok(ParsedAction::AskHuman(strip_quotes(q))),
            _ => Err(arity_error(name, &args)),
        },
        other => Err(DroidClawError::UnknownAction(other.to_string())),
    }
}

/// Element-mode response: Observation/Thought optional prose, Action and
/// Summary mandatory.
pub fn parse_explore_rsp(text: &str) -> DroidClawResult<ParsedResponse> {
    let act = require(&RE_ACTION, text, "Action")?;
    let action = parse_element_action(&act)?;
    let summary = if matches!(action, ParsedAction::Finish) {
        capture(&RE_SUMMARY, text).unwrap_or_default()
    } else {
        require(&RE_SUMMARY, text, "Summary")?
    };
    Ok(ParsedResponse {
        observation: capture(&RE_OBSERVATION, text),
        thought: capture(&RE_THOUGHT, text),
        action,
        summary,
    })
}

/// Grid-mode response.
pub fn parse_grid_rsp(text: &str) -> DroidClawResult<ParsedResponse> {
    let act = require(&RE_ACTION, text, "Action")?;
    let action = parse_grid_action(&act)?;
    let summary = if matches!(action, ParsedAction::Finish) {
        capture(&RE_SUMMARY, text).unwrap_or_default()
    } else {
        require(&RE_SUMMARY, text, "Summary")?
    };
    Ok(ParsedResponse {
        observation: capture(&RE_OBSERVATION, text),
        thought: capture(&RE_THOUGHT, text),
        action,
        summary,
    })
}

/// Reflection response: `Decision:` mandatory, `Documentation:` mandatory
/// for every decision except INEFFECTIVE.
pub fn parse_reflect_rsp(text: &str) -> DroidClawResult<ReflectOutcome> {
    let decision = ReflectDecision::from_str(&require(&RE_DECISION, text, "Decision")?)?;
    let documentation = capture(&RE_DOCUMENTATION, text);
    if decision != ReflectDecision::Ineffective && documentation.is_none() {
        return Err(DroidClawError::Parse(format!(
            "decision {decision:?} requires a 'Documentation:' line"
        )));
    }
    Ok(ReflectOutcome {
        decision,
        thought: capture(&RE_THOUGHT, text),
        documentation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELEMENT_RSP: &str = "Observation: A login form.\n\
Thought: The username field must be focused first.\n\
Action: tap(3)\n\
Summary: Tapped the username field.";

    #[test]
    fn parses_full_element_response() {
        let rsp = parse_explore_rsp(ELEMENT_RSP).unwrap();
        assert_eq!(rsp.action, ParsedAction::Tap(3));
        assert_eq!(rsp.summary, "Tapped the username field.");
        assert_eq!(rsp.observation.as_deref(), Some("A login form."));
        assert!(rsp.thought.is_some());
    }

    #[test]
    fn surrounding_prose_is_ignored() {
        let text = format!("Sure! Here is my analysis.\n{ELEMENT_RSP}\nHope that helps.");
        let rsp = parse_explore_rsp(&text).unwrap();
        assert_eq!(rsp.action, ParsedAction::Tap(3));
    }

    #[test]
    fn missing_action_line_fails() {
        let err = parse_explore_rsp("Thought: hmm\nSummary: nothing").unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }

    #[test]
    fn missing_summary_fails_for_non_finish() {
        let err = parse_explore_rsp("Action: tap(1)").unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }

    #[test]
    fn finish_short_circuits_without_summary() {
        let rsp = parse_explore_rsp("Action: FINISH").unwrap();
        assert_eq!(rsp.action, ParsedAction::Finish);
        // FINISH embedded in a malformed call still terminates.
        let rsp = parse_explore_rsp("Action: FINISH(all done\nSummary: done").unwrap();
        assert_eq!(rsp.action, ParsedAction::Finish);
    }

    #[test]
    fn text_action_strips_quotes_only() {
        let rsp = parse_explore_rsp("Action: text(\"hello, world\")\nSummary: typed").unwrap();
        assert_eq!(rsp.action, ParsedAction::Text("hello, world".into()));
    }

    #[test]
    fn swipe_action_parses_enums() {
        let rsp =
            parse_explore_rsp("Action: swipe(4, \"up\", \"medium\")\nSummary: scrolled").unwrap();
        assert_eq!(
            rsp.action,
            ParsedAction::Swipe {
                index: 4,
                direction: SwipeDirection::Up,
                distance: SwipeDistance::Medium,
            }
        );
    }

    #[test]
    fn swipe_rejects_bad_direction() {
        let err = parse_explore_rsp("Action: swipe(4, \"sideways\", \"medium\")\nSummary: s")
            .unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }

    #[test]
    fn grid_switch_and_ask_human() {
        let rsp = parse_explore_rsp("Action: grid()\nSummary: switching").unwrap();
        assert_eq!(rsp.action, ParsedAction::EnterGrid);
        let rsp =
            parse_explore_rsp("Action: ask_human(\"Which account?\")\nSummary: asked").unwrap();
        assert_eq!(rsp.action, ParsedAction::AskHuman("Which account?".into()));
    }

    #[test]
    fn unknown_action_name_is_its_own_error() {
        let err = parse_explore_rsp("Action: teleport(3)\nSummary: nope").unwrap_err();
        match err {
            DroidClawError::UnknownAction(name) => assert_eq!(name, "teleport"),
            other => panic!("expected UnknownAction, got {other:?}"),
        }
    }

    #[test]
    fn grid_mode_maps_tap_to_grid_variant() {
        let rsp = parse_grid_rsp("Action: tap(17, \"top-left\")\nSummary: tapped cell").unwrap();
        assert_eq!(rsp.action, ParsedAction::TapGrid(17, SubArea::TopLeft));
    }

    #[test]
    fn grid_swipe_takes_two_cells() {
        let rsp = parse_grid_rsp(
            "Action: swipe(5, \"center\", 12, \"bottom\")\nSummary: dragged",
        )
        .unwrap();
        assert_eq!(
            rsp.action,
            ParsedAction::SwipeGrid {
                start_area: 5,
                start_subarea: SubArea::Center,
                end_area: 12,
                end_subarea: SubArea::Bottom,
            }
        );
    }

    #[test]
    fn grid_tap_rejects_unknown_subarea() {
        let err = parse_grid_rsp("Action: tap(17, \"corner\")\nSummary: s").unwrap_err();
        assert!(matches!(err, DroidClawError::InvalidSubarea(_)));
    }

    #[test]
    fn element_arity_in_grid_mode_fails() {
        let err = parse_grid_rsp("Action: tap(17)\nSummary: s").unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }

    #[test]
    fn reflect_decisions_parse() {
        let rsp = parse_reflect_rsp(
            "Decision: SUCCESS\nThought: it opened the menu\nDocumentation: Opens the nav menu.",
        )
        .unwrap();
        assert_eq!(rsp.decision, ReflectDecision::Success);
        assert_eq!(rsp.documentation.as_deref(), Some("Opens the nav menu."));
    }

    #[test]
    fn ineffective_needs_no_documentation() {
        let rsp = parse_reflect_rsp("Decision: INEFFECTIVE\nThought: nothing changed").unwrap();
        assert_eq!(rsp.decision, ReflectDecision::Ineffective);
        assert!(rsp.documentation.is_none());
    }

    #[test]
    fn back_without_documentation_fails() {
        let err = parse_reflect_rsp("Decision: BACK\nThought: wrong screen").unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }

    #[test]
    fn unknown_decision_fails() {
        let err = parse_reflect_rsp("Decision: MAYBE\nDocumentation: x").unwrap_err();
        assert!(matches!(err, DroidClawError::Parse(_)));
    }
}
