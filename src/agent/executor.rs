//! Round-based task orchestration.
//!
//! One round: capture, perceive, prompt, parse, dispatch. Model and parse
//! failures hold the round counter and retry up to a bounded number of
//! consecutive failures; device failures end the run with an Unexpected
//! report.
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actions::{parse_explore_rsp, parse_grid_rsp, ParsedAction};
use crate::agent::history::{RoundLog, RoundRecord};
use crate::agent::interrupt::HumanOverride;
use crate::agent::prompts;
use crate::agent::state::{AddressMode, RunOutcome, RunReport};
use crate::config::AppConfig;
use crate::device::Device;
use crate::docs_store::DocStore;
use crate::errors::{DroidClawError, DroidClawResult};
use crate::human::HumanInput;
use crate::llm::ModelProvider;
use crate::perception::annotator::draw_bbox_multi;
use crate::perception::grid::{area_to_xy, draw_grid};
use crate::perception::screen_model::build_task_elements;
use crate::perception::stagnation::StagnationDetector;
use crate::perception::InteractiveElement;

/// What the current round can address: the extracted element list, or the
/// grid lattice shape.
enum ScreenContext {
    Elements(Vec<InteractiveElement>),
    Grid { rows: u32, cols: u32 },
}

pub struct TaskExecutor<'a> {
    config: &'a AppConfig,
    device: &'a dyn Device,
    model: &'a dyn ModelProvider,
    human: &'a dyn HumanInput,
    docs: DocStore,
    log: RoundLog,
    task_dir: PathBuf,
    override_flag: HumanOverride,
}

impl<'a> TaskExecutor<'a> {
    pub fn new(
        config: &'a AppConfig,
        device: &'a dyn Device,
        model: &'a dyn ModelProvider,
        human: &'a dyn HumanInput,
        docs_root: &Path,
        task_dir: &Path,
        override_flag: HumanOverride,
    ) -> DroidClawResult<Self> {
        std::fs::create_dir_all(task_dir)?;
        Ok(Self {
            config,
            device,
            model,
            human,
            docs: DocStore::new(docs_root)?,
            log: RoundLog::new(task_dir),
            task_dir: task_dir.to_path_buf(),
            override_flag,
        })
    }

    fn default_mode(&self) -> AddressMode {
        if self.config.agent.always_grid || self.config.agent.disable_xml {
            AddressMode::Grid
        } else {
            AddressMode::Element
        }
    }

    /// Runs the task to the end. Every termination path produces a report;
    /// a mid-run device or IO failure is reported as Unexpected rather than
    /// propagated.
    pub async fn run(&self, task: &str) -> RunReport {
        let mut rounds: u32 = 0;
        let outcome = match self.run_loop(task, &mut rounds).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(rounds, error = %e, "run aborted");
                RunOutcome::Unexpected
            }
        };
        RunReport {
            outcome,
            rounds,
            docs_written: 0,
        }
    }

    async fn run_loop(&self, task: &str, round: &mut u32) -> DroidClawResult<RunOutcome> {
        let (width, height) = self.device.get_screen_size().await?;
        let agent = &self.config.agent;

        let mut task = task.to_string();
        let mut last_act = String::from("None");
        let mut mode = self.default_mode();
        let mut pending_context: Option<String> = None;
        let mut stagnation = StagnationDetector::new(&self.config.stagnation);
        let mut failures: u32 = 0;
        // Capture sequence. Unlike the round counter it never rewinds, so a
        // retried round gets fresh file names instead of overwriting the
        // previous capture (which would make the screen look stagnant).
        let mut step: u32 = 0;

        while *round < agent.max_rounds {
            *round += 1;
            step += 1;
            tracing::info!(round = *round, ?mode, "round start");

            if self.override_flag.take() {
                let answer = self
                    .human
                    .ask("Human override requested. Provide guidance for the agent:")?;
                pending_context = Some(prompts::human_answer_context(
                    "operator override",
                    &answer,
                ));
            }

            let screenshot = self
                .device
                .get_screenshot(&step.to_string(), &self.task_dir)
                .await?;

            let mut context = pending_context.take().unwrap_or_default();
            if stagnation.observe(&screenshot) {
                tracing::warn!(round = *round, "screen stagnant, injecting recovery hint");
                if !context.is_empty() {
                    context.push_str("\n\n");
                }
                context.push_str(prompts::STAGNATION_HINT);
            }

            let (screen, prompt, image) = match mode {
                AddressMode::Element => {
                    let xml_path = self
                        .device
                        .get_xml(&step.to_string(), &self.task_dir)
                        .await?;
                    let xml = std::fs::read_to_string(&xml_path)?;
                    let elements =
                        build_task_elements(&xml, self.config.perception.min_dist)?;
                    tracing::info!(
                        round = *round,
                        elements = elements.len(),
                        "screen model built"
                    );

                    let labeled = self.task_dir.join(format!("{step}_labeled.png"));
                    draw_bbox_multi(&screenshot, &labeled, &elements, agent.dark_mode)?;
                    let ui_doc = self.docs.render_for_prompt(&elements)?;
                    let prompt = prompts::task_prompt(&ui_doc, &task, &last_act, &context);
                    (ScreenContext::Elements(elements), prompt, labeled)
                }
                AddressMode::Grid => {
                    let gridded = self.task_dir.join(format!("{step}_grid.png"));
                    let (rows, cols) = draw_grid(
                        &screenshot,
                        &gridded,
                        None,
                        None,
                        self.config.perception.grid_min_cell_px,
                    );
                    if rows == 0 || cols == 0 {
                        if agent.disable_xml {
                            tracing::error!(round = *round, "grid unavailable and xml disabled");
                            return Ok(RunOutcome::Unexpected);
                        }
                        tracing::warn!(
                            round = *round,
                            "grid unavailable, reverting to element mode"
                        );
                        mode = AddressMode::Element;
                        *round -= 1;
                        continue;
                    }
                    let prompt = prompts::grid_prompt(&task, &last_act, &context);
                    (ScreenContext::Grid { rows, cols }, prompt, gridded)
                }
            };

            let response = match self.model.get_response(&prompt, &[image.clone()]).await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(round = *round, error = %e, "model call failed");
                    *round -= 1;
                    failures += 1;
                    if failures >= agent.max_model_retries {
                        return Ok(RunOutcome::Unexpected);
                    }
                    if !context.is_empty() {
                        pending_context = Some(context);
                    }
                    tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
                    continue;
                }
            };

            self.log.append(&RoundRecord {
                step: *round,
                prompt: prompt.clone(),
                image: image.display().to_string(),
                response: response.clone(),
            })?;

            let parse = match mode {
                AddressMode::Element => parse_explore_rsp(&response),
                AddressMode::Grid => parse_grid_rsp(&response),
            };
            let parsed = match parse {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(round = *round, error = %e, "unusable model response");
                    *round -= 1;
                    failures += 1;
                    if failures >= agent.max_model_retries {
                        return Ok(RunOutcome::Unexpected);
                    }
                    if !context.is_empty() {
                        pending_context = Some(context);
                    }
                    tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
                    continue;
                }
            };
            failures = 0;
            tracing::info!(round = *round, action = ?parsed.action, "action parsed");

            match &parsed.action {
                ParsedAction::Finish => {
                    let answer = self
                        .human
                        .ask("Task completed. Enter a new task, or 'q' to quit:")?;
                    if matches!(answer.to_lowercase().as_str(), "" | "q" | "quit" | "exit") {
                        return Ok(RunOutcome::Completed);
                    }
                    task = answer;
                    last_act = String::from("None");
                    mode = self.default_mode();
                    continue;
                }
                ParsedAction::EnterGrid => {
                    mode = AddressMode::Grid;
                    if !parsed.summary.is_empty() {
                        last_act = parsed.summary.clone();
                    }
                    continue;
                }
                ParsedAction::AskHuman(question) => {
                    let answer = self.human.ask(question)?;
                    pending_context = Some(prompts::human_answer_context(question, &answer));
                    if !parsed.summary.is_empty() {
                        last_act = parsed.summary.clone();
                    }
                    mode = self.default_mode();
                    continue;
                }
                action => match self.dispatch(action, &screen, width, height).await {
                    Ok(()) => {
                        if !parsed.summary.is_empty() {
                            last_act = parsed.summary.clone();
                        }
                    }
                    Err(DroidClawError::IndexOutOfRange(msg)) => {
                        // Round is counted, nothing reached the device and
                        // the summary must not leak into the next prompt.
                        tracing::error!(round = *round, %msg, "action out of range, round abandoned");
                    }
                    Err(e) => return Err(e),
                },
            }

            mode = self.default_mode();
            tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
        }

        Ok(RunOutcome::RoundBudget)
    }

    /// Validates the action against the current screen cardinality and
    /// dispatches it to the device. `IndexOutOfRange` means nothing was
    /// sent to the device.
    async fn dispatch(
        &self,
        action: &ParsedAction,
        screen: &ScreenContext,
        width: u32,
        height: u32,
    ) -> DroidClawResult<()> {
        let element_center = |elements: &[InteractiveElement], index: usize| {
            if index == 0 || index > elements.len() {
                Err(DroidClawError::IndexOutOfRange(format!(
                    "element {index} not in 1..={}",
                    elements.len()
                )))
            } else {
                Ok(elements[index - 1].bbox.center())
            }
        };

        match (action, screen) {
            (ParsedAction::Text(text), _) => self.device.input_text(text).await,
            (ParsedAction::Tap(i), ScreenContext::Elements(elements)) => {
                let (x, y) = element_center(elements, *i)?;
                self.device.tap(x, y).await
            }
            (ParsedAction::LongPress(i), ScreenContext::Elements(elements)) => {
                let (x, y) = element_center(elements, *i)?;
                self.device.long_press(x, y).await
            }
            (
                ParsedAction::Swipe {
                    index,
                    direction,
                    distance,
                },
                ScreenContext::Elements(elements),
            ) => {
                let (x, y) = element_center(elements, *index)?;
                self.device.swipe(x, y, *direction, *distance, false).await
            }
            (ParsedAction::TapGrid(area, sub), ScreenContext::Grid { rows, cols }) => {
                let (x, y) = area_to_xy(*area, *sub, width, height, *rows, *cols)?;
                self.device.tap(x, y).await
            }
            (ParsedAction::LongPressGrid(area, sub), ScreenContext::Grid { rows, cols }) => {
                let (x, y) = area_to_xy(*area, *sub, width, height, *rows, *cols)?;
                self.device.long_press(x, y).await
            }
            (
                ParsedAction::SwipeGrid {
                    start_area,
                    start_subarea,
                    end_area,
                    end_subarea,
                },
                ScreenContext::Grid { rows, cols },
            ) => {
                let start = area_to_xy(*start_area, *start_subarea, width, height, *rows, *cols)?;
                let end = area_to_xy(*end_area, *end_subarea, width, height, *rows, *cols)?;
                self.device.swipe_precise(start, end, 400).await
            }
            _ => Err(DroidClawError::Parse(
                "action does not match the current addressing mode".into(),
            )),
        }
    }
}
