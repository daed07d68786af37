//! Autonomous exploration with reflection.
//!
//! Bootstraps per-element documentation: pick an action, apply it, compare
//! before/after screenshots through the reflect prompt, and persist what the
//! element turned out to do. Elements judged useless are excluded from later
//! rounds of the same session.
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::actions::{parse_explore_rsp, parse_reflect_rsp, ParsedAction, ReflectDecision};
use crate::agent::history::{RoundLog, RoundRecord};
use crate::agent::prompts;
use crate::agent::state::{RunOutcome, RunReport};
use crate::config::AppConfig;
use crate::device::Device;
use crate::docs_store::{ActionKind, DocStore};
use crate::errors::{DroidClawError, DroidClawResult};
use crate::llm::ModelProvider;
use crate::perception::annotator::draw_bbox_multi;
use crate::perception::screen_model::collect_interactive;
use crate::perception::InteractiveElement;

pub struct SelfExplorer<'a> {
    config: &'a AppConfig,
    device: &'a dyn Device,
    model: &'a dyn ModelProvider,
    docs: DocStore,
    log: RoundLog,
    task_dir: PathBuf,
}

impl<'a> SelfExplorer<'a> {
    pub fn new(
        config: &'a AppConfig,
        device: &'a dyn Device,
        model: &'a dyn ModelProvider,
        docs_root: &Path,
        task_dir: &Path,
    ) -> DroidClawResult<Self> {
        std::fs::create_dir_all(task_dir)?;
        Ok(Self {
            config,
            device,
            model,
            docs: DocStore::new(docs_root)?,
            log: RoundLog::new(task_dir),
            task_dir: task_dir.to_path_buf(),
        })
    }

    /// Runs the exploration to the end. Every termination path produces a
    /// report; documentation written before a mid-run failure stays counted.
    pub async fn run(&self, task: &str) -> RunReport {
        let mut rounds: u32 = 0;
        let mut docs_written: u32 = 0;
        match self.run_loop(task, &mut rounds, &mut docs_written).await {
            Ok(outcome) => self.report(outcome, rounds, docs_written),
            Err(e) => {
                tracing::error!(rounds, error = %e, "exploration aborted");
                self.report(RunOutcome::Unexpected, rounds, docs_written)
            }
        }
    }

    async fn run_loop(
        &self,
        task: &str,
        round: &mut u32,
        docs_written: &mut u32,
    ) -> DroidClawResult<RunOutcome> {
        let agent = &self.config.agent;
        let perception = &self.config.perception;

        let mut useless: HashSet<String> = HashSet::new();
        let mut last_act = String::from("None");
        let mut failures: u32 = 0;

        while *round < agent.max_rounds {
            *round += 1;
            tracing::info!(round = *round, "exploration round start");

            let before = self
                .device
                .get_screenshot(&format!("{}_before", *round), &self.task_dir)
                .await?;
            let xml_path = self
                .device
                .get_xml(&round.to_string(), &self.task_dir)
                .await?;
            let xml = std::fs::read_to_string(&xml_path)?;
            let elements: Vec<InteractiveElement> =
                collect_interactive(&xml, perception.min_area, perception.iou_threshold)?
                    .into_iter()
                    .filter(|e| !useless.contains(&e.uid))
                    .collect();
            tracing::info!(
                round = *round,
                elements = elements.len(),
                "candidates after filtering"
            );

            let before_labeled = self
                .task_dir
                .join(format!("{}_before_labeled.png", *round));
            draw_bbox_multi(&before, &before_labeled, &elements, agent.dark_mode)?;

            let prompt = prompts::explore_prompt(task, &last_act);
            let response = match self
                .model
                .get_response(&prompt, &[before_labeled.clone()])
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(round = *round, error = %e, "model call failed");
                    *round -= 1;
                    failures += 1;
                    if failures >= agent.max_model_retries {
                        return Ok(RunOutcome::Unexpected);
                    }
                    tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
                    continue;
                }
            };

            self.log.append(&RoundRecord {
                step: *round,
                prompt: prompt.clone(),
                image: before_labeled.display().to_string(),
                response: response.clone(),
            })?;

            let parsed = match parse_explore_rsp(&response) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(round = *round, error = %e, "unusable model response");
                    *round -= 1;
                    failures += 1;
                    if failures >= agent.max_model_retries {
                        return Ok(RunOutcome::Unexpected);
                    }
                    tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
                    continue;
                }
            };
            failures = 0;

            // (action phrase for the reflect prompt, element, doc kind)
            let acted: Option<(&'static str, usize, ActionKind)> = match &parsed.action {
                ParsedAction::Finish => {
                    tracing::info!(round = *round, "exploration finished by the model");
                    return Ok(RunOutcome::Completed);
                }
                ParsedAction::Text(text) => {
                    self.device.input_text(text).await?;
                    None
                }
                ParsedAction::Tap(i)
                | ParsedAction::LongPress(i)
                | ParsedAction::Swipe { index: i, .. } => {
                    let (x, y) = match element_center(&elements, *i) {
                        Ok(center) => center,
                        Err(e) => {
                            // Round counted, no device effect.
                            tracing::error!(round = *round, error = %e, "round abandoned");
                            continue;
                        }
                    };
                    match &parsed.action {
                        ParsedAction::Tap(_) => {
                            self.device.tap(x, y).await?;
                            Some(("tapping", *i, ActionKind::Tap))
                        }
                        ParsedAction::LongPress(_) => {
                            self.device.long_press(x, y).await?;
                            Some(("long pressing", *i, ActionKind::LongPress))
                        }
                        ParsedAction::Swipe {
                            direction, distance, ..
                        } => {
                            self.device
                                .swipe(x, y, *direction, *distance, false)
                                .await?;
                            Some(("swiping", *i, ActionKind::from_swipe(*direction)))
                        }
                        _ => unreachable!(),
                    }
                }
                other => {
                    tracing::warn!(
                        round = *round,
                        action = ?other,
                        "action unsupported during exploration"
                    );
                    continue;
                }
            };

            if !parsed.summary.is_empty() {
                last_act = parsed.summary.clone();
            }

            let Some((phrase, index, kind)) = acted else {
                tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
                continue;
            };
            let uid = elements[index - 1].uid.clone();

            tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
            let after = self
                .device
                .get_screenshot(&format!("{}_after", *round), &self.task_dir)
                .await?;
            let after_labeled = self.task_dir.join(format!("{}_after_labeled.png", *round));
            draw_bbox_multi(&after, &after_labeled, &elements, agent.dark_mode)?;

            let reflect = prompts::reflect_prompt(phrase, index, &last_act, task);
            let reflect_rsp = match self
                .model
                .get_response(&reflect, &[before_labeled, after_labeled])
                .await
                .and_then(|r| parse_reflect_rsp(&r))
            {
                Ok(outcome) => outcome,
                Err(e) => {
                    // The device action already happened; skip the doc for
                    // this round rather than re-dispatching.
                    tracing::warn!(round = *round, error = %e, "reflection unusable, no doc this round");
                    continue;
                }
            };
            tracing::info!(round = *round, decision = ?reflect_rsp.decision, uid = %uid, "reflection");

            match reflect_rsp.decision {
                ReflectDecision::Ineffective => {
                    useless.insert(uid);
                    last_act = String::from("None");
                }
                ReflectDecision::Back | ReflectDecision::Continue => {
                    if matches!(reflect_rsp.decision, ReflectDecision::Back) {
                        self.device.back().await?;
                    }
                    useless.insert(uid.clone());
                    if let Some(doc) = &reflect_rsp.documentation {
                        if self.docs.set_once(&uid, kind, doc)? {
                            *docs_written += 1;
                        }
                    }
                    last_act = String::from("None");
                }
                ReflectDecision::Success => {
                    if let Some(doc) = &reflect_rsp.documentation {
                        if self.docs.set_once(&uid, kind, doc)? {
                            *docs_written += 1;
                        }
                    }
                }
            }

            tokio::time::sleep(Duration::from_secs(agent.request_interval_secs)).await;
        }

        Ok(RunOutcome::RoundBudget)
    }

    fn report(&self, outcome: RunOutcome, rounds: u32, docs_written: u32) -> RunReport {
        tracing::info!(?outcome, rounds, docs_written, "exploration ended");
        RunReport {
            outcome,
            rounds,
            docs_written,
        }
    }
}

fn element_center(
    elements: &[InteractiveElement],
    index: usize,
) -> DroidClawResult<(i32, i32)> {
    if index == 0 || index > elements.len() {
        return Err(DroidClawError::IndexOutOfRange(format!(
            "element {index} not in 1..={}",
            elements.len()
        )));
    }
    Ok(elements[index - 1].bbox.center())
}
