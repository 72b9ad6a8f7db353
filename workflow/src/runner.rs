use crate::analytics::AnalyticsReport;
use crate::error::FlowError;
use crate::flow::Flow;
use crate::layout::FlowLayout;
use crate::step::Step;
use crate::terminal::Terminal;
use std::collections::BTreeSet;
use std::io;
use tracing::debug;
use tracing::warn;

/// What the caller decided for the step about to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    Skip,
    Run,
    Unrecognized(String),
}

pub trait SignalSource {
    fn next_signal(
        &mut self,
        position: usize,
        step: &Step,
        terminal: &mut dyn Terminal,
    ) -> io::Result<Signal>;
}

/// Asks on the terminal before every step.
#[derive(Debug, Default)]
pub struct PromptSignals;

impl SignalSource for PromptSignals {
    fn next_signal(
        &mut self,
        _position: usize,
        _step: &Step,
        terminal: &mut dyn Terminal,
    ) -> io::Result<Signal> {
        let answer =
            terminal.ask("Do you want to skip this step? (Press 's' to skip, Enter to continue): ")?;
        Ok(match answer.as_deref().map(str::trim) {
            Some("s" | "S") => Signal::Skip,
            Some("") => Signal::Run,
            Some(other) => Signal::Unrecognized(other.to_string()),
            None => Signal::Unrecognized("end of input".to_string()),
        })
    }
}

/// Skips a fixed set of 1-based positions and runs everything else.
#[derive(Debug, Default)]
pub struct ScriptedSignals {
    skip: BTreeSet<usize>,
}

impl ScriptedSignals {
    pub fn skipping(positions: impl IntoIterator<Item = usize>) -> Self {
        Self {
            skip: positions.into_iter().collect(),
        }
    }
}

impl SignalSource for ScriptedSignals {
    fn next_signal(
        &mut self,
        position: usize,
        _step: &Step,
        _terminal: &mut dyn Terminal,
    ) -> io::Result<Signal> {
        Ok(if self.skip.contains(&position) {
            Signal::Skip
        } else {
            Signal::Run
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Skipped,
    Completed,
    Failed(String),
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepRecord {
    pub position: usize,
    pub tag: &'static str,
    pub outcome: StepOutcome,
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub flow_name: String,
    pub records: Vec<StepRecord>,
    pub analytics: AnalyticsReport,
}

pub struct Runner<'a> {
    layout: &'a FlowLayout,
}

impl<'a> Runner<'a> {
    pub fn new(layout: &'a FlowLayout) -> Self {
        Self { layout }
    }

    /// Replays `flow` once. Step failures are reported on the terminal and
    /// counted, never propagated; only terminal I/O failures abort the replay.
    ///
    /// Every step that is not skipped counts as completed, whether it ran,
    /// failed, or got an unrecognized signal.
    pub fn run(
        &self,
        flow: &mut Flow,
        terminal: &mut dyn Terminal,
        signals: &mut dyn SignalSource,
    ) -> Result<RunReport, FlowError> {
        let mut records = Vec::with_capacity(flow.count());
        for slot in 0..flow.count() {
            let position = slot + 1;
            flow.analytics_mut().on_start();
            let step = flow.step_at(position)?;
            let tag = step.tag();
            let is_end = matches!(step, Step::End);
            terminal.say(&format!("Step {position}: {tag}"))?;

            let signal = signals.next_signal(position, step, terminal)?;
            let outcome = match signal {
                Signal::Skip => {
                    terminal.say("Step skipped!")?;
                    flow.analytics_mut().on_skip(slot);
                    StepOutcome::Skipped
                }
                Signal::Run => match flow.execute(slot, terminal, self.layout) {
                    Ok(()) => StepOutcome::Completed,
                    Err(err) => {
                        warn!(flow = flow.name(), position, error = %err, "step failed");
                        terminal.say(&format!("Error executing step: {err}"))?;
                        flow.analytics_mut().on_error(slot);
                        StepOutcome::Failed(err.to_string())
                    }
                },
                Signal::Unrecognized(answer) => {
                    debug!(position, answer = %answer, "unrecognized signal, step not executed");
                    StepOutcome::Ignored
                }
            };
            if outcome != StepOutcome::Skipped {
                flow.analytics_mut().on_complete();
            }
            records.push(StepRecord {
                position,
                tag,
                outcome,
            });
            if is_end {
                break;
            }
        }

        Ok(RunReport {
            flow_name: flow.name().to_string(),
            records,
            analytics: flow.analytics().report(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Console;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn console(input: &str) -> Console<Cursor<Vec<u8>>, Vec<u8>> {
        Console::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    fn fixture() -> (tempfile::TempDir, FlowLayout) {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = FlowLayout::new(dir.path());
        layout.ensure_dirs().expect("dirs");
        (dir, layout)
    }

    fn outcomes(report: &RunReport) -> Vec<StepOutcome> {
        report
            .records
            .iter()
            .map(|record| record.outcome.clone())
            .collect()
    }

    #[test]
    fn skipped_steps_do_not_count_as_completed() {
        let (_dir, layout) = fixture();
        let mut flow = Flow::new("three", 3).expect("flow");
        flow.append(Step::title("One", "first")).expect("append");
        flow.append(Step::text("Two", "second")).expect("append");
        flow.append(Step::title("Three", "third")).expect("append");

        let report = Runner::new(&layout)
            .run(&mut flow, &mut console(""), &mut ScriptedSignals::skipping([2]))
            .expect("run");

        let analytics = flow.analytics();
        assert_eq!(analytics.skips(0), 0);
        assert_eq!(analytics.skips(1), 1);
        assert_eq!(analytics.skips(2), 0);
        assert_eq!(analytics.times_completed(), 2);
        assert_eq!(analytics.times_started(), 3);
        assert_eq!(
            outcomes(&report),
            vec![
                StepOutcome::Completed,
                StepOutcome::Skipped,
                StepOutcome::Completed
            ]
        );
    }

    #[test]
    fn failed_step_counts_error_and_completion() {
        let (_dir, layout) = fixture();
        let mut flow = Flow::new("divide", 3).expect("flow");
        flow.append(Step::number_input("a")).expect("append");
        flow.append(Step::number_input("b")).expect("append");
        flow.append(Step::calculus('/', 1, 2)).expect("append");

        let mut term = console("4\n0\n");
        let report = Runner::new(&layout)
            .run(&mut flow, &mut term, &mut ScriptedSignals::default())
            .expect("run");

        assert_eq!(flow.analytics().errors(2), 1);
        assert_eq!(flow.analytics().times_completed(), 3);
        assert_eq!(
            report.records[2].outcome,
            StepOutcome::Failed("division by zero".to_string())
        );
        let printed = String::from_utf8(term.into_output()).expect("utf8");
        assert!(printed.contains("Error executing step: division by zero"));
    }

    #[test]
    fn prompted_signals_cover_skip_run_and_unrecognized() {
        let (_dir, layout) = fixture();
        let mut flow = Flow::new("prompted", 4).expect("flow");
        flow.append(Step::text_input("Name?")).expect("append");
        flow.append(Step::text_input("City?")).expect("append");
        flow.append(Step::text_input("Job?")).expect("append");
        flow.append(Step::output(1, "unused", "T", "D")).expect("append");

        // run step 1, skip 2, answer nonsense for 3, input ends before 4
        let mut term = console("\nAda\nS\nwhat\n");
        let report = Runner::new(&layout)
            .run(&mut flow, &mut term, &mut PromptSignals)
            .expect("run");

        assert_eq!(
            outcomes(&report),
            vec![
                StepOutcome::Completed,
                StepOutcome::Skipped,
                StepOutcome::Ignored,
                StepOutcome::Ignored
            ]
        );
        assert_eq!(flow.step_at(1).expect("step").info(), "Ada");
        assert_eq!(flow.step_at(3).expect("step").info(), "");
        assert_eq!(report.analytics.times_started, 4);
        assert_eq!(report.analytics.times_completed, 3);
        assert_eq!(report.analytics.slots[1].skips, 1);
        assert!(report.analytics.slots.iter().all(|slot| slot.errors == 0));
    }

    #[test]
    fn replay_stops_after_end_step() {
        let (_dir, layout) = fixture();
        let mut flow = Flow::new("ended", 3).expect("flow");
        flow.append(Step::End).expect("append");
        flow.append(Step::title("Unreached", "never")).expect("append");

        let mut term = console("");
        let report = Runner::new(&layout)
            .run(&mut flow, &mut term, &mut ScriptedSignals::default())
            .expect("run");

        assert_eq!(report.records.len(), 1);
        assert_eq!(report.analytics.times_started, 1);
        let printed = String::from_utf8(term.into_output()).expect("utf8");
        assert_eq!(printed, "Step 1: EndStep\nEnd of flow.\n");
    }

    #[test]
    fn analytics_accumulate_across_replays() {
        let (_dir, layout) = fixture();
        let mut flow = Flow::new("twice", 2).expect("flow");
        flow.append(Step::display("missing")).expect("append");
        flow.append(Step::End).expect("append");

        let runner = Runner::new(&layout);
        for _ in 0..2 {
            runner
                .run(&mut flow, &mut console(""), &mut ScriptedSignals::default())
                .expect("run");
        }

        let report = flow.analytics().report();
        assert_eq!(report.times_started, 4);
        assert_eq!(report.times_completed, 4);
        assert_eq!(report.slots[0].errors, 2);
    }
}
