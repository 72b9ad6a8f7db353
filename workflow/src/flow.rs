use crate::analytics::Analytics;
use crate::error::FlowError;
use crate::layout::FlowLayout;
use crate::step::Step;
use crate::terminal::Terminal;
use chrono::DateTime;
use chrono::Utc;
use textwrap::wrap;

/// Upper bound on the number of steps a flow may declare.
pub const MAX_CAPACITY: usize = 10_000;

/// A named, capacity-bounded sequence of steps. Positions handed to and from
/// callers are 1-based; analytics slots are 0-based.
#[derive(Debug, Clone)]
pub struct Flow {
    name: String,
    capacity: usize,
    steps: Vec<Step>,
    created_at: DateTime<Utc>,
    analytics: Analytics,
}

impl Flow {
    pub fn new(name: impl Into<String>, capacity: usize) -> Result<Self, FlowError> {
        if capacity == 0 {
            return Err(FlowError::ZeroCapacity);
        }
        if capacity > MAX_CAPACITY {
            return Err(FlowError::CapacityTooLarge {
                capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(Self {
            name: name.into(),
            capacity,
            steps: Vec::new(),
            created_at: Utc::now(),
            analytics: Analytics::new(capacity),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn count(&self) -> usize {
        self.steps.len()
    }

    pub fn is_full(&self) -> bool {
        self.steps.len() >= self.capacity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn analytics(&self) -> &Analytics {
        &self.analytics
    }

    pub fn analytics_mut(&mut self) -> &mut Analytics {
        &mut self.analytics
    }

    /// Replaces the counters with previously recorded ones. Counters sized for
    /// a different capacity are rejected.
    pub fn restore_analytics(&mut self, analytics: Analytics) -> bool {
        if analytics.capacity() != self.capacity {
            return false;
        }
        self.analytics = analytics;
        true
    }

    /// Appends a step and returns its 1-based position.
    pub fn append(&mut self, step: Step) -> Result<usize, FlowError> {
        if self.is_full() {
            return Err(FlowError::CapacityExceeded {
                capacity: self.capacity,
            });
        }
        if let Some(position) = step
            .references()
            .into_iter()
            .find(|position| !(1..=self.steps.len()).contains(position))
        {
            return Err(FlowError::NotFound(format!(
                "referenced step {position} (flow has {} steps)",
                self.steps.len()
            )));
        }
        self.steps.push(step);
        Ok(self.steps.len())
    }

    pub fn step_at(&self, position: usize) -> Result<&Step, FlowError> {
        position
            .checked_sub(1)
            .and_then(|index| self.steps.get(index))
            .ok_or_else(|| FlowError::NotFound(format!("step {position}")))
    }

    /// Executes the step in `slot` (0-based) against the steps before it.
    pub fn execute(
        &mut self,
        slot: usize,
        terminal: &mut dyn Terminal,
        layout: &FlowLayout,
    ) -> Result<(), FlowError> {
        let len = self.steps.len();
        let (earlier, rest) = self.steps.split_at_mut(slot.min(len));
        let step = rest
            .first_mut()
            .ok_or_else(|| FlowError::NotFound(format!("step {}", slot + 1)))?;
        step.execute(earlier, terminal, layout)
    }

    /// Numbered listing of the steps with descriptions wrapped to `width`.
    pub fn outline(&self, width: usize) -> String {
        let mut result = format!(
            "Flow: {} ({}/{} steps)\n",
            self.name,
            self.count(),
            self.capacity
        );
        for (index, step) in self.steps.iter().enumerate() {
            result.push_str(&format!("{}. {}\n", index + 1, step.tag()));
            for line in step.body_lines() {
                for wrapped in wrap(&line, width.saturating_sub(3).max(1)) {
                    result.push_str("   ");
                    result.push_str(wrapped.trim_end());
                    result.push('\n');
                }
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::Console;
    use std::io::Cursor;
    use pretty_assertions::assert_eq;

    #[test]
    fn append_enforces_capacity() {
        let mut flow = Flow::new("demo", 2).expect("flow");
        assert_eq!(flow.append(Step::title("A", "B")).expect("first"), 1);
        assert_eq!(flow.append(Step::text("C", "D")).expect("second"), 2);
        let err = flow.append(Step::End).unwrap_err();
        assert!(matches!(err, FlowError::CapacityExceeded { capacity: 2 }));
        assert_eq!(flow.count(), 2);
        assert_eq!(flow.analytics().capacity(), 2);
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(Flow::new("empty", 0), Err(FlowError::ZeroCapacity)));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        assert!(Flow::new("edge", MAX_CAPACITY).is_ok());
        assert!(matches!(
            Flow::new("huge", usize::MAX),
            Err(FlowError::CapacityTooLarge {
                capacity: usize::MAX,
                max: MAX_CAPACITY,
            })
        ));
    }

    #[test]
    fn execute_sees_earlier_steps() {
        let dir = tempfile::tempdir().expect("tempdir");
        let layout = FlowLayout::new(dir.path());
        let mut flow = Flow::new("sum", 3).expect("flow");
        flow.append(Step::number_input("a")).expect("a");
        flow.append(Step::number_input("b")).expect("b");
        flow.append(Step::calculus('+', 1, 2)).expect("calc");

        let mut console = Console::new(Cursor::new(b"2\n3\n".to_vec()), Vec::new());
        for slot in 0..3 {
            flow.execute(slot, &mut console, &layout).expect("execute");
        }
        assert!(matches!(
            flow.execute(3, &mut console, &layout),
            Err(FlowError::NotFound(_))
        ));
        let printed = String::from_utf8(console.into_output()).expect("utf8");
        assert!(printed.ends_with("Result: 5\n"));
    }

    #[test]
    fn references_must_point_backwards() {
        let mut flow = Flow::new("calc", 4).expect("flow");
        flow.append(Step::number_input("a")).expect("a");
        assert!(matches!(
            flow.append(Step::calculus('+', 1, 2)),
            Err(FlowError::NotFound(_))
        ));
        assert!(matches!(
            flow.append(Step::output(0, "out", "T", "D")),
            Err(FlowError::NotFound(_))
        ));
        flow.append(Step::number_input("b")).expect("b");
        assert_eq!(flow.append(Step::calculus('+', 1, 2)).expect("calc"), 3);
    }

    #[test]
    fn step_at_is_one_based() {
        let mut flow = Flow::new("lookup", 2).expect("flow");
        flow.append(Step::display("notes")).expect("append");
        assert_eq!(flow.step_at(1).expect("found").tag(), "DisplayStep");
        assert!(matches!(flow.step_at(0), Err(FlowError::NotFound(_))));
        assert!(matches!(flow.step_at(2), Err(FlowError::NotFound(_))));
    }

    #[test]
    fn outline_wraps_long_descriptions() {
        let mut flow = Flow::new("show", 3).expect("flow");
        flow.append(Step::text("Intro", "one two three four five six"))
            .expect("append");
        flow.append(Step::End).expect("append");
        assert_eq!(
            flow.outline(16),
            "Flow: show (2/3 steps)\n1. TextStep\n   Intro\n   one two three\n   four five six\n2. EndStep\n"
        );
    }
}
