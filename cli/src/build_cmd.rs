use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use procflow_workflow::Flow;
use procflow_workflow::Step;
use procflow_workflow::Terminal;

const MENU: &[&str] = &[
    "----- Create Flow Menu -----",
    "1. Add a title step",
    "2. Add a text step",
    "3. Add a text input step",
    "4. Add a number input step",
    "5. Add a calculus step",
    "6. Add a display step",
    "7. Add a text file input step",
    "8. Add a CSV file input step",
    "9. Add an output step",
    "10. Add an end step",
];

/// Builds a flow from answers on `terminal`. Building stops after an end step,
/// when the flow is full, or when input ends at the menu. `None` when input
/// ends before the flow has a name.
pub fn build_flow(terminal: &mut dyn Terminal) -> Result<Option<Flow>> {
    let Some(name) = terminal.ask("Enter the name of the flow: ")? else {
        return Ok(None);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("flow name must not be empty");
    }
    let capacity = ask_number(terminal, "Enter the maximum number of steps: ")?;
    let mut flow = Flow::new(name, capacity).context("cannot create flow")?;

    while !flow.is_full() {
        for line in MENU {
            terminal.say(line)?;
        }
        let Some(choice) = terminal.ask("Enter your choice: ")? else {
            break;
        };
        let step = match read_step(terminal, choice.trim()) {
            Ok(Some(step)) => step,
            Ok(None) => {
                terminal.say("Invalid choice")?;
                continue;
            }
            Err(err) => {
                terminal.say(&format!("Invalid step: {err}"))?;
                continue;
            }
        };
        let is_end = matches!(step, Step::End);
        match flow.append(step) {
            Ok(position) => terminal.say(&format!("Added step {position}."))?,
            Err(err) => terminal.say(&format!("Could not add step: {err}"))?,
        }
        if is_end {
            break;
        }
    }
    if flow.is_full() {
        terminal.say("The flow has reached its maximum number of steps.")?;
    }
    Ok(Some(flow))
}

fn read_step(terminal: &mut dyn Terminal, choice: &str) -> Result<Option<Step>> {
    let step = match choice {
        "1" => {
            terminal.say("TITLE STEP")?;
            let title = ask_line(terminal, "Enter the title: ")?;
            Step::title(title, ask_line(terminal, "Enter the subtitle: ")?)
        }
        "2" => {
            terminal.say("TEXT STEP")?;
            let title = ask_line(terminal, "Enter the title: ")?;
            Step::text(title, ask_line(terminal, "Enter the copy: ")?)
        }
        "3" => {
            terminal.say("TEXT INPUT STEP")?;
            Step::text_input(ask_line(terminal, "Enter the description: ")?)
        }
        "4" => {
            terminal.say("NUMBER INPUT STEP")?;
            Step::number_input(ask_line(terminal, "Enter the description: ")?)
        }
        "5" => {
            terminal.say("CALCULUS STEP")?;
            let operation = ask_line(
                terminal,
                "Enter the operation (+, -, *, /, m for min, M for max): ",
            )?;
            let Some(operator) = operation.trim().chars().next() else {
                bail!("an operation is required");
            };
            let lhs = ask_number(terminal, "Enter the index of the first operand step: ")?;
            let rhs = ask_number(terminal, "Enter the index of the second operand step: ")?;
            Step::calculus(operator, lhs, rhs)
        }
        "6" => {
            terminal.say("DISPLAY STEP")?;
            Step::display(ask_line(terminal, "Enter the filename: ")?)
        }
        "7" => {
            terminal.say("TEXT FILE INPUT STEP")?;
            Step::text_file_input(ask_line(
                terminal,
                "Enter the description of text filename: ",
            )?)
        }
        "8" => {
            terminal.say("CSV FILE INPUT STEP")?;
            Step::csv_file_input(ask_line(
                terminal,
                "Enter the description of CSV filename: ",
            )?)
        }
        "9" => {
            terminal.say("OUTPUT STEP")?;
            let source = ask_number(terminal, "Enter the step number: ")?;
            let file = ask_line(terminal, "Enter the filename: ")?;
            let title = ask_line(terminal, "Enter the title: ")?;
            Step::output(
                source,
                file,
                title,
                ask_line(terminal, "Enter the description: ")?,
            )
        }
        "10" => {
            terminal.say("END STEP")?;
            Step::End
        }
        _ => return Ok(None),
    };
    Ok(Some(step))
}

fn ask_line(terminal: &mut dyn Terminal, prompt: &str) -> Result<String> {
    match terminal.ask(prompt)? {
        Some(line) => Ok(line),
        None => bail!("input ended while building the flow"),
    }
}

fn ask_number(terminal: &mut dyn Terminal, prompt: &str) -> Result<usize> {
    let line = ask_line(terminal, prompt)?;
    line.trim()
        .parse()
        .with_context(|| format!("`{}` is not a positive whole number", line.trim()))
}
