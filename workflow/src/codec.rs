//! Line-oriented persistence format for flows.
//!
//! ```text
//! <flow-name>
//! <capacity>
//! <tag>
//! <body line>...
//! ```
//!
//! Each tag is followed by a fixed number of body lines. Records are decoded in
//! file order and reference-bearing records may only point at records decoded
//! before them.

use crate::error::FlowError;
use crate::flow::Flow;
use crate::step::CALCULUS_TAG;
use crate::step::CSV_FILE_INPUT_TAG;
use crate::step::DISPLAY_TAG;
use crate::step::END_TAG;
use crate::step::NUMBER_INPUT_TAG;
use crate::step::OUTPUT_TAG;
use crate::step::Step;
use crate::step::TEXT_FILE_INPUT_TAG;
use crate::step::TEXT_INPUT_TAG;
use crate::step::TEXT_TAG;
use crate::step::TITLE_TAG;
use std::iter::Enumerate;
use std::str::Lines;
use tracing::debug;

pub fn encode(flow: &Flow) -> Result<String, FlowError> {
    let mut out = String::new();
    let mut line = 0;
    let mut push = |text: &str| -> Result<(), FlowError> {
        line += 1;
        if text.contains(['\n', '\r']) {
            return Err(FlowError::format(
                line,
                format!("`{}` contains a line break", text.escape_debug()),
            ));
        }
        out.push_str(text);
        out.push('\n');
        Ok(())
    };

    if flow.name().trim().is_empty() {
        return Err(FlowError::format(1, "flow name must not be empty"));
    }
    push(flow.name())?;
    push(&flow.capacity().to_string())?;
    for step in flow.steps() {
        push(step.tag())?;
        for body in step.body_lines() {
            push(&body)?;
        }
    }
    Ok(out)
}

pub fn decode(text: &str) -> Result<Flow, FlowError> {
    let mut reader = Reader::new(text);

    let (_, name) = reader
        .next_line()
        .ok_or_else(|| FlowError::format(1, "missing flow name"))?;
    if name.trim().is_empty() {
        return Err(FlowError::format(1, "flow name must not be empty"));
    }
    let (line, raw_capacity) = reader
        .next_line()
        .ok_or_else(|| FlowError::format(2, "missing capacity"))?;
    let capacity: usize = raw_capacity
        .trim()
        .parse()
        .map_err(|_| FlowError::format(line, format!("invalid capacity `{raw_capacity}`")))?;
    let mut flow = Flow::new(name, capacity)
        .map_err(|err| FlowError::format(line, err.to_string()))?;

    while let Some((line, tag)) = reader.next_line() {
        let tag = tag.trim();
        if tag.is_empty() {
            continue;
        }
        let step = decode_step(&mut reader, line, tag, flow.count())?;
        if flow.is_full() {
            return Err(FlowError::format(
                line,
                format!("more steps than the declared capacity of {capacity}"),
            ));
        }
        flow.append(step)
            .map_err(|err| FlowError::format(line, err.to_string()))?;
    }

    debug!(flow = flow.name(), steps = flow.count(), "decoded flow");
    Ok(flow)
}

fn decode_step(
    reader: &mut Reader<'_>,
    line: usize,
    tag: &str,
    decoded: usize,
) -> Result<Step, FlowError> {
    let step = match tag {
        TITLE_TAG => {
            let title = reader.body(tag)?;
            Step::title(title, reader.body(tag)?)
        }
        TEXT_TAG => {
            let title = reader.body(tag)?;
            Step::text(title, reader.body(tag)?)
        }
        TEXT_INPUT_TAG => Step::text_input(reader.body(tag)?),
        NUMBER_INPUT_TAG => Step::number_input(reader.body(tag)?),
        CALCULUS_TAG => {
            let body_line = reader.line();
            let body = reader.body(tag)?;
            let parts: Vec<&str> = body.split_whitespace().collect();
            let [operator, lhs, rhs] = parts.as_slice() else {
                return Err(FlowError::format(
                    body_line,
                    format!("expected `<operator> <step> <step>`, found `{body}`"),
                ));
            };
            let mut chars = operator.chars();
            let (Some(operator), None) = (chars.next(), chars.next()) else {
                return Err(FlowError::format(
                    body_line,
                    format!("operator must be a single character, found `{operator}`"),
                ));
            };
            Step::calculus(
                operator,
                reference(body_line, tag, lhs, decoded)?,
                reference(body_line, tag, rhs, decoded)?,
            )
        }
        DISPLAY_TAG => Step::display(reader.body(tag)?),
        TEXT_FILE_INPUT_TAG => Step::text_file_input(reader.body(tag)?),
        CSV_FILE_INPUT_TAG => Step::csv_file_input(reader.body(tag)?),
        OUTPUT_TAG => {
            let body_line = reader.line();
            let source = reference(body_line, tag, reader.body(tag)?, decoded)?;
            let file = reader.body(tag)?;
            let title = reader.body(tag)?;
            Step::output(source, file, title, reader.body(tag)?)
        }
        END_TAG => Step::End,
        unknown => {
            return Err(FlowError::format(
                line,
                format!("Unknown step type `{unknown}`"),
            ));
        }
    };
    Ok(step)
}

fn reference(line: usize, tag: &str, raw: &str, decoded: usize) -> Result<usize, FlowError> {
    let position: i64 = raw
        .trim()
        .parse()
        .map_err(|_| FlowError::format(line, format!("{tag} has a non-numeric step `{raw}`")))?;
    match usize::try_from(position) {
        Ok(position) if (1..=decoded).contains(&position) => Ok(position),
        _ => Err(FlowError::format(
            line,
            format!("{tag} references step {position} but only {decoded} steps precede it"),
        )),
    }
}

struct Reader<'a> {
    lines: Enumerate<Lines<'a>>,
    last: usize,
}

impl<'a> Reader<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            lines: text.lines().enumerate(),
            last: 0,
        }
    }

    /// 1-based number of the line `next_line` would return.
    fn line(&self) -> usize {
        self.last + 1
    }

    fn next_line(&mut self) -> Option<(usize, &'a str)> {
        let (index, text) = self.lines.next()?;
        self.last = index + 1;
        Some((self.last, text))
    }

    fn body(&mut self, tag: &str) -> Result<&'a str, FlowError> {
        let expected = self.line();
        self.next_line()
            .map(|(_, text)| text)
            .ok_or_else(|| FlowError::format(expected, format!("{tag} is missing a body line")))
    }
}
