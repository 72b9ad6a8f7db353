use crate::error::FlowError;
use crate::layout::FlowLayout;
use crate::terminal::Terminal;
use std::fmt::Display;
use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::io::Write;
use std::ops::Add;
use std::ops::Div;
use std::ops::Mul;
use std::ops::Sub;
use std::str::FromStr;

pub const TITLE_TAG: &str = "TitleStep";
pub const TEXT_TAG: &str = "TextStep";
pub const TEXT_INPUT_TAG: &str = "TextInputStep";
pub const NUMBER_INPUT_TAG: &str = "NumberInputStep";
pub const CALCULUS_TAG: &str = "CalculusStep";
pub const DISPLAY_TAG: &str = "DisplayStep";
pub const TEXT_FILE_INPUT_TAG: &str = "TextFileInputStep";
pub const CSV_FILE_INPUT_TAG: &str = "CSVFileInputStep";
pub const OUTPUT_TAG: &str = "OutputStep";
pub const END_TAG: &str = "EndStep";

/// One unit of a flow.
///
/// Reference-bearing variants (`Calculus`, `Output`) hold 1-based positions of
/// earlier steps and read them at execution time, so they always observe the
/// most recently captured value.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    Title {
        title: String,
        subtitle: String,
    },
    Text {
        title: String,
        body: String,
    },
    TextInput {
        prompt: String,
        input: Option<String>,
    },
    NumberInput {
        prompt: String,
        value: Option<f64>,
    },
    Calculus {
        operator: char,
        lhs: usize,
        rhs: usize,
    },
    Display {
        file: String,
    },
    TextFileInput {
        prompt: String,
        content: String,
    },
    CsvFileInput {
        prompt: String,
        content: String,
    },
    Output {
        source: usize,
        file: String,
        title: String,
        description: String,
    },
    End,
}

impl Step {
    pub fn title(title: impl Into<String>, subtitle: impl Into<String>) -> Self {
        Self::Title {
            title: title.into(),
            subtitle: subtitle.into(),
        }
    }

    pub fn text(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Text {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn text_input(prompt: impl Into<String>) -> Self {
        Self::TextInput {
            prompt: prompt.into(),
            input: None,
        }
    }

    pub fn number_input(prompt: impl Into<String>) -> Self {
        Self::NumberInput {
            prompt: prompt.into(),
            value: None,
        }
    }

    pub fn calculus(operator: char, lhs: usize, rhs: usize) -> Self {
        Self::Calculus { operator, lhs, rhs }
    }

    pub fn display(file: impl Into<String>) -> Self {
        Self::Display { file: file.into() }
    }

    pub fn text_file_input(prompt: impl Into<String>) -> Self {
        Self::TextFileInput {
            prompt: prompt.into(),
            content: String::new(),
        }
    }

    pub fn csv_file_input(prompt: impl Into<String>) -> Self {
        Self::CsvFileInput {
            prompt: prompt.into(),
            content: String::new(),
        }
    }

    pub fn output(
        source: usize,
        file: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::Output {
            source,
            file: file.into(),
            title: title.into(),
            description: description.into(),
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Self::Title { .. } => TITLE_TAG,
            Self::Text { .. } => TEXT_TAG,
            Self::TextInput { .. } => TEXT_INPUT_TAG,
            Self::NumberInput { .. } => NUMBER_INPUT_TAG,
            Self::Calculus { .. } => CALCULUS_TAG,
            Self::Display { .. } => DISPLAY_TAG,
            Self::TextFileInput { .. } => TEXT_FILE_INPUT_TAG,
            Self::CsvFileInput { .. } => CSV_FILE_INPUT_TAG,
            Self::Output { .. } => OUTPUT_TAG,
            Self::End => END_TAG,
        }
    }

    /// Body lines written after the tag in the persisted form.
    pub fn body_lines(&self) -> Vec<String> {
        match self {
            Self::Title { title, subtitle } => vec![title.clone(), subtitle.clone()],
            Self::Text { title, body } => vec![title.clone(), body.clone()],
            Self::TextInput { prompt, .. }
            | Self::NumberInput { prompt, .. }
            | Self::TextFileInput { prompt, .. }
            | Self::CsvFileInput { prompt, .. } => vec![prompt.clone()],
            Self::Calculus { operator, lhs, rhs } => vec![format!("{operator} {lhs} {rhs}")],
            Self::Display { file } => vec![file.clone()],
            Self::Output {
                source,
                file,
                title,
                description,
            } => vec![
                source.to_string(),
                file.clone(),
                title.clone(),
                description.clone(),
            ],
            Self::End => Vec::new(),
        }
    }

    pub fn describe(&self) -> String {
        self.body_lines().join("\n")
    }

    /// Value later steps observe when they reference this one.
    pub fn info(&self) -> String {
        match self {
            Self::Title { title, .. } => title.clone(),
            Self::TextInput { input, .. } => input.clone().unwrap_or_default(),
            Self::NumberInput { value, .. } => value.map(format_number).unwrap_or_default(),
            Self::Display { file } => file.clone(),
            Self::TextFileInput { content, .. } | Self::CsvFileInput { content, .. } => {
                content.clone()
            }
            Self::Text { .. } | Self::Calculus { .. } | Self::Output { .. } | Self::End => {
                String::new()
            }
        }
    }

    /// 1-based positions of the steps this one reads.
    pub fn references(&self) -> Vec<usize> {
        match self {
            Self::Calculus { lhs, rhs, .. } => vec![*lhs, *rhs],
            Self::Output { source, .. } => vec![*source],
            _ => Vec::new(),
        }
    }

    /// Performs the step's side effect. `earlier` holds the steps preceding
    /// this one in its flow.
    pub fn execute(
        &mut self,
        earlier: &[Step],
        terminal: &mut dyn Terminal,
        layout: &FlowLayout,
    ) -> Result<(), FlowError> {
        match self {
            Self::Title { title, subtitle } => {
                terminal.say(&format!("Title: {title}"))?;
                terminal.say(&format!("Subtitle: {subtitle}"))?;
            }
            Self::Text { title, body } => {
                terminal.say(&format!("Title: {title}"))?;
                terminal.say(&format!("Copy: {body}"))?;
            }
            Self::TextInput { prompt, input } => {
                terminal.say(prompt)?;
                let line = terminal
                    .ask("Give me a text: ")?
                    .ok_or(FlowError::InputClosed)?;
                *input = Some(line);
            }
            Self::NumberInput { prompt, value } => {
                terminal.say(prompt)?;
                let line = terminal
                    .ask("Give me a number: ")?
                    .ok_or(FlowError::InputClosed)?;
                *value = Some(parse_operand(&line)?);
            }
            Self::Calculus { operator, lhs, rhs } => {
                let lhs = parse_operand::<f64>(&resolve(earlier, *lhs)?.info())?;
                let rhs = parse_operand::<f64>(&resolve(earlier, *rhs)?.info())?;
                let result = Operator::from_symbol(*operator)?.apply(lhs, rhs)?;
                terminal.say(&format!("Result: {}", format_number(result)))?;
            }
            Self::Display { file } => display_file(file, terminal, layout)?,
            Self::TextFileInput { prompt, content } => {
                terminal.say(prompt)?;
                *content = capture_text_file(terminal, layout)?;
            }
            Self::CsvFileInput { prompt, content } => {
                terminal.say(prompt)?;
                content.clear();
                if let Some(rows) = capture_csv_file(terminal, layout)? {
                    *content = rows;
                }
            }
            Self::Output {
                source,
                file,
                title,
                description,
            } => {
                let info = resolve(earlier, *source)?.info();
                let name = with_extension(file, ".txt");
                let path = layout.step_file(&name)?;
                let report = format!(
                    "File Name: {name}\nTitle: {title}\nDescription: {description}\nInformation from step {source}: {info}\n"
                );
                let mut out = File::create(&path).map_err(|err| FlowError::io(&path, err))?;
                out.write_all(report.as_bytes())
                    .map_err(|err| FlowError::io(&path, err))?;
                terminal.say(&format!(
                    "Open file for detail, file name: {}",
                    path.display()
                ))?;
            }
            Self::End => terminal.say("End of flow.")?,
        }
        Ok(())
    }
}

/// Arithmetic operators understood by calculus steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Min,
    Max,
}

impl Operator {
    pub fn from_symbol(symbol: char) -> Result<Self, FlowError> {
        match symbol {
            '+' => Ok(Self::Add),
            '-' => Ok(Self::Subtract),
            '*' => Ok(Self::Multiply),
            '/' => Ok(Self::Divide),
            'm' => Ok(Self::Min),
            'M' => Ok(Self::Max),
            other => Err(FlowError::UnsupportedOperator(other)),
        }
    }

    pub fn apply<T: Operand>(self, lhs: T, rhs: T) -> Result<T, FlowError> {
        Ok(match self {
            Self::Add => lhs + rhs,
            Self::Subtract => lhs - rhs,
            Self::Multiply => lhs * rhs,
            Self::Divide => {
                if rhs == T::default() {
                    return Err(FlowError::DivideByZero);
                }
                lhs / rhs
            }
            Self::Min => {
                if rhs < lhs {
                    rhs
                } else {
                    lhs
                }
            }
            Self::Max => {
                if lhs < rhs {
                    rhs
                } else {
                    lhs
                }
            }
        })
    }
}

/// Numeric types a calculus step can evaluate over. `Default` must be zero.
pub trait Operand:
    Copy
    + PartialOrd
    + Default
    + FromStr
    + Display
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
{
}

impl<T> Operand for T where
    T: Copy
        + PartialOrd
        + Default
        + FromStr
        + Display
        + Add<Output = T>
        + Sub<Output = T>
        + Mul<Output = T>
        + Div<Output = T>
{
}

pub fn parse_operand<T: Operand>(text: &str) -> Result<T, FlowError> {
    text.trim()
        .parse()
        .map_err(|_| FlowError::Parse(text.to_string()))
}

pub(crate) fn format_number(value: f64) -> String {
    format!("{value}")
}

fn resolve(earlier: &[Step], position: usize) -> Result<&Step, FlowError> {
    position
        .checked_sub(1)
        .and_then(|index| earlier.get(index))
        .ok_or_else(|| FlowError::NotFound(format!("referenced step {position}")))
}

fn with_extension(name: &str, extension: &str) -> String {
    if name.ends_with(extension) {
        name.to_string()
    } else {
        format!("{name}{extension}")
    }
}

fn display_file(
    file: &str,
    terminal: &mut dyn Terminal,
    layout: &FlowLayout,
) -> Result<(), FlowError> {
    let path = layout.step_file(&with_extension(file, ".txt"))?;
    if !path.exists() {
        return Err(FlowError::NotFound(format!(
            "file {} does not exist",
            path.display()
        )));
    }
    let reader = File::open(&path).map_err(|err| FlowError::io(&path, err))?;
    for line in BufReader::new(reader).lines() {
        let line = line.map_err(|err| FlowError::io(&path, err))?;
        terminal.say(&line)?;
    }
    Ok(())
}

fn ask_file_name(
    terminal: &mut dyn Terminal,
    prompt: &str,
    extension: &str,
) -> Result<String, FlowError> {
    let name = terminal.ask(prompt)?.ok_or(FlowError::InputClosed)?;
    Ok(with_extension(name.trim(), extension))
}

fn capture_text_file(
    terminal: &mut dyn Terminal,
    layout: &FlowLayout,
) -> Result<String, FlowError> {
    let name = ask_file_name(terminal, "Enter the text file name: ", ".txt")?;
    let path = layout.step_file(&name)?;
    let mut file = File::create(&path).map_err(|err| FlowError::io(&path, err))?;
    terminal.say(&format!("File {name} is created"))?;
    terminal.say("Enter the content of the file. When finished, type 'STOP'")?;

    let mut lines = Vec::new();
    while let Some(line) = terminal.read_line()? {
        if line == "STOP" {
            break;
        }
        writeln!(file, "{line}").map_err(|err| FlowError::io(&path, err))?;
        lines.push(line);
    }
    terminal.say("The content is written in file.")?;
    Ok(lines.join("\n"))
}

/// Returns `None` when the user aborts with `q`. Rows completed before an abort
/// or a bad cell are still written.
fn capture_csv_file(
    terminal: &mut dyn Terminal,
    layout: &FlowLayout,
) -> Result<Option<String>, FlowError> {
    let name = ask_file_name(terminal, "Enter the csv file name: ", ".csv")?;
    let path = layout.step_file(&name)?;
    let mut file = File::create(&path).map_err(|err| FlowError::io(&path, err))?;
    let rows = ask_count(terminal, "Enter the number of rows: ")?;
    let cols = ask_count(terminal, "Enter the number of cols: ")?;

    let mut rendered = String::new();
    let captured = read_csv_rows(terminal, rows, cols, &mut rendered);
    file.write_all(rendered.as_bytes())
        .map_err(|err| FlowError::io(&path, err))?;
    if !captured? {
        return Ok(None);
    }
    terminal.say(&format!("The CSV file is created: {name}"))?;
    Ok(Some(rendered))
}

/// Appends completed rows to `rendered`. Returns `false` when the user aborts.
fn read_csv_rows(
    terminal: &mut dyn Terminal,
    rows: usize,
    cols: usize,
    rendered: &mut String,
) -> Result<bool, FlowError> {
    for _ in 0..rows {
        let mut cells = Vec::new();
        for _ in 0..cols {
            let input = terminal
                .ask("Enter value in file or 'q' to exit: ")?
                .ok_or(FlowError::InputClosed)?;
            if input.trim() == "q" {
                terminal.say("Exit")?;
                return Ok(false);
            }
            cells.push(format_number(parse_operand(&input)?));
        }
        rendered.push_str(&cells.join(","));
        rendered.push('\n');
    }
    Ok(true)
}

fn ask_count(terminal: &mut dyn Terminal, prompt: &str) -> Result<usize, FlowError> {
    let line = terminal.ask(prompt)?.ok_or(FlowError::InputClosed)?;
    let parsed = line.trim().parse();
    parsed.map_err(|_| FlowError::Parse(line))
}
