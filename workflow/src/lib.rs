mod analytics;
pub mod codec;
mod config;
mod error;
mod flow;
mod layout;
mod runner;
mod step;
mod store;
mod terminal;

pub use analytics::Analytics;
pub use analytics::AnalyticsReport;
pub use analytics::SlotCounts;
pub use config::CONFIG_FILE_NAME;
pub use config::FlowConfig;
pub use error::FlowError;
pub use flow::Flow;
pub use flow::MAX_CAPACITY;
pub use layout::FlowLayout;
pub use runner::PromptSignals;
pub use runner::RunReport;
pub use runner::Runner;
pub use runner::ScriptedSignals;
pub use runner::Signal;
pub use runner::SignalSource;
pub use runner::StepOutcome;
pub use runner::StepRecord;
pub use step::Operand;
pub use step::Operator;
pub use step::Step;
pub use step::parse_operand;
pub use store::FlowStore;
pub use terminal::Console;
pub use terminal::Terminal;
