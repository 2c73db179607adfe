//! Report framing and the sinks reports are handed to.

use anyhow::Result;
use hoststats_telemetry::SampleRecord;
use serde_json::{Map, Value};
use tracing::info;

/// Log target of emitted reports, for filtering them apart from diagnostics.
pub const REPORT_TARGET: &str = "hoststats::report";

/// How a record is framed before it is emitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Framing {
    /// `"<prefix> <json>"`; the prefix is dropped when empty
    Prefix(String),
    /// `{"<key>": <record>}`
    Keyed(String),
}

/// A framed sample record, ready to be emitted.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub framing: Framing,
    pub record: SampleRecord,
}

impl Report {
    pub fn new(framing: Framing, record: SampleRecord) -> Self {
        Self { framing, record }
    }

    /// Render the report as a single line.
    pub fn render(&self) -> Result<String> {
        match &self.framing {
            Framing::Prefix(prefix) => {
                let json = serde_json::to_string(&self.record)?;
                let prefix = prefix.trim();
                if prefix.is_empty() {
                    Ok(json)
                } else {
                    Ok(format!("{prefix} {json}"))
                }
            }
            Framing::Keyed(_) => Ok(serde_json::to_string(&self.to_value()?)?),
        }
    }

    /// The report as a JSON value, wrapped under the key when keyed.
    pub fn to_value(&self) -> Result<Value> {
        let record = serde_json::to_value(&self.record)?;
        match &self.framing {
            Framing::Prefix(_) => Ok(record),
            Framing::Keyed(key) => {
                let mut wrapper = Map::new();
                wrapper.insert(key.clone(), record);
                Ok(Value::Object(wrapper))
            }
        }
    }
}

/// Destination for reports. Emission is synchronous: `emit` returns once the
/// sink has accepted the report.
pub trait RecordSink {
    fn emit(&mut self, report: &Report) -> Result<()>;
}

/// Emits each report as one INFO event on [`REPORT_TARGET`].
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl RecordSink for TracingSink {
    fn emit(&mut self, report: &Report) -> Result<()> {
        let line = report.render()?;
        info!(target: REPORT_TARGET, "{}", line);
        Ok(())
    }
}

/// Keeps reports in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub reports: Vec<Report>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<&Report> {
        self.reports.last()
    }
}

impl RecordSink for MemorySink {
    fn emit(&mut self, report: &Report) -> Result<()> {
        self.reports.push(report.clone());
        Ok(())
    }
}
