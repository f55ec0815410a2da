//! Remote resources exposed by a DARE server
//!
//! The graph is shallow: the service root creates robots (or runs one-off
//! executions), and a robot spawns executions and periodicals. Each wrapper is
//! only a URL plus the shared transport.

use serde::Deserialize;

use crate::error::Result;
use crate::http::{FormParams, PostBody, Transport};
use crate::period::Period;

/// Join `base` (trailing slashes removed) with `relative` (leading slashes removed)
pub fn join_path(base: &str, relative: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        relative.trim_start_matches('/')
    )
}

macro_rules! resource {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        pub struct $name<'a> {
            url: String,
            transport: &'a Transport,
        }

        impl<'a> $name<'a> {
            pub fn new(url: &str, transport: &'a Transport) -> Self {
                Self {
                    url: url.trim_end_matches('/').to_string(),
                    transport,
                }
            }

            pub fn url(&self) -> &str {
                &self.url
            }

            /// URL of `relative` underneath this resource
            pub fn path(&self, relative: &str) -> String {
                join_path(&self.url, relative)
            }
        }
    };
}

/// `show` and `delete` for resources that can be fetched and removed
macro_rules! show_and_delete {
    ($($name:ident),+) => {
        $(
            impl $name<'_> {
                /// JSON description, or `None` when the server doesn't have it
                pub fn show(&self) -> Result<Option<serde_json::Value>> {
                    self.transport.get_json(&self.url)
                }

                pub fn delete(&self) -> Result<()> {
                    self.transport.delete(&self.url)
                }
            }
        )+
    };
}

resource! {
    /// Root of a DARE service
    Dare
}

resource! {
    /// A robot registered on the server
    Robot
}

resource! {
    /// One run of a robot
    Execution
}

resource! {
    /// A robot scheduled to run periodically
    Periodical
}

show_and_delete!(Robot, Execution, Periodical);

impl<'a> Dare<'a> {
    /// Create a robot from its minilanguage definition
    pub fn create_robot(&self, minilanguage: &str) -> Result<Robot<'a>> {
        let params = FormParams::new().with("minilanguage", minilanguage);
        let url = self
            .transport
            .post_for_location(&self.path("robot/create"), &PostBody::Form(params))?;
        tracing::info!(%url, "robot created");
        Ok(Robot::new(&url, self.transport))
    }

    /// Create a robot from its XML definition
    pub fn create_robot_from_xml(&self, xml: &str) -> Result<Robot<'a>> {
        let url = self
            .transport
            .post_for_location(&self.path("robot/create"), &PostBody::Xml(xml.to_string()))?;
        tracing::info!(%url, "robot created");
        Ok(Robot::new(&url, self.transport))
    }

    /// Execute a minilanguage definition once, without registering a robot
    pub fn execute(&self, minilanguage: &str, inputs: &[String]) -> Result<Execution<'a>> {
        let params = FormParams::new()
            .with("robot", minilanguage)
            .with_all("input", inputs.iter().cloned());
        let url = self
            .transport
            .post_for_location(&self.path("robot/execute"), &PostBody::Form(params))?;
        tracing::info!(%url, "execution requested");
        Ok(Execution::new(&url, self.transport))
    }
}

impl<'a> Robot<'a> {
    pub fn execute(&self, inputs: &[String]) -> Result<Execution<'a>> {
        let params = FormParams::new().with_all("input", inputs.iter().cloned());
        let url = self
            .transport
            .post_for_location(&self.path("execute"), &PostBody::Form(params))?;
        tracing::info!(%url, "execution requested");
        Ok(Execution::new(&url, self.transport))
    }

    pub fn periodical(&self, period: &Period, inputs: &[String]) -> Result<Periodical<'a>> {
        let params = FormParams::new()
            .with("period", period.to_string())
            .with_all("input", inputs.iter().cloned());
        let url = self
            .transport
            .post_for_location(&self.path("periodical"), &PostBody::Form(params))?;
        tracing::info!(%url, %period, "periodical created");
        Ok(Periodical::new(&url, self.transport))
    }
}

/// JSON description of a robot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RobotView {
    pub code: String,
    pub creation_date_millis: i64,
    #[serde(rename = "robotXML")]
    pub robot_xml: Option<String>,
    pub robot_in_minilanguage: Option<String>,
}

/// JSON description of an execution result
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutionView {
    #[serde(alias = "date")]
    pub creation_date_millis: i64,
    /// Milliseconds the robot took to run
    pub execution_time: i64,
    pub created_from: Option<String>,
    pub inputs: Vec<String>,
    pub result_lines: Vec<String>,
}

/// JSON description of a periodical execution
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeriodicalView {
    pub code: String,
    pub creation_date_millis: i64,
    pub robot: Option<String>,
    pub period_unit: Option<String>,
    pub period_amount: Option<u32>,
    pub inputs: Vec<String>,
    pub last_execution_result: Option<ExecutionView>,
}

impl RobotView {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl ExecutionView {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

impl PeriodicalView {
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    /// Period in wire form, when the server reported one
    pub fn period(&self) -> Option<String> {
        let amount = self.period_amount?;
        let unit = self.period_unit.as_deref()?;
        let text = format!("{}{}", amount, unit);
        text.parse::<Period>().map(|p| p.to_string()).ok().or(Some(text))
    }
}
