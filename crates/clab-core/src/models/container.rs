use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ClabError;

static LABEL_FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^=!]+?)(?:(!=|=)(.*))?$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSummary {
    pub id: String,
    pub names: Vec<String>,
    pub state: String,
    pub labels: BTreeMap<String, String>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    pub fn display_name(&self) -> String {
        if self.names.is_empty() {
            self.id.clone()
        } else {
            self.names.join(",")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Equal,
    NotEqual,
    Exists,
}

/// A container label match such as `containerlab=lab1`, `role!=spine` or `clab-node-kind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelFilter {
    pub field: String,
    pub operator: FilterOperator,
    pub value: String,
}

impl LabelFilter {
    pub fn equal(field: &str, value: &str) -> Self {
        Self {
            field: field.to_string(),
            operator: FilterOperator::Equal,
            value: value.to_string(),
        }
    }

    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let current = labels.get(&self.field);
        match self.operator {
            FilterOperator::Exists => current.is_some(),
            FilterOperator::Equal => current == Some(&self.value),
            FilterOperator::NotEqual => current != Some(&self.value),
        }
    }

    /// Parse a list of label filter strings, failing on the first bad one.
    pub fn parse_all(raw: &[String]) -> Result<Vec<LabelFilter>, ClabError> {
        raw.iter().map(|s| s.parse()).collect()
    }
}

impl FromStr for LabelFilter {
    type Err = ClabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = LABEL_FILTER_RE
            .captures(s.trim())
            .ok_or_else(|| ClabError::Runtime(format!("invalid label filter '{s}'")))?;
        let field = caps[1].trim().to_string();
        let operator = match caps.get(2).map(|m| m.as_str()) {
            Some("=") => FilterOperator::Equal,
            Some("!=") => FilterOperator::NotEqual,
            _ => FilterOperator::Exists,
        };
        let value = caps.get(3).map(|m| m.as_str().to_string()).unwrap_or_default();
        Ok(LabelFilter {
            field,
            operator,
            value,
        })
    }
}

/// Captured result of a command executed inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}
