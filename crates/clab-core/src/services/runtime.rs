use std::collections::BTreeMap;
use std::process::Output;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;

use crate::error::{ClabError, Result};
use crate::models::{ContainerSummary, ExecOutput, FilterOperator, LabelFilter};

/// The container operations the orchestrator needs after provisioning.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Containers matching every filter.
    async fn list_containers(&self, filters: &[LabelFilter]) -> Result<Vec<ContainerSummary>>;

    /// Run `cmd` in `container` and wait for it. A non-zero exit is reported
    /// in [`ExecOutput::exit_code`], not as an error.
    async fn exec(&self, container: &str, cmd: &[String]) -> Result<ExecOutput>;

    /// Start `cmd` in `container` without waiting for it.
    async fn exec_detached(&self, container: &str, cmd: &[String]) -> Result<()>;
}

/// [`ContainerRuntime`] backed by the `docker` command line.
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            binary: "docker".to_string(),
        }
    }

    async fn output(&self, args: &[String]) -> Result<Output> {
        Command::new(&self.binary)
            .args(args)
            .output()
            .await
            .map_err(|e| ClabError::Runtime(format!("failed to run {}: {e}", self.binary)))
    }

    async fn run_checked(&self, args: &[String]) -> Result<String> {
        let output = self.output(args).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ClabError::Runtime(format!(
                "{} {} failed (exit {}): {stderr}",
                self.binary,
                args.first().map(String::as_str).unwrap_or_default(),
                output.status.code().unwrap_or(-1)
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn list_containers(&self, filters: &[LabelFilter]) -> Result<Vec<ContainerSummary>> {
        let args = ps_args(filters);
        let stdout = self.run_checked(&args).await?;
        let containers = parse_ps_output(&stdout)?;
        Ok(containers
            .into_iter()
            .filter(|c| filters.iter().all(|f| f.matches(&c.labels)))
            .collect())
    }

    async fn exec(&self, container: &str, cmd: &[String]) -> Result<ExecOutput> {
        let mut args = vec!["exec".to_string(), container.to_string()];
        args.extend_from_slice(cmd);
        tracing::debug!("exec in {container}: {cmd:?}");
        let output = self.output(&args).await?;
        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn exec_detached(&self, container: &str, cmd: &[String]) -> Result<()> {
        let mut args = vec!["exec".to_string(), "-d".to_string(), container.to_string()];
        args.extend_from_slice(cmd);
        tracing::debug!("detached exec in {container}: {cmd:?}");
        self.run_checked(&args).await?;
        Ok(())
    }
}

/// `docker ps` arguments. Equality and existence filters are pushed down to
/// docker; negative filters are applied on the parsed result.
fn ps_args(filters: &[LabelFilter]) -> Vec<String> {
    let mut args: Vec<String> = ["ps", "-a", "--no-trunc", "--format", "{{json .}}"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for filter in filters {
        let expr = match filter.operator {
            FilterOperator::Equal => format!("label={}={}", filter.field, filter.value),
            FilterOperator::Exists => format!("label={}", filter.field),
            FilterOperator::NotEqual => continue,
        };
        args.push("--filter".to_string());
        args.push(expr);
    }
    args
}

#[derive(Deserialize)]
struct PsLine {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names", default)]
    names: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Labels", default)]
    labels: String,
}

/// Parse `docker ps --format '{{json .}}'` output, one JSON object per line.
fn parse_ps_output(stdout: &str) -> Result<Vec<ContainerSummary>> {
    stdout
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|line| -> Result<ContainerSummary> {
            let ps: PsLine = serde_json::from_str(line)?;
            Ok(ContainerSummary {
                id: ps.id,
                names: ps
                    .names
                    .split(',')
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                    .collect(),
                state: ps.state,
                labels: parse_labels(&ps.labels),
            })
        })
        .collect()
}

fn parse_labels(raw: &str) -> BTreeMap<String, String> {
    raw.split(',')
        .filter(|kv| !kv.is_empty())
        .map(|kv| match kv.split_once('=') {
            Some((k, v)) => (k.to_string(), v.to_string()),
            None => (kv.to_string(), String::new()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ps_args_push_down_positive_filters() {
        let filters = vec![
            LabelFilter::equal("containerlab", "lab1"),
            "role!=spine".parse().unwrap(),
            "clab-node-kind".parse().unwrap(),
        ];
        let args = ps_args(&filters);
        assert_eq!(
            args[5..],
            [
                "--filter",
                "label=containerlab=lab1",
                "--filter",
                "label=clab-node-kind"
            ]
        );
    }

    #[test]
    fn parse_ps_json_lines() {
        let out = r#"{"ID":"abc123","Names":"clab-lab1-r1","State":"running","Labels":"containerlab=lab1,clab-node-name=r1"}
{"ID":"def456","Names":"clab-lab1-r2","State":"exited","Labels":""}
"#;
        let containers = parse_ps_output(out).unwrap();
        assert_eq!(containers.len(), 2);
        assert_eq!(containers[0].id, "abc123");
        assert_eq!(containers[0].names, vec!["clab-lab1-r1"]);
        assert!(containers[0].is_running());
        assert_eq!(containers[0].labels["clab-node-name"], "r1");
        assert!(!containers[1].is_running());
        assert!(containers[1].labels.is_empty());
    }

    #[test]
    fn parse_ps_rejects_garbage() {
        assert!(matches!(parse_ps_output("not json"), Err(ClabError::Json(_))));
    }
}
