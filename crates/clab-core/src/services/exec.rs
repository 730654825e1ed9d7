use crate::error::{ClabError, Result};
use crate::models::{ExecOutput, LabelFilter};
use crate::services::runtime::ContainerRuntime;

/// Label every lab container carries, valued with the lab name.
pub const LAB_LABEL: &str = "containerlab";

/// Outcome of running the command in one container.
#[derive(Debug)]
pub struct ContainerExec {
    pub container: String,
    pub result: Result<ExecOutput>,
}

/// Split every argument on spaces so `"ip addr"` and `ip addr` behave the same.
pub fn split_command(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|a| a.split(' '))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Run `args` in every running container of `lab` that matches `labels`.
/// A failure in one container is logged and does not stop the others.
pub async fn exec_in_lab(
    runtime: &dyn ContainerRuntime,
    lab: &str,
    labels: &[LabelFilter],
    args: &[String],
) -> Result<Vec<ContainerExec>> {
    let cmd = split_command(args);
    if cmd.is_empty() {
        return Err(ClabError::Runtime("provide command to execute".into()));
    }
    tracing::debug!("raw command: {args:?}");

    let mut filters = vec![LabelFilter::equal(LAB_LABEL, lab)];
    filters.extend_from_slice(labels);
    let containers = runtime
        .list_containers(&filters)
        .await
        .map_err(|e| ClabError::Runtime(format!("could not list containers: {e}")))?;
    if containers.is_empty() {
        tracing::info!("no containers found");
    }

    let mut results = Vec::new();
    for container in containers.iter().filter(|c| c.is_running()) {
        let name = container.display_name();
        let result = runtime.exec(&container.id, &cmd).await;
        match &result {
            Err(e) => tracing::error!("{name}: failed to execute cmd: {e}"),
            Ok(out) => {
                if !out.stdout.is_empty() {
                    tracing::info!("{name}: stdout:\n{}", out.stdout);
                }
                if !out.stderr.is_empty() {
                    tracing::info!("{name}: stderr:\n{}", out.stderr);
                }
            }
        }
        results.push(ContainerExec {
            container: name,
            result,
        });
    }
    Ok(results)
}
