//! Publishes node ports through mysocket.io tunnels.
//!
//! Every `mysocketctl` call is an argv vector executed directly in the
//! publishing container, and its table output is parsed here. Only the
//! long-running `tunnel connect` goes through a shell, for its log
//! redirection, and each of its words is quoted first.

use crate::error::{ClabError, Result};
use crate::models::{NodeDeclaration, PublishSocket};
use crate::services::runtime::ContainerRuntime;

const CTL: &str = "mysocketctl";

fn argv(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

pub fn list_sockets_cmd() -> Vec<String> {
    argv(&[CTL, "socket", "ls"])
}

pub fn delete_socket_cmd(socket_id: &str) -> Vec<String> {
    argv(&[CTL, "socket", "delete", "-s", socket_id])
}

pub fn socket_name(node: &str, socket: &PublishSocket) -> String {
    format!("clab-{node}-{}-{}", socket.socket_type, socket.port)
}

pub fn create_socket_cmd(socket: &PublishSocket, node: &str) -> Vec<String> {
    let mut cmd = argv(&[CTL, "socket", "create", "-t", socket.socket_type.as_str()]);
    cmd.push("-n".into());
    cmd.push(socket_name(node, socket));
    if socket.is_identity_aware() {
        cmd.push("-c".into());
    }
    if !socket.allowed_domains.is_empty() {
        cmd.push("-d".into());
        cmd.push(socket.allowed_domains.join(","));
    }
    if !socket.allowed_emails.is_empty() {
        cmd.push("-e".into());
        cmd.push(socket.allowed_emails.join(","));
    }
    cmd
}

pub fn create_tunnel_cmd(socket_id: &str) -> Vec<String> {
    argv(&[CTL, "tunnel", "create", "-s", socket_id])
}

/// `/bin/sh -c` wrapper connecting the tunnel and logging to
/// `socket-<node>-<type>-<port>.log`.
pub fn connect_tunnel_cmd(
    node: &NodeDeclaration,
    socket: &PublishSocket,
    socket_id: &str,
    tunnel_id: &str,
) -> Vec<String> {
    let port = socket.port.to_string();
    let connect: [&str; 11] = [
        CTL,
        "tunnel",
        "connect",
        "--host",
        node.long_name.as_str(),
        "-p",
        port.as_str(),
        "-s",
        socket_id,
        "-t",
        tunnel_id,
    ];
    let log_file = format!(
        "socket-{}-{}-{}.log",
        node.short_name, socket.socket_type, socket.port
    );
    let script = format!(
        "{} > {}",
        connect.iter().map(|w| shell_quote(w)).collect::<Vec<_>>().join(" "),
        shell_quote(&log_file)
    );
    argv(&["/bin/sh", "-c", &script])
}

/// Single-quote `word` for POSIX sh.
pub fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}

/// Whitespace-separated column `col` of line `line` (both zero based).
fn table_field(output: &str, line: usize, col: usize) -> Option<String> {
    output
        .lines()
        .nth(line)
        .and_then(|l| l.split_whitespace().nth(col))
        .map(str::to_string)
}

/// Ids of previously published lab sockets in `mysocketctl socket ls` output.
fn lab_socket_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|l| l.contains("clab"))
        .filter_map(|l| l.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

async fn run(runtime: &dyn ContainerRuntime, container: &str, cmd: &[String]) -> Result<String> {
    tracing::debug!("running mysocketio command {cmd:?}");
    let out = runtime.exec(container, cmd).await?;
    if out.exit_code != 0 {
        return Err(ClabError::Runtime(format!(
            "{} exited with {}: {}",
            cmd.join(" "),
            out.exit_code,
            out.stderr.trim()
        )));
    }
    Ok(out.stdout)
}

/// Replace every lab socket with fresh tunnels for the `publish` entries of
/// `nodes`, running `mysocketctl` in `container`. Returns the number of
/// tunnels started.
pub async fn create_tunnels(
    runtime: &dyn ContainerRuntime,
    container: &str,
    nodes: &[NodeDeclaration],
) -> Result<usize> {
    let mut planned = Vec::new();
    for node in nodes {
        for entry in &node.publish {
            planned.push((node, entry.parse::<PublishSocket>()?));
        }
    }

    let listing = run(runtime, container, &list_sockets_cmd())
        .await
        .map_err(|e| ClabError::Runtime(format!("failed to remove existing sockets: {e}")))?;
    for id in lab_socket_ids(&listing) {
        run(runtime, container, &delete_socket_cmd(&id))
            .await
            .map_err(|e| ClabError::Runtime(format!("failed to remove existing sockets: {e}")))?;
    }

    for (node, socket) in &planned {
        let out = run(runtime, container, &create_socket_cmd(socket, &node.short_name))
            .await
            .map_err(|e| ClabError::Runtime(format!("failed to create mysocketio socket: {e}")))?;
        let socket_id = table_field(&out, 3, 1).ok_or_else(|| {
            ClabError::Runtime(format!(
                "no socket id in output for {}",
                socket_name(&node.short_name, socket)
            ))
        })?;

        let out = run(runtime, container, &create_tunnel_cmd(&socket_id))
            .await
            .map_err(|e| ClabError::Runtime(format!("failed to create mysocketio tunnel: {e}")))?;
        let tunnel_id = table_field(&out, 3, 3).ok_or_else(|| {
            ClabError::Runtime(format!("no tunnel id in output for socket {socket_id}"))
        })?;

        runtime
            .exec_detached(
                container,
                &connect_tunnel_cmd(node, socket, &socket_id, &tunnel_id),
            )
            .await?;
        tracing::info!(
            "node={}, published {}/{} via socket {socket_id}",
            node.short_name,
            socket.socket_type,
            socket.port
        );
    }
    Ok(planned.len())
}
