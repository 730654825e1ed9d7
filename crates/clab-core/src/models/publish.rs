use std::fmt;
use std::str::FromStr;

use crate::error::ClabError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
    Tcp,
    Tls,
    Http,
    Https,
}

impl SocketType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketType::Tcp => "tcp",
            SocketType::Tls => "tls",
            SocketType::Http => "http",
            SocketType::Https => "https",
        }
    }
}

impl fmt::Display for SocketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocketType {
    type Err = ClabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tcp" => Ok(SocketType::Tcp),
            "tls" => Ok(SocketType::Tls),
            "http" => Ok(SocketType::Http),
            "https" => Ok(SocketType::Https),
            other => Err(ClabError::InvalidPublish(format!(
                "socket type {other} is not supported. Supported types are tcp/tls/http/https"
            ))),
        }
    }
}

/// One `publish` entry of a node: `<type>/<port>[/<allowed-users>]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSocket {
    pub socket_type: SocketType,
    pub port: u16,
    pub allowed_domains: Vec<String>,
    pub allowed_emails: Vec<String>,
}

impl PublishSocket {
    pub fn is_identity_aware(&self) -> bool {
        !self.allowed_domains.is_empty() || !self.allowed_emails.is_empty()
    }
}

impl FromStr for PublishSocket {
    type Err = ClabError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() < 2 || parts.len() > 3 {
            return Err(ClabError::InvalidPublish(format!(
                "wrong publish section {s}. should be <type>/<port-number>[/<allowed-domains>|<email>,], \
                 i.e. tcp/22 or tls/22/gmail.com or http/80/user1@mail.com,gmail.com"
            )));
        }

        let socket_type: SocketType = parts[0].parse()?;
        let port = parts[1]
            .parse::<u32>()
            .map_err(|e| ClabError::InvalidPublish(format!("invalid port {}: {e}", parts[1])))?;
        if !(1..=65535).contains(&port) {
            return Err(ClabError::InvalidPublish(format!(
                "incorrect port number {port}"
            )));
        }

        let mut socket = PublishSocket {
            socket_type,
            port: port as u16,
            allowed_domains: Vec::new(),
            allowed_emails: Vec::new(),
        };

        if let Some(users) = parts.get(2) {
            for entry in users.split(',').map(str::trim).filter(|e| !e.is_empty()) {
                if entry.contains('@') {
                    socket.allowed_emails.push(entry.to_string());
                } else {
                    socket.allowed_domains.push(entry.to_string());
                }
            }
            // identity-aware sockets need TLS
            if socket.is_identity_aware() && socket.socket_type == SocketType::Tcp {
                socket.socket_type = SocketType::Tls;
            }
        }

        Ok(socket)
    }
}
