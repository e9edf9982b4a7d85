use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

/// Directory holding IPC socket files.
const IPC_DIR: &str = "/tmp/tessera";

/// Where a ZeroMQ socket binds or connects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "address")]
pub enum Endpoint {
    /// Inter-process communication via Unix domain sockets.
    /// Fastest option for same-host runs.
    Ipc(String),

    /// TCP for workers on other hosts.
    Tcp { host: String, port: u16 },
}

impl Endpoint {
    /// IPC endpoint with the given socket name, placed under `/tmp/tessera/`.
    pub fn ipc(name: &str) -> Self {
        Self::Ipc(name.to_string())
    }

    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Parse `ipc://<path>` or `tcp://<host>:<port>`.
    ///
    /// For IPC the file stem becomes the socket name.
    pub fn parse(s: &str) -> Result<Self, TransportError> {
        if let Some(path) = s.strip_prefix("ipc://") {
            let name = Path::new(path)
                .file_stem()
                .and_then(|n| n.to_str())
                .filter(|n| !n.is_empty())
                .ok_or_else(|| TransportError::Endpoint(format!("no socket name in '{s}'")))?;
            Ok(Self::ipc(name))
        } else if let Some(addr) = s.strip_prefix("tcp://") {
            let (host, port) = addr
                .rsplit_once(':')
                .ok_or_else(|| TransportError::Endpoint(format!("missing port in '{s}'")))?;
            if host.is_empty() {
                return Err(TransportError::Endpoint(format!("missing host in '{s}'")));
            }
            let port = port
                .parse::<u16>()
                .map_err(|e| TransportError::Endpoint(format!("bad port in '{s}': {e}")))?;
            Ok(Self::tcp(host, port))
        } else {
            Err(TransportError::Endpoint(format!(
                "'{s}' must start with ipc:// or tcp://"
            )))
        }
    }

    /// The ZeroMQ endpoint address string.
    pub fn endpoint(&self) -> String {
        match self {
            Self::Ipc(name) => format!("ipc://{IPC_DIR}/{name}.sock"),
            Self::Tcp { host, port } => format!("tcp://{host}:{port}"),
        }
    }

    fn ipc_path(&self) -> Option<String> {
        match self {
            Self::Ipc(name) => Some(format!("{IPC_DIR}/{name}.sock")),
            Self::Tcp { .. } => None,
        }
    }

    /// For IPC endpoints, create the socket directory (ZeroMQ will not).
    pub fn ensure_ipc_dir(&self) -> std::io::Result<()> {
        if let Some(path) = self.ipc_path() {
            if let Some(parent) = Path::new(&path).parent() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }

    /// Remove a stale IPC socket file left over from a previous run.
    ///
    /// A leftover `.sock` file makes the next bind fail with `EADDRINUSE`.
    pub fn remove_stale_socket(&self) -> std::io::Result<()> {
        if let Some(path) = self.ipc_path() {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    tracing::debug!(path, "removed stale IPC socket");
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }
}

impl FromStr for Endpoint {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipc_endpoint() {
        let e = Endpoint::ipc("coordinator");
        assert_eq!(e.endpoint(), "ipc:///tmp/tessera/coordinator.sock");
    }

    #[test]
    fn tcp_endpoint() {
        let e = Endpoint::tcp("127.0.0.1", 5570);
        assert_eq!(e.endpoint(), "tcp://127.0.0.1:5570");
        assert_eq!(e.to_string(), e.endpoint());
    }

    #[test]
    fn parse_roundtrips_display() {
        for s in ["tcp://10.0.0.7:6000", "ipc:///tmp/tessera/hub.sock"] {
            let e: Endpoint = s.parse().unwrap();
            assert_eq!(e.to_string(), s);
        }
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Endpoint::parse("udp://host:1").is_err());
        assert!(Endpoint::parse("tcp://host").is_err());
        assert!(Endpoint::parse("tcp://:80").is_err());
        assert!(Endpoint::parse("tcp://host:99999").is_err());
        assert!(Endpoint::parse("ipc://").is_err());
    }
}
