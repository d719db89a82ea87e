use std::io;

/// Failures of the session control surface. Both leave the session disconnected.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("could not bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: io::Error,
    },
    #[error("could not resolve {host}:{port}: {reason}")]
    Resolve {
        host: String,
        port: u16,
        reason: String,
    },
}

impl SessionError {
    pub fn resolve(host: &str, port: u16, reason: impl ToString) -> Self {
        SessionError::Resolve {
            host: host.to_string(),
            port,
            reason: reason.to_string(),
        }
    }
}
