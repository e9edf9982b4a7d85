use tessera_transport::Endpoint;

use super::types::TesseraConfig;
use crate::error::ConfigError;

impl TesseraConfig {
    /// Reject configs that cannot describe a run.
    ///
    /// An empty dataset or a window that does not fit is allowed: it yields
    /// zero frames and a run that retires every worker at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_pool()?;
        self.validate_transport()?;
        Ok(())
    }

    fn validate_pool(&self) -> Result<(), ConfigError> {
        if self.pool.workers == 0 {
            return Err(ConfigError::Invalid(
                "pool.workers must be at least 1".into(),
            ));
        }
        if u32::try_from(self.pool.workers).is_err() {
            return Err(ConfigError::Invalid(format!(
                "pool.workers = {} exceeds the address space",
                self.pool.workers
            )));
        }
        Ok(())
    }

    /// Ensure the transport kind is known and the endpoint agrees with it.
    fn validate_transport(&self) -> Result<(), ConfigError> {
        let kind = self.transport.kind.as_str();
        match kind {
            "local" => Ok(()),
            "tcp" | "ipc" => {
                let endpoint = Endpoint::parse(&self.transport.endpoint)
                    .map_err(|e| ConfigError::Invalid(format!("transport.endpoint: {e}")))?;
                let matches = matches!(
                    (kind, &endpoint),
                    ("tcp", Endpoint::Tcp { .. }) | ("ipc", Endpoint::Ipc(_))
                );
                if matches {
                    Ok(())
                } else {
                    Err(ConfigError::Invalid(format!(
                        "transport.endpoint '{}' does not match kind '{kind}'",
                        self.transport.endpoint
                    )))
                }
            }
            other => Err(ConfigError::Invalid(format!(
                "invalid transport kind '{other}', expected 'local', 'tcp' or 'ipc'"
            ))),
        }
    }

    /// The hub endpoint, for the ZeroMQ transport kinds.
    pub fn endpoint(&self) -> Result<Endpoint, ConfigError> {
        Endpoint::parse(&self.transport.endpoint)
            .map_err(|e| ConfigError::Invalid(format!("transport.endpoint: {e}")))
    }
}
