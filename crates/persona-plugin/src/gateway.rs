//! Host adapters that forward every call to a remote capability gateway.

use std::time::Duration;
use tracing::debug;

use persona_core::wire::{
    FILESYSTEM_ROUTE, FilesystemRequest, FilesystemResponse, HEALTH_ROUTE, SYSTEMINFO_ROUTE,
    SystemInfoResponse,
};
use persona_core::{HostAdapterSet, PersonaError, Result, SystemStatus};

/// Host adapters that proxy each call over HTTP.
///
/// Uses a blocking client: capability calls arrive from inside synchronous
/// wasm host functions. Must not be called from an async worker thread.
pub struct GatewayAdapterSet {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl GatewayAdapterSet {
    /// `timeout` of `None` disables the per-request timeout.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PersonaError::GatewayTransport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{}", self.base_url, route)
    }

    fn filesystem(&self, request: &FilesystemRequest) -> Result<FilesystemResponse> {
        debug!(action = %request.action, path = %request.path, "gateway filesystem call");
        let resp = self
            .client
            .post(self.url(FILESYSTEM_ROUTE))
            .json(request)
            .send()
            .map_err(|e| PersonaError::GatewayTransport(e.to_string()))?;

        let status = resp.status();
        let body: FilesystemResponse = resp.json().map_err(|e| {
            PersonaError::GatewayTransport(format!("unreadable response (HTTP {status}): {e}"))
        })?;

        if body.success {
            Ok(body)
        } else {
            Err(body.into_error())
        }
    }

    /// One full telemetry snapshot. Each adapter call takes its own.
    pub fn system_status(&self) -> Result<SystemStatus> {
        let resp = self
            .client
            .post(self.url(SYSTEMINFO_ROUTE))
            .send()
            .map_err(|e| PersonaError::GatewayTransport(e.to_string()))?;

        let status = resp.status();
        let body: SystemInfoResponse = resp.json().map_err(|e| {
            PersonaError::GatewayTransport(format!("unreadable response (HTTP {status}): {e}"))
        })?;

        match (body.success, body.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(PersonaError::GatewayResponse("telemetry response without data".into())),
            (false, _) => Err(PersonaError::GatewayResponse(
                body.error.unwrap_or_else(|| format!("HTTP {status}")),
            )),
        }
    }
}

impl HostAdapterSet for GatewayAdapterSet {
    fn name(&self) -> &'static str {
        "gateway"
    }

    fn read_file(&self, path: &str) -> Result<String> {
        let resp = self.filesystem(&FilesystemRequest::read(path))?;
        resp.data
            .ok_or_else(|| PersonaError::GatewayResponse("readFile response without data".into()))
    }

    fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.filesystem(&FilesystemRequest::write(path, content))?;
        Ok(())
    }

    fn get_cpu_load(&self) -> Result<[f64; 3]> {
        Ok(self.system_status()?.cpu_load)
    }

    fn get_free_memory(&self) -> Result<u64> {
        Ok(self.system_status()?.free_memory)
    }

    fn get_total_memory(&self) -> Result<u64> {
        Ok(self.system_status()?.total_memory)
    }

    /// Verifies the gateway answers before any plugin call relies on it.
    fn init(&self) -> Result<()> {
        let resp = self
            .client
            .get(self.url(HEALTH_ROUTE))
            .send()
            .map_err(|e| PersonaError::GatewayTransport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(PersonaError::GatewayTransport(format!(
                "health check returned HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_is_normalized() {
        let adapters = GatewayAdapterSet::new("http://127.0.0.1:3710/", None).unwrap();
        assert_eq!(adapters.base_url(), "http://127.0.0.1:3710");
        assert_eq!(adapters.url(FILESYSTEM_ROUTE), "http://127.0.0.1:3710/api/filesystem");
    }

    #[test]
    fn unreachable_gateway_is_transport_error() {
        // Port 9 (discard) on localhost is closed on test machines
        let adapters =
            GatewayAdapterSet::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();
        assert!(matches!(
            adapters.read_file("/etc/hostname"),
            Err(PersonaError::GatewayTransport(_))
        ));
        assert!(matches!(adapters.init(), Err(PersonaError::GatewayTransport(_))));
    }

    #[test]
    fn greet_is_computed_locally() {
        let adapters = GatewayAdapterSet::new("http://127.0.0.1:9", None).unwrap();
        assert_eq!(adapters.greet("world").unwrap(), "Hello, world!");
    }
}
