//! Server configuration.

/// Configuration for the sync server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum number of change items accepted in one upload.
    pub max_upload_batch: usize,
    /// Maximum number of types named in one download request.
    pub max_download_types: usize,
}

impl ServerConfig {
    /// Creates a configuration with the default limits.
    pub fn new() -> Self {
        Self {
            max_upload_batch: 1000,
            max_download_types: 100,
        }
    }

    /// Sets the maximum upload batch size.
    pub fn with_max_upload_batch(mut self, size: usize) -> Self {
        self.max_upload_batch = size;
        self
    }

    /// Sets the maximum number of types per download.
    pub fn with_max_download_types(mut self, count: usize) -> Self {
        self.max_download_types = count;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
