//! Server configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Complete server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server configuration
    pub http: HttpConfig,

    /// Video relay configuration
    pub stream: StreamConfig,

    /// Live fanout configuration
    pub live: LiveConfig,

    /// CORS configuration
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Bind address
    pub bind_addr: SocketAddr,

    /// Maximum request body size (bytes); frame uploads are the
    /// largest payload this server accepts
    pub max_body_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Target output rate of the `/video` stream (frames per second)
    pub target_fps: u32,

    /// JPEG quality used when re-encoding submitted frames (1-100)
    pub jpeg_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// Per-subscriber event queue depth; a subscriber that falls this
    /// far behind is treated as a failed delivery and dropped
    pub subscriber_queue_depth: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins (dashboard dev hosts by default)
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                bind_addr: "0.0.0.0:8000".parse().unwrap(),
                max_body_size: 4 * 1024 * 1024, // 4MB
            },
            stream: StreamConfig {
                target_fps: 20,
                jpeg_quality: 80,
            },
            live: LiveConfig {
                subscriber_queue_depth: 32,
            },
            cors: CorsConfig {
                allowed_origins: vec![
                    "http://localhost:5173".to_string(),
                    "http://127.0.0.1:5173".to_string(),
                ],
            },
        }
    }
}

impl ServerConfig {
    /// Load configuration from file, with environment overrides
    pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("CROWDSHIELD"))
            .build()?;

        settings.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("CROWDSHIELD"))
            .build()?;

        settings.try_deserialize()
    }

    /// Pacing delay between `/video` stream parts
    pub fn frame_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.stream.target_fps.max(1) as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http.bind_addr.port(), 8000);
        assert_eq!(config.stream.target_fps, 20);
        assert_eq!(config.frame_interval(), std::time::Duration::from_millis(50));
    }
}
