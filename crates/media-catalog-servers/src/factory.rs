/// Backend factory pattern keyed by the configured active media server.
///
/// Callers depend on the `MediaServer` interface only; the registry owns
/// the mapping from a backend name to its concrete construction.
use crate::traits::MediaServer;
use crate::ServerError;
use async_trait::async_trait;
use media_catalog_config::Config;
use std::collections::HashMap;

#[async_trait]
pub trait ServerFactory: Send + Sync {
    /// The backend name this factory creates.
    fn server_name(&self) -> &str;

    /// Build a backend instance from configuration. Returns `None` when
    /// the backend is not enabled or not configured.
    async fn create_server(
        &self,
        config: &Config,
    ) -> Result<Option<Box<dyn MediaServer>>, ServerError>;

    /// Check the backend's configuration before attempting construction.
    fn validate_config(&self, config: &Config) -> Result<(), ServerError>;
}

pub struct ServerFactoryRegistry {
    factories: HashMap<String, Box<dyn ServerFactory>>,
}

impl ServerFactoryRegistry {
    /// Registry with all built-in backends registered.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(Box::new(plex::PlexServerFactory));
        registry.register(Box::new(emby::EmbyServerFactory));
        registry
    }

    pub fn register(&mut self, factory: Box<dyn ServerFactory>) {
        self.factories
            .insert(factory.server_name().to_string(), factory);
    }

    pub fn registered_servers(&self) -> Vec<&str> {
        self.factories.keys().map(|name| name.as_str()).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Build the backend named by `config.mediaserver`.
    pub async fn create_active(&self, config: &Config) -> Result<Box<dyn MediaServer>, ServerError> {
        let name = config.mediaserver.as_str();
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ServerError::UnknownBackend(name.to_string()))?;
        factory.validate_config(config)?;
        factory
            .create_server(config)
            .await?
            .ok_or_else(|| ServerError::NotConfigured(name.to_string()))
    }
}

impl Default for ServerFactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

mod plex {
    use super::*;
    use crate::plex::PlexServer;

    pub struct PlexServerFactory;

    #[async_trait]
    impl ServerFactory for PlexServerFactory {
        fn server_name(&self) -> &str {
            crate::plex::client::SERVER_NAME
        }

        async fn create_server(
            &self,
            config: &Config,
        ) -> Result<Option<Box<dyn MediaServer>>, ServerError> {
            if let Some(plex_config) = &config.plex {
                if plex_config.enabled {
                    let server = PlexServer::connect(plex_config).await;
                    return Ok(Some(Box::new(server)));
                }
            }
            Ok(None)
        }

        fn validate_config(&self, config: &Config) -> Result<(), ServerError> {
            if let Some(plex_config) = &config.plex {
                if plex_config.enabled {
                    if plex_config.host.is_empty() {
                        return Err(ServerError::InvalidConfig {
                            backend: self.server_name().to_string(),
                            reason: "host is not configured".to_string(),
                        });
                    }
                    if plex_config.token.is_empty() {
                        return Err(ServerError::InvalidConfig {
                            backend: self.server_name().to_string(),
                            reason: "token is not configured".to_string(),
                        });
                    }
                }
            }
            Ok(())
        }
    }
}

mod emby {
    use super::*;
    use crate::emby::EmbyServer;

    pub struct EmbyServerFactory;

    #[async_trait]
    impl ServerFactory for EmbyServerFactory {
        fn server_name(&self) -> &str {
            crate::emby::client::SERVER_NAME
        }

        async fn create_server(
            &self,
            config: &Config,
        ) -> Result<Option<Box<dyn MediaServer>>, ServerError> {
            if let Some(emby_config) = &config.emby {
                if emby_config.enabled {
                    let server = EmbyServer::connect(emby_config).await;
                    return Ok(Some(Box::new(server)));
                }
            }
            Ok(None)
        }

        fn validate_config(&self, config: &Config) -> Result<(), ServerError> {
            if let Some(emby_config) = &config.emby {
                if emby_config.enabled {
                    if emby_config.host.is_empty() {
                        return Err(ServerError::InvalidConfig {
                            backend: self.server_name().to_string(),
                            reason: "host is not configured".to_string(),
                        });
                    }
                    if emby_config.api_key.is_empty() {
                        return Err(ServerError::InvalidConfig {
                            backend: self.server_name().to_string(),
                            reason: "api_key is not configured".to_string(),
                        });
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use media_catalog_config::PlexConfig;

    #[tokio::test]
    async fn unknown_backend_is_rejected() {
        let registry = ServerFactoryRegistry::new();
        let config = Config {
            mediaserver: "jellyfin".to_string(),
            ..Default::default()
        };
        match registry.create_active(&config).await {
            Err(ServerError::UnknownBackend(name)) => assert_eq!(name, "jellyfin"),
            other => panic!("expected UnknownBackend, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn disabled_backend_is_not_configured() {
        let registry = ServerFactoryRegistry::new();
        let config = Config {
            mediaserver: "plex".to_string(),
            plex: Some(PlexConfig {
                enabled: false,
                host: "10.0.0.2:32400".to_string(),
                token: "secret".to_string(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            registry.create_active(&config).await,
            Err(ServerError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn enabled_backend_without_token_fails_validation() {
        let registry = ServerFactoryRegistry::new();
        let config = Config {
            mediaserver: "plex".to_string(),
            plex: Some(PlexConfig {
                enabled: true,
                host: "10.0.0.2:32400".to_string(),
                token: String::new(),
            }),
            ..Default::default()
        };
        assert!(matches!(
            registry.create_active(&config).await,
            Err(ServerError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn built_in_backends_are_registered() {
        let registry = ServerFactoryRegistry::new();
        assert!(registry.is_registered("plex"));
        assert!(registry.is_registered("emby"));
        assert!(!registry.is_registered("kodi"));
    }
}
