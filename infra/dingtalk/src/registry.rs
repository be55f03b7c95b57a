use crate::{At, DingTalk, DingTalkError, DingTalkErrorExt};
use moka::sync::Cache;
use serde_json::Value;
use shed_config::Config;
use std::path::Path;
use tracing::debug;

/// Bound on distinct cached robots.
static MAX_CACHED_ROBOTS: u64 = 64;

/// Named robots backed by an INI file.
///
/// Each section describes one robot:
///
/// ```ini
/// [alerts]
/// access_token = f3ab7d...
/// secret = SEC5f0e...
/// ```
///
/// Robots are built on first use and cached per section name.
#[derive(Clone)]
pub struct DingTalkRegistry {
    config: Config,
    cache: Cache<String, DingTalk>,
}

impl std::fmt::Debug for DingTalkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DingTalkRegistry")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl DingTalkRegistry {
    /// Loads the registry from an INI file.
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Validation`] when the file does not exist
    /// and [`DingTalkError::Config`] when it cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DingTalkError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(DingTalkError::Validation {
                message: format!("no robot config at {}", path.display()).into(),
                context: None,
            });
        }

        let config = Config::open(path).context(format!("Loading {}", path.display()))?;
        let cache = Cache::builder().max_capacity(MAX_CACHED_ROBOTS).build();
        debug!("Robot registry loaded from {}", path.display());
        Ok(Self { config, cache })
    }

    /// The robot for a named client, built on first use.
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Validation`] when the section is missing or
    /// has no access token.
    pub fn robot(&self, name: &str) -> Result<DingTalk, DingTalkError> {
        if let Some(robot) = self.cache.get(name) {
            return Ok(robot);
        }

        let robot = self.build_robot(name)?;
        self.cache.insert(name.to_owned(), robot.clone());
        Ok(robot)
    }

    /// Sends a plain text message through a named robot.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalkRegistry::robot`] and [`DingTalk::send_text`].
    pub async fn send_text(
        &self,
        client: &str,
        text: &str,
        at: At,
    ) -> Result<Value, DingTalkError> {
        self.robot(client)?.send_text(text, at).await
    }

    /// Sends a markdown message through a named robot.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalkRegistry::robot`] and
    /// [`DingTalk::send_markdown`].
    pub async fn send_markdown(
        &self,
        client: &str,
        title: &str,
        markdown: &str,
        at: At,
    ) -> Result<Value, DingTalkError> {
        self.robot(client)?.send_markdown(title, markdown, at).await
    }

    /// Renders a markdown template file and sends it through a named robot.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalkRegistry::robot`] and
    /// [`DingTalk::send_markdown_file`].
    pub async fn send_markdown_file(
        &self,
        client: &str,
        title: &str,
        template: impl AsRef<Path>,
        vars: &[(&str, &str)],
        at: At,
    ) -> Result<Value, DingTalkError> {
        self.robot(client)?.send_markdown_file(title, template, vars, at).await
    }

    /// Posts a prebuilt message body through a named robot.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalkRegistry::robot`] and [`DingTalk::send_raw`].
    pub async fn send_raw(&self, client: &str, body: Value) -> Result<Value, DingTalkError> {
        self.robot(client)?.send_raw(body).await
    }

    fn build_robot(&self, name: &str) -> Result<DingTalk, DingTalkError> {
        if !self.config.contains_section(name) {
            return Err(DingTalkError::Validation {
                message: format!("client not found: {name}").into(),
                context: None,
            });
        }

        let Some(access_token) = self.config.get(name, "access_token") else {
            return Err(DingTalkError::Validation {
                message: format!("client '{name}' has no access_token").into(),
                context: None,
            });
        };

        let mut builder = DingTalk::builder().access_token(access_token);
        if let Some(secret) = self.config.get(name, "secret") {
            builder = builder.secret(secret);
        }
        if let Some(endpoint) = self.config.get(name, "endpoint") {
            builder = builder.endpoint(endpoint);
        }
        builder.init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const ROBOTS: &str = "[alerts]\n\
        access_token = token-alerts\n\
        secret = SECtest\n\
        \n\
        [plain]\n\
        access_token = token-plain\n\
        \n\
        [broken]\n\
        secret = SEConly\n";

    fn registry() -> (tempfile::NamedTempFile, DingTalkRegistry) {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), ROBOTS).expect("write robots");
        let registry = DingTalkRegistry::open(file.path()).expect("registry");
        (file, registry)
    }

    #[test]
    fn robots_build_from_their_sections() {
        let (_file, registry) = registry();

        let signed = registry.robot("alerts").expect("robot");
        let url = signed.service_url().expect("url");
        assert!(url.contains("access_token=token-alerts"));
        assert!(url.contains("&sign="));

        let plain = registry.robot("plain").expect("robot");
        let url = plain.service_url().expect("url");
        assert!(url.ends_with("access_token=token-plain"));
    }

    #[test]
    fn robots_are_cached_per_client() {
        let (_file, registry) = registry();
        let first = registry.robot("alerts").expect("robot");
        let second = registry.robot("alerts").expect("robot");
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
    }

    #[test]
    fn unknown_and_tokenless_clients_are_rejected() {
        let (_file, registry) = registry();

        let unknown = registry.robot("nobody").expect_err("must fail");
        assert!(unknown.to_string().contains("client not found"));

        let tokenless = registry.robot("broken").expect_err("must fail");
        assert!(tokenless.to_string().contains("no access_token"));
    }

    #[test]
    fn missing_registry_files_are_rejected() {
        let result = DingTalkRegistry::open("/definitely/not/here.ini");
        assert!(matches!(result, Err(DingTalkError::Validation { .. })));
    }
}
