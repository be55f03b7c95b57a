use crate::{EmailMessage, IntoRecipients, MailError, MailErrorExt, Mailer};
use moka::sync::Cache;
use shed_config::Config;
use std::path::Path;
use tracing::debug;

/// Bound on distinct cached senders.
static MAX_CACHED_SENDERS: u64 = 64;

/// Named senders backed by an INI file.
///
/// Each section describes one sender:
///
/// ```ini
/// [reports]
/// host = smtp.example.com
/// port = 465
/// username = reports@example.com
/// password = secret
/// from_name = Nightly reports
/// ```
///
/// Mailers are built on first use and cached per section name.
#[derive(Clone)]
pub struct MailerRegistry {
    config: Config,
    cache: Cache<String, Mailer>,
}

impl std::fmt::Debug for MailerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailerRegistry")
            .field("cached", &self.cache.entry_count())
            .finish_non_exhaustive()
    }
}

impl MailerRegistry {
    /// Loads the registry from an INI file.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when the file does not exist and
    /// [`MailError::Config`] when it cannot be parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MailError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MailError::Validation {
                message: format!("no sender config at {}", path.display()).into(),
                context: None,
            });
        }

        let config = Config::open(path).context(format!("Loading {}", path.display()))?;
        let cache = Cache::builder().max_capacity(MAX_CACHED_SENDERS).build();
        debug!("Mailer registry loaded from {}", path.display());
        Ok(Self { config, cache })
    }

    /// The mailer for a named sender, built on first use.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when the sender section is missing
    /// or incomplete.
    pub fn mailer(&self, name: &str) -> Result<Mailer, MailError> {
        if let Some(mailer) = self.cache.get(name) {
            return Ok(mailer);
        }

        let mailer = self.build_mailer(name)?;
        self.cache.insert(name.to_owned(), mailer.clone());
        Ok(mailer)
    }

    /// Sends a plain-text email through a named sender.
    ///
    /// # Errors
    ///
    /// The errors of [`MailerRegistry::mailer`] and [`Mailer::send_text`].
    pub async fn send_text(
        &self,
        sender: &str,
        to: impl IntoRecipients,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        self.mailer(sender)?.send_text(to, subject, body).await
    }

    /// Sends an HTML email through a named sender.
    ///
    /// # Errors
    ///
    /// The errors of [`MailerRegistry::mailer`] and [`Mailer::send_html`].
    pub async fn send_html(
        &self,
        sender: &str,
        to: impl IntoRecipients,
        subject: &str,
        html: &str,
    ) -> Result<(), MailError> {
        self.mailer(sender)?.send_html(to, subject, html).await
    }

    /// Renders an HTML template file and sends it through a named sender.
    ///
    /// # Errors
    ///
    /// The errors of [`MailerRegistry::mailer`] and
    /// [`Mailer::send_html_file`].
    pub async fn send_html_file(
        &self,
        sender: &str,
        to: impl IntoRecipients,
        subject: &str,
        template: impl AsRef<Path>,
        vars: &[(&str, &str)],
    ) -> Result<(), MailError> {
        self.mailer(sender)?.send_html_file(to, subject, template, vars).await
    }

    /// Sends a fully specified message through a named sender.
    ///
    /// # Errors
    ///
    /// The errors of [`MailerRegistry::mailer`] and [`Mailer::send`].
    pub async fn send(&self, sender: &str, message: EmailMessage) -> Result<(), MailError> {
        self.mailer(sender)?.send(message).await
    }

    fn build_mailer(&self, name: &str) -> Result<Mailer, MailError> {
        if !self.config.contains_section(name) {
            return Err(MailError::Validation {
                message: format!("sender not found: {name}").into(),
                context: None,
            });
        }

        let (Some(host), Some(username), Some(password)) = (
            self.config.get(name, "host"),
            self.config.get(name, "username"),
            self.config.get(name, "password"),
        ) else {
            return Err(MailError::Validation {
                message: format!("sender '{name}' is missing host, username, or password").into(),
                context: None,
            });
        };

        let port = u16::try_from(self.config.get_int(name, "port", 25)).map_err(|_| {
            MailError::Validation {
                message: format!("sender '{name}' has an invalid port").into(),
                context: None,
            }
        })?;

        let mut builder = Mailer::builder().host(host).port(port).credentials(username, password);
        if let Some(from_name) = self.config.get(name, "from_name") {
            builder = builder.from_name(from_name);
        }
        builder.init()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SENDERS: &str = "[reports]\n\
        host = smtp.example.com\n\
        port = 2525\n\
        username = reports@example.com\n\
        password = secret\n\
        from_name = Nightly reports\n\
        \n\
        [broken]\n\
        host = smtp.example.com\n";

    fn registry() -> (tempfile::NamedTempFile, MailerRegistry) {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        std::fs::write(file.path(), SENDERS).expect("write senders");
        let registry = MailerRegistry::open(file.path()).expect("registry");
        (file, registry)
    }

    #[test]
    fn senders_build_from_their_sections() {
        let (_file, registry) = registry();
        let mailer = registry.mailer("reports").expect("mailer");
        assert_eq!(mailer.from_mailbox().name.as_deref(), Some("Nightly reports"));
    }

    #[test]
    fn mailers_are_cached_per_sender() {
        let (_file, registry) = registry();
        let first = registry.mailer("reports").expect("mailer");
        let second = registry.mailer("reports").expect("mailer");
        assert!(Arc::ptr_eq(&first.inner, &second.inner));
    }

    #[test]
    fn unknown_and_incomplete_senders_are_rejected() {
        let (_file, registry) = registry();

        let unknown = registry.mailer("nobody").expect_err("must fail");
        assert!(unknown.to_string().contains("sender not found"));

        let incomplete = registry.mailer("broken").expect_err("must fail");
        assert!(incomplete.to_string().contains("missing host, username, or password"));
    }

    #[test]
    fn missing_registry_files_are_rejected() {
        let result = MailerRegistry::open("/definitely/not/here.ini");
        assert!(matches!(result, Err(MailError::Validation { .. })));
    }
}
