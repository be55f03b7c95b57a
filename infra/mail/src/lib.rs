//! Async SMTP mailer.
//!
//! [`Mailer`] wraps a `lettre` SMTP transport behind a builder. The TLS mode
//! follows the port convention (465 implicit TLS, 587 STARTTLS, anything else
//! plaintext) unless overridden, and the connection is made lazily on the
//! first send. Convenience senders cover plain text, HTML, and HTML template
//! files with `{name}` placeholders; [`EmailMessage`] is the full form with
//! carbon copies and attachments. [`MailerRegistry`] builds mailers from
//! named sections of an INI file.
//!
//! ```no_run
//! # async fn demo() -> Result<(), shed_mail::MailError> {
//! let mailer = shed_mail::Mailer::builder()
//!     .host("smtp.example.com")
//!     .port(465)
//!     .credentials("reports@example.com", "secret")
//!     .from_name("Nightly reports")
//!     .init()?;
//! mailer.send_text("ops@example.com", "Backup done", "All volumes copied.").await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod message;
mod registry;

pub use error::{MailError, MailErrorExt};
pub use lettre::message::Mailbox;
pub use message::{EmailAttachment, EmailMessage, IntoRecipients};
pub use registry::MailerRegistry;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use message::MessageBody;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How the SMTP connection is encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    /// TLS from the first byte (SMTPS).
    Wrapper,
    /// Plaintext connection upgraded via STARTTLS.
    StartTls,
    /// No encryption.
    Plain,
}

impl TlsMode {
    /// The conventional mode for a port: 465 wrapper TLS, 587 STARTTLS,
    /// anything else plaintext.
    #[must_use]
    pub const fn from_port(port: u16) -> Self {
        match port {
            465 => Self::Wrapper,
            587 => Self::StartTls,
            _ => Self::Plain,
        }
    }
}

struct MailerInner {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

/// Async SMTP mailer handle.
///
/// Cheap to clone; all clones share one transport.
#[derive(Clone)]
pub struct Mailer {
    inner: Arc<MailerInner>,
}

impl fmt::Debug for Mailer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mailer").field("from", &self.inner.from).finish_non_exhaustive()
    }
}

impl Mailer {
    /// Starts a builder with the default SMTP port 25.
    pub fn builder() -> MailerBuilder {
        MailerBuilder::default()
    }

    /// Builder preset for QQ Mail (`smtp.qq.com`, implicit TLS).
    pub fn qq(username: impl Into<String>, password: impl Into<String>) -> MailerBuilder {
        Self::builder().host("smtp.qq.com").port(465).credentials(username, password)
    }

    /// Builder preset for NetEase 163 Mail (`smtp.163.com`, implicit TLS).
    pub fn netease(username: impl Into<String>, password: impl Into<String>) -> MailerBuilder {
        Self::builder().host("smtp.163.com").port(465).credentials(username, password)
    }

    /// Builder preset for Gmail (`smtp.gmail.com`, STARTTLS).
    pub fn gmail(username: impl Into<String>, password: impl Into<String>) -> MailerBuilder {
        Self::builder().host("smtp.gmail.com").port(587).credentials(username, password)
    }

    /// The from header applied to outgoing mail.
    #[must_use]
    pub fn from_mailbox(&self) -> &Mailbox {
        &self.inner.from
    }

    /// Sends a plain-text email.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when no recipient is given and
    /// [`MailError::Smtp`] when the server refuses the message.
    pub async fn send_text(
        &self,
        to: impl IntoRecipients,
        subject: &str,
        body: &str,
    ) -> Result<(), MailError> {
        self.send(EmailMessage::text(subject, body).to(to)).await
    }

    /// Sends an HTML email.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when no recipient is given and
    /// [`MailError::Smtp`] when the server refuses the message.
    pub async fn send_html(
        &self,
        to: impl IntoRecipients,
        subject: &str,
        html: &str,
    ) -> Result<(), MailError> {
        self.send(EmailMessage::html(subject, html).to(to)).await
    }

    /// Renders an HTML template file and sends the result.
    ///
    /// Placeholders use `{name}` syntax and are substituted from `vars`;
    /// `{__title}`, `{__receivers}`, and `{__today}` are always available
    /// and cannot be overridden. An empty template is skipped without error.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Io`] when the template cannot be read, plus the
    /// errors of [`Mailer::send`].
    pub async fn send_html_file(
        &self,
        to: impl IntoRecipients,
        subject: &str,
        template: impl AsRef<Path>,
        vars: &[(&str, &str)],
    ) -> Result<(), MailError> {
        let template = template.as_ref();
        let raw = tokio::fs::read_to_string(template)
            .await
            .context(format!("Reading {}", template.display()))?;
        if raw.trim().is_empty() {
            debug!("Template {} is empty, nothing sent", template.display());
            return Ok(());
        }

        let to = to.into_recipients();
        let html = render_template(&raw, subject, &to, vars);
        self.send(EmailMessage::html(subject, html).to(to)).await
    }

    /// Sends a fully specified message.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when the message has no recipients,
    /// [`MailError::Address`] when a recipient does not parse,
    /// [`MailError::Io`] when an attachment cannot be read, and
    /// [`MailError::Smtp`] when the server refuses the message.
    pub async fn send(&self, mut message: EmailMessage) -> Result<(), MailError> {
        if message.to.is_empty() {
            return Err(MailError::Validation { message: "no recipients".into(), context: None });
        }

        let mut attachments = Vec::with_capacity(message.attachments.len());
        for attachment in std::mem::take(&mut message.attachments) {
            attachments.push(load_attachment(attachment).await?);
        }

        let subject = message.subject.clone();
        let receivers = message.to.len();
        let email = self.assemble(message, attachments)?;
        self.inner.transport.send(email).await.context("Sending mail")?;
        debug!(subject = %subject, receivers, "Email sent");
        Ok(())
    }

    /// Opens a connection to verify the transport settings.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Smtp`] when the server cannot be reached.
    pub async fn test_connection(&self) -> Result<bool, MailError> {
        self.inner.transport.test_connection().await.context("Connection check")
    }

    fn assemble(
        &self,
        message: EmailMessage,
        attachments: Vec<(String, Vec<u8>)>,
    ) -> Result<Message, MailError> {
        let mut builder =
            Message::builder().from(self.inner.from.clone()).subject(message.subject);
        for recipient in &message.to {
            builder =
                builder.to(recipient.parse::<Mailbox>().context(format!("Recipient '{recipient}'"))?);
        }
        for recipient in &message.cc {
            builder =
                builder.cc(recipient.parse::<Mailbox>().context(format!("Copy to '{recipient}'"))?);
        }

        let mut parts = MultiPart::mixed().singlepart(match message.body {
            MessageBody::Text(text) => SinglePart::plain(text),
            MessageBody::Html(html) => SinglePart::html(html),
        });
        for (name, data) in attachments {
            parts = parts.singlepart(attachment_part(name, data)?);
        }

        builder.multipart(parts).context("Building message")
    }
}

/// Builder for [`Mailer`].
#[derive(Debug)]
#[must_use = "builders do nothing unless you call .init()"]
pub struct MailerBuilder {
    host: String,
    port: u16,
    username: String,
    password: String,
    from_name: Option<String>,
    tls: Option<TlsMode>,
    timeout: Option<Duration>,
}

impl Default for MailerBuilder {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 25,
            username: String::new(),
            password: String::new(),
            from_name: None,
            tls: None,
            timeout: None,
        }
    }
}

impl MailerBuilder {
    /// SMTP server host name.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// SMTP server port; also selects the default TLS mode.
    pub const fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// User name and password for authentication. The user name doubles as
    /// the from address.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Display name for the from header; defaults to the user name.
    pub fn from_name(mut self, name: impl Into<String>) -> Self {
        self.from_name = Some(name.into());
        self
    }

    /// Overrides the TLS mode derived from the port.
    pub const fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = Some(mode);
        self
    }

    /// SMTP I/O timeout; the transport default applies when unset.
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the [`Mailer`]. No connection is made here; the first send
    /// connects.
    ///
    /// # Errors
    ///
    /// Returns [`MailError::Validation`] when the host or credentials are
    /// missing, [`MailError::Address`] when the user name is not a mail
    /// address, and [`MailError::Smtp`] when TLS parameters cannot be built.
    pub fn init(self) -> Result<Mailer, MailError> {
        if self.host.is_empty() {
            return Err(MailError::Validation { message: "missing SMTP host".into(), context: None });
        }
        if self.username.is_empty() || self.password.is_empty() {
            return Err(MailError::Validation {
                message: "missing SMTP credentials".into(),
                context: None,
            });
        }

        let address = self.username.parse::<lettre::Address>().context("From address")?;
        let from = Mailbox::new(Some(self.from_name.unwrap_or_else(|| self.username.clone())), address);

        let mode = self.tls.unwrap_or_else(|| TlsMode::from_port(self.port));
        let tls = match mode {
            TlsMode::Wrapper => {
                Tls::Wrapper(TlsParameters::new(self.host.clone()).context("TLS parameters")?)
            }
            TlsMode::StartTls => {
                Tls::Required(TlsParameters::new(self.host.clone()).context("TLS parameters")?)
            }
            TlsMode::Plain => Tls::None,
        };

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(self.host.as_str())
            .port(self.port)
            .tls(tls)
            .credentials(Credentials::new(self.username, self.password))
            .timeout(self.timeout)
            .build();

        debug!(host = %self.host, port = self.port, tls = ?mode, "Mailer ready");
        Ok(Mailer { inner: Arc::new(MailerInner { transport, from }) })
    }
}

/// Substitutes template placeholders. Built-ins go first so user variables
/// cannot override them.
fn render_template(
    template: &str,
    title: &str,
    receivers: &[String],
    vars: &[(&str, &str)],
) -> String {
    let mut html = template
        .replace("{__title}", title)
        .replace("{__receivers}", &receivers.join(","))
        .replace("{__today}", &shed_clock::today_string());
    for (name, value) in vars {
        html = html.replace(&format!("{{{name}}}"), value);
    }
    html
}

async fn load_attachment(attachment: EmailAttachment) -> Result<(String, Vec<u8>), MailError> {
    match attachment {
        EmailAttachment::Path(path) => {
            let name = file_name(&path)?;
            let data =
                tokio::fs::read(&path).await.context(format!("Reading {}", path.display()))?;
            Ok((name, data))
        }
        EmailAttachment::Renamed { path, name } => {
            let data =
                tokio::fs::read(&path).await.context(format!("Reading {}", path.display()))?;
            Ok((name, data))
        }
        EmailAttachment::Bytes { name, data } => Ok((name, data)),
    }
}

fn attachment_part(name: String, data: Vec<u8>) -> Result<SinglePart, MailError> {
    let mime = message::attachment_mime(&name);
    let content_type = ContentType::parse(mime).map_err(|_| MailError::Internal {
        message: format!("unsupported MIME type {mime}").into(),
        context: None,
    })?;
    Ok(Attachment::new(name).body(data, content_type))
}

fn file_name(path: &Path) -> Result<String, MailError> {
    path.file_name().and_then(|name| name.to_str()).map(str::to_owned).ok_or_else(|| {
        MailError::Validation {
            message: format!("no file name in {}", path.display()).into(),
            context: None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_mailer() -> Mailer {
        Mailer::builder()
            .host("smtp.example.com")
            .port(2525)
            .credentials("robot@example.com", "secret")
            .from_name("Robot")
            .init()
            .expect("mailer")
    }

    #[test]
    fn tls_mode_follows_the_port_convention() {
        assert_eq!(TlsMode::from_port(465), TlsMode::Wrapper);
        assert_eq!(TlsMode::from_port(587), TlsMode::StartTls);
        assert_eq!(TlsMode::from_port(25), TlsMode::Plain);
        assert_eq!(TlsMode::from_port(2525), TlsMode::Plain);
    }

    #[test]
    fn builder_rejects_missing_settings() {
        let missing_host = Mailer::builder().credentials("a@example.com", "pw").init();
        assert!(matches!(missing_host, Err(MailError::Validation { .. })));

        let missing_credentials = Mailer::builder().host("smtp.example.com").init();
        assert!(matches!(missing_credentials, Err(MailError::Validation { .. })));

        let bad_address =
            Mailer::builder().host("smtp.example.com").credentials("not-an-address", "pw").init();
        assert!(matches!(bad_address, Err(MailError::Address { .. })));
    }

    #[test]
    fn presets_fill_host_and_port() {
        let builder = Mailer::qq("a@qq.com", "pw");
        assert_eq!(builder.host, "smtp.qq.com");
        assert_eq!(builder.port, 465);

        let builder = Mailer::gmail("a@gmail.com", "pw");
        assert_eq!(builder.host, "smtp.gmail.com");
        assert_eq!(builder.port, 587);
    }

    #[test]
    fn templates_render_builtins_first() {
        let rendered = render_template(
            "<h1>{__title}</h1><p>for {__receivers} on {__today}</p><p>{status}</p>",
            "Weekly",
            &["a@example.com".to_owned(), "b@example.com".to_owned()],
            &[("status", "all green"), ("__title", "overridden")],
        );

        assert!(rendered.contains("<h1>Weekly</h1>"));
        assert!(rendered.contains("for a@example.com,b@example.com on"));
        assert!(rendered.contains("all green"));
        assert!(!rendered.contains("overridden"));
        assert!(!rendered.contains("{__today}"));
    }

    #[test]
    fn assembled_messages_carry_all_parts() {
        let mailer = offline_mailer();
        let message = EmailMessage::html("Build report", "<p>ok</p>")
            .to("dev@example.com, qa@example.com")
            .cc("lead@example.com");
        let attachments = vec![
            ("graph.png".to_owned(), vec![0x89, 0x50, 0x4e, 0x47]),
            ("build.log".to_owned(), b"done".to_vec()),
        ];

        let email = mailer.assemble(message, attachments).expect("assemble");
        let rendered = String::from_utf8_lossy(&email.formatted()).into_owned();

        assert!(rendered.contains("Subject: Build report"));
        assert!(rendered.contains("dev@example.com"));
        assert!(rendered.contains("qa@example.com"));
        assert!(rendered.contains("lead@example.com"));
        assert!(rendered.contains("robot@example.com"));
        assert!(rendered.contains("Content-Type: image/png"));
        assert!(rendered.contains("filename=\"graph.png\""));
        assert!(rendered.contains("Content-Type: application/octet-stream"));
        assert!(rendered.contains("<p>ok</p>"));
    }

    #[test]
    fn recipients_must_parse_as_addresses() {
        let mailer = offline_mailer();
        let message = EmailMessage::text("Hello", "hi").to("not an address");
        let result = mailer.assemble(message, Vec::new());
        assert!(matches!(result, Err(MailError::Address { .. })));
    }
}
