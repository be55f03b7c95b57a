//! DingTalk robot webhook client.
//!
//! [`DingTalk`] posts robot messages to the webhook endpoint. When a secret
//! is configured every request URL carries a millisecond timestamp and an
//! HMAC-SHA256 signature over `"{timestamp}\n{secret}"`, base64- and then
//! percent-encoded. Senders cover the text, markdown, link, actionCard, and
//! feedCard message kinds; every sender returns the decoded reply, and a
//! non-zero `errcode` surfaces as [`DingTalkError::Api`].
//! [`DingTalkRegistry`] builds robots from named sections of an INI file.
//!
//! ```no_run
//! # async fn demo() -> Result<(), shed_dingtalk::DingTalkError> {
//! let robot = shed_dingtalk::DingTalk::builder()
//!     .access_token("f3ab7d...")
//!     .secret("SEC5f0e...")
//!     .init()?;
//! robot.send_text("Deploy finished", shed_dingtalk::At::everyone()).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod registry;

pub use error::{DingTalkError, DingTalkErrorExt};
pub use registry::DingTalkRegistry;

use hmac::{Hmac, Mac};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::{Value, json};
use sha2::Sha256;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Hosted webhook endpoint for robot messages.
static DEFAULT_ENDPOINT: &str = "https://oapi.dingtalk.com/robot/send";
/// Connection establishment cap.
static CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
/// Whole-request cap.
static REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Mention targets attached to text and markdown messages.
#[derive(Debug, Clone, Default)]
pub struct At {
    pub mobiles: Vec<String>,
    pub all: bool,
}

impl At {
    /// Mentions nobody.
    #[must_use]
    pub const fn nobody() -> Self {
        Self { mobiles: Vec::new(), all: false }
    }

    /// Mentions the whole group.
    #[must_use]
    pub const fn everyone() -> Self {
        Self { mobiles: Vec::new(), all: true }
    }

    /// Mentions the given mobile numbers; a comma-separated string or a
    /// slice.
    #[must_use]
    pub fn mobiles(numbers: impl IntoMobiles) -> Self {
        Self { mobiles: numbers.into_mobiles(), all: false }
    }
}

/// Conversion into a mobile-number list; strings split on commas.
pub trait IntoMobiles {
    fn into_mobiles(self) -> Vec<String>;
}

impl IntoMobiles for &str {
    fn into_mobiles(self) -> Vec<String> {
        self.split(',')
            .map(str::trim)
            .filter(|number| !number.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl IntoMobiles for String {
    fn into_mobiles(self) -> Vec<String> {
        self.as_str().into_mobiles()
    }
}

impl<S: AsRef<str>> IntoMobiles for &[S] {
    fn into_mobiles(self) -> Vec<String> {
        self.iter()
            .map(|number| number.as_ref().trim().to_owned())
            .filter(|number| !number.is_empty())
            .collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoMobiles for &[S; N] {
    fn into_mobiles(self) -> Vec<String> {
        self.as_slice().into_mobiles()
    }
}

impl<S: AsRef<str>> IntoMobiles for Vec<S> {
    fn into_mobiles(self) -> Vec<String> {
        self.as_slice().into_mobiles()
    }
}

/// Button layout on an action card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonOrientation {
    /// Buttons stack below the text.
    Vertical,
    /// Buttons sit side by side.
    Horizontal,
}

impl ButtonOrientation {
    const fn flag(self) -> &'static str {
        match self {
            Self::Vertical => "0",
            Self::Horizontal => "1",
        }
    }
}

struct DingTalkInner {
    client: reqwest::Client,
    endpoint: String,
    access_token: String,
    secret: Option<String>,
}

/// DingTalk robot handle.
///
/// Cheap to clone; all clones share one HTTP client.
#[derive(Clone)]
pub struct DingTalk {
    inner: Arc<DingTalkInner>,
}

impl std::fmt::Debug for DingTalk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DingTalk")
            .field("endpoint", &self.inner.endpoint)
            .field("signed", &self.inner.secret.is_some())
            .finish_non_exhaustive()
    }
}

impl DingTalk {
    /// Starts a builder.
    pub fn builder() -> DingTalkBuilder {
        DingTalkBuilder::default()
    }

    /// Sends a plain text message.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalk::send_raw`].
    pub async fn send_text(&self, text: &str, at: At) -> Result<Value, DingTalkError> {
        self.send_raw(json!({
            "msgtype": "text",
            "text": { "content": text },
            "at": at_body(&at),
        }))
        .await
    }

    /// Sends a markdown message.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalk::send_raw`].
    pub async fn send_markdown(
        &self,
        title: &str,
        markdown: &str,
        at: At,
    ) -> Result<Value, DingTalkError> {
        self.send_raw(json!({
            "msgtype": "markdown",
            "markdown": { "title": title, "text": markdown },
            "at": at_body(&at),
        }))
        .await
    }

    /// Renders a markdown template file and sends the result.
    ///
    /// Placeholders use `{name}` syntax and are substituted from `vars`;
    /// `{__title}` and `{__today}` are always available and cannot be
    /// overridden.
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Io`] when the template cannot be read and
    /// [`DingTalkError::Validation`] when it is blank, plus the errors of
    /// [`DingTalk::send_raw`].
    pub async fn send_markdown_file(
        &self,
        title: &str,
        template: impl AsRef<Path>,
        vars: &[(&str, &str)],
        at: At,
    ) -> Result<Value, DingTalkError> {
        let template = template.as_ref();
        let raw = tokio::fs::read_to_string(template)
            .await
            .context(format!("Reading {}", template.display()))?;
        if raw.trim().is_empty() {
            return Err(DingTalkError::Validation {
                message: format!("blank template {}", template.display()).into(),
                context: None,
            });
        }

        self.send_markdown(title, &render_template(&raw, title, vars), at).await
    }

    /// Sends a link card.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalk::send_raw`].
    pub async fn send_link(
        &self,
        title: &str,
        text: &str,
        message_url: &str,
        pic_url: &str,
    ) -> Result<Value, DingTalkError> {
        self.send_raw(json!({
            "msgtype": "link",
            "link": {
                "title": title,
                "text": text,
                "messageUrl": message_url,
                "picUrl": pic_url,
            },
        }))
        .await
    }

    /// Sends an action card. A single button renders in the overall form
    /// with `singleTitle`/`singleURL`, several render as a button list.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalk::send_raw`].
    pub async fn send_action_card(
        &self,
        title: &str,
        text: &str,
        buttons: &[(&str, &str)],
        orientation: ButtonOrientation,
        hide_avatar: bool,
    ) -> Result<Value, DingTalkError> {
        let avatar_flag = if hide_avatar { "1" } else { "0" };
        let card = if let [(single_title, single_url)] = buttons {
            json!({
                "title": title,
                "text": text,
                "singleTitle": single_title,
                "singleURL": single_url,
                "btnOrientation": orientation.flag(),
                "hideAvatar": avatar_flag,
            })
        } else {
            let buttons: Vec<Value> = buttons
                .iter()
                .map(|(label, url)| json!({ "title": label, "actionURL": url }))
                .collect();
            json!({
                "title": title,
                "text": text,
                "btns": buttons,
                "btnOrientation": orientation.flag(),
                "hideAvatar": avatar_flag,
            })
        };

        self.send_raw(json!({ "msgtype": "actionCard", "actionCard": card })).await
    }

    /// Sends a feed card of (title, message URL, picture URL) entries. An
    /// empty picture URL omits the picture.
    ///
    /// # Errors
    ///
    /// The errors of [`DingTalk::send_raw`].
    pub async fn send_feed_card(
        &self,
        links: &[(&str, &str, &str)],
    ) -> Result<Value, DingTalkError> {
        let links: Vec<Value> = links
            .iter()
            .map(|(title, message_url, pic_url)| {
                if pic_url.is_empty() {
                    json!({ "title": title, "messageURL": message_url })
                } else {
                    json!({ "title": title, "messageURL": message_url, "picURL": pic_url })
                }
            })
            .collect();

        self.send_raw(json!({ "msgtype": "feedCard", "feedCard": { "links": links } })).await
    }

    /// Posts a prebuilt message body and returns the decoded reply.
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Request`] when the request fails and
    /// [`DingTalkError::Api`] when the service answers a non-zero `errcode`.
    pub async fn send_raw(&self, body: Value) -> Result<Value, DingTalkError> {
        let url = self.service_url()?;
        let response = self
            .inner
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .context("Sending robot message")?;
        let reply: Value = response.json().await.context("Decoding robot reply")?;

        let code = reply.get("errcode").and_then(Value::as_i64).unwrap_or(0);
        if code != 0 {
            let message =
                reply.get("errmsg").and_then(Value::as_str).unwrap_or("unknown error").to_owned();
            return Err(DingTalkError::Api { code, message, context: None });
        }

        let kind = body.get("msgtype").and_then(Value::as_str).unwrap_or("raw");
        debug!(msgtype = kind, "Robot message delivered");
        Ok(reply)
    }

    fn service_url(&self) -> Result<String, DingTalkError> {
        let mut url = format!("{}?access_token={}", self.inner.endpoint, self.inner.access_token);
        if let Some(secret) = &self.inner.secret {
            let timestamp = shed_clock::unix_millis();
            let sign = sign_request(secret, timestamp)?;
            url = format!("{url}&timestamp={timestamp}&sign={sign}");
        }
        Ok(url)
    }
}

/// Builder for [`DingTalk`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing unless you call .init()"]
pub struct DingTalkBuilder {
    access_token: String,
    secret: Option<String>,
    endpoint: Option<String>,
}

impl DingTalkBuilder {
    /// Robot access token from the webhook URL.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// Signing secret; enables the timestamp/sign query parameters.
    pub fn secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Overrides the webhook endpoint.
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Builds the [`DingTalk`] handle.
    ///
    /// # Errors
    ///
    /// Returns [`DingTalkError::Validation`] when the access token is
    /// missing and [`DingTalkError::Request`] when the HTTP client cannot be
    /// built.
    pub fn init(self) -> Result<DingTalk, DingTalkError> {
        if self.access_token.is_empty() {
            return Err(DingTalkError::Validation {
                message: "missing access token".into(),
                context: None,
            });
        }

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Building HTTP client")?;

        let endpoint = self.endpoint.unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned());
        debug!(%endpoint, signed = self.secret.is_some(), "DingTalk robot ready");
        Ok(DingTalk {
            inner: Arc::new(DingTalkInner {
                client,
                endpoint,
                access_token: self.access_token,
                secret: self.secret,
            }),
        })
    }
}

fn at_body(at: &At) -> Value {
    json!({ "atMobiles": at.mobiles, "isAtAll": at.all })
}

/// `percent_encode(base64(hmac_sha256(secret, "{timestamp}\n{secret}")))`
fn sign_request(secret: &str, timestamp: i64) -> Result<String, DingTalkError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| {
        DingTalkError::Internal { message: "unusable signing secret".into(), context: None }
    })?;
    mac.update(format!("{timestamp}\n{secret}").as_bytes());

    let encoded = shed_crypto::base64_encode(mac.finalize().into_bytes());
    Ok(utf8_percent_encode(&encoded, NON_ALPHANUMERIC).to_string())
}

/// Substitutes template placeholders. Built-ins go first so user variables
/// cannot override them.
fn render_template(template: &str, title: &str, vars: &[(&str, &str)]) -> String {
    let mut text = template
        .replace("{__title}", title)
        .replace("{__today}", &shed_clock::today_string());
    for (name, value) in vars {
        text = text.replace(&format!("{{{name}}}"), value);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signatures_match_the_reference_algorithm() {
        let sign = sign_request("SECtest", 1_700_000_000_000).expect("sign");
        assert_eq!(sign, "aZLLrriXgn05YbwaGR7knYsLeJADjr9NwLaNNKpxh4g%3D");
    }

    #[test]
    fn mobile_strings_split_on_commas() {
        let at = At::mobiles("13800000001, 13800000002,");
        assert_eq!(at.mobiles, vec!["13800000001".to_owned(), "13800000002".to_owned()]);
        assert!(!at.all);
        assert!(At::everyone().all);
        assert!(At::nobody().mobiles.is_empty());
    }

    #[test]
    fn builder_requires_an_access_token() {
        let result = DingTalk::builder().init();
        assert!(matches!(result, Err(DingTalkError::Validation { .. })));
    }

    #[test]
    fn service_urls_carry_the_signature_only_with_a_secret() {
        let plain = DingTalk::builder().access_token("token").init().expect("robot");
        assert_eq!(
            plain.service_url().expect("url"),
            "https://oapi.dingtalk.com/robot/send?access_token=token"
        );

        let signed =
            DingTalk::builder().access_token("token").secret("SECtest").init().expect("robot");
        let url = signed.service_url().expect("url");
        assert!(url.contains("&timestamp="));
        assert!(url.contains("&sign="));
    }

    #[test]
    fn templates_render_builtins_first() {
        let rendered = render_template(
            "# {__title} ({__today})\n{state}",
            "Deploy",
            &[("state", "green"), ("__title", "overridden")],
        );

        assert!(rendered.starts_with("# Deploy ("));
        assert!(rendered.contains("green"));
        assert!(!rendered.contains("overridden"));
    }
}
