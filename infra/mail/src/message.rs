use std::path::{Path, PathBuf};

/// Body flavor of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MessageBody {
    Text(String),
    Html(String),
}

/// A fully specified outgoing email.
///
/// The convenience senders on [`crate::Mailer`] cover the common cases; this
/// type is the full form with carbon copies and attachments.
#[derive(Debug, Clone)]
pub struct EmailMessage {
    pub(crate) subject: String,
    pub(crate) body: MessageBody,
    pub(crate) to: Vec<String>,
    pub(crate) cc: Vec<String>,
    pub(crate) attachments: Vec<EmailAttachment>,
}

impl EmailMessage {
    /// A plain-text email with the given subject.
    #[must_use]
    pub fn text(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::new(subject.into(), MessageBody::Text(body.into()))
    }

    /// An HTML email with the given subject.
    #[must_use]
    pub fn html(subject: impl Into<String>, html: impl Into<String>) -> Self {
        Self::new(subject.into(), MessageBody::Html(html.into()))
    }

    const fn new(subject: String, body: MessageBody) -> Self {
        Self { subject, body, to: Vec::new(), cc: Vec::new(), attachments: Vec::new() }
    }

    /// Adds recipients, either a comma-separated string or a slice.
    #[must_use]
    pub fn to(mut self, recipients: impl IntoRecipients) -> Self {
        self.to.extend(recipients.into_recipients());
        self
    }

    /// Adds carbon-copy recipients.
    #[must_use]
    pub fn cc(mut self, recipients: impl IntoRecipients) -> Self {
        self.cc.extend(recipients.into_recipients());
        self
    }

    /// Attaches a file; the attachment is named after the file.
    #[must_use]
    pub fn attach(mut self, path: impl Into<PathBuf>) -> Self {
        self.attachments.push(EmailAttachment::Path(path.into()));
        self
    }

    /// Attaches a file under a different name.
    #[must_use]
    pub fn attach_as(mut self, path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        self.attachments.push(EmailAttachment::Renamed { path: path.into(), name: name.into() });
        self
    }

    /// Attaches an in-memory payload under the given name.
    #[must_use]
    pub fn attach_bytes(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.attachments.push(EmailAttachment::Bytes { name: name.into(), data: data.into() });
        self
    }
}

/// An email attachment in one of the accepted shapes.
#[derive(Debug, Clone)]
pub enum EmailAttachment {
    /// File on disk, named after its file name.
    Path(PathBuf),
    /// File on disk sent under a different name.
    Renamed { path: PathBuf, name: String },
    /// In-memory payload with an explicit name.
    Bytes { name: String, data: Vec<u8> },
}

/// Conversion into a recipient list.
///
/// Strings split on commas so receiver lists kept as a single config value
/// work directly; slices and vectors pass through. Blank entries are dropped.
pub trait IntoRecipients {
    fn into_recipients(self) -> Vec<String>;
}

impl IntoRecipients for &str {
    fn into_recipients(self) -> Vec<String> {
        self.split(',')
            .map(str::trim)
            .filter(|address| !address.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

impl IntoRecipients for String {
    fn into_recipients(self) -> Vec<String> {
        self.as_str().into_recipients()
    }
}

impl<S: AsRef<str>> IntoRecipients for &[S] {
    fn into_recipients(self) -> Vec<String> {
        self.iter()
            .map(|address| address.as_ref().trim().to_owned())
            .filter(|address| !address.is_empty())
            .collect()
    }
}

impl<S: AsRef<str>, const N: usize> IntoRecipients for &[S; N] {
    fn into_recipients(self) -> Vec<String> {
        self.as_slice().into_recipients()
    }
}

impl<S: AsRef<str>> IntoRecipients for Vec<S> {
    fn into_recipients(self) -> Vec<String> {
        self.as_slice().into_recipients()
    }
}

/// MIME label for an attachment, keyed on the file extension. Image formats
/// get their image type, everything else goes out as a binary blob.
pub(crate) fn attachment_mime(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|extension| extension.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "bmp" => "image/bmp",
        "gif" => "image/gif",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "psd" => "image/vnd.adobe.photoshop",
        "svg" => "image/svg+xml",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_strings_split_on_commas() {
        assert_eq!(
            "a@example.com, b@example.com,,".into_recipients(),
            vec!["a@example.com".to_owned(), "b@example.com".to_owned()],
        );
        assert_eq!(["c@example.com"].as_slice().into_recipients(), vec!["c@example.com".to_owned()]);
        assert_eq!(String::from(" d@example.com ").into_recipients(), vec!["d@example.com".to_owned()]);
    }

    #[test]
    fn builder_methods_accumulate() {
        let message = EmailMessage::html("Report", "<p>done</p>")
            .to("a@example.com")
            .to(&["b@example.com"])
            .cc("audit@example.com")
            .attach("report.pdf")
            .attach_as("raw.csv", "march.csv")
            .attach_bytes("inline.txt", b"hi".to_vec());

        assert_eq!(message.to.len(), 2);
        assert_eq!(message.cc.len(), 1);
        assert_eq!(message.attachments.len(), 3);
        assert_eq!(message.body, MessageBody::Html("<p>done</p>".to_owned()));
    }

    #[test]
    fn image_extensions_map_to_image_mime_types() {
        assert_eq!(attachment_mime("photo.JPG"), "image/jpeg");
        assert_eq!(attachment_mime("diagram.svg"), "image/svg+xml");
        assert_eq!(attachment_mime("notes.txt"), "application/octet-stream");
        assert_eq!(attachment_mime("no-extension"), "application/octet-stream");
    }
}
