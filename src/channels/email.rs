//! Email transports — IMAP over rustls for inbound, SMTP via lettre for outbound.

use std::io::{BufRead, BufReader, Read, Write as IoWrite};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, info};

use crate::channels::channel::{Inbox, Mailer};
use crate::channels::email_types::{OutgoingEmail, RawEmail};
use crate::error::{ChannelError, ConfigError};

// ── Configuration ───────────────────────────────────────────────────

/// Mail account configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub imap_host: String,
    pub imap_port: u16,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: SecretString,
    pub from_address: String,
    pub poll_interval_secs: u64,
}

impl EmailConfig {
    /// Build config from environment variables.
    ///
    /// `EMAIL_IMAP_HOST`, `EMAIL_USERNAME` and `EMAIL_PASSWORD` are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        let imap_host = std::env::var("EMAIL_IMAP_HOST")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_IMAP_HOST".to_string()))?;

        let imap_port: u16 = std::env::var("EMAIL_IMAP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(993);

        let smtp_host =
            std::env::var("EMAIL_SMTP_HOST").unwrap_or_else(|_| imap_host.replace("imap", "smtp"));

        let smtp_port: u16 = std::env::var("EMAIL_SMTP_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(465);

        let username = std::env::var("EMAIL_USERNAME")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_USERNAME".to_string()))?;
        let password = std::env::var("EMAIL_PASSWORD")
            .map_err(|_| ConfigError::MissingEnvVar("EMAIL_PASSWORD".to_string()))?;
        let from_address = std::env::var("EMAIL_FROM_ADDRESS").unwrap_or_else(|_| username.clone());

        let poll_interval_secs: u64 = std::env::var("EMAIL_POLL_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Ok(Self {
            imap_host,
            imap_port,
            smtp_host,
            smtp_port,
            username,
            password: SecretString::from(password),
            from_address,
            poll_interval_secs,
        })
    }
}

// ── IMAP ────────────────────────────────────────────────────────────

type TlsStream = rustls::StreamOwned<rustls::ClientConnection, TcpStream>;

fn imap_err(reason: impl Into<String>) -> ChannelError {
    ChannelError::Protocol {
        name: "imap".into(),
        reason: reason.into(),
    }
}

/// Response to one tagged IMAP command.
#[derive(Debug, Default)]
struct ImapResponse {
    /// Untagged lines (`* ...`), CRLF stripped.
    untagged: Vec<String>,
    /// Literal payloads (`{N}` blocks) in arrival order.
    literals: Vec<Vec<u8>>,
    /// Tagged completion line, tag stripped (`OK ...`, `NO ...`, `BAD ...`).
    status: String,
}

impl ImapResponse {
    fn is_ok(&self) -> bool {
        self.status.starts_with("OK")
    }
}

/// Blocking IMAP session over TLS. Run its methods in `spawn_blocking`.
struct ImapSession {
    stream: BufReader<TlsStream>,
    tag_counter: u32,
}

impl ImapSession {
    /// Connect TCP, wrap in TLS, read the greeting.
    fn open(config: &EmailConfig) -> Result<Self, ChannelError> {
        let tcp = TcpStream::connect((&*config.imap_host, config.imap_port))?;
        tcp.set_read_timeout(Some(Duration::from_secs(30)))?;

        let mut root_store = rustls::RootCertStore::empty();
        root_store.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
        let tls_config = Arc::new(
            rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth(),
        );
        let server_name = rustls_pki_types::ServerName::try_from(config.imap_host.clone())
            .map_err(|e| ChannelError::StartupFailed {
                name: "imap".into(),
                reason: format!("Invalid IMAP host name: {e}"),
            })?;
        let conn = rustls::ClientConnection::new(tls_config, server_name).map_err(|e| {
            ChannelError::StartupFailed {
                name: "imap".into(),
                reason: format!("TLS setup failed: {e}"),
            }
        })?;

        let mut session = Self {
            stream: BufReader::new(rustls::StreamOwned::new(conn, tcp)),
            tag_counter: 0,
        };

        let greeting = session.read_line()?;
        if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
            return Err(imap_err(format!("Unexpected greeting: {greeting}")));
        }
        Ok(session)
    }

    fn read_line(&mut self) -> Result<String, ChannelError> {
        let mut buf = Vec::new();
        let n = self.stream.read_until(b'\n', &mut buf)?;
        if n == 0 {
            return Err(ChannelError::Disconnected {
                name: "imap".into(),
                reason: "IMAP connection closed".into(),
            });
        }
        Ok(String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string())
    }

    /// Send `cmd` under a fresh tag and collect everything up to the tagged reply.
    fn command(&mut self, cmd: &str) -> Result<ImapResponse, ChannelError> {
        self.tag_counter += 1;
        let tag = format!("A{}", self.tag_counter);
        let full = format!("{tag} {cmd}\r\n");
        let stream = self.stream.get_mut();
        IoWrite::write_all(stream, full.as_bytes())?;
        IoWrite::flush(stream)?;

        let mut response = ImapResponse::default();
        loop {
            let line = self.read_line()?;
            if let Some(rest) = line.strip_prefix(&tag) {
                response.status = rest.trim_start().to_string();
                return Ok(response);
            }
            if let Some(size) = literal_size(&line) {
                let mut literal = vec![0u8; size];
                self.stream.read_exact(&mut literal)?;
                response.literals.push(literal);
            }
            response.untagged.push(line);
        }
    }

    fn login(&mut self, username: &str, password: &str) -> Result<(), ChannelError> {
        let resp = self.command(&format!(
            "LOGIN {} {}",
            quote_imap(username),
            quote_imap(password)
        ))?;
        if !resp.is_ok() {
            return Err(ChannelError::AuthFailed {
                name: "imap".into(),
                reason: resp.status,
            });
        }
        Ok(())
    }

    fn select_inbox(&mut self) -> Result<(), ChannelError> {
        let resp = self.command("SELECT \"INBOX\"")?;
        if !resp.is_ok() {
            return Err(imap_err(format!("SELECT INBOX failed: {}", resp.status)));
        }
        Ok(())
    }

    fn search_all(&mut self) -> Result<Vec<String>, ChannelError> {
        let resp = self.command("SEARCH ALL")?;
        if !resp.is_ok() {
            return Err(imap_err(format!("SEARCH failed: {}", resp.status)));
        }
        Ok(parse_search_ids(&resp.untagged))
    }

    fn fetch_rfc822(&mut self, id: &str) -> Result<Vec<u8>, ChannelError> {
        let resp = self.command(&format!("FETCH {id} RFC822"))?;
        if !resp.is_ok() {
            return Err(imap_err(format!("FETCH {id} failed: {}", resp.status)));
        }
        resp.literals
            .into_iter()
            .next()
            .ok_or_else(|| imap_err(format!("FETCH {id} returned no message body")))
    }

    fn logout(&mut self) -> Result<(), ChannelError> {
        self.command("LOGOUT").map(|_| ())
    }
}

/// Size of a trailing `{N}` literal marker, if the line ends with one.
fn literal_size(line: &str) -> Option<usize> {
    let inner = line.strip_suffix('}')?;
    let open = inner.rfind('{')?;
    inner[open + 1..].trim_end_matches('+').parse().ok()
}

/// Quote a string for an IMAP command argument.
fn quote_imap(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Collect message ids from `* SEARCH ...` lines.
fn parse_search_ids(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .filter_map(|l| l.strip_prefix("* SEARCH"))
        .flat_map(|rest| rest.split_whitespace().map(str::to_string))
        .collect()
}

/// IMAP inbox. One authenticated session is kept for the monitor's lifetime.
pub struct ImapInbox {
    config: EmailConfig,
    session: Option<ImapSession>,
}

impl ImapInbox {
    pub fn new(config: EmailConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }

    /// Run a blocking session operation off the async runtime.
    async fn with_session<T, F>(&mut self, op: F) -> Result<T, ChannelError>
    where
        T: Send + 'static,
        F: FnOnce(&mut ImapSession) -> Result<T, ChannelError> + Send + 'static,
    {
        let mut session = self.session.take().ok_or_else(|| ChannelError::Disconnected {
            name: "imap".into(),
            reason: "not connected".into(),
        })?;
        let (session, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut session);
            (session, result)
        })
        .await
        .map_err(|e| imap_err(format!("IMAP task panicked: {e}")))?;
        self.session = Some(session);
        result
    }
}

#[async_trait]
impl Inbox for ImapInbox {
    async fn connect(&mut self) -> Result<(), ChannelError> {
        let cfg = self.config.clone();
        let session = tokio::task::spawn_blocking(move || {
            let mut session = ImapSession::open(&cfg)?;
            session.login(&cfg.username, cfg.password.expose_secret())?;
            session.select_inbox()?;
            Ok::<_, ChannelError>(session)
        })
        .await
        .map_err(|e| imap_err(format!("IMAP task panicked: {e}")))??;

        info!(host = %self.config.imap_host, "IMAP session authenticated, INBOX selected");
        self.session = Some(session);
        Ok(())
    }

    async fn list_ids(&mut self) -> Result<Vec<String>, ChannelError> {
        let ids = self.with_session(|s| s.search_all()).await?;
        debug!(count = ids.len(), "IMAP SEARCH ALL");
        Ok(ids)
    }

    async fn fetch(&mut self, id: &str) -> Result<RawEmail, ChannelError> {
        let id = id.to_string();
        let fetch_id = id.clone();
        let raw = self.with_session(move |s| s.fetch_rfc822(&fetch_id)).await?;
        Ok(RawEmail::new(id, raw))
    }

    async fn disconnect(&mut self) -> Result<(), ChannelError> {
        if self.session.is_none() {
            return Ok(());
        }
        let result = self.with_session(|s| s.logout()).await;
        self.session = None;
        result
    }
}

// ── SMTP ────────────────────────────────────────────────────────────

fn send_err(reason: String) -> ChannelError {
    ChannelError::SendFailed {
        name: "email".into(),
        reason,
    }
}

/// Build the MIME message: plain-text body, plus an optional binary attachment.
pub fn build_message(from: &str, email: &OutgoingEmail) -> Result<Message, ChannelError> {
    let builder = Message::builder()
        .from(from
            .parse()
            .map_err(|e| send_err(format!("Invalid from address: {e}")))?)
        .to(email
            .to
            .parse()
            .map_err(|e| send_err(format!("Invalid to address: {e}")))?)
        .subject(email.subject.as_str());

    let text = SinglePart::plain(email.body.clone());
    let message = match &email.attachment {
        Some(attachment) => {
            let content_type = ContentType::parse("application/octet-stream")
                .map_err(|e| send_err(format!("Invalid attachment content type: {e}")))?;
            let part = Attachment::new(attachment.filename.clone())
                .body(attachment.content.clone(), content_type);
            builder.multipart(MultiPart::mixed().singlepart(text).singlepart(part))
        }
        None => builder.multipart(MultiPart::mixed().singlepart(text)),
    };

    message.map_err(|e| send_err(format!("Failed to build email: {e}")))
}

/// SMTP mailer over implicit TLS. A fresh connection is opened per message.
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    pub fn new(config: EmailConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), ChannelError> {
        let message = build_message(&self.config.from_address, email)?;

        let creds = Credentials::new(
            self.config.username.clone(),
            self.config.password.expose_secret().to_string(),
        );
        let transport = SmtpTransport::relay(&self.config.smtp_host)
            .map_err(|e| send_err(format!("SMTP relay error: {e}")))?
            .port(self.config.smtp_port)
            .credentials(creds)
            .build();

        debug!(host = %self.config.smtp_host, "Connecting to SMTP server");
        tokio::task::spawn_blocking(move || transport.send(&message))
            .await
            .map_err(|e| send_err(format!("SMTP task panicked: {e}")))?
            .map_err(|e| send_err(format!("SMTP send failed: {e}")))?;

        info!(to = %email.to, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
