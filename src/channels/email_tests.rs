use super::*;
use crate::channels::email_types::EmailAttachment;

fn test_config() -> EmailConfig {
    EmailConfig {
        imap_host: "imap.test.com".into(),
        imap_port: 993,
        smtp_host: "smtp.test.com".into(),
        smtp_port: 465,
        username: "office@test.com".into(),
        password: SecretString::from("pass"),
        from_address: "office@test.com".into(),
        poll_interval_secs: 60,
    }
}

// ── IMAP parsing tests ──────────────────────────────────────────

#[test]
fn literal_size_detects_trailing_marker() {
    assert_eq!(literal_size("* 1 FETCH (RFC822 {1234}"), Some(1234));
    assert_eq!(literal_size("* 1 FETCH (RFC822 {12+}"), Some(12));
}

#[test]
fn literal_size_ignores_plain_lines() {
    assert_eq!(literal_size("* OK ready"), None);
    assert_eq!(literal_size("* 1 FETCH (FLAGS (\\Seen))"), None);
    assert_eq!(literal_size("{abc}"), None);
}

#[test]
fn search_ids_parsed_in_server_order() {
    let lines = vec![
        "* SEARCH 3 1 2".to_string(),
        "* OK still here".to_string(),
    ];
    assert_eq!(parse_search_ids(&lines), vec!["3", "1", "2"]);
}

#[test]
fn search_ids_empty_mailbox() {
    let lines = vec!["* SEARCH".to_string()];
    assert!(parse_search_ids(&lines).is_empty());
}

#[test]
fn quote_imap_escapes_specials() {
    assert_eq!(quote_imap("plain"), "\"plain\"");
    assert_eq!(quote_imap(r#"p"a\ss"#), r#""p\"a\\ss""#);
}

#[test]
fn imap_response_status() {
    let ok = ImapResponse {
        status: "OK LOGIN completed".into(),
        ..Default::default()
    };
    let no = ImapResponse {
        status: "NO [AUTHENTICATIONFAILED] Invalid credentials".into(),
        ..Default::default()
    };
    assert!(ok.is_ok());
    assert!(!no.is_ok());
}

// ── Message composition tests ───────────────────────────────────

#[test]
fn build_plain_reply() {
    let email = OutgoingEmail {
        to: "student@example.com".into(),
        subject: "Re: Your Request".into(),
        body: "Dear student,\n\nThank you.".into(),
        attachment: None,
    };
    let message = build_message("office@test.com", &email).unwrap();
    let formatted = String::from_utf8(message.formatted()).unwrap();
    assert!(formatted.contains("Subject: Re: Your Request"));
    assert!(formatted.contains("To: student@example.com"));
    assert!(formatted.contains("Thank you."));
    assert!(!formatted.contains("Content-Disposition: attachment"));
}

#[test]
fn build_reply_with_attachment() {
    let email = OutgoingEmail {
        to: "student@example.com".into(),
        subject: "Re: attestation de stage".into(),
        body: "Please find your attestation attached.".into(),
        attachment: Some(EmailAttachment {
            filename: "attestation_de_stage.pdf".into(),
            content: vec![0x25, 0x50, 0x44, 0x46, 0x00, 0xff, 0xfe],
        }),
    };
    let message = build_message("office@test.com", &email).unwrap();
    let formatted = String::from_utf8_lossy(&message.formatted()).to_string();
    assert!(formatted.contains("multipart/mixed"));
    assert!(formatted.contains("attestation_de_stage.pdf"));
    assert!(formatted.contains("Content-Transfer-Encoding: base64"));
}

#[test]
fn build_rejects_invalid_recipient() {
    let email = OutgoingEmail {
        to: "not an address".into(),
        subject: "x".into(),
        body: "y".into(),
        attachment: None,
    };
    let err = build_message("office@test.com", &email).unwrap_err();
    assert!(matches!(err, ChannelError::SendFailed { .. }));
}

// ── Config tests ────────────────────────────────────────────────

#[test]
fn config_from_env_requires_imap_host() {
    // SAFETY: This test runs in isolation; no other thread reads EMAIL_IMAP_HOST concurrently.
    unsafe { std::env::remove_var("EMAIL_IMAP_HOST") };
    assert!(matches!(
        EmailConfig::from_env(),
        Err(ConfigError::MissingEnvVar(var)) if var == "EMAIL_IMAP_HOST"
    ));
}

#[tokio::test]
async fn inbox_operations_require_connection() {
    let mut inbox = ImapInbox::new(test_config());
    let err = inbox.list_ids().await.unwrap_err();
    assert!(matches!(err, ChannelError::Disconnected { .. }));
    assert!(inbox.disconnect().await.is_ok());
}
