//! Module `commands`
//!
//! The command model: one parsed protocol line and one reply value.

use std::fmt;

use crate::protocol::responses::{self, format_multiline, format_response};

/// A single command line received on the control connection.
///
/// The verb is upper-cased; the argument is the trimmed remainder of the
/// line, or `None` when nothing follows the verb.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    verb: String,
    argument: Option<String>,
}

impl Command {
    /// Parses a raw line (with or without its CRLF terminator).
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim_end_matches(['\r', '\n']).trim_start();
        let mut parts = trimmed.splitn(2, char::is_whitespace);
        let verb = parts.next().unwrap_or("").to_ascii_uppercase();
        let argument = parts
            .next()
            .map(str::trim)
            .filter(|arg| !arg.is_empty())
            .map(str::to_string);

        Self { verb, argument }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.verb[..], &self.argument) {
            // never log passwords
            ("PASS", Some(_)) => write!(f, "PASS ****"),
            (verb, Some(arg)) => write!(f, "{} {}", verb, arg),
            (verb, None) => write!(f, "{}", verb),
        }
    }
}

/// Reply produced by exactly one handler invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandResult {
    pub code: u16,
    pub text: String,
    /// Leading lines of a multi-line reply: a `code-` header then body lines.
    pub detail: Vec<String>,
}

impl CommandResult {
    pub fn new(code: u16, text: impl Into<String>) -> Self {
        Self {
            code,
            text: text.into(),
            detail: Vec::new(),
        }
    }

    /// Multi-line reply: `code-header`, one indented line per entry of
    /// `body`, then `code text`.
    pub fn multiline(
        code: u16,
        header: impl Into<String>,
        body: impl IntoIterator<Item = String>,
        text: impl Into<String>,
    ) -> Self {
        let mut detail = vec![header.into()];
        detail.extend(body);
        Self {
            code,
            text: text.into(),
            detail,
        }
    }

    /// Whether the session must close after writing this reply.
    pub fn is_closing(&self) -> bool {
        self.code == responses::CLOSING
    }

    /// Wire form, terminated by CRLF.
    pub fn to_line(&self) -> String {
        match self.detail.split_first() {
            Some((header, body)) => format_multiline(self.code, header, body, &self.text),
            None => format_response(self.code, &self.text),
        }
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.text)
    }
}

/// Parses a raw command string received from a client.
pub fn parse_command(raw: &str) -> Command {
    Command::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_verb_and_argument() {
        let cmd = parse_command("stor dir/file name.txt\r\n");
        assert_eq!(cmd.verb(), "STOR");
        assert_eq!(cmd.argument(), Some("dir/file name.txt"));
    }

    #[test]
    fn missing_argument_is_none() {
        assert_eq!(parse_command("QUIT\r\n").argument(), None);
        assert_eq!(parse_command("CWD    \r\n").argument(), None);
        assert_eq!(parse_command("").verb(), "");
    }

    #[test]
    fn hides_password_when_displayed() {
        assert_eq!(parse_command("PASS hunter2").to_string(), "PASS ****");
    }

    #[test]
    fn renders_reply_line() {
        let result = CommandResult::new(226, "Transfer complete.");
        assert_eq!(result.to_line(), "226 Transfer complete.\r\n");
        assert!(!result.is_closing());
        assert!(CommandResult::new(221, "Bye").is_closing());
    }

    #[test]
    fn renders_multiline_reply() {
        let result = CommandResult::multiline(211, "Features:", ["SIZE".to_string()], "End");
        assert_eq!(result.to_line(), "211-Features:\r\n SIZE\r\n211 End\r\n");
    }
}
