//! Request parsing
//!
//! Requests are single text lines. Keywords match case-insensitively; the
//! installer path is the verbatim remainder of the line after `msi `.

use std::fmt;

const MSI_PREFIX: &str = "msi ";
const STATUS: &str = "status";
const LOG: &str = "log";

/// A request received from the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `msi <path>`: validate and run the installer at `path`
    RunInstaller(String),
    /// `status`: report the outcome of the last install
    QueryStatus,
    /// `log`: pull the next buffered log line
    NextLogLine,
    /// Empty or absent request: the client is going away
    Disconnect,
    /// Anything else
    Unknown(String),
}

impl Request {
    /// Parse a request line. `None` stands for an absent request.
    pub fn parse(line: Option<&str>) -> Self {
        let line = match line {
            Some(l) if !l.is_empty() => l,
            _ => return Request::Disconnect,
        };

        // "msi " plus at least one character of path
        if line.len() > MSI_PREFIX.len() {
            if let Some(prefix) = line.get(..MSI_PREFIX.len()) {
                if prefix.eq_ignore_ascii_case(MSI_PREFIX) {
                    return Request::RunInstaller(line[MSI_PREFIX.len()..].to_string());
                }
            }
        }

        if line.eq_ignore_ascii_case(STATUS) {
            Request::QueryStatus
        } else if line.eq_ignore_ascii_case(LOG) {
            Request::NextLogLine
        } else {
            Request::Unknown(line.to_string())
        }
    }

    /// Render the request as the line a client sends
    pub fn to_line(&self) -> String {
        match self {
            Request::RunInstaller(path) => format!("{}{}", MSI_PREFIX, path),
            Request::QueryStatus => STATUS.to_string(),
            Request::NextLogLine => LOG.to_string(),
            Request::Disconnect => String::new(),
            Request::Unknown(raw) => raw.clone(),
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Request::RunInstaller(path) => write!(f, "MSI({})", path),
            Request::QueryStatus => write!(f, "STATUS"),
            Request::NextLogLine => write!(f, "LOG"),
            Request::Disconnect => write!(f, "DISCONNECT"),
            Request::Unknown(raw) => write!(f, "UNKNOWN({:?})", raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_and_empty_mean_disconnect() {
        assert_eq!(Request::parse(None), Request::Disconnect);
        assert_eq!(Request::parse(Some("")), Request::Disconnect);
    }

    #[test]
    fn test_msi_prefix_is_case_insensitive() {
        assert_eq!(
            Request::parse(Some("msi C:\\pkg.msi")),
            Request::RunInstaller("C:\\pkg.msi".into())
        );
        assert_eq!(
            Request::parse(Some("MsI /tmp/a b.msi")),
            Request::RunInstaller("/tmp/a b.msi".into())
        );
    }

    #[test]
    fn test_msi_needs_a_path() {
        assert_eq!(Request::parse(Some("msi ")), Request::Unknown("msi ".into()));
        assert_eq!(Request::parse(Some("msi")), Request::Unknown("msi".into()));
        assert_eq!(Request::parse(Some("msix")), Request::Unknown("msix".into()));
        assert_eq!(Request::parse(Some("msi x")), Request::RunInstaller("x".into()));
    }

    #[test]
    fn test_exact_keywords() {
        assert_eq!(Request::parse(Some("status")), Request::QueryStatus);
        assert_eq!(Request::parse(Some("STATUS")), Request::QueryStatus);
        assert_eq!(Request::parse(Some("Log")), Request::NextLogLine);
        assert_eq!(Request::parse(Some("status ")), Request::Unknown("status ".into()));
        assert_eq!(Request::parse(Some("logs")), Request::Unknown("logs".into()));
    }

    #[test]
    fn test_multibyte_input_does_not_panic() {
        assert_eq!(Request::parse(Some("ms\u{e9}x")), Request::Unknown("ms\u{e9}x".into()));
        assert_eq!(Request::parse(Some("\u{1f600}\u{1f600}")), Request::Unknown("\u{1f600}\u{1f600}".into()));
    }

    #[test]
    fn test_to_line() {
        assert_eq!(Request::RunInstaller("/tmp/x.msi".into()).to_line(), "msi /tmp/x.msi");
        assert_eq!(Request::QueryStatus.to_line(), "status");
        assert_eq!(Request::Disconnect.to_line(), "");
    }
}
