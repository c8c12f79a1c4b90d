//! Connection-level transport options.
//!
//! These are not headers: they are handed to the executor just before the
//! underlying connection is configured, in a fixed order, through
//! [`TransportOptions::prepare`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVersion {
    Http10,
    Http11,
}

impl HttpVersion {
    pub fn as_http(self) -> http::Version {
        match self {
            HttpVersion::Http10 => http::Version::HTTP_10,
            HttpVersion::Http11 => http::Version::HTTP_11,
        }
    }
}

impl fmt::Display for HttpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpVersion::Http10 => write!(f, "HTTP/1.0"),
            HttpVersion::Http11 => write!(f, "HTTP/1.1"),
        }
    }
}

/// A single transport setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportOption {
    /// Protocol version used on the wire
    HttpVersion(HttpVersion),
    /// Close the connection after the response instead of returning it to the pool
    ForbidReuse(bool),
    /// Never take a pooled connection, always connect anew
    FreshConnect(bool),
    /// Per-connection debug logging of the transport
    Verbose(bool),
    /// Never interrupt blocking operations with process signals
    NoSignal(bool),
}

/// Receiver of transport options, invoked at connection-prepare time.
pub trait TransportTarget {
    fn set_option(&mut self, option: TransportOption);
}

/// Records the options it is given, in order.
impl TransportTarget for Vec<TransportOption> {
    fn set_option(&mut self, option: TransportOption) {
        self.push(option);
    }
}

/// The option set derived from a client's HTTP version and keep-alive policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransportOptions {
    http_version: HttpVersion,
    keep_alive: bool,
}

impl TransportOptions {
    pub fn new(http_version: HttpVersion, keep_alive: bool) -> Self {
        TransportOptions {
            http_version,
            keep_alive,
        }
    }

    pub fn http_version(&self) -> HttpVersion {
        self.http_version
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Options in the order they are applied.
    pub fn options(&self) -> [TransportOption; 5] {
        let fresh = !self.keep_alive;
        [
            TransportOption::HttpVersion(self.http_version),
            TransportOption::ForbidReuse(fresh),
            TransportOption::FreshConnect(fresh),
            TransportOption::Verbose(false),
            TransportOption::NoSignal(true),
        ]
    }

    /// Apply every option to `target`.
    pub fn prepare<T: TransportTarget + ?Sized>(&self, target: &mut T) {
        for option in self.options() {
            target.set_option(option);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prepared(version: HttpVersion, keep_alive: bool) -> Vec<TransportOption> {
        let mut applied = Vec::new();
        TransportOptions::new(version, keep_alive).prepare(&mut applied);
        applied
    }

    #[test]
    fn test_http11_without_keep_alive() {
        assert_eq!(
            prepared(HttpVersion::Http11, false),
            vec![
                TransportOption::HttpVersion(HttpVersion::Http11),
                TransportOption::ForbidReuse(true),
                TransportOption::FreshConnect(true),
                TransportOption::Verbose(false),
                TransportOption::NoSignal(true),
            ]
        );
    }

    #[test]
    fn test_http11_with_keep_alive() {
        assert_eq!(
            prepared(HttpVersion::Http11, true),
            vec![
                TransportOption::HttpVersion(HttpVersion::Http11),
                TransportOption::ForbidReuse(false),
                TransportOption::FreshConnect(false),
                TransportOption::Verbose(false),
                TransportOption::NoSignal(true),
            ]
        );
    }

    #[test]
    fn test_http10_without_keep_alive() {
        assert_eq!(
            prepared(HttpVersion::Http10, false),
            vec![
                TransportOption::HttpVersion(HttpVersion::Http10),
                TransportOption::ForbidReuse(true),
                TransportOption::FreshConnect(true),
                TransportOption::Verbose(false),
                TransportOption::NoSignal(true),
            ]
        );
    }

    #[test]
    fn test_http10_with_keep_alive() {
        assert_eq!(
            prepared(HttpVersion::Http10, true),
            vec![
                TransportOption::HttpVersion(HttpVersion::Http10),
                TransportOption::ForbidReuse(false),
                TransportOption::FreshConnect(false),
                TransportOption::Verbose(false),
                TransportOption::NoSignal(true),
            ]
        );
    }

    #[test]
    fn test_version_mapping() {
        assert_eq!(HttpVersion::Http10.as_http(), http::Version::HTTP_10);
        assert_eq!(HttpVersion::Http11.to_string(), "HTTP/1.1");
    }
}
