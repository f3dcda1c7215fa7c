//! Minimal HTTP/1.0 client pieces: base URL splitting, GET request encoding and
//! response head parsing.
//!
//! Requests are sent as HTTP/1.0 with `Connection: close`, so the body is
//! either delimited by `Content-Length` or runs until the server closes.

use core::fmt::{self, Write};
use core::net::Ipv4Addr;

/// Errors produced while interpreting URLs and responses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// Only plain `http://` URLs are supported
    UnsupportedScheme,
    /// Missing host or unparsable port
    InvalidUrl,
    /// No blank line terminating the response head
    IncompleteHead,
    /// Response head is not valid UTF-8
    InvalidUtf8,
    /// First line is not `HTTP/1.x <code> ...`
    InvalidStatusLine,
    /// A header the body framing depends on has an unusable value
    InvalidHeader,
    /// Fewer body bytes than announced by `Content-Length`
    TruncatedBody,
    /// Chunked or otherwise encoded bodies are not accepted
    UnsupportedEncoding,
}

/// Host part of a URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host<'a> {
    Ipv4(Ipv4Addr),
    Name(&'a str),
}

/// A split `http://host[:port][/prefix]` base URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Url<'a> {
    pub host: Host<'a>,
    /// Host as written, used for the `Host` header
    pub authority: &'a str,
    pub port: u16,
    /// Path prefix without trailing slash; empty for the root
    pub prefix: &'a str,
}

impl<'a> Url<'a> {
    pub fn parse(url: &'a str) -> Result<Self, HttpError> {
        let rest = url
            .trim()
            .strip_prefix("http://")
            .ok_or(HttpError::UnsupportedScheme)?;

        let (authority, prefix) = match rest.find('/') {
            Some(idx) => (&rest[..idx], rest[idx..].trim_end_matches('/')),
            None => (rest, ""),
        };

        let (host, port) = match authority.rsplit_once(':') {
            Some((host, port)) => (host, port.parse::<u16>().map_err(|_| HttpError::InvalidUrl)?),
            None => (authority, 80),
        };
        if host.is_empty() || port == 0 {
            return Err(HttpError::InvalidUrl);
        }

        let host = match host.parse::<Ipv4Addr>() {
            Ok(ip) => Host::Ipv4(ip),
            Err(_) => Host::Name(host),
        };

        Ok(Self {
            host,
            authority,
            port,
            prefix,
        })
    }
}

/// A GET request against a base URL
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    pub url: Url<'a>,
    /// Endpoint path appended to the URL prefix, starting with `/`
    pub path: &'a str,
    pub headers: &'a [(&'a str, &'a str)],
}

impl Request<'_> {
    /// Write the request head; GET carries no body
    pub fn encode<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(
            out,
            "GET {}{} HTTP/1.0\r\nHost: {}\r\n",
            self.url.prefix, self.path, self.url.authority
        )?;
        for (name, value) in self.headers {
            write!(out, "{}: {}\r\n", name, value)?;
        }
        out.write_str("Connection: close\r\n\r\n")
    }
}

/// A parsed response borrowing from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: u16,
    pub body: &'a [u8],
}

impl Response<'_> {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Split a complete raw response into status code and body
pub fn parse_response(raw: &[u8]) -> Result<Response<'_>, HttpError> {
    let head_end = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(HttpError::IncompleteHead)?;
    let head = core::str::from_utf8(&raw[..head_end]).map_err(|_| HttpError::InvalidUtf8)?;
    let rest = &raw[head_end + 4..];

    let mut lines = head.split("\r\n");
    let status = parse_status_line(lines.next().unwrap_or(""))?;

    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.trim().eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse::<usize>().map_err(|_| HttpError::InvalidHeader)?);
        } else if name.trim().eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            return Err(HttpError::UnsupportedEncoding);
        }
    }

    let body = match content_length {
        Some(len) if len > rest.len() => return Err(HttpError::TruncatedBody),
        Some(len) => &rest[..len],
        None => rest,
    };

    Ok(Response { status, body })
}

fn parse_status_line(line: &str) -> Result<u16, HttpError> {
    let mut parts = line.split_whitespace();
    let version = parts.next().ok_or(HttpError::InvalidStatusLine)?;
    if !version.starts_with("HTTP/1.") {
        return Err(HttpError::InvalidStatusLine);
    }
    let code = parts.next().ok_or(HttpError::InvalidStatusLine)?;
    if code.len() != 3 {
        return Err(HttpError::InvalidStatusLine);
    }
    code.parse::<u16>().map_err(|_| HttpError::InvalidStatusLine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_ip_base_url_with_port() {
        let url = Url::parse("http://192.168.1.100:5000").unwrap();
        assert_eq!(url.host, Host::Ipv4(Ipv4Addr::new(192, 168, 1, 100)));
        assert_eq!(url.authority, "192.168.1.100:5000");
        assert_eq!(url.port, 5000);
        assert_eq!(url.prefix, "");
    }

    #[test]
    fn parses_named_host_with_prefix() {
        let url = Url::parse("http://colors.local/jacket/").unwrap();
        assert_eq!(url.host, Host::Name("colors.local"));
        assert_eq!(url.port, 80);
        assert_eq!(url.prefix, "/jacket");
    }

    #[test]
    fn rejects_unusable_urls() {
        assert_eq!(Url::parse("https://example.com"), Err(HttpError::UnsupportedScheme));
        assert_eq!(Url::parse("http://:5000"), Err(HttpError::InvalidUrl));
        assert_eq!(Url::parse("http://host:http"), Err(HttpError::InvalidUrl));
        assert_eq!(Url::parse(""), Err(HttpError::UnsupportedScheme));
    }

    #[test]
    fn encodes_get_request_with_headers() {
        let url = Url::parse("http://192.168.1.100:5000/").unwrap();
        let request = Request {
            url,
            path: "/api/v1/color",
            headers: &[("X-API-Key", "secret")],
        };
        let mut out = String::new();
        request.encode(&mut out).unwrap();

        assert_eq!(
            out,
            "GET /api/v1/color HTTP/1.0\r\nHost: 192.168.1.100:5000\r\nX-API-Key: secret\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn parses_response_with_content_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}trailing";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body, b"{}");
        assert!(response.is_success());
    }

    #[test]
    fn body_runs_to_end_without_content_length() {
        let raw = b"HTTP/1.0 500 INTERNAL SERVER ERROR\r\n\r\noops";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 500);
        assert_eq!(response.body, b"oops");
        assert!(!response.is_success());
    }

    #[test]
    fn rejects_malformed_responses() {
        assert_eq!(parse_response(b"HTTP/1.1 200 OK\r\n"), Err(HttpError::IncompleteHead));
        assert_eq!(parse_response(b"SSH-2.0\r\n\r\n"), Err(HttpError::InvalidStatusLine));
        assert_eq!(parse_response(b"HTTP/1.1 abc\r\n\r\n"), Err(HttpError::InvalidStatusLine));
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n{}"),
            Err(HttpError::TruncatedBody)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\n{}\r\n0\r\n\r\n"),
            Err(HttpError::UnsupportedEncoding)
        );
    }

    #[test]
    fn unparsable_content_length_is_a_header_error() {
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: lots\r\n\r\n{}"),
            Err(HttpError::InvalidHeader)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nContent-Length: -1\r\n\r\n{}"),
            Err(HttpError::InvalidHeader)
        );
    }
}
