//! HTTP method as a typed enum.
//!
//! Only the methods a route can be registered for are representable. Anything
//! else (`HEAD`, `CONNECT`, extension methods) never reaches the router: the
//! server reports it as not found, the same outcome as an unregistered method.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// A method routes can be registered for.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Trace,
    Options,
}

/// Returned when a method string or [`http::Method`] is outside the supported set.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported method `{0}`")]
pub struct UnsupportedMethod(pub String);

impl Method {
    pub const ALL: [Method; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Delete,
        Self::Trace,
        Self::Options,
    ];

    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get     => "GET",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Patch   => "PATCH",
            Self::Delete  => "DELETE",
            Self::Trace   => "TRACE",
            Self::Options => "OPTIONS",
        }
    }
}

/// Parses an uppercase method string (e.g. `"GET"`). Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnsupportedMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET"     => Ok(Self::Get),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "PATCH"   => Ok(Self::Patch),
            "DELETE"  => Ok(Self::Delete),
            "TRACE"   => Ok(Self::Trace),
            "OPTIONS" => Ok(Self::Options),
            other     => Err(UnsupportedMethod(other.to_owned())),
        }
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = UnsupportedMethod;

    fn try_from(m: &http::Method) -> Result<Self, Self::Error> {
        m.as_str().parse()
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_supported_method() {
        for m in Method::ALL {
            assert_eq!(m.as_str().parse::<Method>(), Ok(m));
        }
    }

    #[test]
    fn rejects_lowercase_and_unknown() {
        assert!("get".parse::<Method>().is_err());
        assert_eq!(
            "HEAD".parse::<Method>(),
            Err(UnsupportedMethod("HEAD".to_owned()))
        );
    }

    #[test]
    fn converts_from_http_method() {
        assert_eq!(Method::try_from(&http::Method::PATCH), Ok(Method::Patch));
        assert!(Method::try_from(&http::Method::CONNECT).is_err());
    }
}
