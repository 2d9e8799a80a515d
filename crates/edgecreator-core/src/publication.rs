//! Publication and issue identifiers.
//!
//! A publication is identified by a country code and a magazine code,
//! written `country/magazine` (e.g. `fr/DDD`). An issue is one number within
//! a publication.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a malformed publication code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid publication code `{0}`, expected `country/magazine`")]
pub struct InvalidPublicationCode(pub String);

/// A `country/magazine` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicationCode {
    country: String,
    magazine: String,
}

impl PublicationCode {
    pub fn new(country: impl Into<String>, magazine: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            magazine: magazine.into(),
        }
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn magazine(&self) -> &str {
        &self.magazine
    }
}

impl fmt::Display for PublicationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.country, self.magazine)
    }
}

impl FromStr for PublicationCode {
    type Err = InvalidPublicationCode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((country, magazine))
                if !country.is_empty() && !magazine.is_empty() && !magazine.contains('/') =>
            {
                Ok(Self::new(country, magazine))
            }
            _ => Err(InvalidPublicationCode(s.to_string())),
        }
    }
}

/// Selects one issue of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IssueSelector {
    publication: PublicationCode,
    issue_number: String,
}

impl IssueSelector {
    pub fn new(publication: PublicationCode, issue_number: impl Into<String>) -> Self {
        Self {
            publication,
            issue_number: issue_number.into(),
        }
    }

    pub fn publication(&self) -> &PublicationCode {
        &self.publication
    }

    pub fn country(&self) -> &str {
        self.publication.country()
    }

    pub fn magazine(&self) -> &str {
        self.publication.magazine()
    }

    pub fn issue_number(&self) -> &str {
        &self.issue_number
    }

    /// Returns a selector for another issue of the same publication.
    pub fn sibling(&self, issue_number: impl Into<String>) -> Self {
        Self::new(self.publication.clone(), issue_number)
    }
}

impl fmt::Display for IssueSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.publication, self.issue_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publication_code_parse() {
        let code: PublicationCode = "fr/DDD".parse().unwrap();
        assert_eq!(code.country(), "fr");
        assert_eq!(code.magazine(), "DDD");
        assert_eq!(code.to_string(), "fr/DDD");
    }

    #[test]
    fn test_publication_code_rejects_malformed() {
        assert!("fr".parse::<PublicationCode>().is_err());
        assert!("/DDD".parse::<PublicationCode>().is_err());
        assert!("fr/".parse::<PublicationCode>().is_err());
        assert!("fr/DDD/1".parse::<PublicationCode>().is_err());
    }

    #[test]
    fn test_issue_selector_sibling() {
        let selector = IssueSelector::new(PublicationCode::new("fr", "DDD"), "12");
        let sibling = selector.sibling("13");
        assert_eq!(sibling.publication(), selector.publication());
        assert_eq!(sibling.issue_number(), "13");
        assert_eq!(sibling.to_string(), "fr/DDD 13");
    }
}
