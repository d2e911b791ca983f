//! Declared field limits and known hostile inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum accepted length per form field.
pub const FIELD_LIMITS: &[(&str, usize)] = &[
    ("first_name", 50),
    ("last_name", 50),
    ("name", 100),
    ("email", 254),
    ("username", 30),
    ("password", 64),
    ("phone", 20),
    ("address", 100),
    ("city", 50),
    ("state", 50),
    ("zip_code", 10),
    ("country", 56),
    ("subject", 120),
    ("message", 1000),
    ("comments", 1000),
];

pub fn max_len(field: &str) -> Option<usize> {
    FIELD_LIMITS
        .iter()
        .find(|(name, _)| *name == field)
        .map(|(_, len)| *len)
}

/// Injection payload families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PayloadClass {
    SqlInjection,
    Xss,
}

impl FromStr for PayloadClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sql-injection" | "sqli" | "sql" => Ok(PayloadClass::SqlInjection),
            "xss" => Ok(PayloadClass::Xss),
            other => Err(format!("unknown payload class: {}", other)),
        }
    }
}

impl fmt::Display for PayloadClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadClass::SqlInjection => f.write_str("sql-injection"),
            PayloadClass::Xss => f.write_str("xss"),
        }
    }
}

pub const SQL_INJECTION: &[&str] = &[
    "' OR '1'='1",
    "'; DROP TABLE users; --",
    "' UNION SELECT * FROM users --",
    "admin'--",
    "admin' #",
    "admin'/*",
    "' OR 1=1--",
    "' OR 1=1#",
    "' OR 1=1/*",
    "') OR ('1'='1",
];

pub const XSS: &[&str] = &[
    "<script>alert('XSS')</script>",
    "<img src=x onerror=alert('XSS')>",
    "<svg onload=alert('XSS')>",
    "javascript:alert('XSS')",
    "<iframe src=javascript:alert('XSS')>",
    "<body onload=alert('XSS')>",
    "<input onfocus=alert('XSS') autofocus>",
    "<select onfocus=alert('XSS') autofocus>",
    "<textarea onfocus=alert('XSS') autofocus>",
    "<keygen onfocus=alert('XSS') autofocus>",
];

pub fn adversarial_payloads(class: PayloadClass) -> &'static [&'static str] {
    match class {
        PayloadClass::SqlInjection => SQL_INJECTION,
        PayloadClass::Xss => XSS,
    }
}

/// An address of exactly `len` characters, or as close as the suffix allows.
pub fn email_of_len(len: usize) -> String {
    const DOMAIN: &str = "@example.com";
    let local = len.saturating_sub(DOMAIN.len()).max(1);
    format!("{}{}", "a".repeat(local), DOMAIN)
}

/// Values at and just past the declared limits of `field`.
pub fn boundary_values(field: &str) -> Vec<String> {
    match field {
        "email" => {
            let max = max_len("email").unwrap_or(254);
            vec![
                "a@b.co".to_string(),
                email_of_len(max),
                email_of_len(max + 1),
                "test@".to_string(),
                "@example.com".to_string(),
                "test..test@example.com".to_string(),
            ]
        }
        "password" => {
            let max = max_len("password").unwrap_or(64);
            vec![
                "1234567".to_string(),
                "12345678".to_string(),
                "a".repeat(max),
                "a".repeat(max + 1),
                "password".to_string(),
                "PASSWORD".to_string(),
                "Password1".to_string(),
            ]
        }
        other => {
            let max = max_len(other).unwrap_or(255);
            vec![
                String::new(),
                "a".to_string(),
                "a".repeat(max),
                "a".repeat(max + 1),
            ]
        }
    }
}
