//! Synthetic input records for the suites.
//!
//! Every record is built from a [`StdRng`]. An explicit seed builds a fresh
//! generator per call, so repeated calls with the same seed and kind return the
//! same record. Without a seed the provider's own generator is used; it is seeded
//! once from the run seed so a whole run can be replayed.

pub mod payloads;

use chrono::{Duration, NaiveDate};
use fake::faker::address::en::{BuildingNumber, CityName, CountryName, StateName, StreetName, ZipCode};
use fake::faker::internet::en::{Password, SafeEmail, Username};
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::faker::name::en::{FirstName, LastName};
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Mutex;

pub use payloads::{adversarial_payloads, boundary_values, max_len, PayloadClass, FIELD_LIMITS};

/// Record families the provider can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataKind {
    ValidUser,
    InvalidUser,
    EdgeCase,
    ApiPayload,
    ValidLogin,
    InvalidLogin,
    ContactForm,
    FeedbackForm,
}

impl DataKind {
    pub const ALL: [DataKind; 8] = [
        DataKind::ValidUser,
        DataKind::InvalidUser,
        DataKind::EdgeCase,
        DataKind::ApiPayload,
        DataKind::ValidLogin,
        DataKind::InvalidLogin,
        DataKind::ContactForm,
        DataKind::FeedbackForm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataKind::ValidUser => "valid-user",
            DataKind::InvalidUser => "invalid-user",
            DataKind::EdgeCase => "edge-case",
            DataKind::ApiPayload => "api-payload",
            DataKind::ValidLogin => "valid-login",
            DataKind::InvalidLogin => "invalid-login",
            DataKind::ContactForm => "contact-form",
            DataKind::FeedbackForm => "feedback-form",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| format!("unknown data kind: {}", s))
    }
}

/// One generated record; fields keyed by form field name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataRecord {
    pub kind: DataKind,
    pub fields: BTreeMap<String, String>,
}

impl DataRecord {
    fn new(kind: DataKind) -> Self {
        Self {
            kind,
            fields: BTreeMap::new(),
        }
    }

    fn set(&mut self, field: &str, value: impl Into<String>) {
        self.fields.insert(field.to_string(), value.into());
    }

    /// Set a field, truncated to its declared maximum length.
    fn set_bounded(&mut self, field: &str, value: String) {
        let value = match max_len(field) {
            Some(max) if value.chars().count() > max => value.chars().take(max).collect(),
            _ => value,
        };
        self.set(field, value);
    }

    /// Field value, empty when absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }
}

pub struct DataProvider {
    seed: u64,
    rng: Mutex<StdRng>,
}

impl Default for DataProvider {
    fn default() -> Self {
        Self::new(None)
    }
}

impl DataProvider {
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            seed,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Seed of the provider's own generator.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn generate(&self, kind: DataKind, seed: Option<u64>) -> DataRecord {
        match seed {
            Some(seed) => build(kind, &mut StdRng::seed_from_u64(seed)),
            None => {
                let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
                build(kind, &mut *rng)
            }
        }
    }

    pub fn boundary_values(&self, field: &str) -> Vec<String> {
        boundary_values(field)
    }

    pub fn adversarial(&self, class: PayloadClass) -> &'static [&'static str] {
        adversarial_payloads(class)
    }
}

fn build<R: Rng>(kind: DataKind, rng: &mut R) -> DataRecord {
    match kind {
        DataKind::ValidUser => valid_user(rng),
        DataKind::InvalidUser => invalid_user(rng),
        DataKind::EdgeCase => edge_case(rng),
        DataKind::ApiPayload => api_payload(rng),
        DataKind::ValidLogin => {
            let user = valid_user(rng);
            let mut record = DataRecord::new(kind);
            record.set("email", user.get("email"));
            record.set("password", user.get("password"));
            record
        }
        DataKind::InvalidLogin => {
            let mut record = DataRecord::new(kind);
            let email: String = SafeEmail().fake_with_rng(rng);
            record.set_bounded("email", format!("nonexistent.{}", email));
            record.set("password", format!("wrongpassword{}", rng.gen_range(100..1000)));
            record
        }
        DataKind::ContactForm => {
            let mut record = DataRecord::new(kind);
            let first: String = FirstName().fake_with_rng(rng);
            let last: String = LastName().fake_with_rng(rng);
            record.set_bounded("name", format!("{} {}", first, last));
            record.set_bounded("email", SafeEmail().fake_with_rng(rng));
            record.set_bounded("subject", Sentence(3..7).fake_with_rng(rng));
            record.set_bounded("message", Paragraph(2..4).fake_with_rng(rng));
            record
        }
        DataKind::FeedbackForm => {
            let mut record = DataRecord::new(kind);
            let first: String = FirstName().fake_with_rng(rng);
            record.set_bounded("name", first);
            record.set_bounded("email", SafeEmail().fake_with_rng(rng));
            record.set("rating", rng.gen_range(1..=5).to_string());
            record.set_bounded("comments", Paragraph(1..3).fake_with_rng(rng));
            let category = ["General", "Bug Report", "Feature Request", "Support"]
                .choose(rng)
                .copied()
                .unwrap_or("General");
            record.set("category", category);
            record
        }
    }
}

fn valid_user<R: Rng>(rng: &mut R) -> DataRecord {
    let mut record = DataRecord::new(DataKind::ValidUser);
    let first: String = FirstName().fake_with_rng(rng);
    let last: String = LastName().fake_with_rng(rng);
    let username: String = Username().fake_with_rng(rng);
    let password: String = Password(10..16).fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    let number: String = BuildingNumber().fake_with_rng(rng);

    record.set_bounded("first_name", first);
    record.set_bounded("last_name", last);
    record.set_bounded("email", SafeEmail().fake_with_rng(rng));
    record.set_bounded(
        "username",
        format!("{}{}", username.replace('.', "_"), rng.gen_range(100..1000)),
    );
    // Guarantee every character class common password rules ask for.
    record.set_bounded("password", format!("{}Aa1!", password));
    record.set(
        "phone",
        format!("+1{}", (0..10).map(|_| rng.gen_range(0..10).to_string()).collect::<String>()),
    );
    record.set_bounded("address", format!("{} {}", number, street));
    record.set_bounded("city", CityName().fake_with_rng(rng));
    record.set_bounded("state", StateName().fake_with_rng(rng));
    record.set_bounded("zip_code", ZipCode().fake_with_rng(rng));
    record.set_bounded("country", CountryName().fake_with_rng(rng));
    record.set("date_of_birth", birth_date(rng));
    record
}

/// Birth date for an adult, relative to a fixed epoch so output never depends
/// on the current date.
fn birth_date<R: Rng>(rng: &mut R) -> String {
    let epoch = NaiveDate::from_ymd_opt(1950, 1, 1).unwrap_or_default();
    let date = epoch + Duration::days(rng.gen_range(0..(50 * 365)));
    date.format("%Y-%m-%d").to_string()
}

fn invalid_user<R: Rng>(rng: &mut R) -> DataRecord {
    const EMAILS: [&str; 5] = [
        "invalid-email",
        "user@",
        "@example.com",
        "user@@example.com",
        "user example@test.com",
    ];
    const PASSWORDS: [&str; 4] = ["123", "short", "abc", "password"];

    let mut record = DataRecord::new(DataKind::InvalidUser);
    record.set("first_name", "");
    record.set("last_name", "");
    record.set("email", *EMAILS.choose(rng).unwrap_or(&EMAILS[0]));
    record.set("username", "");
    record.set("password", *PASSWORDS.choose(rng).unwrap_or(&PASSWORDS[0]));
    record.set("phone", "invalid-phone");
    record.set("address", "");
    record.set("city", "");
    record.set("state", "");
    record.set("zip_code", "invalid-zip");
    record.set("country", "");
    record.set("date_of_birth", "invalid-date");
    record
}

fn edge_case<R: Rng>(rng: &mut R) -> DataRecord {
    let mut record = DataRecord::new(DataKind::EdgeCase);
    let max = |field: &str| max_len(field).unwrap_or(255);

    record.set("first_name", "A".repeat(max("first_name")));
    record.set("last_name", "José Müller-Ñúñez 李");
    record.set("email", payloads::email_of_len(max("email")));
    record.set("username", "   ");
    record.set("password", "!@#$%^&*()");
    record.set("phone", "1234567890");
    record.set("address", "!@#$%^&*()_+-=[]{}|;':\",./<>?");
    record.set("city", "");
    record.set("message", "A".repeat(max("message")));
    record.set(
        "sql_injection",
        *payloads::SQL_INJECTION.choose(rng).unwrap_or(&payloads::SQL_INJECTION[0]),
    );
    record.set("xss", *payloads::XSS.choose(rng).unwrap_or(&payloads::XSS[0]));
    record
}

fn api_payload<R: Rng>(rng: &mut R) -> DataRecord {
    let mut record = DataRecord::new(DataKind::ApiPayload);
    let first: String = FirstName().fake_with_rng(rng);
    let email: String = SafeEmail().fake_with_rng(rng);

    let valid = serde_json::json!({
        "name": first,
        "email": email,
        "age": rng.gen_range(18..80),
        "active": true,
    });
    let invalid = serde_json::json!({
        "name": "",
        "email": "not-an-email",
        "age": -5,
        "active": "yes",
    });
    let large = serde_json::json!({ "data": "x".repeat(10_000) });

    record.set("valid_json", valid.to_string());
    record.set("invalid_json", invalid.to_string());
    record.set(
        "malformed_json",
        r#"{"name": "test", "email": "test@example.com",}"#,
    );
    record.set("empty_json", "{}");
    record.set("large_payload", large.to_string());
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_record() {
        let provider = DataProvider::new(None);
        let first = provider.generate(DataKind::ValidUser, Some(1));
        let second = provider.generate(DataKind::ValidUser, Some(1));
        assert_eq!(first, second);

        let other = DataProvider::new(Some(99)).generate(DataKind::ValidUser, Some(1));
        assert_eq!(first, other);
    }

    #[test]
    fn test_edge_case_has_field_at_max_length() {
        let provider = DataProvider::default();
        let record = provider.generate(DataKind::EdgeCase, Some(1));
        let at_max = record.fields.iter().any(|(field, value)| {
            max_len(field).is_some_and(|max| value.chars().count() == max)
        });
        assert!(at_max, "no field at its declared maximum: {:?}", record.fields.keys());
        assert_eq!(record.get("first_name").len(), 50);
        assert_eq!(record.get("email").len(), 254);
    }

    #[test]
    fn test_valid_user_honors_limits() {
        let provider = DataProvider::new(Some(42));
        for _ in 0..20 {
            let record = provider.generate(DataKind::ValidUser, None);
            for (field, value) in &record.fields {
                if let Some(max) = max_len(field) {
                    assert!(value.chars().count() <= max, "{} too long", field);
                }
            }
            assert!(record.get("email").contains('@'));
            assert!(record.get("password").len() >= 8);
        }
    }

    #[test]
    fn test_provider_seed_replays_unseeded_sequence() {
        let a = DataProvider::new(Some(7));
        let b = DataProvider::new(Some(7));
        for kind in DataKind::ALL {
            assert_eq!(a.generate(kind, None), b.generate(kind, None));
        }
    }

    #[test]
    fn test_api_payloads_parse_as_expected() {
        let record = DataProvider::default().generate(DataKind::ApiPayload, Some(3));
        assert!(serde_json::from_str::<serde_json::Value>(record.get("valid_json")).is_ok());
        assert!(serde_json::from_str::<serde_json::Value>(record.get("malformed_json")).is_err());
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("valid_user".parse::<DataKind>().unwrap(), DataKind::ValidUser);
        assert!("premium-user".parse::<DataKind>().is_err());
    }
}
