//! Test data: the shared JSON fixture file and random generators

use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use fake::faker::address::en::StreetName;
use fake::faker::address::en::CityName;
use fake::faker::internet::en::{SafeEmail, Username};
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::CellNumber;
use fake::Fake;
use rand::distr::{Alphanumeric, SampleString};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::Result;

pub const DEFAULT_DATA_PATH: &str = "data/test_data.json";

/// A known account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub number: String,
    pub username: String,
    pub password: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl UserRecord {
    /// The account every environment is seeded with
    pub fn builtin_admin() -> Self {
        Self {
            number: "001".to_string(),
            username: "admin".to_string(),
            password: "Lx123456".to_string(),
            name: Some("Administrator".to_string()),
            role: Some("admin".to_string()),
        }
    }
}

/// Credentials of one login case, fields may be deliberately empty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCase {
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

/// Contents of the fixture file. Unknown sections are kept as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestData {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub test_cases: Map<String, JsonValue>,
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl TestData {
    /// Read the fixture file; a missing file gives empty data
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!(path = %path.display(), "Test data file not found");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let data = serde_json::from_str(&content)?;
        info!(path = %path.display(), "Loaded test data");
        Ok(data)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Saved test data");
        Ok(())
    }

    /// `test_cases.login`, keyed by case name (`valid`, `invalid_password`, ...)
    pub fn login_cases(&self) -> BTreeMap<String, LoginCase> {
        self.test_cases
            .get("login")
            .and_then(JsonValue::as_object)
            .map(|cases| {
                cases
                    .iter()
                    .filter_map(|(name, case)| {
                        serde_json::from_value(case.clone()).ok().map(|c| (name.clone(), c))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn login_case(&self, name: &str) -> Option<LoginCase> {
        self.login_cases().remove(name)
    }

    pub fn find_user(&self, username: &str) -> Option<&UserRecord> {
        self.users.iter().find(|u| u.username == username)
    }
}

/// Random ASCII letters and digits
pub fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::rng(), len)
}

/// Random decimal digits, leading zeros allowed
pub fn random_digits(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// A random date within the last `days_back` days
pub fn random_date(days_back: u32) -> NaiveDate {
    let today = Local::now().date_naive();
    let offset = rand::rng().random_range(0..=days_back as i64);
    today - ChronoDuration::days(offset)
}

/// A complete fake account for registration scenarios
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedUser {
    pub number: String,
    pub username: String,
    pub password: String,
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
}

pub fn generate_test_user() -> GeneratedUser {
    let street: String = StreetName().fake();
    let city: String = CityName().fake();
    GeneratedUser {
        number: random_digits(3),
        username: Username().fake(),
        password: format!("Test{}", random_string(6)),
        name: Name().fake(),
        phone: CellNumber().fake(),
        email: SafeEmail().fake(),
        address: format!("{}, {}", street, city),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "users": [{"number": "001", "username": "admin", "password": "Lx123456", "role": "admin"}],
        "test_cases": {
            "login": {
                "valid": {"number": "001", "username": "admin", "password": "Lx123456"},
                "empty_password": {"number": "001", "username": "admin", "password": ""}
            }
        },
        "products": [1, 2]
    }"#;

    #[test]
    fn test_login_cases() {
        let data: TestData = serde_json::from_str(SAMPLE).unwrap();
        let cases = data.login_cases();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases["valid"].username, "admin");
        assert!(data.login_case("empty_password").unwrap().password.is_empty());
        assert!(data.find_user("admin").is_some());
    }

    #[test]
    fn test_save_keeps_unknown_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("data.json");

        let data: TestData = serde_json::from_str(SAMPLE).unwrap();
        data.save(&path).unwrap();

        let reloaded = TestData::load(&path).unwrap();
        assert_eq!(reloaded.users, data.users);
        assert!(reloaded.extra.contains_key("products"));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let data = TestData::load(&dir.path().join("none.json")).unwrap();
        assert!(data.users.is_empty());
    }

    #[test]
    fn test_random_generators() {
        assert_eq!(random_string(8).len(), 8);
        let digits = random_digits(6);
        assert_eq!(digits.len(), 6);
        assert!(digits.chars().all(|c| c.is_ascii_digit()));
        assert!(random_date(30) <= Local::now().date_naive());

        let user = generate_test_user();
        assert!(user.password.starts_with("Test"));
        assert_eq!(user.number.len(), 3);
        assert!(user.email.contains('@'));
    }
}
