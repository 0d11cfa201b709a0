//! Name-pattern inference and realistic fake values.
//!
//! Column names are split into lowercase words (`created_at` → `created`, `at`;
//! `firstName` → `first`, `name`) and matched against a fixed list of patterns.
//! Matching is on whole words so `description` never matches `ip`.

use super::SqlValue;
use crate::schema::DataType;
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use fake::faker::address::en::{
    BuildingNumber, CityName, CountryName, StateName, StreetName, ZipCode,
};
use fake::faker::company::en::CompanyName;
use fake::faker::currency::en::CurrencyCode;
use fake::faker::internet::en::{DomainSuffix, IPv4, SafeEmail, Username};
use fake::faker::job::en::Title;
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;

const STATUSES: &[&str] = &["active", "inactive", "pending", "completed"];

const TYPES: &[&str] = &["type1", "type2", "type3"];

const CATEGORIES: &[&str] = &[
    "Electronics",
    "Clothing",
    "Home & Garden",
    "Sports",
    "Books",
    "Toys",
    "Grocery",
    "Health",
    "Beauty",
    "Automotive",
    "Office",
    "Music",
    "Movies",
    "Software",
];

const PRODUCT_ADJECTIVES: &[&str] = &[
    "Ergonomic", "Rustic", "Sleek", "Handcrafted", "Practical", "Refined", "Small", "Gorgeous",
    "Incredible", "Licensed", "Tasty", "Intelligent", "Generic", "Fantastic",
];

const PRODUCT_MATERIALS: &[&str] = &[
    "Steel", "Wooden", "Concrete", "Plastic", "Cotton", "Granite", "Rubber", "Metal", "Soft",
    "Fresh", "Frozen",
];

const PRODUCT_NOUNS: &[&str] = &[
    "Chair", "Car", "Computer", "Keyboard", "Mouse", "Bike", "Ball", "Gloves", "Pants", "Shirt",
    "Table", "Shoes", "Hat", "Towels", "Soap", "Tuna", "Chicken", "Fish", "Cheese", "Bacon",
];

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

const HASH_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789$";

/// Realistic value kinds inferred from a column name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePattern {
    Email,
    FullName,
    FirstName,
    LastName,
    Username,
    Phone,
    IpAddress,
    StreetAddress,
    City,
    State,
    Country,
    PostalCode,
    BirthDate,
    RecentDate,
    Price,
    Amount,
    Currency,
    AccountNumber,
    Url,
    Domain,
    Title,
    LongText,
    Comment,
    Status,
    Kind,
    Company,
    JobTitle,
    Product,
    Category,
    Avatar,
    PasswordHash,
    Token,
}

/// Split a column name into lowercase words on `_`, `-`, spaces and camelCase humps
pub fn name_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if c == '_' || c == '-' || c == ' ' || c == '.' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

impl NamePattern {
    /// Infer the pattern for a column name; `None` when nothing matches
    pub fn infer(name: &str, data_type: DataType) -> Option<Self> {
        let words = name_words(name);
        let joined: String = words.concat();
        let has = |w: &str| words.iter().any(|x| x == w);
        let has_any = |ws: &[&str]| ws.iter().any(|w| has(w));

        let pattern = if has_any(&["email", "mail"]) {
            NamePattern::Email
        } else if joined == "name" || joined == "fullname" {
            NamePattern::FullName
        } else if joined == "firstname" || joined == "givenname" {
            NamePattern::FirstName
        } else if joined == "lastname" || joined == "surname" || joined == "familyname" {
            NamePattern::LastName
        } else if joined == "username" || joined == "login" {
            NamePattern::Username
        } else if has_any(&["phone", "mobile", "telephone", "phonenumber"]) {
            NamePattern::Phone
        } else if has("ip") {
            NamePattern::IpAddress
        } else if has_any(&["address", "street"]) {
            NamePattern::StreetAddress
        } else if has("city") {
            NamePattern::City
        } else if has_any(&["state", "province"]) {
            NamePattern::State
        } else if has("country") {
            NamePattern::Country
        } else if has_any(&["zipcode", "zip", "postal", "postcode"]) {
            NamePattern::PostalCode
        } else if has_any(&["birthday", "birthdate", "dob"]) || (has("birth") && has("date")) {
            NamePattern::BirthDate
        } else if has_any(&["created", "updated", "date"]) {
            NamePattern::RecentDate
        } else if has_any(&["price", "cost"]) {
            NamePattern::Price
        } else if has_any(&["amount", "balance"]) {
            NamePattern::Amount
        } else if has("currency") {
            NamePattern::Currency
        } else if has("account") && data_type == DataType::String {
            NamePattern::AccountNumber
        } else if has("url") || joined == "website" {
            NamePattern::Url
        } else if has("domain") {
            NamePattern::Domain
        } else if joined == "title" {
            NamePattern::Title
        } else if has_any(&["description", "content"]) {
            NamePattern::LongText
        } else if has_any(&["comment", "comments"]) {
            NamePattern::Comment
        } else if joined == "status" {
            NamePattern::Status
        } else if joined == "type" {
            NamePattern::Kind
        } else if has("company") {
            NamePattern::Company
        } else if has_any(&["job", "position"]) {
            NamePattern::JobTitle
        } else if has("product") {
            NamePattern::Product
        } else if has("category") {
            NamePattern::Category
        } else if has_any(&["avatar", "image"]) {
            NamePattern::Avatar
        } else if has_any(&["password", "hash"]) {
            NamePattern::PasswordHash
        } else if has_any(&["token", "key"]) {
            NamePattern::Token
        } else {
            return None;
        };

        pattern.fits(data_type).then_some(pattern)
    }

    /// Whether values of this pattern can be stored in a column of `data_type`.
    /// Enum, numeric and boolean columns never take free-text values.
    pub fn fits(&self, data_type: DataType) -> bool {
        match self {
            NamePattern::Price | NamePattern::Amount => matches!(
                data_type,
                DataType::Decimal | DataType::Integer | DataType::String
            ),
            NamePattern::BirthDate | NamePattern::RecentDate => {
                matches!(data_type, DataType::Datetime | DataType::String)
            }
            _ => data_type == DataType::String,
        }
    }

    /// Produce a value for this pattern
    pub fn generate<R: Rng>(
        &self,
        rng: &mut R,
        now: NaiveDateTime,
        data_type: DataType,
    ) -> SqlValue {
        let text = match self {
            NamePattern::Email => SafeEmail().fake_with_rng(rng),
            NamePattern::FullName => Name().fake_with_rng(rng),
            NamePattern::FirstName => FirstName().fake_with_rng(rng),
            NamePattern::LastName => LastName().fake_with_rng(rng),
            NamePattern::Username => Username().fake_with_rng(rng),
            NamePattern::Phone => PhoneNumber().fake_with_rng(rng),
            NamePattern::IpAddress => IPv4().fake_with_rng(rng),
            NamePattern::StreetAddress => {
                let number: String = BuildingNumber().fake_with_rng(rng);
                let street: String = StreetName().fake_with_rng(rng);
                format!("{} {}", number, street)
            }
            NamePattern::City => CityName().fake_with_rng(rng),
            NamePattern::State => StateName().fake_with_rng(rng),
            NamePattern::Country => CountryName().fake_with_rng(rng),
            NamePattern::PostalCode => ZipCode().fake_with_rng(rng),
            NamePattern::BirthDate => return SqlValue::Date(birth_date(rng, now)),
            NamePattern::RecentDate => return SqlValue::Timestamp(recent_datetime(rng, now)),
            NamePattern::Price => return number_value(price(rng), data_type),
            NamePattern::Amount => return number_value(amount(rng), data_type),
            NamePattern::Currency => CurrencyCode().fake_with_rng(rng),
            NamePattern::AccountNumber => digits(rng, 8),
            NamePattern::Url => url(rng),
            NamePattern::Domain => domain(rng),
            NamePattern::Title => Sentence(3..8).fake_with_rng(rng),
            NamePattern::LongText => Paragraph(3..5).fake_with_rng(rng),
            NamePattern::Comment => {
                let count = rng.random_range(2..=4);
                (0..count)
                    .map(|_| Sentence(4..10).fake_with_rng::<String, _>(rng))
                    .collect::<Vec<_>>()
                    .join(" ")
            }
            NamePattern::Status => pick(rng, STATUSES).to_string(),
            NamePattern::Kind => pick(rng, TYPES).to_string(),
            NamePattern::Company => CompanyName().fake_with_rng(rng),
            NamePattern::JobTitle => Title().fake_with_rng(rng),
            NamePattern::Product => product_name(rng),
            NamePattern::Category => pick(rng, CATEGORIES).to_string(),
            NamePattern::Avatar => format!(
                "https://avatars.example.com/{}.jpg",
                alphanumeric(rng, 12).to_lowercase()
            ),
            NamePattern::PasswordHash => from_charset(rng, HASH_CHARS, 60),
            NamePattern::Token => alphanumeric(rng, 32),
        };
        SqlValue::String(text)
    }
}

/// Integer columns get the whole-number part of a money amount
fn number_value(value: f64, data_type: DataType) -> SqlValue {
    match data_type {
        DataType::Integer => SqlValue::Int(value as i64),
        DataType::String => SqlValue::String(format!("{:.2}", value)),
        _ => SqlValue::Float(value),
    }
}

pub fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

fn from_charset<R: Rng>(rng: &mut R, charset: &[u8], len: usize) -> String {
    (0..len)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

pub fn alphanumeric<R: Rng>(rng: &mut R, len: usize) -> String {
    from_charset(rng, ALPHANUMERIC, len)
}

pub fn digits<R: Rng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

pub fn word<R: Rng>(rng: &mut R) -> String {
    Word().fake_with_rng(rng)
}

pub fn sentence<R: Rng>(rng: &mut R) -> String {
    Sentence(4..10).fake_with_rng(rng)
}

pub fn paragraphs<R: Rng>(rng: &mut R) -> String {
    let count = rng.random_range(2..=3);
    (0..count)
        .map(|_| Paragraph(3..6).fake_with_rng::<String, _>(rng))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Two-decimal amount in `0.00..=1000.00`
pub fn amount<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(0..=100_000) as f64 / 100.0
}

fn price<R: Rng>(rng: &mut R) -> f64 {
    rng.random_range(100..=100_000) as f64 / 100.0
}

/// A moment within the 30 days before `now`, at whole-second precision
pub fn recent_datetime<R: Rng>(rng: &mut R, now: NaiveDateTime) -> NaiveDateTime {
    let seconds = rng.random_range(0..30 * 24 * 60 * 60);
    now - TimeDelta::seconds(seconds)
}

/// A birth date for an adult aged 18 to 80
fn birth_date<R: Rng>(rng: &mut R, now: NaiveDateTime) -> NaiveDate {
    let days = rng.random_range(18 * 365..80 * 365);
    now.date() - TimeDelta::days(days)
}

fn domain<R: Rng>(rng: &mut R) -> String {
    let name: String = Word().fake_with_rng(rng);
    let suffix: String = DomainSuffix().fake_with_rng(rng);
    format!("{}.{}", name.to_lowercase(), suffix)
}

fn url<R: Rng>(rng: &mut R) -> String {
    let path: String = Word().fake_with_rng(rng);
    format!("https://{}/{}", domain(rng), path.to_lowercase())
}

fn product_name<R: Rng>(rng: &mut R) -> String {
    format!(
        "{} {} {}",
        pick(rng, PRODUCT_ADJECTIVES),
        pick(rng, PRODUCT_MATERIALS),
        pick(rng, PRODUCT_NOUNS)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_words() {
        assert_eq!(name_words("created_at"), vec!["created", "at"]);
        assert_eq!(name_words("firstName"), vec!["first", "name"]);
        assert_eq!(name_words("IP-Address"), vec!["ip", "address"]);
    }

    #[test]
    fn test_whole_word_matching() {
        assert_eq!(
            NamePattern::infer("description", DataType::String),
            Some(NamePattern::LongText)
        );
        assert_eq!(
            NamePattern::infer("shipping_method", DataType::String),
            None
        );
        assert_eq!(
            NamePattern::infer("client_ip", DataType::String),
            Some(NamePattern::IpAddress)
        );
    }

    #[test]
    fn test_numeric_columns_skip_text_patterns() {
        assert_eq!(NamePattern::infer("status", DataType::Integer), None);
        assert_eq!(
            NamePattern::infer("price", DataType::Decimal),
            Some(NamePattern::Price)
        );
    }
}
