//! Per-column value synthesis.
//!
//! Each column value is resolved with a fixed precedence:
//! 1. single-column primary key: sequence (auto-increment) or unique random key
//! 2. foreign key: sampled from the referenced column's generated values
//! 3. nullable: NULL with the configured probability
//! 4. name pattern: realistic value inferred from the column name
//! 5. data type fallback
//!
//! The synthesizer owns a seeded RNG so runs are reproducible.

pub mod patterns;
mod value;

pub use patterns::NamePattern;
pub use value::{escape_string, SqlValue};

use crate::schema::{Column, DataType, Table};
use ahash::AHashSet;
use chrono::{Datelike, NaiveDateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Default probability of emitting NULL for a nullable column
pub const DEFAULT_NULL_PROBABILITY: f64 = 0.1;

/// Upper bound for random integer keys and values
pub const MAX_RANDOM_INT: i64 = 1_000_000;

/// Placeholder range for foreign keys whose target has no rows yet
const PLACEHOLDER_KEY_MAX: i64 = 100;

/// Lookup of previously generated values, used for foreign-key sampling
pub trait ReferenceSource {
    /// Values of `column` over the rows generated so far for `table`
    fn values<'a>(&'a self, table: &str, column: &str) -> Vec<&'a SqlValue>;
}

/// Generates cell values for table rows
#[derive(Debug)]
pub struct Synthesizer {
    rng: StdRng,
    seed: u64,
    null_probability: f64,
    now: NaiveDateTime,
    used_keys: AHashSet<i64>,
}

impl Synthesizer {
    /// Create a synthesizer with the given seed
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed,
            null_probability: DEFAULT_NULL_PROBABILITY,
            now: Utc::now().naive_utc(),
            used_keys: AHashSet::new(),
        }
    }

    /// Create a synthesizer with a random seed
    pub fn from_entropy() -> Self {
        Self::new(rand::random())
    }

    pub fn with_null_probability(mut self, probability: f64) -> Self {
        self.null_probability = probability.clamp(0.0, 1.0);
        self
    }

    /// Fix the reference time used for generated dates
    pub fn with_now(mut self, now: NaiveDateTime) -> Self {
        self.now = now;
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn null_probability(&self) -> f64 {
        self.null_probability
    }

    /// Reset per-table state (the set of random keys already handed out)
    pub fn start_table(&mut self) {
        self.used_keys.clear();
    }

    /// Resolve the value of `column` for row `row_index` of `table`
    pub fn generate_value(
        &mut self,
        column: &Column,
        table: &Table,
        row_index: usize,
        references: &dyn ReferenceSource,
    ) -> SqlValue {
        if table
            .primary_key_column()
            .is_some_and(|pk| pk.eq_ignore_ascii_case(&column.name))
        {
            return if column.auto_increment {
                SqlValue::Int(row_index as i64 + 1)
            } else {
                self.unique_key(column, row_index)
            };
        }

        if let Some(fk) = table.foreign_key_for(&column.name) {
            let candidates = references.values(&fk.referenced_table, &fk.referenced_column);
            if candidates.is_empty() {
                return SqlValue::Int(self.rng.random_range(1..=PLACEHOLDER_KEY_MAX));
            }
            let idx = self.rng.random_range(0..candidates.len());
            return candidates[idx].clone();
        }

        if column.nullable && self.rng.random_bool(self.null_probability) {
            return SqlValue::Null;
        }

        if let Some(pattern) = NamePattern::infer(&column.name, column.data_type) {
            return pattern.generate(&mut self.rng, self.now, column.data_type);
        }

        self.by_data_type(column)
    }

    /// Unique non-sequential key: random integer or UUID string
    fn unique_key(&mut self, column: &Column, row_index: usize) -> SqlValue {
        if column.data_type == DataType::String {
            return SqlValue::String(
                uuid::Builder::from_random_bytes(self.rng.random())
                    .into_uuid()
                    .to_string(),
            );
        }
        if self.used_keys.len() as i64 >= MAX_RANDOM_INT {
            return SqlValue::Int(row_index as i64 + 1);
        }
        loop {
            let key = self.rng.random_range(1..=MAX_RANDOM_INT);
            if self.used_keys.insert(key) {
                return SqlValue::Int(key);
            }
        }
    }

    /// Fallback value from the column's category and declared type
    fn by_data_type(&mut self, column: &Column) -> SqlValue {
        match column.data_type {
            DataType::Integer => {
                let (min, max) = integer_bounds(&column.sql_type, column.unsigned);
                SqlValue::Int(self.rng.random_range(min..=max.min(MAX_RANDOM_INT)))
            }
            DataType::String => SqlValue::String(self.sized_text(column.declared_length())),
            DataType::Datetime => self.temporal(&column.sql_type),
            DataType::Decimal => SqlValue::Float(patterns::amount(&mut self.rng)),
            DataType::Boolean => SqlValue::Bool(self.rng.random_bool(0.5)),
            DataType::Json => {
                let key1 = patterns::word(&mut self.rng);
                let key2 = self.rng.random_range(0..=MAX_RANDOM_INT);
                let key3 = self.rng.random_bool(0.5);
                let object = serde_json::json!({ "key1": key1, "key2": key2, "key3": key3 });
                SqlValue::String(object.to_string())
            }
            DataType::Enum => {
                if column.enum_values.is_empty() {
                    SqlValue::String(format!("option{}", self.rng.random_range(1..=5)))
                } else {
                    let idx = self.rng.random_range(0..column.enum_values.len());
                    SqlValue::String(column.enum_values[idx].clone())
                }
            }
            DataType::Binary => SqlValue::String(patterns::word(&mut self.rng)),
        }
    }

    /// Text tiered by declared length; 0 or missing counts as 255
    fn sized_text(&mut self, declared: Option<usize>) -> String {
        let max_len = declared.filter(|&n| n > 0).unwrap_or(255);
        let text = if max_len <= 10 {
            patterns::alphanumeric(&mut self.rng, max_len)
        } else if max_len <= 50 {
            patterns::word(&mut self.rng)
        } else if max_len <= 255 {
            patterns::sentence(&mut self.rng)
        } else {
            patterns::paragraphs(&mut self.rng)
        };
        truncate_chars(text, max_len)
    }

    fn temporal(&mut self, sql_type: &str) -> SqlValue {
        let moment = patterns::recent_datetime(&mut self.rng, self.now);
        match sql_type {
            "DATE" => SqlValue::Date(moment.date()),
            "TIME" | "TIMETZ" => SqlValue::String(moment.format("%H:%M:%S").to_string()),
            "YEAR" => SqlValue::Int(moment.year() as i64),
            _ => SqlValue::Timestamp(moment),
        }
    }
}

/// Value range of an integer type, before the random-value cap
fn integer_bounds(sql_type: &str, unsigned: bool) -> (i64, i64) {
    let bits = match sql_type {
        "TINYINT" => 8,
        "SMALLINT" | "INT2" | "SMALLSERIAL" => 16,
        "MEDIUMINT" => 24,
        _ => 32,
    };
    if unsigned {
        (0, (1i64 << bits) - 1)
    } else {
        (-(1i64 << (bits - 1)), (1i64 << (bits - 1)) - 1)
    }
}

fn truncate_chars(text: String, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        text
    } else {
        text.chars().take(max_len).collect::<String>().trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoReferences;

    impl ReferenceSource for NoReferences {
        fn values<'a>(&'a self, _table: &str, _column: &str) -> Vec<&'a SqlValue> {
            Vec::new()
        }
    }

    #[test]
    fn test_integer_bounds() {
        assert_eq!(integer_bounds("TINYINT", true), (0, 255));
        assert_eq!(integer_bounds("INT", false), (-2147483648, 2147483647));
    }

    #[test]
    fn test_short_string_uses_declared_length() {
        let mut table = Table::new("t");
        let mut code = Column::new("code", "CHAR");
        code.size = Some("3".to_string());
        code.nullable = false;
        table.columns.push(code.clone());

        let mut synth = Synthesizer::new(7);
        match synth.generate_value(&code, &table, 0, &NoReferences) {
            SqlValue::String(s) => assert_eq!(s.chars().count(), 3),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_same_seed_same_values() {
        let mut table = Table::new("t");
        let mut note = Column::new("note", "VARCHAR");
        note.size = Some("100".to_string());
        table.columns.push(note.clone());

        let mut a = Synthesizer::new(42);
        let mut b = Synthesizer::new(42);
        for i in 0..5 {
            assert_eq!(
                a.generate_value(&note, &table, i, &NoReferences),
                b.generate_value(&note, &table, i, &NoReferences)
            );
        }
    }
}
