//! Unit tests for per-column value synthesis.

use ahash::AHashSet;
use chrono::NaiveDate;
use sql_testbed::schema::{Column, DataType, Dialect, ForeignKey, Table};
use sql_testbed::synth::{NamePattern, ReferenceSource, SqlValue, Synthesizer};

/// References served from a fixed list of (table, column, values)
struct FixedReferences(Vec<(&'static str, &'static str, Vec<SqlValue>)>);

impl ReferenceSource for FixedReferences {
    fn values<'a>(&'a self, table: &str, column: &str) -> Vec<&'a SqlValue> {
        self.0
            .iter()
            .filter(|(t, c, _)| *t == table && *c == column)
            .flat_map(|(_, _, values)| values.iter())
            .collect()
    }
}

fn no_refs() -> FixedReferences {
    FixedReferences(Vec::new())
}

fn not_null(name: &str, sql_type: &str) -> Column {
    let mut column = Column::new(name, sql_type);
    column.nullable = false;
    column
}

fn table_with(name: &str, columns: Vec<Column>, pk: &[&str]) -> Table {
    let mut table = Table::new(name);
    table.columns = columns;
    table.primary_key = pk.iter().map(|s| s.to_string()).collect();
    table
}

mod key_tests {
    use super::*;

    #[test]
    fn test_auto_increment_pk_is_sequential() {
        let mut id = not_null("id", "INT");
        id.auto_increment = true;
        let table = table_with("users", vec![id.clone()], &["id"]);
        let mut synth = Synthesizer::new(1);
        let values: Vec<SqlValue> = (0..5)
            .map(|i| synth.generate_value(&id, &table, i, &no_refs()))
            .collect();
        assert_eq!(values, (1..=5).map(SqlValue::Int).collect::<Vec<_>>());
    }

    #[test]
    fn test_random_integer_pk_is_unique_per_table() {
        let id = not_null("id", "BIGINT");
        let table = table_with("events", vec![id.clone()], &["id"]);
        let mut synth = Synthesizer::new(9);
        let mut seen = AHashSet::new();
        for i in 0..2000 {
            match synth.generate_value(&id, &table, i, &no_refs()) {
                SqlValue::Int(n) => {
                    assert!((1..=1_000_000).contains(&n));
                    assert!(seen.insert(n), "duplicate key {}", n);
                }
                other => panic!("unexpected key {:?}", other),
            }
        }
    }

    #[test]
    fn test_string_pk_is_uuid() {
        let id = not_null("id", "CHAR");
        let table = table_with("sessions", vec![id.clone()], &["id"]);
        let mut synth = Synthesizer::new(3);
        let SqlValue::String(key) = synth.generate_value(&id, &table, 0, &no_refs()) else {
            panic!("expected a string key");
        };
        assert!(uuid::Uuid::parse_str(&key).is_ok());
    }

    #[test]
    fn test_composite_key_columns_are_not_sequences() {
        let a = not_null("order_id", "INT");
        let b = not_null("line_no", "INT");
        let table = table_with("lines", vec![a.clone(), b.clone()], &["order_id", "line_no"]);
        let mut synth = Synthesizer::new(5);
        // falls through to the integer fallback instead of row_index + 1
        let values: Vec<SqlValue> = (0..20)
            .map(|i| synth.generate_value(&b, &table, i, &no_refs()))
            .collect();
        assert_ne!(values, (1..=20).map(SqlValue::Int).collect::<Vec<_>>());
    }
}

mod foreign_key_tests {
    use super::*;

    fn orders_table() -> (Table, Column) {
        let user_id = not_null("user_id", "INT");
        let mut table = table_with("orders", vec![user_id.clone()], &[]);
        table.foreign_keys.push(ForeignKey {
            name: None,
            column: "user_id".to_string(),
            referenced_table: "users".to_string(),
            referenced_column: "id".to_string(),
        });
        (table, user_id)
    }

    #[test]
    fn test_fk_samples_referenced_values() {
        let (table, user_id) = orders_table();
        let refs = FixedReferences(vec![(
            "users",
            "id",
            vec![SqlValue::Int(10), SqlValue::Int(20), SqlValue::Int(30)],
        )]);
        let mut synth = Synthesizer::new(11);
        for i in 0..100 {
            let value = synth.generate_value(&user_id, &table, i, &refs);
            assert!(
                matches!(value, SqlValue::Int(10 | 20 | 30)),
                "unexpected {:?}",
                value
            );
        }
    }

    #[test]
    fn test_fk_without_rows_uses_placeholder() {
        let (table, user_id) = orders_table();
        let mut synth = Synthesizer::new(12);
        for i in 0..100 {
            match synth.generate_value(&user_id, &table, i, &no_refs()) {
                SqlValue::Int(n) => assert!((1..=100).contains(&n)),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_nullable_fk_is_never_null() {
        let (mut table, _) = orders_table();
        let user_id = Column::new("user_id", "INT");
        table.columns = vec![user_id.clone()];
        let mut synth = Synthesizer::new(13).with_null_probability(1.0);
        assert!(!synth.generate_value(&user_id, &table, 0, &no_refs()).is_null());
    }
}

mod fallback_tests {
    use super::*;

    fn value_of(column: &Column, seed: u64) -> SqlValue {
        let table = table_with("t", vec![column.clone()], &[]);
        Synthesizer::new(seed).generate_value(column, &table, 0, &no_refs())
    }

    #[test]
    fn test_null_probability_extremes() {
        let column = Column::new("note", "TEXT");
        let table = table_with("t", vec![column.clone()], &[]);
        let mut always = Synthesizer::new(1).with_null_probability(1.0);
        let mut never = Synthesizer::new(1).with_null_probability(0.0);
        for i in 0..50 {
            assert!(always.generate_value(&column, &table, i, &no_refs()).is_null());
            assert!(!never.generate_value(&column, &table, i, &no_refs()).is_null());
        }
    }

    #[test]
    fn test_tinyint_unsigned_range() {
        let mut column = not_null("level", "TINYINT");
        column.unsigned = true;
        for seed in 0..50 {
            match value_of(&column, seed) {
                SqlValue::Int(n) => assert!((0..=255).contains(&n)),
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_string_tiers_respect_declared_size() {
        for (size, max) in [("8", 8usize), ("40", 40), ("120", 120)] {
            let mut column = not_null("remark", "VARCHAR");
            column.size = Some(size.to_string());
            for seed in 0..20 {
                let SqlValue::String(s) = value_of(&column, seed) else {
                    panic!("expected a string");
                };
                assert!(s.chars().count() <= max, "{:?} longer than {}", s, max);
            }
        }
    }

    #[test]
    fn test_temporal_types() {
        assert!(matches!(value_of(&not_null("d", "DATE"), 1), SqlValue::Date(_)));
        assert!(matches!(value_of(&not_null("ts", "DATETIME"), 1), SqlValue::Timestamp(_)));
        let SqlValue::String(time) = value_of(&not_null("t", "TIME"), 1) else {
            panic!("expected a time string");
        };
        assert_eq!(time.len(), 8);
        assert!(matches!(value_of(&not_null("y", "YEAR"), 1), SqlValue::Int(_)));
    }

    #[test]
    fn test_recent_datetime_window() {
        let now = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let column = not_null("seen_at", "TIMESTAMP");
        let table = table_with("t", vec![column.clone()], &[]);
        let mut synth = Synthesizer::new(4).with_now(now);
        for i in 0..50 {
            let value = synth.generate_value(&column, &table, i, &no_refs());
            let SqlValue::Timestamp(ts) = value else {
                panic!("expected a timestamp");
            };
            assert!(ts <= now);
            assert!(now - ts <= chrono::TimeDelta::days(30));
        }
    }

    #[test]
    fn test_decimal_json_enum_boolean() {
        let SqlValue::Float(amount) = value_of(&not_null("weight", "DECIMAL"), 2) else {
            panic!("expected a float");
        };
        assert!((0.0..=1000.0).contains(&amount));

        let SqlValue::String(json) = value_of(&not_null("settings", "JSON"), 2) else {
            panic!("expected a json string");
        };
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(parsed.get("key1").is_some());
        assert!(parsed.get("key2").is_some());
        assert!(parsed.get("key3").is_some());

        let mut level = not_null("level", "ENUM");
        level.enum_values = vec!["low".to_string(), "high".to_string()];
        let SqlValue::String(choice) = value_of(&level, 2) else {
            panic!("expected an enum string");
        };
        assert!(choice == "low" || choice == "high");

        let SqlValue::String(option) = value_of(&not_null("mode", "ENUM"), 2) else {
            panic!("expected an enum string");
        };
        assert!(option.starts_with("option"));

        assert!(matches!(value_of(&not_null("active", "BOOLEAN"), 2), SqlValue::Bool(_)));
    }

    #[test]
    fn test_name_patterns_produce_plausible_values() {
        let SqlValue::String(email) = value_of(&not_null("email", "VARCHAR"), 5) else {
            panic!("expected an email");
        };
        assert!(email.contains('@'));

        let SqlValue::String(ip) = value_of(&not_null("last_login_ip", "VARCHAR"), 5) else {
            panic!("expected an ip");
        };
        assert_eq!(ip.split('.').count(), 4);

        assert!(matches!(
            value_of(&not_null("price", "DECIMAL"), 5),
            SqlValue::Float(p) if p >= 1.0
        ));
        assert!(matches!(value_of(&not_null("birth_date", "DATE"), 5), SqlValue::Date(_)));
    }
}

mod pattern_tests {
    use super::*;

    #[test]
    fn test_inference_table() {
        let cases = [
            ("user_email", DataType::String, Some(NamePattern::Email)),
            ("firstName", DataType::String, Some(NamePattern::FirstName)),
            ("name", DataType::String, Some(NamePattern::FullName)),
            ("mobile", DataType::String, Some(NamePattern::Phone)),
            ("ip_address", DataType::String, Some(NamePattern::IpAddress)),
            ("billing_address", DataType::String, Some(NamePattern::StreetAddress)),
            ("zip", DataType::String, Some(NamePattern::PostalCode)),
            ("dob", DataType::Datetime, Some(NamePattern::BirthDate)),
            ("updated_at", DataType::Datetime, Some(NamePattern::RecentDate)),
            ("balance", DataType::Decimal, Some(NamePattern::Amount)),
            ("account_number", DataType::String, Some(NamePattern::AccountNumber)),
            ("account_id", DataType::Integer, None),
            ("website", DataType::String, Some(NamePattern::Url)),
            ("api_token", DataType::String, Some(NamePattern::Token)),
            ("password_hash", DataType::String, Some(NamePattern::PasswordHash)),
            ("recipe", DataType::String, None),
            ("status", DataType::Enum, None),
        ];
        for (name, data_type, expected) in cases {
            assert_eq!(NamePattern::infer(name, data_type), expected, "column {}", name);
        }
    }
}

mod literal_tests {
    use super::*;

    #[test]
    fn test_sql_literals() {
        assert_eq!(SqlValue::Null.to_sql_literal(Dialect::MySql), "NULL");
        assert_eq!(SqlValue::Int(-4).to_sql_literal(Dialect::MySql), "-4");
        assert_eq!(SqlValue::Float(2.5).to_sql_literal(Dialect::MySql), "2.50");
        assert_eq!(SqlValue::Bool(true).to_sql_literal(Dialect::MySql), "1");
        assert_eq!(SqlValue::Bool(false).to_sql_literal(Dialect::Postgres), "FALSE");
        assert_eq!(
            SqlValue::from("O'Brien").to_sql_literal(Dialect::Sqlite),
            "'O''Brien'"
        );
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(SqlValue::Date(date).to_sql_literal(Dialect::MySql), "'2024-02-29'");
        let ts = date.and_hms_opt(8, 5, 3).unwrap();
        assert_eq!(
            SqlValue::Timestamp(ts).to_sql_literal(Dialect::Postgres),
            "'2024-02-29 08:05:03'"
        );
    }

    #[test]
    fn test_json_serialization() {
        let values = vec![
            SqlValue::Null,
            SqlValue::Int(1),
            SqlValue::from("x"),
            SqlValue::Bool(true),
        ];
        assert_eq!(serde_json::to_string(&values).unwrap(), r#"[null,1,"x",true]"#);
    }
}
