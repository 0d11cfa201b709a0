//! DDL parsing for schema extraction.
//!
//! Parses CREATE TABLE statements (plus ALTER TABLE ... ADD and CREATE INDEX)
//! to extract:
//! - Column definitions with types and modifiers
//! - Primary key, foreign key, unique and check constraints
//! - Indexes
//!
//! Statements other than these are skipped. A CREATE TABLE statement that does
//! not follow the grammar is reported as a parse error with its position.

use super::lexer::{fold_unquoted, join_tokens, tokenize, Token, TokenKind};
use super::{
    Column, Constraint, ConstraintKind, DataType, Dialect, ForeignKey, IndexDef, Schema, Table,
};
use crate::error::{Error, Result};
use crate::input;
use std::path::Path;
use tracing::debug;

/// Parse schema text in the named dialect (`mysql`, `mariadb`, `postgres`,
/// `postgresql`, `sqlite`).
pub fn parse(text: &str, dialect: &str) -> Result<Schema> {
    let dialect: Dialect = dialect.parse()?;
    SchemaParser::new(dialect).parse(text)
}

/// Read and parse a schema file. Compressed files are decompressed by extension.
pub fn parse_file(path: &Path, dialect: &str) -> Result<Schema> {
    let dialect: Dialect = dialect.parse()?;
    let text = input::read_to_string(path)?;
    SchemaParser::new(dialect).parse(&text)
}

/// Recursive-descent parser over a restricted CREATE TABLE grammar
#[derive(Debug, Clone, Copy)]
pub struct SchemaParser {
    dialect: Dialect,
}

impl SchemaParser {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Parse all supported statements in `text` into a schema
    pub fn parse(&self, text: &str) -> Result<Schema> {
        let mut tokens = tokenize(text)?;
        if self.dialect.folds_unquoted_identifiers() {
            fold_unquoted(&mut tokens);
        }
        let mut cursor = Cursor::new(&tokens);
        let mut tables: Vec<Table> = Vec::new();

        while !cursor.at_end() {
            if cursor.eat(&TokenKind::Semicolon) {
                continue;
            }
            if cursor.peek_keyword("CREATE") {
                self.parse_create(&mut cursor, &mut tables)?;
            } else if cursor.peek_keyword("ALTER") {
                self.parse_alter(&mut cursor, &mut tables)?;
            } else {
                cursor.skip_statement();
            }
        }

        resolve_implicit_references(&mut tables);
        debug!(tables = tables.len(), dialect = %self.dialect, "parsed schema");
        Ok(Schema::new(self.dialect, tables))
    }

    fn parse_create(&self, cursor: &mut Cursor<'_>, tables: &mut Vec<Table>) -> Result<()> {
        cursor.next(); // CREATE
        cursor.eat_keywords(&["OR", "REPLACE"]);
        let _ = cursor.eat_keyword("TEMPORARY")
            || cursor.eat_keyword("TEMP")
            || cursor.eat_keyword("UNLOGGED");

        if cursor.eat_keyword("TABLE") {
            return self.parse_create_table(cursor, tables);
        }

        let unique = cursor.eat_keyword("UNIQUE");
        if cursor.eat_keyword("INDEX") {
            let stmt = cursor.statement_tokens();
            parse_create_index(stmt, unique, tables);
        } else {
            cursor.skip_statement();
        }
        Ok(())
    }

    fn parse_create_table(&self, cursor: &mut Cursor<'_>, tables: &mut Vec<Table>) -> Result<()> {
        cursor.eat_keywords(&["IF", "NOT", "EXISTS"]);
        let name = cursor.qualified_name("table name")?;

        if !cursor.peek_is(&TokenKind::LParen) {
            if cursor.peek_keyword("AS") || cursor.peek_keyword("LIKE") {
                // CREATE TABLE ... AS SELECT / LIKE: no column list to model
                cursor.skip_statement();
                return Ok(());
            }
            return Err(cursor.error_here(format!("expected '(' after table name `{}`", name)));
        }

        let items = cursor.paren_items(&format!("column list of table `{}`", name))?;
        // Table options (ENGINE=..., DEFAULT CHARSET=..., WITH (...)) up to ';'
        cursor.skip_statement();

        let mut table = Table::new(name);
        for item in items {
            if item.is_empty() {
                continue;
            }
            self.parse_table_item(item, &mut table)?;
        }

        for pk in table.primary_key.clone() {
            table.add_primary_key(&pk);
        }

        if tables.iter().any(|t| t.name.eq_ignore_ascii_case(&table.name)) {
            debug!(table = %table.name, "duplicate CREATE TABLE ignored");
            return Ok(());
        }
        tables.push(table);
        Ok(())
    }

    fn parse_alter(&self, cursor: &mut Cursor<'_>, tables: &mut [Table]) -> Result<()> {
        let stmt = cursor.statement_tokens();
        let mut c = Cursor::new(stmt);
        c.next(); // ALTER
        if !c.eat_keyword("TABLE") {
            return Ok(());
        }
        c.eat_keywords(&["IF", "EXISTS"]);
        c.eat_keyword("ONLY");
        let Ok(name) = c.qualified_name("table name") else {
            return Ok(());
        };
        let Some(table) = tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&name))
        else {
            debug!(table = %name, "ALTER TABLE for unknown table ignored");
            return Ok(());
        };

        for action in split_items(c.rest()) {
            let mut a = Cursor::new(action);
            if !a.eat_keyword("ADD") {
                continue;
            }
            a.eat_keyword("COLUMN");
            a.eat_keywords(&["IF", "NOT", "EXISTS"]);
            self.parse_table_item(a.rest(), table)?;
        }
        Ok(())
    }

    /// Classify one comma-separated body item as a constraint clause or a column
    fn parse_table_item(&self, item: &[Token], table: &mut Table) -> Result<()> {
        let mut c = Cursor::new(item);

        let mut constraint_name = None;
        if c.eat_keyword("CONSTRAINT") && !starts_constraint(c.peek()) {
            constraint_name = c.next().and_then(|t| t.ident()).map(str::to_string);
        }

        if c.eat_keywords(&["PRIMARY", "KEY"]) {
            skip_index_options(&mut c);
            for column in c.column_list()? {
                table.add_primary_key(&column);
            }
        } else if c.eat_keywords(&["FOREIGN", "KEY"]) {
            if c.peek().and_then(|t| t.ident()).is_some() {
                c.next(); // MySQL index name
            }
            let columns = c.column_list()?;
            if !c.eat_keyword("REFERENCES") {
                return Err(c.error_here("expected REFERENCES in FOREIGN KEY clause"));
            }
            let referenced_table = c.qualified_name("referenced table")?;
            let referenced_columns = if c.peek_is(&TokenKind::LParen) {
                c.column_list()?
            } else {
                Vec::new()
            };
            for (i, column) in columns.into_iter().enumerate() {
                table.foreign_keys.push(ForeignKey {
                    name: constraint_name.clone(),
                    column,
                    referenced_table: referenced_table.clone(),
                    referenced_column: referenced_columns.get(i).cloned().unwrap_or_default(),
                });
            }
        } else if c.eat_keyword("UNIQUE") {
            let _ = c.eat_keyword("KEY") || c.eat_keyword("INDEX");
            let name = index_name(&mut c).or(constraint_name);
            skip_index_options(&mut c);
            let columns = c.column_list()?;
            if let [single] = columns.as_slice() {
                if let Some(col) = table.column_mut(single) {
                    col.unique = true;
                }
            }
            table.indexes.push(IndexDef {
                name: name.unwrap_or_default(),
                columns,
                unique: true,
            });
        } else if c.eat_keyword("CHECK") {
            let expr = c.paren_group("CHECK expression")?;
            table.constraints.push(Constraint {
                kind: ConstraintKind::Check,
                name: constraint_name,
                definition: join_tokens(expr),
            });
        } else if self.starts_mysql_index(&c) {
            let _ = c.eat_keyword("FULLTEXT") || c.eat_keyword("SPATIAL");
            let _ = c.eat_keyword("KEY") || c.eat_keyword("INDEX");
            let name = index_name(&mut c);
            skip_index_options(&mut c);
            let columns = c.column_list()?;
            table.indexes.push(IndexDef {
                name: name.unwrap_or_default(),
                columns,
                unique: false,
            });
        } else if constraint_name.is_some() {
            debug!(table = %table.name, "unsupported named constraint skipped");
        } else {
            self.parse_column(&mut c, table)?;
        }
        Ok(())
    }

    /// `KEY`/`INDEX`/`FULLTEXT`/`SPATIAL` clauses only exist in the MySQL family;
    /// in PostgreSQL `key` is an ordinary column name.
    fn starts_mysql_index(&self, c: &Cursor<'_>) -> bool {
        if self.dialect == Dialect::Postgres {
            return false;
        }
        ["KEY", "INDEX", "FULLTEXT", "SPATIAL"]
            .iter()
            .any(|kw| c.peek_keyword(kw))
    }

    fn parse_column(&self, c: &mut Cursor<'_>, table: &mut Table) -> Result<()> {
        let name = match c.peek().and_then(|t| t.ident()) {
            Some(name) => name.to_string(),
            None => {
                return Err(c.error_here(format!(
                    "expected column definition in table `{}`",
                    table.name
                )))
            }
        };
        c.next();

        let sql_type = parse_type_name(c);
        let mut column = Column::new(name, sql_type);

        if c.peek_is(&TokenKind::LParen) {
            let args = c.paren_group("type arguments")?;
            column.size = Some(args.iter().map(Token::text).collect::<String>());
            if column.data_type == DataType::Enum {
                column.enum_values = args
                    .iter()
                    .filter_map(|t| match &t.kind {
                        TokenKind::Str(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect();
            }
        }

        if matches!(
            column.sql_type.as_str(),
            "SERIAL" | "BIGSERIAL" | "SMALLSERIAL" | "SERIAL4" | "SERIAL8"
        ) {
            column.auto_increment = true;
            column.nullable = false;
        }

        let mut inline_pk = false;
        let mut reference: Option<(String, String)> = None;

        while let Some(token) = c.peek() {
            if token.kind == TokenKind::LParen {
                c.paren_group("column modifier")?;
                continue;
            }
            c.next();
            let TokenKind::Word(word) = &token.kind else {
                continue;
            };
            match word.to_uppercase().as_str() {
                "NOT" => {
                    if c.eat_keyword("NULL") {
                        column.nullable = false;
                    }
                }
                "NULL" => column.nullable = true,
                "AUTO_INCREMENT" | "AUTOINCREMENT" | "IDENTITY" => column.auto_increment = true,
                "UNSIGNED" => column.unsigned = true,
                "UNIQUE" => {
                    c.eat_keyword("KEY");
                    column.unique = true;
                }
                "PRIMARY" => {
                    c.eat_keyword("KEY");
                    inline_pk = true;
                    column.nullable = false;
                }
                "DEFAULT" => column.default = parse_default(c)?,
                "REFERENCES" => {
                    let referenced_table = c.qualified_name("referenced table")?;
                    let referenced_column = if c.peek_is(&TokenKind::LParen) {
                        c.column_list()?.into_iter().next().unwrap_or_default()
                    } else {
                        String::new()
                    };
                    reference = Some((referenced_table, referenced_column));
                }
                "CHECK" => {
                    let expr = c.paren_group("CHECK expression")?;
                    table.constraints.push(Constraint {
                        kind: ConstraintKind::Check,
                        name: None,
                        definition: join_tokens(expr),
                    });
                }
                "CONSTRAINT" | "COMMENT" | "COLLATE" => {
                    c.next();
                }
                _ => {}
            }
        }

        if inline_pk && self.dialect == Dialect::Sqlite && column.sql_type == "INTEGER" {
            // INTEGER PRIMARY KEY aliases the rowid
            column.auto_increment = true;
        }

        let column_name = column.name.clone();
        table.columns.push(column);
        if inline_pk {
            table.add_primary_key(&column_name);
        }
        if let Some((referenced_table, referenced_column)) = reference {
            table.foreign_keys.push(ForeignKey {
                name: None,
                column: column_name,
                referenced_table,
                referenced_column,
            });
        }
        Ok(())
    }
}

/// Parse `CREATE [UNIQUE] INDEX name ON table (cols)`; the tokens start after INDEX.
/// Index statements for unknown tables or in unsupported shapes are ignored.
fn parse_create_index(stmt: &[Token], unique: bool, tables: &mut [Table]) {
    let mut c = Cursor::new(stmt);
    c.eat_keyword("CONCURRENTLY");
    c.eat_keywords(&["IF", "NOT", "EXISTS"]);
    let name = if c.peek_keyword("ON") {
        String::new()
    } else {
        match c.next().and_then(|t| t.ident()) {
            Some(n) => n.to_string(),
            None => return,
        }
    };
    if !c.eat_keyword("ON") {
        return;
    }
    c.eat_keyword("ONLY");
    let Ok(table_name) = c.qualified_name("table name") else {
        return;
    };
    if c.eat_keyword("USING") {
        c.next();
    }
    let Ok(columns) = c.column_list() else {
        return;
    };
    if let Some(table) = tables
        .iter_mut()
        .find(|t| t.name.eq_ignore_ascii_case(&table_name))
    {
        table.indexes.push(IndexDef {
            name,
            columns,
            unique,
        });
    }
}

/// Base type name, folding multi-word spellings into a single token
fn parse_type_name(c: &mut Cursor<'_>) -> String {
    let Some(TokenKind::Word(word)) = c.peek().map(|t| &t.kind) else {
        // SQLite allows columns without a declared type
        return String::new();
    };
    if is_column_modifier(word) {
        return String::new();
    }
    let base = word.to_uppercase();
    c.next();

    match base.as_str() {
        "DOUBLE" => {
            c.eat_keyword("PRECISION");
            base
        }
        "CHARACTER" | "CHAR" if c.eat_keyword("VARYING") => "VARCHAR".to_string(),
        "NATIONAL" => {
            let _ = c.eat_keyword("CHARACTER") || c.eat_keyword("CHAR");
            if c.eat_keyword("VARYING") {
                "NVARCHAR".to_string()
            } else {
                "NCHAR".to_string()
            }
        }
        "TIMESTAMP" | "TIME" => {
            if c.eat_keywords(&["WITH", "TIME", "ZONE"]) {
                format!("{}TZ", base)
            } else {
                c.eat_keywords(&["WITHOUT", "TIME", "ZONE"]);
                base
            }
        }
        _ => base,
    }
}

fn is_column_modifier(word: &str) -> bool {
    matches!(
        word.to_uppercase().as_str(),
        "NOT" | "NULL" | "PRIMARY" | "DEFAULT" | "REFERENCES" | "UNIQUE" | "CHECK"
            | "CONSTRAINT" | "AUTOINCREMENT" | "COLLATE" | "GENERATED"
    )
}

/// Default value text with quotes stripped
fn parse_default(c: &mut Cursor<'_>) -> Result<Option<String>> {
    let Some(token) = c.next() else {
        return Ok(None);
    };
    let value = match &token.kind {
        TokenKind::Str(s) => s.clone(),
        TokenKind::Number(n) => n.clone(),
        TokenKind::Quoted(q) => q.clone(),
        TokenKind::Punct(sign @ ('-' | '+')) => match c.peek().map(|t| &t.kind) {
            Some(TokenKind::Number(n)) => {
                let n = n.clone();
                c.next();
                if *sign == '-' {
                    format!("-{}", n)
                } else {
                    n
                }
            }
            _ => sign.to_string(),
        },
        TokenKind::Word(w) => {
            if c.peek_is(&TokenKind::LParen) {
                let args = c.paren_group("default expression")?;
                format!("{}({})", w, join_tokens(args))
            } else {
                w.clone()
            }
        }
        TokenKind::LParen => {
            c.back();
            let expr = c.paren_group("default expression")?;
            join_tokens(expr)
        }
        _ => token.text(),
    };
    Ok(Some(value))
}

fn starts_constraint(token: Option<&Token>) -> bool {
    token.is_some_and(|t| {
        ["PRIMARY", "FOREIGN", "UNIQUE", "CHECK"]
            .iter()
            .any(|kw| t.is_keyword(kw))
    })
}

/// Optional index name before the column list
fn index_name(c: &mut Cursor<'_>) -> Option<String> {
    if c.peek_keyword("USING") {
        return None;
    }
    let name = c.peek().and_then(|t| t.ident())?.to_string();
    c.next();
    Some(name)
}

/// Skip `USING BTREE`, `CLUSTERED` and similar between the clause keyword and its columns
fn skip_index_options(c: &mut Cursor<'_>) {
    loop {
        if c.eat_keyword("USING") {
            c.next();
        } else if !(c.eat_keyword("CLUSTERED") || c.eat_keyword("NONCLUSTERED")) {
            break;
        }
    }
}

/// Fill in referenced columns omitted in `REFERENCES t` with the target's primary key
fn resolve_implicit_references(tables: &mut [Table]) {
    let primary_keys: Vec<(String, Option<String>)> = tables
        .iter()
        .map(|t| (t.name.to_lowercase(), t.primary_key_column().map(str::to_string)))
        .collect();

    for table in tables.iter_mut() {
        for fk in &mut table.foreign_keys {
            if !fk.referenced_column.is_empty() {
                continue;
            }
            let target = fk.referenced_table.to_lowercase();
            fk.referenced_column = primary_keys
                .iter()
                .find(|(name, _)| *name == target)
                .and_then(|(_, pk)| pk.clone())
                .unwrap_or_else(|| "id".to_string());
        }
    }
}

/// Split tokens on commas at parenthesis depth zero
fn split_items(tokens: &[Token]) -> Vec<&[Token]> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                items.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        items.push(&tokens[start..]);
    }
    items
}

/// Position-tracking view over a token slice
struct Cursor<'t> {
    tokens: &'t [Token],
    pos: usize,
}

impl<'t> Cursor<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    fn back(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }

    fn rest(&self) -> &'t [Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    fn peek_is(&self, kind: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == kind)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(keyword))
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek_is(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek_keyword(keyword) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Consume a keyword sequence only if all of it matches
    fn eat_keywords(&mut self, keywords: &[&str]) -> bool {
        let matches = keywords
            .iter()
            .enumerate()
            .all(|(i, kw)| self.tokens.get(self.pos + i).is_some_and(|t| t.is_keyword(kw)));
        if matches {
            self.pos += keywords.len();
        }
        matches
    }

    fn error_here(&self, message: impl Into<String>) -> Error {
        let token = self.peek().or_else(|| self.tokens.last());
        let (line, column) = token.map(|t| (t.line, t.column)).unwrap_or((1, 1));
        Error::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    /// `name` or `schema.name`, returning the last component
    fn qualified_name(&mut self, what: &str) -> Result<String> {
        let mut name = match self.peek().and_then(|t| t.ident()) {
            Some(n) => n.to_string(),
            None => return Err(self.error_here(format!("expected {}", what))),
        };
        self.next();
        while self.peek_is(&TokenKind::Dot) {
            match self.tokens.get(self.pos + 1).and_then(|t| t.ident()) {
                Some(part) => {
                    name = part.to_string();
                    self.pos += 2;
                }
                None => break,
            }
        }
        Ok(name)
    }

    /// Index of the parenthesis matching the `(` at the current position
    fn matching_paren(&self) -> Option<usize> {
        let mut depth = 0usize;
        for (offset, token) in self.tokens[self.pos..].iter().enumerate() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.pos + offset);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Consume `( ... )` and return the inner tokens
    fn paren_group(&mut self, what: &str) -> Result<&'t [Token]> {
        if !self.peek_is(&TokenKind::LParen) {
            return Err(self.error_here(format!("expected '(' to open {}", what)));
        }
        let Some(end) = self.matching_paren() else {
            return Err(self.error_here(format!("unterminated {}", what)));
        };
        let inner = &self.tokens[self.pos + 1..end];
        self.pos = end + 1;
        Ok(inner)
    }

    /// Consume `( a, b, ... )` and return the comma-separated items
    fn paren_items(&mut self, what: &str) -> Result<Vec<&'t [Token]>> {
        let inner = self.paren_group(what)?;
        Ok(split_items(inner))
    }

    /// `(col [ (len) ] [ASC|DESC], ...)` → column names; expression items are skipped
    fn column_list(&mut self) -> Result<Vec<String>> {
        let items = self.paren_items("column list")?;
        Ok(items
            .into_iter()
            .filter_map(|item| item.first().and_then(|t| t.ident()).map(str::to_string))
            .collect())
    }

    /// Tokens up to the next top-level `;` (exclusive); the `;` is consumed
    fn statement_tokens(&mut self) -> &'t [Token] {
        let start = self.pos.min(self.tokens.len());
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::Semicolon if depth == 0 => {
                    let stmt = &self.tokens[start..self.pos];
                    self.pos += 1;
                    return stmt;
                }
                _ => {}
            }
            self.pos += 1;
        }
        &self.tokens[start..]
    }

    fn skip_statement(&mut self) {
        self.statement_tokens();
    }
}
