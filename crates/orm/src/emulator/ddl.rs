//! DDL parsing for the emulator
//!
//! Understands the statement forms the schema updates emit. Statements are
//! tokenized with `sqlparser` and then read by a small recursive-descent
//! parser, since the generic SQL parser does not know Spanner's interleaving
//! clauses.

use sqlparser::dialect::GenericDialect;
use sqlparser::tokenizer::{Token, Tokenizer};

use crate::error::{OrmError, OrmResult};
use crate::field::{Field, FieldType};
use crate::index::Index;

/// A parsed DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStatement {
    CreateTable {
        table: String,
        fields: Vec<Field>,
        primary_keys: Vec<String>,
        parent: Option<String>,
    },
    DropTable {
        table: String,
    },
    AddColumn {
        table: String,
        field: Field,
    },
    DropColumn {
        table: String,
        column: String,
    },
    AlterColumn {
        table: String,
        field: Field,
    },
    CreateIndex {
        table: String,
        index: Index,
    },
    DropIndex {
        index: String,
    },
}

/// Parse a single DDL statement
pub fn parse(sql: &str) -> OrmResult<DdlStatement> {
    let dialect = GenericDialect {};
    let tokens = Tokenizer::new(&dialect, sql)
        .tokenize()
        .map_err(|e| invalid(format!("{}", e)))?
        .into_iter()
        .filter(|token| !matches!(token, Token::Whitespace(_)))
        .collect();

    let mut parser = DdlParser {
        tokens,
        position: 0,
    };
    let statement = parser.statement()?;
    parser.expect_end()?;
    Ok(statement)
}

fn invalid(message: impl Into<String>) -> OrmError {
    OrmError::admin(format!("Invalid DDL statement: {}", message.into()))
}

struct DdlParser {
    tokens: Vec<Token>,
    position: usize,
}

impl DdlParser {
    fn statement(&mut self) -> OrmResult<DdlStatement> {
        if self.keyword("CREATE") {
            self.create()
        } else if self.keyword("DROP") {
            if self.keyword("TABLE") {
                Ok(DdlStatement::DropTable {
                    table: self.identifier()?,
                })
            } else {
                self.expect_keyword("INDEX")?;
                Ok(DdlStatement::DropIndex {
                    index: self.identifier()?,
                })
            }
        } else if self.keyword("ALTER") {
            self.expect_keyword("TABLE")?;
            self.alter_table()
        } else {
            Err(self.unexpected("CREATE, DROP or ALTER"))
        }
    }

    fn create(&mut self) -> OrmResult<DdlStatement> {
        let unique = self.keyword("UNIQUE");
        let null_filtered = self.keyword("NULL_FILTERED");

        if !unique && !null_filtered && self.keyword("TABLE") {
            return self.create_table();
        }

        self.expect_keyword("INDEX")?;
        let name = self.identifier()?;
        self.expect_keyword("ON")?;
        let table = self.identifier()?;
        let columns = self.identifier_list()?;

        let mut index = Index::new(name, columns)
            .unique(unique)
            .null_filtered(null_filtered);
        if self.keyword("STORING") {
            index = index.storing(self.identifier_list()?);
        }
        if self.consume(&Token::Comma) {
            self.expect_keyword("INTERLEAVE")?;
            self.expect_keyword("IN")?;
            index = index.interleave_in(self.identifier()?);
        }

        Ok(DdlStatement::CreateIndex { table, index })
    }

    fn create_table(&mut self) -> OrmResult<DdlStatement> {
        let table = self.identifier()?;

        self.expect(&Token::LParen)?;
        let mut fields = Vec::new();
        if !self.consume(&Token::RParen) {
            loop {
                let name = self.identifier()?;
                fields.push(self.column_definition(name)?);
                if self.consume(&Token::RParen) {
                    break;
                }
                self.expect(&Token::Comma)?;
            }
        }

        self.expect_keyword("PRIMARY")?;
        self.expect_keyword("KEY")?;
        let primary_keys = self.identifier_list()?;
        for field in fields.iter_mut() {
            field.primary_key = primary_keys.contains(&field.name);
        }

        let mut parent = None;
        if self.consume(&Token::Comma) {
            self.expect_keyword("INTERLEAVE")?;
            self.expect_keyword("IN")?;
            self.expect_keyword("PARENT")?;
            parent = Some(self.identifier()?);
            if self.keyword("ON") {
                self.expect_keyword("DELETE")?;
                if !self.keyword("CASCADE") {
                    self.expect_keyword("NO")?;
                    self.expect_keyword("ACTION")?;
                }
            }
        }

        Ok(DdlStatement::CreateTable {
            table,
            fields,
            primary_keys,
            parent,
        })
    }

    fn alter_table(&mut self) -> OrmResult<DdlStatement> {
        let table = self.identifier()?;

        if self.keyword("ADD") {
            self.expect_keyword("COLUMN")?;
            let name = self.identifier()?;
            let field = self.column_definition(name)?;
            Ok(DdlStatement::AddColumn { table, field })
        } else if self.keyword("DROP") {
            self.expect_keyword("COLUMN")?;
            let column = self.identifier()?;
            Ok(DdlStatement::DropColumn { table, column })
        } else {
            self.expect_keyword("ALTER")?;
            self.expect_keyword("COLUMN")?;
            let name = self.identifier()?;
            let field = self.column_definition(name)?;
            Ok(DdlStatement::AlterColumn { table, field })
        }
    }

    /// `<type> [NOT NULL] [OPTIONS (allow_commit_timestamp=true)]`
    fn column_definition(&mut self, name: String) -> OrmResult<Field> {
        let field_type = self.field_type()?;
        let mut field = Field::new(name, field_type).nullable(true);

        if self.keyword("NOT") {
            self.expect_keyword("NULL")?;
            field.nullable = false;
        }

        if self.keyword("OPTIONS") {
            self.expect(&Token::LParen)?;
            self.expect_keyword("allow_commit_timestamp")?;
            self.expect(&Token::Eq)?;
            field.allow_commit_timestamp = if self.keyword("true") {
                true
            } else {
                self.expect_keyword("null")?;
                false
            };
            self.expect(&Token::RParen)?;
        }
        Ok(field)
    }

    fn field_type(&mut self) -> OrmResult<FieldType> {
        let name = self.identifier()?.to_ascii_uppercase();
        let field_type = match name.as_str() {
            "BOOL" => FieldType::Boolean,
            "INT64" => FieldType::Integer,
            "FLOAT64" => FieldType::Float,
            "TIMESTAMP" => FieldType::Timestamp,
            "DATE" => FieldType::Date,
            "STRING" => FieldType::String {
                length: self.length()?,
            },
            "BYTES" => FieldType::Bytes {
                length: self.length()?,
            },
            "ARRAY" => {
                self.expect(&Token::Lt)?;
                self.expect_keyword("STRING")?;
                let length = self.length()?;
                self.expect(&Token::Gt)?;
                FieldType::StringArray { length }
            }
            other => return Err(invalid(format!("unsupported column type {}", other))),
        };
        Ok(field_type)
    }

    /// `(MAX)` or `(<n>)`
    fn length(&mut self) -> OrmResult<Option<u32>> {
        self.expect(&Token::LParen)?;
        let length = match self.next() {
            Some(Token::Word(word)) if word.value.eq_ignore_ascii_case("MAX") => None,
            Some(Token::Number(number, _)) => Some(
                number
                    .parse()
                    .map_err(|_| invalid(format!("invalid length {}", number)))?,
            ),
            other => return Err(invalid(format!("expected length, found {:?}", other))),
        };
        self.expect(&Token::RParen)?;
        Ok(length)
    }

    fn identifier_list(&mut self) -> OrmResult<Vec<String>> {
        self.expect(&Token::LParen)?;
        let mut identifiers = Vec::new();
        if self.consume(&Token::RParen) {
            return Ok(identifiers);
        }
        loop {
            identifiers.push(self.identifier()?);
            if self.consume(&Token::RParen) {
                return Ok(identifiers);
            }
            self.expect(&Token::Comma)?;
        }
    }

    fn identifier(&mut self) -> OrmResult<String> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word.value),
            other => Err(invalid(format!("expected identifier, found {:?}", other))),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    /// Consume the keyword if it is next
    fn keyword(&mut self, keyword: &str) -> bool {
        match self.peek() {
            Some(Token::Word(word))
                if word.quote_style.is_none() && word.value.eq_ignore_ascii_case(keyword) =>
            {
                self.position += 1;
                true
            }
            _ => false,
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> OrmResult<()> {
        if self.keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(keyword))
        }
    }

    fn consume(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: &Token) -> OrmResult<()> {
        if self.consume(token) {
            Ok(())
        } else {
            Err(self.unexpected(&token.to_string()))
        }
    }

    fn expect_end(&mut self) -> OrmResult<()> {
        self.consume(&Token::SemiColon);
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of statement")),
        }
    }

    fn unexpected(&self, expected: &str) -> OrmError {
        match self.peek() {
            Some(token) => invalid(format!("expected {}, found {}", expected, token)),
            None => invalid(format!("expected {}, found end of statement", expected)),
        }
    }
}
