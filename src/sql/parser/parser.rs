use log::{debug, trace};

use super::ast::{Ast, Condition, Operator, StatementType};
use super::{Keyword, Lexer, Token};
use crate::errparse;
use crate::error::{Error, Result};

/// The SQL parser takes tokens from the lexer and parses a single statement
/// into an Abstract Syntax Tree (AST) by recursive descent, dispatching on the
/// leading statement keyword.
///
/// The parser stops at the first error and returns it, without any error
/// recovery. Error messages name the clause they occurred in, e.g.
/// "at WHERE: condition without operator".
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
}

impl Parser {
    /// Parses the input string into a statement AST. The entire string must
    /// be a single statement.
    pub fn parse(statement: &str) -> Result<Ast> {
        let mut parser = Self::new(statement);
        trace!("parsing {} tokens", parser.tokens.len());
        let ast = parser.parse_statement()?;
        debug!("parsed {} statement on table '{}'", ast.statement_type, ast.table_name);
        Ok(ast)
    }

    /// Parses each statement independently, in order. On the first failure,
    /// returns the error along with the ASTs parsed before it.
    pub fn parse_many<S: AsRef<str>>(
        statements: impl IntoIterator<Item = S>,
    ) -> std::result::Result<Vec<Ast>, BatchError> {
        let mut parsed = Vec::new();
        for statement in statements {
            match Self::parse(statement.as_ref()) {
                Ok(ast) => parsed.push(ast),
                Err(error) => return Err(BatchError { parsed, error }),
            }
        }
        Ok(parsed)
    }

    /// Creates a new parser for the given raw statement.
    fn new(input: &str) -> Self {
        Self { tokens: Lexer::tokenize(input), position: 0 }
    }

    /// Peeks the next token, if any.
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    /// Fetches the next token, if any.
    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned()?;
        self.position += 1;
        Some(token)
    }

    /// Passes the next token through the closure, consuming it if the closure
    /// returns Some. Returns the result of the closure.
    fn next_if_map<T>(&mut self, f: impl Fn(&Token) -> Option<T>) -> Option<T> {
        let value = f(self.peek()?)?;
        self.position += 1;
        Some(value)
    }

    /// Consumes the next token if it is the given token, returning true.
    fn next_is(&mut self, token: Token) -> bool {
        self.next_if_map(|t| (t == &token).then_some(())).is_some()
    }

    /// Returns the next field name, if the next token is one. Unterminated
    /// literals are lexed as words starting with ', and are not field names.
    fn next_field(&mut self) -> Option<String> {
        self.next_if_map(|token| match token {
            Token::Ident(field) if !field.starts_with('\'') => Some(field.clone()),
            _ => None,
        })
    }

    /// Returns the next quoted literal's raw value, if the next token is one.
    fn next_literal(&mut self) -> Option<String> {
        self.next_if_map(|token| match token {
            Token::Literal(value) => Some(value.clone()),
            _ => None,
        })
    }

    /// Returns the next condition operand and whether it's a field reference.
    fn next_operand(&mut self) -> Option<(String, bool)> {
        match self.next_field() {
            Some(field) => Some((field, true)),
            None => self.next_literal().map(|value| (value, false)),
        }
    }

    /// Returns the next comparison operator, if any.
    fn next_operator(&mut self) -> Option<Operator> {
        self.next_if_map(|token| match token {
            Token::Equal => Some(Operator::Eq),
            Token::NotEqual => Some(Operator::Ne),
            Token::LessThan => Some(Operator::Lt),
            Token::LessThanOrEqual => Some(Operator::Lte),
            Token::GreaterThan => Some(Operator::Gt),
            Token::GreaterThanOrEqual => Some(Operator::Gte),
            _ => None,
        })
    }

    /// Returns true if the given token occurs anywhere in the remaining input.
    fn remaining_contains(&self, token: &Token) -> bool {
        self.tokens[self.position..].contains(token)
    }

    /// Parses a quoted table name.
    fn parse_table(&mut self) -> Result<String> {
        self.next_literal().ok_or_else(|| Error::Parse("table name cannot be empty".into()))
    }

    /// Parses a statement, dispatching on its leading keyword.
    fn parse_statement(&mut self) -> Result<Ast> {
        match self.next() {
            Some(Token::Keyword(Keyword::Select)) => self.parse_select(),
            Some(Token::Keyword(Keyword::Update)) => self.parse_update(),
            Some(Token::Keyword(Keyword::Delete)) if self.next_is(Keyword::From.into()) => {
                self.parse_delete()
            }
            Some(Token::Keyword(Keyword::Insert)) if self.next_is(Keyword::Into.into()) => {
                self.parse_insert()
            }
            _ => errparse!("query type cannot be empty"),
        }
    }

    /// Parses a SELECT statement, after the SELECT keyword. Running out of
    /// input anywhere before the table name means there is no table.
    fn parse_select(&mut self) -> Result<Ast> {
        let mut ast = Ast::new(StatementType::Select, "");
        loop {
            if self.peek().is_none() {
                return errparse!("table name cannot be empty");
            }
            let field = match self.next_is(Token::Asterisk) {
                true => "*".to_string(),
                false => match self.next_field() {
                    Some(field) => field,
                    None => return errparse!("at SELECT: expected field to SELECT"),
                },
            };
            if self.next_is(Keyword::As.into()) {
                if self.peek().is_none() {
                    return errparse!("table name cannot be empty");
                }
                match self.next_field() {
                    Some(alias) if field != "*" => {
                        ast.aliases.insert(field.clone(), alias);
                    }
                    _ => {
                        return errparse!(
                            "at SELECT: expected field alias for \"{field} as\" to SELECT"
                        )
                    }
                }
            }
            ast.fields.push(field);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::Keyword(Keyword::From)) => break,
                Some(_) => return errparse!("at SELECT: expected comma or FROM"),
                None => return errparse!("table name cannot be empty"),
            }
        }
        ast.table_name = self.parse_table()?;
        if self.peek().is_some() {
            self.parse_where_keyword()?;
            ast.conditions = self.parse_where_clause()?;
        }
        Ok(ast)
    }

    /// Parses an UPDATE statement, after the UPDATE keyword.
    ///
    /// A missing WHERE keyword is reported before anything else after the
    /// table name, even if the SET clause is malformed too.
    fn parse_update(&mut self) -> Result<Ast> {
        let mut ast = Ast::new(StatementType::Update, self.parse_table()?);
        self.check_where_present()?;
        if !self.next_is(Keyword::Set.into()) {
            return errparse!("at UPDATE: expected 'SET'");
        }
        loop {
            let Some(field) = self.next_field() else {
                return errparse!("at UPDATE: expected at least one field to update");
            };
            if !self.next_is(Token::Equal) {
                return errparse!("at UPDATE: expected '='");
            }
            let Some(value) = self.next_literal() else {
                return errparse!("at UPDATE: expected quoted value");
            };
            ast.set_update(field, value);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::Keyword(Keyword::Where)) => break,
                _ => return errparse!("at UPDATE: expected ','"),
            }
        }
        ast.conditions = self.parse_where_clause()?;
        Ok(ast)
    }

    /// Parses a DELETE statement, after the DELETE FROM keywords.
    fn parse_delete(&mut self) -> Result<Ast> {
        let mut ast = Ast::new(StatementType::Delete, self.parse_table()?);
        self.check_where_present()?;
        self.parse_where_keyword()?;
        ast.conditions = self.parse_where_clause()?;
        Ok(ast)
    }

    /// Parses an INSERT statement, after the INSERT INTO keywords. Any
    /// malformation before the first row is reported as a missing row.
    fn parse_insert(&mut self) -> Result<Ast> {
        let mut ast = Ast::new(StatementType::Insert, self.parse_table()?);
        let no_rows =
            || -> Result<Ast> { errparse!("at INSERT INTO: need at least one row to insert") };

        if !self.next_is(Token::OpenParen) {
            return no_rows();
        }
        let mut field_list =
            self.tokens[self.position..].iter().take_while(|t| **t != Token::CloseParen);
        if field_list.any(|t| *t == Token::Asterisk) {
            return errparse!("at INSERT INTO: expected at least one field to insert");
        }
        loop {
            let Some(field) = self.next_field() else {
                return no_rows();
            };
            ast.fields.push(field);
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::CloseParen) => break,
                _ => return no_rows(),
            }
        }
        if !self.next_is(Keyword::Values.into()) || !self.next_is(Token::OpenParen) {
            return no_rows();
        }

        loop {
            ast.inserts.push(self.parse_insert_row(ast.fields.len())?);
            match self.next() {
                None => return Ok(ast),
                Some(Token::Comma) if self.next_is(Token::OpenParen) => {}
                Some(Token::Comma) => return errparse!("at INSERT INTO: expected opening parens"),
                Some(_) => return errparse!("at INSERT INTO: expected comma"),
            }
        }
    }

    /// Parses an INSERT row of quoted values, after its opening parenthesis.
    /// The row must have one value per field.
    fn parse_insert_row(&mut self, fields: usize) -> Result<Vec<String>> {
        let mut row = Vec::new();
        let closed = loop {
            match self.next() {
                Some(Token::CloseParen) if row.is_empty() => break true,
                Some(Token::Literal(value)) => row.push(value),
                Some(_) => return errparse!("at INSERT INTO: expected quoted value"),
                None => break false,
            }
            match self.next() {
                Some(Token::Comma) => {}
                Some(Token::CloseParen) => break true,
                Some(_) => return errparse!("at INSERT INTO: expected comma or closing parens"),
                None => break false,
            }
        };
        if row.len() != fields {
            return errparse!("at INSERT INTO: value count doesn't match field count");
        }
        if !closed {
            return errparse!("at INSERT INTO: expected comma or closing parens");
        }
        Ok(row)
    }

    /// Errors unless a WHERE keyword occurs somewhere in the remaining input.
    /// UPDATE and DELETE must have a WHERE clause.
    fn check_where_present(&self) -> Result<()> {
        if !self.remaining_contains(&Keyword::Where.into()) {
            return errparse!("at WHERE: WHERE clause is mandatory for UPDATE & DELETE");
        }
        Ok(())
    }

    /// Consumes the WHERE keyword, or errors.
    fn parse_where_keyword(&mut self) -> Result<()> {
        if !self.next_is(Keyword::Where.into()) {
            return errparse!("at WHERE: expected WHERE");
        }
        Ok(())
    }

    /// Parses the AND-chained conditions of a WHERE clause, after the WHERE
    /// keyword, up to the end of the input.
    fn parse_where_clause(&mut self) -> Result<Vec<Condition>> {
        if self.peek().is_none() {
            return errparse!("at WHERE: empty WHERE clause");
        }
        let mut conditions = Vec::new();
        loop {
            conditions.push(self.parse_condition()?);
            match self.next() {
                None => return Ok(conditions),
                Some(Token::Keyword(Keyword::And)) => {}
                Some(_) => return errparse!("at WHERE: expected AND"),
            }
        }
    }

    /// Parses a single comparison condition.
    fn parse_condition(&mut self) -> Result<Condition> {
        let Some((operand1, operand1_is_field)) = self.next_operand() else {
            return errparse!("at WHERE: condition with empty left side operand");
        };
        let Some(operator) = self.next_operator() else {
            return errparse!("at WHERE: condition without operator");
        };
        let Some((operand2, operand2_is_field)) = self.next_operand() else {
            return errparse!("at WHERE: condition with empty right side operand");
        };
        Ok(Condition { operand1, operand1_is_field, operator, operand2, operand2_is_field })
    }
}

/// A batch parse failure: the error of the first failing statement, and the
/// ASTs of the statements parsed successfully before it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchError {
    /// The ASTs of the statements before the failing one.
    pub parsed: Vec<Ast>,
    /// The failing statement's error.
    pub error: Error,
}

impl BatchError {
    /// The index of the failing statement in the batch.
    pub fn index(&self) -> usize {
        self.parsed.len()
    }
}

impl std::fmt::Display for BatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for BatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<BatchError> for Error {
    fn from(err: BatchError) -> Self {
        err.error
    }
}
