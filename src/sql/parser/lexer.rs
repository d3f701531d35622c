use std::iter::Peekable;
use std::str::Chars;

/// The lexer (lexical analyzer) preprocesses raw SQL strings into a sequence
/// of lexical tokens (keywords, identifiers, quoted literals and punctuation),
/// which are passed on to the SQL parser. In doing so, it strips away
/// whitespace and keyword casing.
///
/// The lexer never fails: characters it doesn't otherwise recognize become
/// part of identifier tokens, and all grammatical validation is left to the
/// parser. Quoted literals are kept raw, i.e. an escaped quote \' inside a
/// literal is stored as the two characters \ and '.
pub struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

/// A lexical token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A single-quoted literal, with the enclosing quotes stripped.
    Literal(String),
    /// A bare word, with its original casing.
    Ident(String),
    /// A SQL keyword, in canonical form regardless of input casing.
    Keyword(Keyword),
    /// ,
    Comma,
    /// (
    OpenParen,
    /// )
    CloseParen,
    /// =
    Equal,
    /// !=
    NotEqual,
    /// <
    LessThan,
    /// <=
    LessThanOrEqual,
    /// >
    GreaterThan,
    /// >=
    GreaterThanOrEqual,
    /// *
    Asterisk,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "'{s}'"),
            Self::Ident(s) => f.write_str(s),
            Self::Keyword(keyword) => write!(f, "{keyword}"),
            Self::Comma => f.write_str(","),
            Self::OpenParen => f.write_str("("),
            Self::CloseParen => f.write_str(")"),
            Self::Equal => f.write_str("="),
            Self::NotEqual => f.write_str("!="),
            Self::LessThan => f.write_str("<"),
            Self::LessThanOrEqual => f.write_str("<="),
            Self::GreaterThan => f.write_str(">"),
            Self::GreaterThanOrEqual => f.write_str(">="),
            Self::Asterisk => f.write_str("*"),
        }
    }
}

impl From<Keyword> for Token {
    fn from(keyword: Keyword) -> Self {
        Self::Keyword(keyword)
    }
}

/// Reserved SQL keywords.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    And,
    As,
    Delete,
    From,
    Insert,
    Into,
    Select,
    Set,
    Update,
    Values,
    Where,
}

impl TryFrom<&str> for Keyword {
    // Use a cheap static error string. This just indicates it's not a keyword.
    type Error = &'static str;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        // No keyword is longer than 6 characters.
        if value.len() > 6 || !value.is_ascii() {
            return Err("not a keyword");
        }
        Ok(match value.to_ascii_uppercase().as_str() {
            "AND" => Self::And,
            "AS" => Self::As,
            "DELETE" => Self::Delete,
            "FROM" => Self::From,
            "INSERT" => Self::Insert,
            "INTO" => Self::Into,
            "SELECT" => Self::Select,
            "SET" => Self::Set,
            "UPDATE" => Self::Update,
            "VALUES" => Self::Values,
            "WHERE" => Self::Where,
            _ => return Err("not a keyword"),
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Display keywords as uppercase.
        f.write_str(match self {
            Self::And => "AND",
            Self::As => "AS",
            Self::Delete => "DELETE",
            Self::From => "FROM",
            Self::Insert => "INSERT",
            Self::Into => "INTO",
            Self::Select => "SELECT",
            Self::Set => "SET",
            Self::Update => "UPDATE",
            Self::Values => "VALUES",
            Self::Where => "WHERE",
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.scan()
    }
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given string.
    pub fn new(input: &'a str) -> Lexer<'a> {
        Lexer { chars: input.chars().peekable() }
    }

    /// Tokenizes the whole input.
    pub fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input).collect()
    }

    /// Returns the next character if it satisfies the predicate.
    fn next_if(&mut self, predicate: impl Fn(char) -> bool) -> Option<char> {
        self.chars.next_if(|&c| predicate(c))
    }

    /// Consumes consecutive whitespace characters.
    fn skip_whitespace(&mut self) {
        while self.next_if(|c| c.is_whitespace()).is_some() {}
    }

    /// Returns true if the upcoming characters are != (which ends a word).
    fn at_not_equal(&self) -> bool {
        let mut chars = self.chars.clone();
        chars.next() == Some('!') && chars.next() == Some('=')
    }

    /// Returns true if the upcoming character can be part of a bare word.
    fn at_word(&mut self) -> bool {
        match self.chars.peek().copied() {
            None => false,
            Some(c) if c.is_whitespace() => false,
            Some('\'' | ',' | '(' | ')' | '=' | '<' | '>' | '*') => false,
            Some('!') => !self.at_not_equal(),
            Some(_) => true,
        }
    }

    /// Scans the next token, if any, ignoring leading whitespace.
    fn scan(&mut self) -> Option<Token> {
        self.skip_whitespace();
        match self.chars.peek().copied()? {
            '\'' => Some(self.scan_literal()),
            _ if self.at_word() => Some(self.scan_word()),
            _ => self.scan_symbol(),
        }
    }

    /// Scans a bare word, yielding a keyword or an identifier.
    fn scan_word(&mut self) -> Token {
        let mut word = String::new();
        while self.at_word() {
            word.extend(self.chars.next());
        }
        Keyword::try_from(word.as_str()).map(Token::Keyword).unwrap_or(Token::Ident(word))
    }

    /// Scans a single-quoted literal. A quote preceded by a backslash doesn't
    /// terminate the literal, and both characters are kept as-is. If the
    /// input ends before the closing quote, the remainder (including the
    /// opening quote) is returned as an identifier fragment.
    fn scan_literal(&mut self) -> Token {
        let mut raw = String::new();
        self.chars.next(); // opening '
        for c in self.chars.by_ref() {
            if c == '\'' && !raw.ends_with('\\') {
                return Token::Literal(raw);
            }
            raw.push(c);
        }
        Token::Ident(format!("'{raw}"))
    }

    /// Scans a punctuation token.
    fn scan_symbol(&mut self) -> Option<Token> {
        let token = match self.chars.next()? {
            ',' => Token::Comma,
            '(' => Token::OpenParen,
            ')' => Token::CloseParen,
            '=' => Token::Equal,
            '*' => Token::Asterisk,
            '!' => {
                // at_word() only rejects ! when followed by =.
                self.chars.next();
                Token::NotEqual
            }
            '<' => match self.next_if(|c| c == '=') {
                Some(_) => Token::LessThanOrEqual,
                None => Token::LessThan,
            },
            '>' => match self.next_if(|c| c == '=') {
                Some(_) => Token::GreaterThanOrEqual,
                None => Token::GreaterThan,
            },
            c => Token::Ident(c.to_string()),
        };
        Some(token)
    }
}

/// Returns true if the input ends inside an unterminated quoted literal.
pub fn has_open_quote(input: &str) -> bool {
    matches!(Lexer::tokenize(input).last(), Some(Token::Ident(word)) if word.starts_with('\''))
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::Keyword;
    use pretty_assertions::assert_eq;
    use Token::*;

    fn ident(s: &str) -> Token {
        Ident(s.into())
    }

    fn literal(s: &str) -> Token {
        Literal(s.into())
    }

    #[test]
    fn empty() {
        assert_eq!(Lexer::tokenize(""), vec![]);
        assert_eq!(Lexer::tokenize(" \t\n  "), vec![]);
    }

    #[test]
    fn keywords_ignore_case() {
        assert_eq!(
            Lexer::tokenize("select SeLeCt FROM from wHeRe as And"),
            vec![
                Keyword::Select.into(),
                Keyword::Select.into(),
                Keyword::From.into(),
                Keyword::From.into(),
                Keyword::Where.into(),
                Keyword::As.into(),
                Keyword::And.into(),
            ]
        );
    }

    #[test]
    fn identifiers_keep_case() {
        assert_eq!(
            Lexer::tokenize("Foo bAR selected _x9 état"),
            vec![ident("Foo"), ident("bAR"), ident("selected"), ident("_x9"), ident("état")]
        );
    }

    #[test]
    fn literals() {
        assert_eq!(
            Lexer::tokenize("'a' '' 'with spaces and WHERE' 'O\"Neil'"),
            vec![literal("a"), literal(""), literal("with spaces and WHERE"), literal("O\"Neil")]
        );
    }

    #[test]
    fn literal_escaped_quote_is_kept_raw() {
        assert_eq!(Lexer::tokenize(r"'hello\'world'"), vec![literal(r"hello\'world")]);
        assert_eq!(Lexer::tokenize(r"'\'' x"), vec![literal(r"\'"), ident("x")]);
    }

    #[test]
    fn literal_unterminated() {
        assert_eq!(Lexer::tokenize("a 'bc d"), vec![ident("a"), ident("'bc d")]);
        assert_eq!(Lexer::tokenize(r"'x\'"), vec![ident(r"'x\'")]);
        assert!(has_open_quote("SELECT a FROM 'b"));
        assert!(!has_open_quote("SELECT a FROM 'b'"));
    }

    #[test]
    fn symbols() {
        assert_eq!(
            Lexer::tokenize(", ( ) = != < <= > >= *"),
            vec![
                Comma,
                OpenParen,
                CloseParen,
                Equal,
                NotEqual,
                LessThan,
                LessThanOrEqual,
                GreaterThan,
                GreaterThanOrEqual,
                Asterisk,
            ]
        );
    }

    #[test]
    fn symbols_without_whitespace() {
        assert_eq!(
            Lexer::tokenize("a!=b,c<='1'(d)>=*"),
            vec![
                ident("a"),
                NotEqual,
                ident("b"),
                Comma,
                ident("c"),
                LessThanOrEqual,
                literal("1"),
                OpenParen,
                ident("d"),
                CloseParen,
                GreaterThanOrEqual,
                Asterisk,
            ]
        );
    }

    #[test]
    fn literals_adjacent_to_words() {
        assert_eq!(
            Lexer::tokenize("a='1'and b='2'"),
            vec![
                ident("a"),
                Equal,
                literal("1"),
                Keyword::And.into(),
                ident("b"),
                Equal,
                literal("2"),
            ]
        );
    }

    #[test]
    fn unrecognized_characters_are_identifiers() {
        assert_eq!(
            Lexer::tokenize("a!b ; ! x.y"),
            vec![ident("a!b"), ident(";"), ident("!"), ident("x.y")]
        );
    }

    #[test]
    fn statement() {
        assert_eq!(
            Lexer::tokenize(
                "
                UPDATE 'a'
                SET b = 'hello', c = 'bye'
                WHERE a = '1' AND b != c"
            ),
            vec![
                Keyword::Update.into(),
                literal("a"),
                Keyword::Set.into(),
                ident("b"),
                Equal,
                literal("hello"),
                Comma,
                ident("c"),
                Equal,
                literal("bye"),
                Keyword::Where.into(),
                ident("a"),
                Equal,
                literal("1"),
                Keyword::And.into(),
                ident("b"),
                NotEqual,
                ident("c"),
            ]
        );
    }

    #[test]
    fn display() {
        let tokens = Lexer::tokenize("insert INTO 'a' (b) values ('1') where x >= y");
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["INSERT", "INTO", "'a'", "(", "b", ")", "VALUES", "(", "'1'", ")", "WHERE", "x", ">=", "y"]
        );
    }
}
