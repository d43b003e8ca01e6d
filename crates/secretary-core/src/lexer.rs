//! Tokenizer for the command language.
//!
//! A three-state scanner (start, word, quoted string) runs over the trimmed
//! line plus one trailing space, so the last word always flushes. Words are
//! classified in a fixed order: keywords, switches, format names, dates,
//! numbers, file paths, then bare names.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

static DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d\d/\d\d/\d\d\d\d|\d\d/\d\d/\d\d|\d\d/\d\d)$").expect("valid date pattern")
});
static INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").expect("valid integer pattern"));
static FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d*\.\d+$").expect("valid float pattern"));
static FILE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([\w~.-]*/[\w~./-]*|[\w~.-]*\.[A-Za-z0-9]+)$").expect("valid file pattern")
});

const PREVIEW_CHARS: usize = 10;

/// One-character commands recognised only at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shortcut {
    /// `/pattern` searches items
    Search,
    /// `.` prints an item
    Print,
    /// `=` selects the default item
    Use,
}

impl Shortcut {
    fn from_char(c: char) -> Option<Self> {
        match c {
            '/' => Some(Shortcut::Search),
            '.' => Some(Shortcut::Print),
            '=' => Some(Shortcut::Use),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    /// `-s`
    Sensitive,
    /// `-n`
    Name,
    /// `-t`
    Tag,
    /// `-f` or `-fn`
    Field,
    /// `-fv`
    FieldValue,
    /// `-fd`
    FieldDelete,
    /// `-note`
    Note,
    /// `-text`
    EditNote,
}

impl Switch {
    fn parse(word: &str) -> Option<Self> {
        Some(match word {
            "-s" => Switch::Sensitive,
            "-n" => Switch::Name,
            "-t" => Switch::Tag,
            "-f" | "-fn" => Switch::Field,
            "-fv" => Switch::FieldValue,
            "-fd" => Switch::FieldDelete,
            "-note" => Switch::Note,
            "-text" => Switch::EditNote,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Sql,
    Csv,
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Format::Json => "json",
            Format::Sql => "sql",
            Format::Csv => "csv",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Db,
    Item,
    Tag,
    Field,
    Create,
    Read,
    Write,
    Export,
    Import,
    Dump,
    Report,
    List,
    Count,
    Search,
    Use,
    Print,
    Delete,
    Copy,
    Add,
    Update,
    Note,
    Rename,
    Trace,
    Shortcut(Shortcut),
    Switch(Switch),
    Format(Format),
    Date(String),
    Int(i64),
    Float(f64),
    File(String),
    Name(String),
    Str(String),
    Invalid(String),
    Eos,
}

impl Token {
    fn keyword(word: &str) -> Option<Token> {
        Some(match word {
            "db" => Token::Db,
            "item" => Token::Item,
            "tag" => Token::Tag,
            "field" => Token::Field,
            "create" => Token::Create,
            "read" => Token::Read,
            "write" => Token::Write,
            "export" => Token::Export,
            "import" => Token::Import,
            "dump" => Token::Dump,
            "report" => Token::Report,
            "list" => Token::List,
            "count" => Token::Count,
            "search" => Token::Search,
            "use" => Token::Use,
            "print" => Token::Print,
            "delete" => Token::Delete,
            "copy" => Token::Copy,
            "add" => Token::Add,
            "update" => Token::Update,
            "note" => Token::Note,
            "rename" => Token::Rename,
            "trace" => Token::Trace,
            _ => return None,
        })
    }

    fn classify(word: &str) -> Token {
        if let Some(keyword) = Token::keyword(word) {
            return keyword;
        }
        if let Some(switch) = Switch::parse(word) {
            return Token::Switch(switch);
        }
        match word {
            "json" => return Token::Format(Format::Json),
            "sql" => return Token::Format(Format::Sql),
            "csv" => return Token::Format(Format::Csv),
            _ => {}
        }
        if DATE.is_match(word) {
            return Token::Date(word.to_string());
        }
        if INT.is_match(word) {
            if let Ok(value) = word.parse() {
                return Token::Int(value);
            }
        }
        if FLOAT.is_match(word) {
            if let Ok(value) = word.parse() {
                return Token::Float(value);
            }
        }
        if FILE.is_match(word) {
            return Token::File(word.to_string());
        }
        Token::Name(word.to_string())
    }
}

/// A token together with the text it was read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Lexeme {
    pub token: Token,
    pub text: String,
}

impl Lexeme {
    fn new(token: Token, text: impl Into<String>) -> Self {
        Self {
            token,
            text: text.into(),
        }
    }
}

enum State {
    Start,
    Word,
    Quoted(char),
}

#[derive(Debug, Default)]
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    at_line_start: bool,
}

impl Lexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the lexer onto a new line.
    pub fn input(&mut self, line: &str) {
        self.chars = line.trim().chars().chain(std::iter::once(' ')).collect();
        self.pos = 0;
        self.at_line_start = true;
    }

    pub fn next_token(&mut self) -> Token {
        self.next_lexeme().token
    }

    /// Next token with its source text. Returns `Eos` forever once exhausted.
    pub fn next_lexeme(&mut self) -> Lexeme {
        let mut state = State::Start;
        let mut buf = String::new();

        while let Some(&c) = self.chars.get(self.pos) {
            self.pos += 1;
            match state {
                State::Start => {
                    if c.is_whitespace() {
                        continue;
                    }
                    if std::mem::take(&mut self.at_line_start) {
                        if let Some(shortcut) = Shortcut::from_char(c) {
                            return Lexeme::new(Token::Shortcut(shortcut), c);
                        }
                    }
                    if c == '"' || c == '\'' {
                        state = State::Quoted(c);
                    } else {
                        buf.push(c);
                        state = State::Word;
                    }
                }
                State::Word => {
                    if c.is_whitespace() {
                        return Lexeme::new(Token::classify(&buf), buf);
                    }
                    buf.push(c);
                }
                State::Quoted(delimiter) => {
                    if c == delimiter {
                        return Lexeme::new(Token::Str(buf.clone()), buf);
                    }
                    buf.push(c);
                }
            }
        }

        match state {
            State::Quoted(_) => {
                let preview: String = buf.trim_end().chars().take(PREVIEW_CHARS).collect();
                let message = format!("unterminated string [{}...]", preview);
                Lexeme::new(Token::Invalid(message), buf)
            }
            _ => Lexeme::new(Token::Eos, ""),
        }
    }

    /// Tokenize a whole line, ending with `Eos`.
    pub fn tokenize(line: &str) -> Vec<Token> {
        let mut lexer = Lexer::new();
        lexer.input(line);
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token();
            let done = token == Token::Eos;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_line() {
        assert_eq!(
            Lexer::tokenize(r#"item search name 8 "one string" joe"#),
            vec![
                Token::Item,
                Token::Search,
                Token::Name("name".to_string()),
                Token::Int(8),
                Token::Str("one string".to_string()),
                Token::Name("joe".to_string()),
                Token::Eos,
            ]
        );
    }

    #[test]
    fn test_classification_order() {
        assert_eq!(
            Lexer::tokenize("-fn -fd json 01/02/2023 01/02 3.5 vault.db ./x/y name"),
            vec![
                Token::Switch(Switch::Field),
                Token::Switch(Switch::FieldDelete),
                Token::Format(Format::Json),
                Token::Date("01/02/2023".to_string()),
                Token::Date("01/02".to_string()),
                Token::Float(3.5),
                Token::File("vault.db".to_string()),
                Token::File("./x/y".to_string()),
                Token::Name("name".to_string()),
                Token::Eos,
            ]
        );
    }

    #[test]
    fn test_quotes_keep_content_verbatim() {
        assert_eq!(
            Lexer::tokenize(r#"'say "hi"' "-s""#),
            vec![
                Token::Str(r#"say "hi""#.to_string()),
                Token::Str("-s".to_string()),
                Token::Eos,
            ]
        );
    }

    #[test]
    fn test_unterminated_string() {
        let tokens = Lexer::tokenize(r#"tag add "a very long unterminated"#);
        assert_eq!(
            tokens[2],
            Token::Invalid("unterminated string [a very lon...]".to_string())
        );
        assert_eq!(tokens[3], Token::Eos);
    }

    #[test]
    fn test_eos_repeats() {
        let mut lexer = Lexer::new();
        lexer.input("trace");
        assert_eq!(lexer.next_token(), Token::Trace);
        assert_eq!(lexer.next_token(), Token::Eos);
        assert_eq!(lexer.next_token(), Token::Eos);
    }

    #[test]
    fn test_shortcuts_only_at_line_start() {
        assert_eq!(
            Lexer::tokenize("/bank"),
            vec![
                Token::Shortcut(Shortcut::Search),
                Token::Name("bank".to_string()),
                Token::Eos,
            ]
        );
        assert_eq!(
            Lexer::tokenize("  = 4"),
            vec![Token::Shortcut(Shortcut::Use), Token::Int(4), Token::Eos]
        );
        assert_eq!(
            Lexer::tokenize("item ="),
            vec![Token::Item, Token::Name("=".to_string()), Token::Eos]
        );
    }

    #[test]
    fn test_lexeme_keeps_leading_zeros() {
        let mut lexer = Lexer::new();
        lexer.input("0042");
        let lexeme = lexer.next_lexeme();
        assert_eq!(lexeme.token, Token::Int(42));
        assert_eq!(lexeme.text, "0042");
    }

    #[test]
    fn test_input_resets_state() {
        let mut lexer = Lexer::new();
        lexer.input("\"open");
        assert!(matches!(lexer.next_token(), Token::Invalid(_)));
        lexer.input("db");
        assert_eq!(lexer.next_token(), Token::Db);
    }

    #[test]
    fn test_empty_line() {
        assert_eq!(Lexer::tokenize("   "), vec![Token::Eos]);
    }
}
