//! Recursive-descent parser and session state.
//!
//! The parser owns the [`CommandProcessor`] and the default item selected
//! with `item use`. Every line produces exactly one [`Response`]; grammar
//! failures become `Error` responses and leave the session untouched.
//!
//! ```text
//! line     := '!' shell-text | '/' text search-opts | '.' [INT] ['-s'] | '=' [INT]
//!           | db | vocab | item | 'trace' | EOS
//! db       := 'db' ( 'create' [file] | 'read' [file] | 'write'
//!                  | 'export' format file | 'import' format file | 'dump' | 'report' )
//! vocab    := ('tag'|'field') ( 'list' | 'count' | 'search' text | 'add' text ['-s']
//!                  | 'rename' text text | 'delete' text | 'import' file | 'export' file )
//! item     := 'item' ( 'list' | 'count' | 'search' text search-opts | 'use' [INT]
//!                  | 'print' [INT] ['-s'] | 'delete' [INT] | 'copy' [INT]
//!                  | 'add' item-opts | 'update' [INT] item-opts | 'note' [INT]
//!                  | 'tag' ('add'|'delete') text
//!                  | 'field' ('add' text value | 'update' INT field-opts | 'delete' INT) )
//! ```

use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;

use crate::command::{CommandProcessor, FieldAssignment, Host, ItemOptions, Payload, Response};
use crate::lexer::{Format, Lexeme, Lexer, Shortcut, Switch, Token};
use crate::store::{SearchScopes, Vocabulary};
use crate::trace::Tracer;

const PROMPT_NAME: &str = "secretary";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("{0}")]
    Invalid(String),

    #[error("unknown command")]
    UnknownCommand,

    #[error("{0} expected")]
    Expected(&'static str),

    #[error("item id expected")]
    ItemIdExpected,

    #[error("unknown item option")]
    UnknownOption,

    #[error("unexpected '{0}'")]
    Unexpected(String),
}

type ParseResult<T> = std::result::Result<T, ParseError>;

/// Session settings handed over by the front end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Used by `db create` and `db read` when no file is given.
    pub default_path: Option<PathBuf>,
    pub trace: bool,
    /// Allow `!command` lines.
    pub shell_escape: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_path: None,
            trace: false,
            shell_escape: true,
        }
    }
}

/// `item field update` switches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    /// `-f`: move the value to another field definition
    pub field: Option<String>,
    /// `-fv`: new value
    pub value: Option<String>,
}

pub struct Parser {
    lexer: Lexer,
    tokens: Vec<Lexeme>,
    pos: usize,
    cp: CommandProcessor,
    config: SessionConfig,
    default_item: Option<i64>,
}

impl Parser {
    pub fn new(host: Box<dyn Host>, config: SessionConfig) -> Self {
        let tracer = Tracer::new(config.trace);
        Self {
            lexer: Lexer::new(),
            tokens: Vec::new(),
            pos: 0,
            cp: CommandProcessor::new(host, tracer),
            config,
            default_item: None,
        }
    }

    pub fn processor(&self) -> &CommandProcessor {
        &self.cp
    }

    pub fn default_item(&self) -> Option<i64> {
        self.default_item
    }

    /// `secretary> `, `secretary[vault.db]> ` or `secretary[vault.db:12]> `.
    pub fn prompt(&self) -> String {
        let Some(store) = self.cp.store() else {
            return format!("{}> ", PROMPT_NAME);
        };
        let file = store
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        match self.default_item {
            Some(id) => format!("{}[{}:{}]> ", PROMPT_NAME, file, id),
            None => format!("{}[{}]> ", PROMPT_NAME, file),
        }
    }

    pub fn quit(&mut self) -> Response {
        self.cp.quit()
    }

    /// Parse and run one line.
    pub fn execute(&mut self, line: &str) -> Response {
        if let Some(command) = line.trim_start().strip_prefix('!') {
            return self.shell(command);
        }

        if let Err(err) = self.scan(line) {
            return Response::error(err.to_string());
        }
        match self.line() {
            Ok(response) => response,
            Err(err) => {
                self.cp.tracer().emit("rejected", &err);
                Response::error(err.to_string())
            }
        }
    }

    fn scan(&mut self, line: &str) -> ParseResult<()> {
        self.lexer.input(line);
        self.tokens.clear();
        self.pos = 0;
        loop {
            let lexeme = self.lexer.next_lexeme();
            match lexeme.token {
                Token::Invalid(message) => return Err(ParseError::Invalid(message)),
                Token::Eos => break,
                _ => self.tokens.push(lexeme),
            }
        }
        let tokens: Vec<&Token> = self.tokens.iter().map(|lexeme| &lexeme.token).collect();
        self.cp.tracer().emit("tokens", &tokens);
        Ok(())
    }

    fn shell(&mut self, command: &str) -> Response {
        if !self.config.shell_escape {
            return Response::error("shell escape is disabled");
        }
        let command = command.trim();
        if command.is_empty() {
            return Response::error("shell command expected");
        }
        self.cp.tracer().emit("shell", &command);
        match Command::new("sh").arg("-c").arg(command).status() {
            Ok(status) if status.success() => Response::empty(),
            Ok(status) => Response::warning(format!("shell command {}", status)),
            Err(err) => Response::exception("cannot run shell", &err),
        }
    }

    // -- token stream --

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|lexeme| &lexeme.token)
    }

    fn advance(&mut self) -> Option<Lexeme> {
        let lexeme = self.tokens.get(self.pos).cloned();
        if lexeme.is_some() {
            self.pos += 1;
        }
        lexeme
    }

    fn accept(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn end(&self) -> ParseResult<()> {
        match self.tokens.get(self.pos) {
            None => Ok(()),
            Some(lexeme) => Err(ParseError::Unexpected(lexeme.text.clone())),
        }
    }

    /// Any word-like lexeme, keywords included, as written.
    fn text(&mut self, what: &'static str) -> ParseResult<String> {
        match self.peek() {
            None | Some(Token::Switch(_)) | Some(Token::Shortcut(_)) => {
                Err(ParseError::Expected(what))
            }
            Some(_) => Ok(self.advance().map(|lexeme| lexeme.text).unwrap_or_default()),
        }
    }

    fn file(&mut self) -> ParseResult<PathBuf> {
        self.text("file name").map(PathBuf::from)
    }

    fn int(&mut self, what: &'static str) -> ParseResult<i64> {
        match self.peek() {
            Some(&Token::Int(value)) => {
                self.pos += 1;
                Ok(value)
            }
            _ => Err(ParseError::Expected(what)),
        }
    }

    fn optional_int(&mut self) -> Option<i64> {
        self.int("").ok()
    }

    fn format(&mut self) -> ParseResult<Format> {
        match self.peek() {
            Some(&Token::Format(format)) => {
                self.pos += 1;
                Ok(format)
            }
            _ => Err(ParseError::Expected("json or sql")),
        }
    }

    /// An explicit id, else the default item.
    fn item_id(&mut self) -> ParseResult<i64> {
        self.optional_int()
            .or(self.default_item)
            .ok_or(ParseError::ItemIdExpected)
    }

    // -- grammar --

    fn line(&mut self) -> ParseResult<Response> {
        let Some(lexeme) = self.advance() else {
            return Ok(Response::empty());
        };
        match lexeme.token {
            Token::Shortcut(Shortcut::Search) => self.item_search(),
            Token::Shortcut(Shortcut::Print) => self.item_print(),
            Token::Shortcut(Shortcut::Use) => self.item_use(),
            Token::Db => self.db(),
            Token::Tag => self.vocabulary(Vocabulary::Tags),
            Token::Field => self.vocabulary(Vocabulary::Fields),
            Token::Item => self.item(),
            Token::Trace => {
                self.end()?;
                Ok(self.cp.trace_toggle())
            }
            _ => Err(ParseError::UnknownCommand),
        }
    }

    fn db_path(&mut self) -> ParseResult<PathBuf> {
        let path = match self.peek() {
            None => self.config.default_path.clone(),
            Some(_) => Some(self.file()?),
        };
        self.end()?;
        path.ok_or(ParseError::Expected("file name"))
    }

    fn db(&mut self) -> ParseResult<Response> {
        let token = self.advance().map(|lexeme| lexeme.token);
        let response = match token {
            Some(Token::Create) => {
                let path = self.db_path()?;
                let response = self.cp.database_create(&path);
                if response.is_ok() {
                    self.default_item = None;
                }
                response
            }
            Some(Token::Read) => {
                let path = self.db_path()?;
                let response = self.cp.database_read(&path);
                if response.is_ok() || !self.cp.is_loaded() {
                    self.default_item = None;
                }
                response
            }
            Some(Token::Write) => {
                self.end()?;
                self.cp.database_write()
            }
            Some(Token::Export) => {
                let format = self.format()?;
                let path = self.file()?;
                self.end()?;
                self.cp.database_export(&path, format)
            }
            Some(Token::Import) => {
                let format = self.format()?;
                let path = self.file()?;
                self.end()?;
                let response = self.cp.database_import(&path, format);
                if response.is_ok() {
                    self.default_item = None;
                }
                response
            }
            Some(Token::Dump) => {
                self.end()?;
                self.cp.database_dump()
            }
            Some(Token::Report) => {
                self.end()?;
                self.cp.database_report()
            }
            _ => return Err(ParseError::UnknownCommand),
        };
        Ok(response)
    }

    fn vocabulary(&mut self, vocabulary: Vocabulary) -> ParseResult<Response> {
        let token = self.advance().map(|lexeme| lexeme.token);
        let response = match token {
            Some(Token::List) => {
                self.end()?;
                self.cp.vocabulary_list(vocabulary)
            }
            Some(Token::Count) => {
                self.end()?;
                self.cp.vocabulary_count(vocabulary)
            }
            Some(Token::Search) => {
                let pattern = self.text("search pattern")?;
                self.end()?;
                self.cp.vocabulary_search(vocabulary, &pattern)
            }
            Some(Token::Add) => {
                let name = self.text("name")?;
                let sensitive = vocabulary == Vocabulary::Fields
                    && self.accept(&Token::Switch(Switch::Sensitive));
                self.options_end()?;
                match vocabulary {
                    Vocabulary::Tags => self.cp.tag_add(&name),
                    Vocabulary::Fields => self.cp.field_add(&name, sensitive),
                }
            }
            Some(Token::Rename) => {
                let old_name = self.text("name")?;
                let new_name = self.text("new name")?;
                self.end()?;
                self.cp.vocabulary_rename(vocabulary, &old_name, &new_name)
            }
            Some(Token::Delete) => {
                let name = self.text("name")?;
                self.end()?;
                self.cp.vocabulary_delete(vocabulary, &name)
            }
            Some(Token::Import) => {
                let path = self.file()?;
                self.end()?;
                self.cp.vocabulary_import(vocabulary, &path)
            }
            Some(Token::Export) => {
                let path = self.file()?;
                self.end()?;
                self.cp.vocabulary_export(vocabulary, &path)
            }
            _ => return Err(ParseError::UnknownCommand),
        };
        Ok(response)
    }

    /// Reject whatever is left in a switch group.
    fn options_end(&self) -> ParseResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(ParseError::UnknownOption),
        }
    }

    fn item(&mut self) -> ParseResult<Response> {
        let token = self.advance().map(|lexeme| lexeme.token);
        let response = match token {
            Some(Token::List) => {
                self.end()?;
                self.cp.item_list()
            }
            Some(Token::Count) => {
                self.end()?;
                self.cp.item_count()
            }
            Some(Token::Search) => return self.item_search(),
            Some(Token::Use) => return self.item_use(),
            Some(Token::Print) => return self.item_print(),
            Some(Token::Delete) => {
                let id = self.item_id()?;
                self.end()?;
                let response = self.cp.item_delete(id);
                if response.is_ok() && self.default_item == Some(id) {
                    self.default_item = None;
                }
                response
            }
            Some(Token::Copy) => {
                let id = self.item_id()?;
                self.end()?;
                self.cp.item_copy(id)
            }
            Some(Token::Add) => {
                let options = self.item_options(false)?;
                self.cp.item_add(options)
            }
            Some(Token::Update) => {
                let id = self.item_id()?;
                let options = self.item_options(true)?;
                self.cp.item_update(id, options)
            }
            Some(Token::Note) => {
                let id = self.item_id()?;
                self.end()?;
                self.cp.item_note(id)
            }
            Some(Token::Tag) => return self.item_tag(),
            Some(Token::Field) => return self.item_field(),
            _ => return Err(ParseError::UnknownCommand),
        };
        Ok(response)
    }

    fn item_search(&mut self) -> ParseResult<Response> {
        let pattern = self.text("search pattern")?;
        let mut scopes = SearchScopes::default();
        while let Some(token) = self.peek() {
            match token {
                Token::Switch(Switch::Name) => scopes.name = true,
                Token::Switch(Switch::Tag) => scopes.tags = true,
                Token::Switch(Switch::Field) => scopes.field_names = true,
                Token::Switch(Switch::FieldValue) => scopes.field_values = true,
                Token::Switch(Switch::Note) => scopes.note = true,
                _ => return Err(ParseError::UnknownOption),
            }
            self.pos += 1;
        }
        Ok(self.cp.item_search(&pattern, scopes.or_name_only()))
    }

    fn item_print(&mut self) -> ParseResult<Response> {
        let id = self.item_id()?;
        let reveal = self.accept(&Token::Switch(Switch::Sensitive));
        self.options_end()?;
        Ok(self.cp.item_print(id, reveal))
    }

    fn item_use(&mut self) -> ParseResult<Response> {
        let id = self.optional_int();
        self.end()?;
        let response = self.cp.item_use(id);
        if let Payload::Selected(selected) = &response.payload {
            self.default_item = selected.as_ref().map(|item| item.id);
        }
        Ok(response)
    }

    /// `-fd` is only accepted when `update` is set.
    fn item_options(&mut self, update: bool) -> ParseResult<ItemOptions> {
        let mut options = ItemOptions::default();
        while let Some(token) = self.peek() {
            let switch = match token {
                Token::Switch(switch) => *switch,
                _ => return Err(ParseError::UnknownOption),
            };
            self.pos += 1;
            match switch {
                Switch::Name => options.name = Some(self.text("item name")?),
                Switch::Tag => options.tags.push(self.text("tag name")?),
                Switch::Field => {
                    let name = self.text("field name")?;
                    let value = self.text("field value")?;
                    options.fields.push(FieldAssignment { name, value });
                }
                Switch::FieldDelete if update => {
                    options.field_deletes.push(self.text("field name")?)
                }
                Switch::Note => options.note = Some(self.text("note")?),
                Switch::EditNote => options.edit_note = true,
                _ => return Err(ParseError::UnknownOption),
            }
        }
        Ok(options)
    }

    fn item_tag(&mut self) -> ParseResult<Response> {
        let id = self.default_item.ok_or(ParseError::ItemIdExpected)?;
        let token = self.advance().map(|lexeme| lexeme.token);
        let add = match token {
            Some(Token::Add) => true,
            Some(Token::Delete) => false,
            _ => return Err(ParseError::Expected("add or delete")),
        };
        let tag = self.text("tag name")?;
        self.end()?;
        Ok(if add {
            self.cp.item_tag_add(id, &tag)
        } else {
            self.cp.item_tag_delete(id, &tag)
        })
    }

    fn item_field(&mut self) -> ParseResult<Response> {
        let id = self.default_item.ok_or(ParseError::ItemIdExpected)?;
        let token = self.advance().map(|lexeme| lexeme.token);
        match token {
            Some(Token::Add) => {
                let field = self.text("field name")?;
                let value = self.text("field value")?;
                self.end()?;
                Ok(self.cp.item_field_add(id, &field, &value))
            }
            Some(Token::Update) => {
                let value_id = self.int("field value id")?;
                let update = self.field_update()?;
                Ok(self.cp.item_field_update(
                    id,
                    value_id,
                    update.field.as_deref(),
                    update.value.as_deref(),
                ))
            }
            Some(Token::Delete) => {
                let value_id = self.int("field value id")?;
                self.end()?;
                Ok(self.cp.item_field_delete(id, value_id))
            }
            _ => Err(ParseError::Expected("add, update or delete")),
        }
    }

    fn field_update(&mut self) -> ParseResult<FieldUpdate> {
        let mut update = FieldUpdate::default();
        while let Some(token) = self.peek() {
            match token {
                Token::Switch(Switch::Field) => {
                    self.pos += 1;
                    update.field = Some(self.text("field name")?);
                }
                Token::Switch(Switch::FieldValue) => {
                    self.pos += 1;
                    update.value = Some(self.text("field value")?);
                }
                _ => return Err(ParseError::UnknownOption),
            }
        }
        Ok(update)
    }
}
