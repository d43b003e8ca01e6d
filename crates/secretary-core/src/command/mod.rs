//! The command processor: the only code that touches the store.
//!
//! Every operation returns exactly one [`Response`]. Store and crypto
//! failures are converted to `Exception` responses here and never reach the
//! caller as errors.

mod host;
mod items;
mod response;
mod vocabulary;

use std::path::Path;

use crate::error::Result;
use crate::lexer::Format;
use crate::store::Store;
use crate::trace::Tracer;

pub use host::Host;
pub use items::{FieldAssignment, ItemOptions};
pub use response::{ItemDetail, Payload, Response, Severity, MASK};

pub const NO_DATABASE: &str = "no database";
const DISCARD_PROMPT: &str = "There's a database already in memory. Discard it?";
const IMPORT_PROMPT: &str = "Importing replaces the database in memory. Continue?";

pub struct CommandProcessor {
    store: Option<Store>,
    host: Box<dyn Host>,
    tracer: Tracer,
}

impl CommandProcessor {
    pub fn new(host: Box<dyn Host>, tracer: Tracer) -> Self {
        Self {
            store: None,
            host,
            tracer,
        }
    }

    pub fn store(&self) -> Option<&Store> {
        self.store.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.store.is_some()
    }

    pub fn tracer(&self) -> &Tracer {
        &self.tracer
    }

    pub fn trace_toggle(&mut self) -> Response {
        if self.tracer.toggle() {
            Response::done("trace on")
        } else {
            Response::done("trace off")
        }
    }

    /// Run `op` against the loaded store, mapping failures to an exception.
    fn with_store<F>(&mut self, context: &str, op: F) -> Response
    where
        F: FnOnce(&mut Store, &mut dyn Host) -> Result<Response>,
    {
        let Some(store) = self.store.as_mut() else {
            return Response::warning(NO_DATABASE);
        };
        self.tracer.emit("dispatch", &context);
        match op(store, self.host.as_mut()) {
            Ok(response) => response,
            Err(err) => Response::exception(context, &err),
        }
    }

    pub fn database_create(&mut self, path: &Path) -> Response {
        self.tracer.emit("dispatch", &("db create", path));
        if path.exists() {
            return Response::error(format!("database {} already exists", path.display()));
        }
        if self.store.is_some() && !self.host.confirm(DISCARD_PROMPT) {
            return Response::warning("database not created");
        }

        let created = self
            .host
            .acquire_key()
            .and_then(|key| Store::create(path, key));
        match created {
            Ok(store) => {
                self.store = Some(store);
                Response::done(format!("database {} created", path.display()))
            }
            Err(err) => Response::exception(format!("cannot create {}", path.display()), &err),
        }
    }

    pub fn database_read(&mut self, path: &Path) -> Response {
        self.tracer.emit("dispatch", &("db read", path));
        if !path.exists() {
            return Response::error(format!("database {} does not exist", path.display()));
        }
        if self.store.is_some() && !self.host.confirm(DISCARD_PROMPT) {
            return Response::warning("database not read");
        }

        let opened = self
            .host
            .acquire_key()
            .and_then(|key| Store::open(path, key));
        match opened {
            Ok(store) => {
                self.store = Some(store);
                Response::done(format!("database {} read", path.display()))
            }
            Err(err) => {
                self.store = None;
                Response::exception(format!("cannot read {}", path.display()), &err)
            }
        }
    }

    pub fn database_write(&mut self) -> Response {
        self.with_store("cannot write database", |store, _| {
            let backup = store.write()?;
            let mut message = format!("database {} written", store.path().display());
            if let Some(backup) = backup {
                message.push_str(&format!(", previous version kept as {}", backup.display()));
            }
            Ok(Response::done(message))
        })
    }

    pub fn database_export(&mut self, path: &Path, format: Format) -> Response {
        self.with_store("cannot export database", |store, _| {
            match format {
                Format::Json => store.export_document(path)?,
                Format::Sql => store.export_native(path)?,
                Format::Csv => {
                    return Ok(Response::error(
                        "csv is only available for tag and field lists",
                    ))
                }
            }
            Ok(Response::done(format!(
                "database exported to {} ({})",
                path.display(),
                format
            )))
        })
    }

    /// Replace the loaded contents with an exported file, after confirmation.
    pub fn database_import(&mut self, path: &Path, format: Format) -> Response {
        self.with_store("cannot import database", |store, host| {
            if !path.exists() {
                return Ok(Response::error(format!(
                    "file {} does not exist",
                    path.display()
                )));
            }
            if format == Format::Csv {
                return Ok(Response::error(
                    "csv is only available for tag and field lists",
                ));
            }
            if !host.confirm(IMPORT_PROMPT) {
                return Ok(Response::warning("import cancelled"));
            }
            match format {
                Format::Json => store.import_document(path)?,
                _ => store.import_native(path)?,
            }
            Ok(Response::done(format!(
                "database imported from {}",
                path.display()
            )))
        })
    }

    pub fn database_dump(&mut self) -> Response {
        self.with_store("cannot dump database", |store, _| {
            Ok(Response::ok(Payload::Dump(store.dump()?)))
        })
    }

    pub fn database_report(&mut self) -> Response {
        self.with_store("cannot report on database", |store, _| {
            Ok(Response::ok(Payload::Report(Box::new(store.report()?))))
        })
    }

    /// End the session; warns when the loaded store has unsaved changes.
    pub fn quit(&mut self) -> Response {
        self.tracer.emit("dispatch", &"quit");
        let Some(store) = self.store.as_ref() else {
            return Response::empty();
        };
        match store.report() {
            Ok(report) if report.unchanged() => Response::empty(),
            Ok(report) => Response::warning(format!("{} has unsaved changes", report.path)),
            Err(err) => Response::exception("cannot check for changes", &err),
        }
    }
}

/// Current time as unix seconds.
pub(crate) fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
