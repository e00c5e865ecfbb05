//! Capability objects exposed to scripts.
//!
//! The script-visible surface mirrors the browser sandbox filesystem API:
//!
//! ```js
//! requestFileSystem((fs) => {
//!   fs.root.createReader().readEntries((entries) => { ... });
//!   fs.root.getFile(name, onerror, (file) => {
//!     const reader = new FileReader();
//!     reader.onloadend = function () { console.log(this.result); };
//!     reader.readAsText(file);
//!   });
//! });
//! ```
//!
//! Each object is built from a [`Capability`] variant with a fixed set of
//! methods and fields, fresh for every session.

use crate::bridge::{self, BridgedValue};
use crate::dispatch::{expect_arity, expect_function, Completion};
use crate::error::CapabilityError;
use crate::host_fs::{EntryDescriptor, HostFs};
use crate::output::Output;
use rquickjs::function::{Rest, This};
use rquickjs::{Ctx, Function, Object, Value};
use std::rc::Rc;
use tracing::{debug, warn};

/// Host state the capability functions close over.
#[derive(Debug, Clone)]
pub struct Host {
    pub fs: HostFs,
    pub output: Output,
}

impl Host {
    pub fn new(fs: HostFs, output: Output) -> Self {
        Self { fs, output }
    }
}

/// The kinds of host objects a script can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// `console`
    Console,
    /// The object passed to the `requestFileSystem` callback
    FileSystem,
    /// `fs.root`
    Root,
    /// Returned by `createReader()`
    DirectoryReader,
    /// Built by `new FileReader()`
    FileReader,
}

impl Capability {
    pub const fn methods(self) -> &'static [&'static str] {
        match self {
            Self::Console => &["log"],
            Self::FileSystem => &[],
            Self::Root => &["createReader", "getFile"],
            Self::DirectoryReader => &["readEntries"],
            Self::FileReader => &["readAsText"],
        }
    }

    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::FileSystem => &["root"],
            Self::FileReader => &["kind"],
            Self::Console | Self::Root | Self::DirectoryReader => &[],
        }
    }

    /// Build a new engine object for this capability.
    pub fn build<'js>(self, ctx: &Ctx<'js>, host: &Rc<Host>) -> rquickjs::Result<Object<'js>> {
        let object = Object::new(ctx.clone())?;
        match self {
            Self::Console => {
                let host = Rc::clone(host);
                let log = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
                    console_log(&ctx, &host.output, args.0)
                })?
                .with_name("log")?;
                object.set("log", log)?;
            }
            Self::FileSystem => {
                object.set("root", Self::Root.build(ctx, host)?)?;
            }
            Self::Root => {
                let reader_host = Rc::clone(host);
                let create_reader = Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
                    Self::DirectoryReader.build(&ctx, &reader_host)
                })?
                .with_name("createReader")?;
                object.set("createReader", create_reader)?;

                let get_file = Function::new(ctx.clone(), |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
                    get_file(&ctx, &args.0).map_err(|e| e.throw(&ctx))
                })?
                .with_name("getFile")?;
                object.set("getFile", get_file)?;
            }
            Self::DirectoryReader => {
                let host = Rc::clone(host);
                let read_entries = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
                    read_entries(&ctx, &host.fs, &args.0).map_err(|e| e.throw(&ctx))
                })?
                .with_name("readEntries")?;
                object.set("readEntries", read_entries)?;
            }
            Self::FileReader => {
                object.set("kind", "FileReader")?;
                let host = Rc::clone(host);
                let read_as_text = Function::new(
                    ctx.clone(),
                    move |ctx: Ctx<'js>, this: This<Value<'js>>, args: Rest<Value<'js>>| {
                        read_as_text(&ctx, &host.fs, this.0, &args.0).map_err(|e| e.throw(&ctx))
                    },
                )?
                .with_name("readAsText")?;
                object.set("readAsText", read_as_text)?;
            }
        }
        debug_assert!(self.has_declared_shape(&object), "{self:?} built with undeclared keys");
        Ok(object)
    }

    /// Whether `object` carries exactly this capability's methods and fields.
    pub fn has_declared_shape(self, object: &Object<'_>) -> bool {
        let declared = self.methods().len() + self.fields().len();
        let present = self
            .methods()
            .iter()
            .chain(self.fields())
            .all(|key| object.contains_key(*key).unwrap_or(false));
        present && object.keys::<String>().count() == declared
    }
}

/// Install `console`, `requestFileSystem` and `FileReader` on the context's
/// global object.
pub fn install_globals<'js>(ctx: &Ctx<'js>, host: &Rc<Host>) -> rquickjs::Result<()> {
    let globals = ctx.globals();

    globals.set("console", Capability::Console.build(ctx, host)?)?;

    let fs_host = Rc::clone(host);
    let request_file_system = Function::new(ctx.clone(), move |ctx: Ctx<'js>, args: Rest<Value<'js>>| {
        request_file_system(&ctx, &fs_host, &args.0).map_err(|e| e.throw(&ctx))
    })?
    .with_name("requestFileSystem")?;
    globals.set("requestFileSystem", request_file_system)?;

    let reader_host = Rc::clone(host);
    let file_reader = Function::new(ctx.clone(), move |ctx: Ctx<'js>| {
        Capability::FileReader.build(&ctx, &reader_host)
    })?
    .with_name("FileReader")?
    .with_constructor(true);
    globals.set("FileReader", file_reader)?;

    Ok(())
}

fn console_log<'js>(ctx: &Ctx<'js>, output: &Output, args: Vec<Value<'js>>) -> rquickjs::Result<()> {
    let Some(value) = args.into_iter().next() else {
        return Ok(());
    };
    let line = render(ctx, &value);
    if let Err(e) = output.writeln(&line) {
        warn!(error = %e, "console.log write failed");
    }
    Ok(())
}

/// Printable form of a logged value: strings verbatim, everything else as
/// JSON where it has a JSON form, otherwise its string coercion. Never throws.
fn render<'js>(ctx: &Ctx<'js>, value: &Value<'js>) -> String {
    if value.is_undefined() {
        return "undefined".to_string();
    }
    match bridge::from_engine(value) {
        Ok(BridgedValue::String(s)) => return s,
        Ok(bridged) => {
            if let Ok(json) = serde_json::to_string(&bridged) {
                return json;
            }
        }
        Err(CapabilityError::Engine(err)) => discard(ctx, &err),
        Err(_) => {}
    }
    match ctx.json_stringify(value.clone()) {
        Ok(Some(json)) => match json.to_string() {
            Ok(text) => return text,
            Err(err) => discard(ctx, &err),
        },
        Ok(None) => {}
        Err(err) => discard(ctx, &err),
    }
    match bridge::coerce_string(value) {
        Ok(text) => text,
        Err(err) => {
            discard(ctx, &err);
            describe(value)
        }
    }
}

/// Drop the exception behind `err` so it does not escape `console.log`.
fn discard(ctx: &Ctx<'_>, err: &rquickjs::Error) {
    if err.is_exception() {
        let _ = ctx.catch();
    }
}

/// Last-resort rendering for values with no string coercion (symbols).
fn describe(value: &Value<'_>) -> String {
    let description = value
        .as_symbol()
        .and_then(|symbol| symbol.description().ok())
        .and_then(|d| d.as_string().and_then(|s| s.to_string().ok()));
    match description {
        Some(description) => format!("Symbol({description})"),
        None if value.is_symbol() => "Symbol()".to_string(),
        None => format!("[{}]", value.type_name()),
    }
}

fn request_file_system<'js>(ctx: &Ctx<'js>, host: &Rc<Host>, args: &[Value<'js>]) -> Result<(), CapabilityError> {
    expect_arity("requestFileSystem", args, 1)?;
    let callback = expect_function("requestFileSystem", "callback", &args[0])?;
    debug!("requestFileSystem");
    let fs = Capability::FileSystem.build(ctx, host)?;
    Completion::new("requestFileSystem", callback).deliver_value(ctx, fs.into_value())
}

fn read_entries<'js>(ctx: &Ctx<'js>, fs: &HostFs, args: &[Value<'js>]) -> Result<(), CapabilityError> {
    expect_arity("readEntries", args, 1)?;
    let callback = expect_function("readEntries", "callback", &args[0])?;
    let entries = fs.list_entries();
    debug!(root = %fs.root().display(), count = entries.len(), "readEntries");
    Completion::new("readEntries", callback).deliver(ctx, &BridgedValue::from(entries))
}

// Existence is not checked and `onerror` is never called: every name
// succeeds with a synthetic file entry.
fn get_file<'js>(ctx: &Ctx<'js>, args: &[Value<'js>]) -> Result<(), CapabilityError> {
    expect_arity("getFile", args, 3)?;
    let on_success = expect_function("getFile", "onsuccess", &args[2])?;
    let name = bridge::coerce_string(&args[0])?;
    debug!(%name, "getFile");
    let entry = EntryDescriptor::synthetic_file(name);
    Completion::new("getFile", on_success).deliver(ctx, &BridgedValue::from(entry))
}

fn read_as_text<'js>(
    ctx: &Ctx<'js>,
    fs: &HostFs,
    this: Value<'js>,
    args: &[Value<'js>],
) -> Result<(), CapabilityError> {
    if args.len() != 1 {
        return Err(CapabilityError::Argument {
            op: "readAsText",
            reason: format!("expected 1 argument (file), got {}", args.len()),
        });
    }
    let reader = this.into_object().ok_or_else(|| CapabilityError::Argument {
        op: "readAsText",
        reason: "must be called on a FileReader".to_string(),
    })?;

    let name = file_name(&args[0])?;
    let content = fs.read_text(&name).map_err(|e| {
        debug!(%name, error = %e, "readAsText open failed");
        CapabilityError::FileNotFound {
            op: "readAsText",
            path: name.clone(),
        }
    })?;
    debug!(%name, bytes = content.len(), "readAsText");
    reader.set("result", bridge::to_engine(ctx, &BridgedValue::String(content))?)?;

    let on_load_end: Value = reader.get("onloadend")?;
    if on_load_end.is_undefined() {
        return Err(CapabilityError::MissingCallback {
            op: "readAsText",
            property: "onloadend",
        });
    }
    let callback = expect_function("readAsText", "onloadend", &on_load_end)?;
    Completion::new("readAsText", callback)
        .with_this(reader.into_value())
        .deliver(ctx, &BridgedValue::empty_record())
}

fn file_name(file: &Value<'_>) -> Result<String, CapabilityError> {
    let invalid = || CapabilityError::InvalidFile { op: "readAsText" };
    let file = file.as_object().ok_or_else(invalid)?;
    let name: Value = file.get("name")?;
    if name.is_undefined() {
        return Err(invalid());
    }
    Ok(bridge::coerce_string(&name)?)
}
