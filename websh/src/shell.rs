//! Shell state and the command loop

use crate::capability::Host;
use crate::engine::Engine;
use crate::error::{SessionError, WebshError, WebshResult};
use crate::host_fs::HostFs;
use crate::output::Output;
use crate::session::{Session, SessionOutcome};
use std::io::BufRead;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::{debug, error};
use websh_config::{EngineConfig, WebshConfig};

/// Name used in diagnostics.
pub const SHELL_NAME: &str = "websh";

/// A command line split on whitespace. Quotes are not interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    tokens: Vec<String>,
}

impl CommandLine {
    /// `None` for a blank line.
    pub fn parse(line: &str) -> Option<Self> {
        let tokens: Vec<String> = line.split_whitespace().map(str::to_string).collect();
        if tokens.is_empty() {
            None
        } else {
            Some(Self { tokens })
        }
    }

    /// The script name (token 0).
    pub fn name(&self) -> &str {
        &self.tokens[0]
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// What happened to one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Blank,
    Completed,
    NotFound,
    MainNotFound,
    Failed(SessionError),
}

/// Result of asking a [`LineSource`] for the next line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadLine {
    Line(String),
    Interrupted,
    Eof,
}

/// Where the command loop gets its input from.
pub trait LineSource {
    fn read_line(&mut self, prompt: &str) -> WebshResult<ReadLine>;
}

/// Line source over any buffered reader.
///
/// The prompt is written to `prompt_output` when one is given, so piped
/// input produces the same transcript as an interactive session.
pub struct BufReadSource<R> {
    reader: R,
    prompt_output: Option<Output>,
}

impl<R: BufRead> BufReadSource<R> {
    pub fn new(reader: R, prompt_output: Option<Output>) -> Self {
        Self {
            reader,
            prompt_output,
        }
    }
}

impl<R: BufRead> LineSource for BufReadSource<R> {
    fn read_line(&mut self, prompt: &str) -> WebshResult<ReadLine> {
        if let Some(output) = &self.prompt_output {
            output.write(prompt.as_bytes())?;
        }
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(ReadLine::Eof);
        }
        let trimmed = line.trim_end_matches(['\n', '\r']).len();
        line.truncate(trimmed);
        Ok(ReadLine::Line(line))
    }
}

pub struct Shell {
    engine: Engine,
    host: Rc<Host>,
    prompt: String,
    script_extension: String,
}

impl Shell {
    pub fn builder() -> ShellBuilder {
        ShellBuilder::new()
    }

    pub fn output(&self) -> &Output {
        &self.host.output
    }

    pub fn workdir(&self) -> &std::path::Path {
        self.host.fs.root()
    }

    /// The prompt with its placeholders filled in.
    pub fn prompt(&self) -> String {
        let user = std::env::var("USER").unwrap_or_else(|_| "user".to_string());
        self.prompt
            .replace("{cwd}", &self.workdir().display().to_string())
            .replace("{user}", &user)
    }

    /// Run one input line as a command, printing any diagnostic.
    pub fn execute_line(&self, line: &str) -> CommandOutcome {
        let Some(command) = CommandLine::parse(line) else {
            return CommandOutcome::Blank;
        };

        let Some(source) = self
            .host
            .fs
            .read_script(command.name(), &self.script_extension)
        else {
            self.diagnostic(&format!("{SHELL_NAME}: {line}: command not found"));
            return CommandOutcome::NotFound;
        };

        debug!(command = command.name(), args = command.tokens().len(), "starting session");
        let mut session = Session::new(&self.engine, Rc::clone(&self.host), command.name());
        match session.run(&source, command.tokens()) {
            Ok(SessionOutcome::Completed) => CommandOutcome::Completed,
            Ok(SessionOutcome::MainNotFound) => {
                self.diagnostic(&format!("{SHELL_NAME}: main() not found"));
                CommandOutcome::MainNotFound
            }
            Err(e) => {
                if let SessionError::Internal(detail) = &e {
                    error!(command = command.name(), %detail, "internal session failure");
                }
                self.diagnostic(&format!("{SHELL_NAME}: {e}"));
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Read and execute lines until the source is exhausted.
    pub fn run<S: LineSource>(&self, source: &mut S) -> WebshResult<()> {
        loop {
            match source.read_line(&self.prompt())? {
                ReadLine::Line(line) => {
                    self.execute_line(&line);
                }
                ReadLine::Interrupted => {
                    self.diagnostic("^C");
                }
                ReadLine::Eof => {
                    self.diagnostic("Exiting.");
                    return Ok(());
                }
            }
        }
    }

    pub fn shutdown(self) {
        self.engine.shutdown();
    }

    fn diagnostic(&self, line: &str) {
        if let Err(e) = self.host.output.writeln(line) {
            error!(error = %e, "failed to write diagnostic");
        }
    }
}

/// Builder for [`Shell`].
pub struct ShellBuilder {
    workdir: PathBuf,
    output: Output,
    prompt: String,
    script_extension: String,
    engine: EngineConfig,
}

impl Default for ShellBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellBuilder {
    pub fn new() -> Self {
        Self::from_config(&WebshConfig::default())
    }

    pub fn from_config(config: &WebshConfig) -> Self {
        Self {
            workdir: websh_config::expand_path(&config.shell.workdir),
            output: Output::Stdout,
            prompt: config.shell.prompt.clone(),
            script_extension: config.shell.script_extension.clone(),
            engine: config.engine.clone(),
        }
    }

    pub fn workdir(mut self, workdir: impl Into<PathBuf>) -> Self {
        self.workdir = workdir.into();
        self
    }

    pub fn output(mut self, output: Output) -> Self {
        self.output = output;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn script_extension(mut self, extension: impl Into<String>) -> Self {
        self.script_extension = extension.into();
        self
    }

    pub fn engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Initialize the engine and assemble the shell.
    pub fn build(self) -> Result<Shell, WebshError> {
        let engine = Engine::init(&self.engine)?;
        Ok(Shell {
            engine,
            host: Rc::new(Host::new(HostFs::new(self.workdir), self.output)),
            prompt: self.prompt,
            script_extension: self.script_extension,
        })
    }
}
