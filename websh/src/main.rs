use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{CompletionType, Config, Editor};
use std::fs::File;
use std::io::{BufReader, IsTerminal};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use websh::{BufReadSource, LineSource, ReadLine, Shell, ShellBuilder, WebshError, WebshResult};
use websh_config::{LogFormat, LoggingConfig, ShellConfig, WebshConfig};

mod completer;

/// websh - run JavaScript programs as shell commands
#[derive(Parser, Debug)]
#[command(name = "websh", version, about)]
struct Args {
    /// Execute one command line and exit
    #[arg(short = 'c')]
    command: Option<String>,

    /// Working directory for scripts and the filesystem API
    #[arg(short = 'C', long = "dir", env = "WEBSH_WORKDIR")]
    dir: Option<PathBuf>,

    /// Configuration file (overrides the default search path)
    #[arg(long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// File of command lines to execute instead of reading stdin
    batch: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let loaded = match &args.config {
        Some(path) => websh_config::load_from_file(path),
        None => websh_config::load(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Warning: Failed to load config: {e}, using defaults");
        WebshConfig::default()
    });

    init_logging(&config.logging, args.debug);

    let mut builder = ShellBuilder::from_config(&config);
    if let Some(dir) = &args.dir {
        builder = builder.workdir(dir);
    }
    let shell = match builder.build() {
        Ok(shell) => shell,
        Err(e) => {
            eprintln!("websh: {e}");
            std::process::exit(1);
        }
    };

    if let Some(command) = args.command {
        shell.execute_line(&command);
    } else if let Some(batch) = args.batch {
        let file = match File::open(&batch) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("websh: cannot read '{}': {}", batch.display(), e);
                std::process::exit(1);
            }
        };
        shell.run(&mut BufReadSource::new(BufReader::new(file), None))?;
    } else if std::io::stdin().is_terminal() {
        run_repl(&shell, &config.shell)?;
    } else {
        let stdin = std::io::stdin().lock();
        shell.run(&mut BufReadSource::new(stdin, Some(shell.output().clone())))?;
    }

    shell.shutdown();
    Ok(())
}

fn init_logging(config: &LoggingConfig, debug: bool) {
    let level = if debug { "debug" } else { config.level.as_str() };
    let directives = if config.filter.is_empty() {
        level.to_string()
    } else {
        format!("{level},{}", config.filter)
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match config.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().init(),
    }
}

/// Interactive input through rustyline, with history and completion.
struct EditorSource {
    editor: Editor<completer::WebshHelper, DefaultHistory>,
}

impl LineSource for EditorSource {
    fn read_line(&mut self, prompt: &str) -> WebshResult<ReadLine> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(ReadLine::Line(line))
            }
            Err(ReadlineError::Interrupted) => Ok(ReadLine::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadLine::Eof),
            Err(err) => Err(WebshError::Readline(err.to_string())),
        }
    }
}

fn run_repl(shell: &Shell, shell_config: &ShellConfig) -> Result<(), Box<dyn std::error::Error>> {
    let rl_config = Config::builder()
        .completion_type(CompletionType::List)
        .max_history_size(shell_config.history.max_entries)?
        .history_ignore_dups(true)?
        .history_ignore_space(true)
        .build();

    let helper = completer::WebshHelper::new(
        shell.workdir().to_path_buf(),
        shell_config.script_extension.clone(),
    );
    let mut editor = Editor::with_config(rl_config)?;
    editor.set_helper(Some(helper));

    let history_path = shell_config
        .history
        .enabled
        .then(|| websh_config::expand_path(&shell_config.history.file));
    if let Some(path) = &history_path {
        if let Err(e) = editor.load_history(path) {
            debug!(path = %path.display(), error = %e, "no history loaded");
        }
    }

    let mut source = EditorSource { editor };
    shell.run(&mut source)?;

    if let Some(path) = &history_path {
        let _ = source.editor.save_history(path);
    }

    Ok(())
}
