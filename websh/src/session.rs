//! Execution session: compile, run and dispatch one script invocation.
//!
//! A session walks `Loaded -> Compiled -> Run -> Dispatched`. Any failure is
//! terminal. The engine context is created on entry to [`Session::run`] and
//! dropped before it returns, whatever the outcome.

use crate::bridge::{self, BridgedValue};
use crate::capability::{self, Host};
use crate::engine::{CompiledScript, Engine};
use crate::error::SessionError;
use rquickjs::{Ctx, Value};
use std::rc::Rc;
use tracing::debug;

/// Entry point every script must define.
pub const ENTRY_POINT: &str = "main";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loaded,
    Compiled,
    Run,
    Dispatched,
    Failed,
}

/// How a session ended when nothing threw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// `main` ran to completion
    Completed,
    /// The script ran but defines no callable `main`
    MainNotFound,
}

pub struct Session<'e> {
    engine: &'e Engine,
    host: Rc<Host>,
    command: String,
    state: SessionState,
}

impl<'e> Session<'e> {
    /// A session for a script whose source has already been loaded.
    pub fn new(engine: &'e Engine, host: Rc<Host>, command: impl Into<String>) -> Self {
        Self {
            engine,
            host,
            command: command.into(),
            state: SessionState::Loaded,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Compile and run `source`, then call `main(argv)`.
    pub fn run(&mut self, source: &str, argv: &[String]) -> Result<SessionOutcome, SessionError> {
        let context = self
            .engine
            .new_context()
            .map_err(|e| SessionError::Internal(e.to_string()))?;

        let result = context.with(|ctx| self.execute(&ctx, source, argv));
        drop(context);

        if let Err(ref e) = result {
            debug!(command = %self.command, from = ?self.state, error = %e, "session failed");
            self.state = SessionState::Failed;
        }
        result
    }

    fn execute<'js>(
        &mut self,
        ctx: &Ctx<'js>,
        source: &str,
        argv: &[String],
    ) -> Result<SessionOutcome, SessionError> {
        capability::install_globals(ctx, &self.host)
            .map_err(|e| SessionError::Internal(caught(ctx, e)))?;

        let script = CompiledScript::compile(ctx, &self.command, source)
            .map_err(|e| SessionError::Compile(caught(ctx, e)))?;
        self.transition(SessionState::Compiled);

        script
            .run()
            .map_err(|e| SessionError::Runtime(caught(ctx, e)))?;
        self.transition(SessionState::Run);

        let entry: Value = ctx
            .globals()
            .get(ENTRY_POINT)
            .map_err(|e| SessionError::Internal(caught(ctx, e)))?;
        let Some(main) = entry.into_function() else {
            debug!(command = %self.command, "no main() defined");
            return Ok(SessionOutcome::MainNotFound);
        };

        let args = BridgedValue::from(argv.to_vec());
        let args = bridge::to_engine(ctx, &args).map_err(|e| SessionError::Internal(caught(ctx, e)))?;
        main.call::<_, Value>((args,))
            .map_err(|e| SessionError::Main(caught(ctx, e)))?;
        self.transition(SessionState::Dispatched);

        Ok(SessionOutcome::Completed)
    }

    fn transition(&mut self, next: SessionState) {
        debug!(command = %self.command, from = ?self.state, to = ?next, "session transition");
        self.state = next;
    }
}

/// Text of the exception behind `err`, as the engine stringifies it.
fn caught(ctx: &Ctx<'_>, err: rquickjs::Error) -> String {
    match err {
        rquickjs::Error::Exception => {
            let thrown = ctx.catch();
            bridge::coerce_string(&thrown).unwrap_or_else(|_| "<unprintable exception>".to_string())
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host_fs::HostFs;
    use crate::output::Output;
    use tempfile::TempDir;
    use websh_config::EngineConfig;

    struct Fixture {
        engine: Engine,
        host: Rc<Host>,
        output: Output,
        _dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let output = Output::buffer();
            Self {
                engine: Engine::init(&EngineConfig::default()).unwrap(),
                host: Rc::new(Host::new(HostFs::new(dir.path()), output.clone())),
                output,
                _dir: dir,
            }
        }

        fn run(&self, source: &str, argv: &[&str]) -> (Result<SessionOutcome, SessionError>, SessionState) {
            let argv: Vec<String> = argv.iter().map(|s| (*s).to_string()).collect();
            let mut session = Session::new(&self.engine, Rc::clone(&self.host), "test");
            assert_eq!(session.state(), SessionState::Loaded);
            let result = session.run(source, &argv);
            (result, session.state())
        }
    }

    #[test]
    fn main_receives_argv() {
        let fx = Fixture::new();
        let (result, state) = fx.run("function main(argv) { console.log(argv); }", &["hello", "arg1", "arg2"]);
        assert_eq!(result, Ok(SessionOutcome::Completed));
        assert_eq!(state, SessionState::Dispatched);
        assert_eq!(fx.output.contents(), "[\"hello\",\"arg1\",\"arg2\"]\n");
    }

    #[test]
    fn syntax_errors_fail_before_anything_runs() {
        let fx = Fixture::new();
        let (result, state) = fx.run("console.log('ran'); function main( {", &["x"]);
        match result {
            Err(SessionError::Compile(text)) => assert!(text.starts_with("SyntaxError"), "{text}"),
            other => panic!("expected compile error, got {other:?}"),
        }
        assert_eq!(state, SessionState::Failed);
        assert_eq!(fx.output.contents(), "");
    }

    #[test]
    fn code_that_escapes_a_function_wrapper_does_not_run_at_compile() {
        let fx = Fixture::new();
        let (result, state) = fx.run(
            "}); console.log('ran during compile'); (function(){",
            &["x"],
        );
        assert!(matches!(result, Err(SessionError::Compile(_))), "{result:?}");
        assert_eq!(state, SessionState::Failed);
        assert_eq!(fx.output.contents(), "");
    }

    #[test]
    fn shebang_line_is_accepted() {
        let fx = Fixture::new();
        let (result, state) = fx.run(
            "#!/usr/bin/env websh\nfunction main(argv) { console.log(argv[0]); }",
            &["tool"],
        );
        assert_eq!(result, Ok(SessionOutcome::Completed));
        assert_eq!(state, SessionState::Dispatched);
        assert_eq!(fx.output.contents(), "tool\n");
    }

    #[test]
    fn top_level_exceptions_are_runtime_errors() {
        let fx = Fixture::new();
        let (result, state) = fx.run(
            "console.log('before'); throw new Error('top'); function main() {}",
            &["x"],
        );
        assert_eq!(result, Err(SessionError::Runtime("Error: top".to_string())));
        assert_eq!(state, SessionState::Failed);
        // output produced before the failure is kept
        assert_eq!(fx.output.contents(), "before\n");
    }

    #[test]
    fn missing_main_is_not_an_error() {
        let fx = Fixture::new();
        let (result, state) = fx.run("var main = 3;", &["x"]);
        assert_eq!(result, Ok(SessionOutcome::MainNotFound));
        assert_eq!(state, SessionState::Run);
    }

    #[test]
    fn main_exceptions_are_reported() {
        let fx = Fixture::new();
        let (result, _) = fx.run("function main() { throw 'plain string'; }", &["x"]);
        assert_eq!(result, Err(SessionError::Main("plain string".to_string())));
    }

    #[test]
    fn uncaught_capability_errors_surface_from_main() {
        let fx = Fixture::new();
        let (result, _) = fx.run("function main() { requestFileSystem(); }", &["x"]);
        assert_eq!(
            result,
            Err(SessionError::Main(
                "ArityError: requestFileSystem: expected 1 argument(s), got 0".to_string()
            ))
        );
    }

    #[test]
    fn sessions_do_not_leak_globals() {
        let fx = Fixture::new();
        let (first, _) = fx.run("var counter = 41; function main() {}", &["a"]);
        assert_eq!(first, Ok(SessionOutcome::Completed));

        let (second, _) = fx.run("function main() { console.log(typeof counter); }", &["b"]);
        assert_eq!(second, Ok(SessionOutcome::Completed));
        assert_eq!(fx.output.contents(), "undefined\n");
    }
}
