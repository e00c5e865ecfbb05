//! End-to-end tests for the websh command loop
//!
//! Each test copies the shipped commands under `scripts/` and the fixtures
//! under `tests/scripts/` into a scratch working directory, feeds command lines through [`Shell::run`], and
//! compares the full transcript (prompts, script output, diagnostics).

use pretty_assertions::assert_eq;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use websh::{BufReadSource, CommandOutcome, Output, SessionError, Shell};

const PROMPT: &str = "$ ";

fn manifest_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

struct Workspace {
    dir: TempDir,
    output: Output,
    shell: Shell,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        for scripts in ["scripts", "tests/scripts"] {
            let scripts = manifest_dir().join(scripts);
            for entry in fs::read_dir(&scripts).expect("scripts dir missing").flatten() {
                fs::copy(entry.path(), dir.path().join(entry.file_name())).expect("copy failed");
            }
        }

        let output = Output::buffer();
        let shell = Shell::builder()
            .workdir(dir.path())
            .prompt(PROMPT)
            .output(output.clone())
            .build()
            .expect("shell failed to start");
        Self { dir, output, shell }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) {
        fs::write(self.path().join(name), content).expect("write failed");
    }

    /// Run `input` through the loop and return everything written.
    fn session(&self, input: &str) -> String {
        let mut source = BufReadSource::new(Cursor::new(input.to_string()), Some(self.output.clone()));
        self.shell.run(&mut source).expect("loop failed");
        self.output.take()
    }
}

#[test]
fn hello_prints_its_arguments() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("hello arg1 arg2\n"),
        "$ [\"hello\",\"arg1\",\"arg2\"]\n$ Exiting.\n"
    );
}

#[test]
fn missing_command_is_reported_and_loop_continues() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("missing\nhello again\n"),
        "$ websh: missing: command not found\n$ [\"hello\",\"again\"]\n$ Exiting.\n"
    );
}

#[test]
fn not_found_diagnostic_keeps_the_literal_line() {
    let ws = Workspace::new();
    assert_eq!(
        ws.shell.execute_line("missing  with   spaces"),
        CommandOutcome::NotFound
    );
    assert_eq!(
        ws.output.take(),
        "websh: missing  with   spaces: command not found\n"
    );
}

#[test]
fn end_of_input_exits_immediately() {
    let ws = Workspace::new();
    assert_eq!(ws.session(""), "$ Exiting.\n");
}

#[test]
fn blank_lines_are_skipped() {
    let ws = Workspace::new();
    assert_eq!(ws.session("\n   \n"), "$ $ $ Exiting.\n");
}

#[test]
fn ls_lists_the_working_directory() {
    let ws = Workspace::new();
    fs::remove_dir_all(ws.path()).unwrap();
    fs::create_dir(ws.path()).unwrap();
    fs::copy(
        manifest_dir().join("scripts/ls.js"),
        ws.path().join("ls.js"),
    )
    .unwrap();
    ws.write("notes.txt", "x");
    fs::create_dir(ws.path().join("docs")).unwrap();

    assert_eq!(ws.session("ls\n"), "$ docs/\nls.js\nnotes.txt\n$ Exiting.\n");
}

#[test]
fn cat_prints_file_contents() {
    let ws = Workspace::new();
    ws.write("notes.txt", "first line\nsecond line\n");
    assert_eq!(
        ws.session("cat notes.txt\n"),
        "$ first line\nsecond line\n\n$ Exiting.\n"
    );
}

#[test]
fn cat_usage_without_argument() {
    let ws = Workspace::new();
    assert_eq!(ws.session("cat\n"), "$ Usage: cat filename\n$ Exiting.\n");
}

#[test]
fn cat_of_missing_file_is_an_error_from_main() {
    let ws = Workspace::new();
    let outcome = ws.shell.execute_line("cat nope.txt");
    assert_eq!(
        outcome,
        CommandOutcome::Failed(SessionError::Main(
            "FileNotFound: readAsText: file not found: nope.txt".to_string()
        ))
    );
    assert_eq!(
        ws.output.take(),
        "websh: error calling main(): FileNotFound: readAsText: file not found: nope.txt\n"
    );
}

#[test]
fn scripts_can_catch_capability_errors() {
    let ws = Workspace::new();
    ws.write("present.txt", "here");
    assert_eq!(
        ws.session("safecat absent.txt\nsafecat present.txt\n"),
        "$ FileNotFound: absent.txt\n$ here\n$ Exiting.\n"
    );
}

#[test]
fn compile_errors_are_reported() {
    let ws = Workspace::new();
    let outcome = ws.shell.execute_line("broken");
    assert!(matches!(outcome, CommandOutcome::Failed(SessionError::Compile(_))));
    let out = ws.output.take();
    assert!(out.starts_with("websh: compile error: SyntaxError"), "{out}");
    assert!(!out.contains("never printed"));
}

#[test]
fn top_level_errors_are_runtime_errors() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("early\n"),
        "$ websh: runtime error: TypeError: at load\n$ Exiting.\n"
    );
}

#[test]
fn scripts_without_main_are_reported() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("nomain\n"),
        "$ top level only\nwebsh: main() not found\n$ Exiting.\n"
    );
}

#[test]
fn output_before_an_exception_is_kept() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("boom\nhello still-alive\n"),
        "$ partial\nwebsh: error calling main(): Error: boom\n$ [\"hello\",\"still-alive\"]\n$ Exiting.\n"
    );
}

#[test]
fn state_does_not_survive_between_commands() {
    let ws = Workspace::new();
    ws.write(
        "set.js",
        "function main() { globalThis.stash = 'kept?'; console.log('set'); }",
    );
    ws.write("get.js", "function main() { console.log(typeof stash); }");
    assert_eq!(ws.session("set\nget\n"), "$ set\n$ undefined\n$ Exiting.\n");
}

#[test]
fn get_file_never_calls_onerror() {
    let ws = Workspace::new();
    ws.write(
        "probe.js",
        r#"function main(argv) {
  let success = 0;
  let failure = 0;
  requestFileSystem((fs) => {
    fs.root.getFile(argv[1], () => failure++, (file) => {
      success++;
      console.log(`${file.name} ${file.isFile} ${file.isDirectory}`);
    });
  });
  console.log(`${success}/${failure}`);
}"#,
    );
    assert_eq!(
        ws.session("probe ghost.txt\n"),
        "$ ghost.txt true false\n1/0\n$ Exiting.\n"
    );
}

#[test]
fn quoted_arguments_are_split() {
    let ws = Workspace::new();
    assert_eq!(
        ws.session("hello \"foo bar\"\n"),
        "$ [\"hello\",\"\\\"foo\",\"bar\\\"\"]\n$ Exiting.\n"
    );
}

#[test]
fn shebang_scripts_run() {
    let ws = Workspace::new();
    ws.write(
        "tool.js",
        "#!/usr/bin/env websh\nfunction main(argv) { console.log(argv.length); }",
    );
    assert_eq!(ws.session("tool a b\n"), "$ 3\n$ Exiting.\n");
}

#[test]
fn script_code_does_not_run_before_it_compiles() {
    let ws = Workspace::new();
    ws.write(
        "escape.js",
        "}); console.log('too early'); (function(){",
    );
    let outcome = ws.shell.execute_line("escape");
    assert!(matches!(outcome, CommandOutcome::Failed(SessionError::Compile(_))));
    let out = ws.output.take();
    assert!(out.starts_with("websh: compile error: SyntaxError"), "{out}");
    assert!(!out.contains("too early"));
}
