use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use std::borrow::Cow;
use std::path::PathBuf;

/// Completes command names from the scripts in the working directory and
/// arguments from the file names there.
pub struct WebshHelper {
    pub workdir: PathBuf,
    pub script_extension: String,
}

impl WebshHelper {
    pub fn new(workdir: PathBuf, script_extension: String) -> Self {
        Self {
            workdir,
            script_extension,
        }
    }

    fn scripts(&self) -> Vec<String> {
        let suffix = format!(".{}", self.script_extension);
        let Ok(entries) = std::fs::read_dir(&self.workdir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                name.strip_suffix(&suffix).map(str::to_string)
            })
            .collect();
        names.sort();
        names
    }

    fn files(&self, partial: &str) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(&self.workdir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                if !name.starts_with(partial) {
                    return None;
                }
                let is_dir = entry.file_type().is_ok_and(|ft| ft.is_dir());
                Some(if is_dir { format!("{name}/") } else { name })
            })
            .collect();
        names.sort();
        names
    }
}

impl Completer for WebshHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let (start, word) = find_word_start(line_to_cursor);

        let is_first_word = !line_to_cursor[..start].contains(|c: char| !c.is_whitespace());

        let candidates = if is_first_word {
            self.scripts()
                .into_iter()
                .filter(|name| name.starts_with(word))
                .collect()
        } else {
            self.files(word)
        };

        let completions = candidates
            .into_iter()
            .map(|name| Pair {
                display: name.clone(),
                replacement: name,
            })
            .collect();

        Ok((start, completions))
    }
}

fn find_word_start(line: &str) -> (usize, &str) {
    let mut start = line.len();
    for (i, c) in line.char_indices().rev() {
        if c.is_whitespace() {
            break;
        }
        start = i;
    }
    (start, &line[start..])
}

impl Hinter for WebshHelper {
    type Hint = String;

    fn hint(&self, _line: &str, _pos: usize, _ctx: &Context<'_>) -> Option<String> {
        None
    }
}

impl Highlighter for WebshHelper {
    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Borrowed(hint)
    }
}

impl Validator for WebshHelper {}

impl Helper for WebshHelper {}
