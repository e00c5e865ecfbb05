//! Where the prompt, `console.log` and diagnostics are written.

use std::cell::RefCell;
use std::io::Write;
use std::rc::Rc;

/// A cheaply cloneable output sink.
///
/// `Buffer` clones share one buffer, so a capability closure and the test
/// that inspects its output see the same bytes.
#[derive(Clone, Debug)]
pub enum Output {
    Stdout,
    Buffer(Rc<RefCell<Vec<u8>>>),
}

impl Default for Output {
    fn default() -> Self {
        Self::Stdout
    }
}

impl Output {
    pub fn buffer() -> Self {
        Self::Buffer(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn write(&self, data: &[u8]) -> std::io::Result<()> {
        match self {
            Output::Stdout => {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(data)?;
                stdout.flush()
            }
            Output::Buffer(buf) => {
                buf.borrow_mut().extend_from_slice(data);
                Ok(())
            }
        }
    }

    pub fn writeln(&self, s: &str) -> std::io::Result<()> {
        self.write(s.as_bytes())?;
        self.write(b"\n")
    }

    /// Everything written so far. Always empty for `Stdout`.
    pub fn contents(&self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buf) => String::from_utf8_lossy(&buf.borrow()).into_owned(),
        }
    }

    /// Drain what has been written so far.
    pub fn take(&self) -> String {
        match self {
            Output::Stdout => String::new(),
            Output::Buffer(buf) => {
                let bytes = std::mem::take(&mut *buf.borrow_mut());
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }
}
