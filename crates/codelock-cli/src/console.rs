//! Console rendering of the status line.

use codelock_engine::StatusDisplay;
use std::io::{self, Write};

/// Redraws the status line in place on a terminal.
#[derive(Debug)]
pub struct ConsoleDisplay<W> {
    out: W,
}

impl ConsoleDisplay<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> StatusDisplay for ConsoleDisplay<W> {
    fn show(&mut self, line: &str) {
        // Console output is best effort.
        let _ = write!(self.out, "\r\x1b[2K[ {line:<8} ]");
        let _ = self.out.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redraws_in_place() {
        let mut display = ConsoleDisplay::new(Vec::new());
        display.show("***5");
        display.show("");

        let written = String::from_utf8(display.into_inner()).unwrap();
        assert_eq!(written, "\r\x1b[2K[ ***5     ]\r\x1b[2K[          ]");
    }
}
