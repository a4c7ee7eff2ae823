use owo_colors::OwoColorize;
use std::io::{self, BufRead, StdinLock, Write};

use crate::helpers::fmt_error;

/// Line-oriented user interaction of a decommissioning session.
pub trait Console {
    /// `None` once the input is exhausted.
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>>;

    fn say(
        &mut self,
        line: &str,
    );

    fn warn(
        &mut self,
        line: &str,
    );

    fn fail(
        &mut self,
        line: &str,
    );
}

/// Blocking console reading lines from `input` and writing to stdout.
#[derive(Debug)]
pub struct Terminal<R> {
    input: R,
}

impl Terminal<StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Terminal<R> {
    pub const fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Console for Terminal<R> {
    fn read_line(
        &mut self,
        prompt: &str,
    ) -> io::Result<Option<String>> {
        let mut stdout = io::stdout().lock();
        write!(stdout, "{}", prompt.bold())?;
        stdout.flush()?;

        let mut line = Vec::new();
        if self.input.read_until(b'\n', &mut line)? == 0 {
            // print the newline the user never typed
            writeln!(stdout)?;
            return Ok(None);
        }

        // undecodable bytes end up in a diagnostic instead of an I/O error
        Ok(Some(String::from_utf8_lossy(&line).trim().to_owned()))
    }

    fn say(
        &mut self,
        line: &str,
    ) {
        println!("{line}");
    }

    fn warn(
        &mut self,
        line: &str,
    ) {
        println!("{}", line.yellow().bold());
    }

    fn fail(
        &mut self,
        line: &str,
    ) {
        eprintln!("{}", fmt_error(line));
    }
}
