use owo_colors::OwoColorize;
use std::fmt::Display;

use crate::error::SelectionError;

const AFFIRMATIVE: &str = "yes";
const QUIT_TOKENS: [&str; 2] = ["q", "quit"];

pub fn fmt_error<D: Display>(err: D) -> String {
    format!("{} {err}", "Error:".red().bold())
}

/// Only a literal `yes` counts, anything else (including `y`) declines.
pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case(AFFIRMATIVE)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    Quit,
    /// Zero-based position in the listing.
    Index(usize),
}

/// Parses a 1-based bucket number (or a quit token) typed by the user.
pub fn parse_selection(
    input: &str,
    count: usize,
) -> Result<Selection, SelectionError> {
    let input = input.trim();

    if QUIT_TOKENS
        .iter()
        .any(|token| input.eq_ignore_ascii_case(token))
    {
        return Ok(Selection::Quit);
    }

    let index: usize = input
        .parse()
        .map_err(|_| SelectionError::NotANumber(input.to_owned()))?;

    if index == 0 || index > count {
        return Err(SelectionError::OutOfRange { index, count });
    }

    Ok(Selection::Index(index - 1))
}

// https://users.rust-lang.org/t/is-there-a-simple-way-to-give-a-default-string-if-the-string-variable-is-empty/100411

pub trait StringExt {
    fn or(
        self,
        dflt: &str,
    ) -> String;
}

impl<S: Into<String>> StringExt for S {
    fn or(
        self,
        dflt: &str,
    ) -> String {
        // Re-use a `String`s capacity, maybe
        let mut s = self.into();
        if s.is_empty() {
            s.push_str(dflt);
        }
        s
    }
}
