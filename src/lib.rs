use crate::cli::{Args, Process};
use crate::helpers::fmt_error;
use clap::{Command, CommandFactory, Parser};
use clap_complete::{Generator, generate};
use std::io;

pub mod cli;
pub mod config;
pub mod console;
pub mod decommission;
pub mod error;
pub mod gateway;
pub mod helpers;
pub mod inspect;
pub mod purge;

#[cfg(test)]
pub(crate) mod testing;

pub fn print_completions<G: Generator>(
    generator: G,
    cmd: &mut Command,
) {
    // get_name returns a str, to_owned = to_string (but restriction::str_to_string)
    generate(generator, cmd, cmd.get_name().to_owned(), &mut io::stdout());
}

/// Runs the tool and returns the process exit code.
pub async fn async_main_rs() -> i32 {
    let args = Args::parse();

    if let Some(generator) = args.generator {
        let mut cmd = Args::command();

        print_completions(generator, &mut cmd);
        0
    } else {
        args.process().await.unwrap_or_else(|msg| {
            eprintln!("{}", fmt_error(format!("{msg:#}")));
            1
        })
    }
}
