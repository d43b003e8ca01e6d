//! Interactive loop and scripted command runs.

use std::io::{self, BufRead, Write};

use secretary_core::{Parser, Response, Severity};

use crate::render::{render, UiContext};

const EXIT_WORDS: &[&str] = &["bye", "quit", "exit"];

fn show(ctx: &UiContext, response: &Response) {
    let Some(text) = render(ctx, response) else {
        return;
    };
    match response.severity {
        Severity::Ok => println!("{}", text),
        _ => eprintln!("{}", text),
    }
}

/// Run `commands` in order; returns whether every one succeeded.
pub fn run_commands(parser: &mut Parser, ctx: &UiContext, commands: &[String]) -> bool {
    let mut all_ok = true;
    for command in commands {
        let response = parser.execute(command);
        all_ok &= !matches!(response.severity, Severity::Error | Severity::Exception);
        show(ctx, &response);
    }
    show(ctx, &parser.quit());
    all_ok
}

/// Read lines until an exit word or end of input.
pub fn run_repl(parser: &mut Parser, ctx: &UiContext) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("{}", parser.prompt());
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            println!();
            break;
        }
        let trimmed = line.trim();
        if EXIT_WORDS.contains(&trimmed) {
            break;
        }
        show(ctx, &parser.execute(trimmed));
    }

    show(ctx, &parser.quit());
    Ok(())
}
