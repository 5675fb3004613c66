use clap::{FromArgMatches, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "",
    no_binary_name = true,
    disable_help_flag = true,
    disable_version_flag = true,
    next_line_help = false,
    help_template = "{usage-heading} {usage}\n{all-args}"
)]
struct Input<T: FromArgMatches + Subcommand> {
    #[command(subcommand)]
    command: T,
}

/// Parses one line typed at a console into a subcommand.
pub fn parse_line<T: FromArgMatches + Subcommand>(line: &str) -> Result<T, clap::Error> {
    Input::<T>::try_parse_from(line.split_whitespace()).map(|Input { command }| command)
}

/// Blocks on stdin until a valid command is typed. `None` once stdin is closed.
pub fn read_command<T: FromArgMatches + Subcommand>() -> Option<T> {
    loop {
        let mut line = String::new();
        if let Err(_) | Ok(0) = std::io::stdin().read_line(&mut line) {
            return None;
        }

        match parse_line(&line) {
            Ok(command) => return Some(command),
            Err(err) => print!("{err}"),
        }
    }
}
