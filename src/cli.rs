use std::path::PathBuf;

use crate::models::{ProviderId, SummaryOverrides};

pub const USAGE: &str = "\
Usage: tldr <command> [args]

Commands:
  summarize <post-id> <file> [--language L] [--max-length N] [--style S]
                             [--format F] [--emojis] [--bullets N]
  batch <dir>                summarize every <post-id>.{txt,html,md} in <dir>
  show <post-id>             print the stored summary
  delete <post-id>           delete the stored summary
  disable <post-id>          hide the stored summary
  enable <post-id>           re-enable the stored summary
  test [provider]            run connection diagnostics
  providers                  list providers and their configuration
  stats                      stored summary totals
  help                       show this message";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Summarize {
        post_id: i64,
        file: PathBuf,
        overrides: SummaryOverrides,
    },
    Batch {
        dir: PathBuf,
        overrides: SummaryOverrides,
    },
    Show(i64),
    Delete(i64),
    Disable(i64),
    Enable(i64),
    Test(Option<ProviderId>),
    Providers,
    Stats,
    Help,
}

pub fn parse_args<I, S>(args: I) -> Result<Command, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Help);
    };

    match command.as_str() {
        "summarize" => {
            let (positional, overrides) = parse_options(rest)?;
            match positional.as_slice() {
                [post_id, file] => Ok(Command::Summarize {
                    post_id: parse_post_id(post_id)?,
                    file: PathBuf::from(file),
                    overrides,
                }),
                _ => Err("summarize expects <post-id> <file>".to_string()),
            }
        }
        "batch" => {
            let (positional, overrides) = parse_options(rest)?;
            match positional.as_slice() {
                [dir] => Ok(Command::Batch {
                    dir: PathBuf::from(dir),
                    overrides,
                }),
                _ => Err("batch expects <dir>".to_string()),
            }
        }
        "show" => Ok(Command::Show(single_post_id(command, rest)?)),
        "delete" => Ok(Command::Delete(single_post_id(command, rest)?)),
        "disable" => Ok(Command::Disable(single_post_id(command, rest)?)),
        "enable" => Ok(Command::Enable(single_post_id(command, rest)?)),
        "test" => match rest {
            [] => Ok(Command::Test(None)),
            [provider] => provider.parse().map(|p| Command::Test(Some(p))),
            _ => Err("test takes at most one provider".to_string()),
        },
        "providers" => Ok(Command::Providers),
        "stats" => Ok(Command::Stats),
        "help" | "--help" | "-h" => Ok(Command::Help),
        other => Err(format!("unknown command '{}'", other)),
    }
}

fn parse_post_id(value: &str) -> Result<i64, String> {
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(format!("invalid post id '{}'", value)),
    }
}

fn single_post_id(command: &str, rest: &[String]) -> Result<i64, String> {
    match rest {
        [post_id] => parse_post_id(post_id),
        _ => Err(format!("{} expects <post-id>", command)),
    }
}

fn parse_options(args: &[String]) -> Result<(Vec<String>, SummaryOverrides), String> {
    let mut positional = Vec::new();
    let mut overrides = SummaryOverrides::default();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let arg = arg.as_str();
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} requires a value", flag))
        };
        match arg {
            "--language" => overrides.language = Some(value(arg)?),
            "--max-length" => overrides.max_length = Some(parse_number(arg, &value(arg)?)?),
            "--style" => overrides.style = Some(value(arg)?.parse()?),
            "--format" => overrides.format = Some(value(arg)?.parse()?),
            "--bullets" => overrides.bullet_points = Some(parse_number(arg, &value(arg)?)?),
            "--emojis" => overrides.use_emojis = Some(true),
            flag if flag.starts_with("--") => return Err(format!("unknown option '{}'", flag)),
            _ => positional.push(arg.to_string()),
        }
    }

    Ok((positional, overrides))
}

fn parse_number(flag: &str, value: &str) -> Result<u32, String> {
    value
        .parse()
        .map_err(|_| format!("{} expects a number, got '{}'", flag, value))
}
