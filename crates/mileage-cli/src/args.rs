//! Command-line arguments.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;

pub const USAGE: &str = "\
Usage: mileage [COMMAND] [OPTIONS]

Commands:
  show                 Show the selected week (default)
  weeks                List the weeks of the tracked year
  add <MILES>          Add an entry for the selected day
  refresh              Refetch everything, ignoring cache age
  init                 Write the effective configuration to the config file

Options:
  --person <NAME>      Person to show or add for (default: first person)
  --week <WEEK_ID>     Week to show or add to (default: first week)
  --day <YYYY-MM-DD>   Day within the week (default: first day)
  --category <NAME>    Category for `add` (default: first category)
  -h, --help           Print this help";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Show,
    Weeks,
    Add { miles: String },
    Refresh,
    Init,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Args {
    pub command: Command,
    pub person: Option<String>,
    pub week: Option<String>,
    pub day: Option<NaiveDate>,
    pub category: Option<String>,
    pub help: bool,
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self> {
        let mut command = None;
        let mut person = None;
        let mut week = None;
        let mut day = None;
        let mut category = None;
        let mut help = false;

        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |flag: &str| args.next().ok_or_else(|| anyhow!("{} needs a value", flag));
            match arg.as_str() {
                "-h" | "--help" => help = true,
                "--person" => person = Some(value("--person")?),
                "--week" => week = Some(value("--week")?),
                "--category" => category = Some(value("--category")?),
                "--day" => {
                    let text = value("--day")?;
                    let date = NaiveDate::parse_from_str(&text, "%Y-%m-%d")
                        .map_err(|_| anyhow!("--day expects YYYY-MM-DD, got {}", text))?;
                    day = Some(date);
                }
                flag if flag.starts_with("--") => bail!("Unknown option: {}", flag),
                _ if command.is_some() => bail!("Unexpected argument: {}", arg),
                "show" => command = Some(Command::Show),
                "weeks" => command = Some(Command::Weeks),
                "refresh" => command = Some(Command::Refresh),
                "init" => command = Some(Command::Init),
                "add" => {
                    let miles = value("add")?;
                    command = Some(Command::Add { miles });
                }
                other => bail!("Unknown command: {}", other),
            }
        }

        Ok(Self {
            command: command.unwrap_or(Command::Show),
            person,
            week,
            day,
            category,
            help,
        })
    }
}
