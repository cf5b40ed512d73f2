use crate::texture::{ParseTargetError, PartTarget};
use std::path::PathBuf;

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Sofa { index: usize },
    Handle { kind: String },
    Accent { target: PartTarget },
    Swatch { group: String, index: usize },
    Texture { target: PartTarget, path: String },
    Toggle { group: String },
    Export { path: PathBuf },
    List,
    Status,
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CommandError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error(transparent)]
    Target(#[from] ParseTargetError),
}

pub const HELP: &str = "\
commands:
  sofa <n>                         load sofa n (1-based)
  handle <type>                    fit a handle (e.g. Golden, Silver)
  accent <accent|accent1>          choose which accent parts accent swatches color
  swatch <group> <n>               apply swatch n (1-based) of a group
  texture <main|accent|accent1> <path>
                                   apply any texture file
  toggle <group>                   expand or collapse a swatch group
  export <file>                    write the active catalog as JSON
  list                             show sofas, handles and swatch groups
  status                           show the current configuration
  quit";

impl Command {
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let args: Vec<&str> = words.collect();
        let command = match (name, args.as_slice()) {
            ("sofa", [n]) => Command::Sofa {
                index: one_based(n)?,
            },
            ("sofa", _) => return Err(CommandError::Usage("sofa <n>")),
            ("handle", [kind]) => Command::Handle {
                kind: kind.to_string(),
            },
            ("handle", _) => return Err(CommandError::Usage("handle <type>")),
            ("accent", [target]) => Command::Accent {
                target: target.parse()?,
            },
            ("accent", _) => return Err(CommandError::Usage("accent <accent|accent1>")),
            ("swatch", [group, n]) => Command::Swatch {
                group: group.to_string(),
                index: one_based(n)?,
            },
            ("swatch", _) => return Err(CommandError::Usage("swatch <group> <n>")),
            ("texture", [target, path]) => Command::Texture {
                target: target.parse()?,
                path: path.to_string(),
            },
            ("texture", _) => return Err(CommandError::Usage("texture <main|accent|accent1> <path>")),
            ("toggle", [group]) => Command::Toggle {
                group: group.to_string(),
            },
            ("toggle", _) => return Err(CommandError::Usage("toggle <group>")),
            ("export", [path]) => Command::Export {
                path: PathBuf::from(path),
            },
            ("export", _) => return Err(CommandError::Usage("export <file>")),
            ("list", []) => Command::List,
            ("status", []) => Command::Status,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit", _) => Command::Quit,
            (other, _) => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn one_based(value: &str) -> Result<usize, CommandError> {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(CommandError::NotANumber(value.to_string())),
    }
}
