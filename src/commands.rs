//! `:` commands and their autocomplete.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

pub const COMMANDS: &[Command] = &[
  Command {
    name: "policies",
    aliases: &["p", "browse", "all"],
    description: "Browse all policies",
  },
  Command {
    name: "popular",
    aliases: &["top", "home"],
    description: "Most purchased policies",
  },
  Command {
    name: "manage",
    aliases: &["m", "admin"],
    description: "Add, edit and delete policies",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit takaful",
  },
];

/// Look up a command by exact name or alias
pub fn find(input: &str) -> Option<&'static Command> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
}

/// Commands matching `input`, best match first.
///
/// Ranking: exact name, exact alias, name prefix, alias prefix, then
/// substring of name or alias.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let needle = input.trim().to_lowercase();
  if needle.is_empty() {
    return COMMANDS.iter().collect();
  }

  let rank = |cmd: &Command| -> Option<u8> {
    let aliases = cmd.aliases.iter();
    if cmd.name == needle {
      Some(0)
    } else if cmd.aliases.contains(&needle.as_str()) {
      Some(1)
    } else if cmd.name.starts_with(&needle) {
      Some(2)
    } else if aliases.clone().any(|a| a.starts_with(&needle)) {
      Some(3)
    } else if cmd.name.contains(&needle) || aliases.clone().any(|a| a.contains(&needle)) {
      Some(4)
    } else {
      None
    }
  };

  let mut matches: Vec<(u8, &'static Command)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd).map(|r| (r, cmd)))
    .collect();
  matches.sort_by_key(|(r, _)| *r);
  matches.into_iter().map(|(_, cmd)| cmd).collect()
}
