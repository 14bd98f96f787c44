/// Command palette entries and autocomplete

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
  Tasks,
  Refresh,
  Logout,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub kind: CommandKind,
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    kind: CommandKind::Tasks,
    name: "tasks",
    aliases: &["t", "task", "list"],
    description: "Show the task list",
  },
  Command {
    kind: CommandKind::Refresh,
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Drop cached tasks and lookups, then reload",
  },
  Command {
    kind: CommandKind::Logout,
    name: "logout",
    aliases: &["signout"],
    description: "Forget the session",
  },
  Command {
    kind: CommandKind::Quit,
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit fieldsync",
  },
];

/// Rank commands against the typed input. Exact names beat aliases, which
/// beat prefixes, which beat substrings.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input = input.trim().to_lowercase();

  if input.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| rank(cmd, &input).map(|priority| (cmd, priority)))
    .collect();

  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

fn rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

/// The command a submitted palette line runs: the best suggestion, if any.
pub fn resolve(input: &str) -> Option<CommandKind> {
  get_suggestions(input).first().map(|cmd| cmd.kind)
}
