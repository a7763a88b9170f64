/// Command palette entries and autocomplete logic
use crate::config::Screen;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "incomes",
    aliases: &["i", "income"],
    description: "Income records",
  },
  Command {
    name: "expenses",
    aliases: &["e", "expense"],
    description: "Expenses and approvals",
  },
  Command {
    name: "budgets",
    aliases: &["b", "budget"],
    description: "Budget planning",
  },
  Command {
    name: "salaries",
    aliases: &["s", "salary", "payroll"],
    description: "Payroll management",
  },
  Command {
    name: "departments",
    aliases: &["d", "dept", "department"],
    description: "Departments",
  },
  Command {
    name: "reports",
    aliases: &["r", "report"],
    description: "Financial reports and CSV export",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Forget the stored session",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit bursar",
  },
];

/// What a submitted command asks the app to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
  Open(Screen),
  Logout,
  Quit,
}

/// Map a command name or alias to its action.
pub fn resolve(input: &str) -> Option<Action> {
  let input = input.trim().to_lowercase();
  let cmd = COMMANDS
    .iter()
    .find(|c| c.name == input || c.aliases.contains(&input.as_str()))?;
  let action = match cmd.name {
    "incomes" => Action::Open(Screen::Incomes),
    "expenses" => Action::Open(Screen::Expenses),
    "budgets" => Action::Open(Screen::Budgets),
    "salaries" => Action::Open(Screen::Salaries),
    "departments" => Action::Open(Screen::Departments),
    "reports" => Action::Open(Screen::Reports),
    "logout" => Action::Logout,
    _ => Action::Quit,
  };
  Some(action)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable, so equal priorities keep table order
  matches.sort_by_key(|(_, priority)| *priority);
  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better: exact name, exact alias, name prefix, alias prefix,
/// name substring, alias substring.
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
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

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    assert_eq!(get_suggestions("").len(), COMMANDS.len());
  }

  #[test]
  fn test_alias_beats_prefix() {
    let suggestions = get_suggestions("d");
    assert_eq!(suggestions[0].name, "departments");
  }

  #[test]
  fn test_prefix_and_fuzzy_match() {
    assert_eq!(get_suggestions("sal")[0].name, "salaries");
    assert_eq!(get_suggestions("roll")[0].name, "salaries");
    assert_eq!(get_suggestions("pens")[0].name, "expenses");
  }

  #[test]
  fn test_resolve() {
    assert_eq!(resolve("payroll"), Some(Action::Open(Screen::Salaries)));
    assert_eq!(resolve(" Budgets "), Some(Action::Open(Screen::Budgets)));
    assert_eq!(resolve("logout"), Some(Action::Logout));
    assert_eq!(resolve("q"), Some(Action::Quit));
    assert_eq!(resolve("boards"), None);
  }
}
