//! Text notation for actions.
//!
//! Used by `bestactions` output and the `play` command:
//!
//! ```text
//! end | null
//! use <mob> <ability> <target>
//! move <mob> <q>,<r>
//! dmove <mob> <q>,<r>
//! amove <mob> <q>,<r> <ability> <target>
//! ```
//!
//! A list of actions is joined with ` ; `. The empty list is written `-`.

use thiserror::Error;

use crate::board::{Action, Hex};

/// Errors that can occur when parsing action text.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("empty input")]
    EmptyInput,

    #[error("unknown action '{0}'")]
    UnknownAction(String),

    #[error("unexpected end of input, expected {0}")]
    UnexpectedEnd(&'static str),

    #[error("invalid {expected} '{found}'")]
    InvalidToken {
        expected: &'static str,
        found: String,
    },

    #[error("trailing input '{0}'")]
    Trailing(String),
}

/// Parses a single action.
pub fn parse_action(s: &str) -> Result<Action, NotationError> {
    let tokens: Vec<&str> = s.split_whitespace().collect();
    let (&keyword, args) = tokens.split_first().ok_or(NotationError::EmptyInput)?;

    let (action, used) = match keyword {
        "end" => (Action::EndTurn, 0),
        "null" => (Action::Null, 0),
        "use" => (
            Action::AbilityUse {
                mob: parse_id(args, 0, "mob id")?,
                ability: parse_id(args, 1, "ability id")?,
                target: parse_id(args, 2, "target id")?,
            },
            3,
        ),
        "move" => (
            Action::Move {
                mob: parse_id(args, 0, "mob id")?,
                to: parse_hex(args, 1)?,
            },
            2,
        ),
        "dmove" => (
            Action::DefensiveMove {
                mob: parse_id(args, 0, "mob id")?,
                to: parse_hex(args, 1)?,
            },
            2,
        ),
        "amove" => (
            Action::AttackMove {
                mob: parse_id(args, 0, "mob id")?,
                to: parse_hex(args, 1)?,
                ability: parse_id(args, 2, "ability id")?,
                target: parse_id(args, 3, "target id")?,
            },
            4,
        ),
        other => return Err(NotationError::UnknownAction(other.to_string())),
    };

    if args.len() > used {
        return Err(NotationError::Trailing(args[used..].join(" ")));
    }
    Ok(action)
}

/// Parses a `;`-separated list of actions. `-` is the empty list.
pub fn parse_actions(s: &str) -> Result<Vec<Action>, NotationError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(NotationError::EmptyInput);
    }
    if s == "-" {
        return Ok(Vec::new());
    }
    s.split(';').map(parse_action).collect()
}

/// Formats a list of actions as a ` ; `-separated string, `-` when empty.
pub fn format_actions(actions: &[Action]) -> String {
    if actions.is_empty() {
        return "-".to_string();
    }
    actions
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(" ; ")
}

fn parse_id(args: &[&str], idx: usize, expected: &'static str) -> Result<usize, NotationError> {
    let token = args.get(idx).ok_or(NotationError::UnexpectedEnd(expected))?;
    token.parse().map_err(|_| NotationError::InvalidToken {
        expected,
        found: token.to_string(),
    })
}

/// Parses `<q>,<r>`.
fn parse_hex(args: &[&str], idx: usize) -> Result<Hex, NotationError> {
    let token = args.get(idx).ok_or(NotationError::UnexpectedEnd("coordinate"))?;
    let invalid = || NotationError::InvalidToken {
        expected: "coordinate",
        found: token.to_string(),
    };
    let (q, r) = token.split_once(',').ok_or_else(invalid)?;
    let q = q.parse().map_err(|_| invalid())?;
    let r = r.parse().map_err(|_| invalid())?;
    Ok(Hex::new(q, r))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_every_kind() {
        assert_eq!(parse_action("end"), Ok(Action::EndTurn));
        assert_eq!(parse_action(" null "), Ok(Action::Null));
        assert_eq!(
            parse_action("use 0 3 1"),
            Ok(Action::AbilityUse { mob: 0, ability: 3, target: 1 })
        );
        assert_eq!(
            parse_action("move 2 -1,3"),
            Ok(Action::Move { mob: 2, to: Hex::new(-1, 3) })
        );
        assert_eq!(
            parse_action("dmove 2 0,-2"),
            Ok(Action::DefensiveMove { mob: 2, to: Hex::new(0, -2) })
        );
        assert_eq!(
            parse_action("amove 1 1,0 4 3"),
            Ok(Action::AttackMove { mob: 1, to: Hex::new(1, 0), ability: 4, target: 3 })
        );
    }

    #[test]
    fn format_then_parse_is_identity() {
        let actions = vec![
            Action::Move { mob: 0, to: Hex::new(1, -1) },
            Action::AttackMove { mob: 0, to: Hex::new(2, -1), ability: 1, target: 5 },
            Action::EndTurn,
        ];
        let text = format_actions(&actions);
        assert_eq!(text, "move 0 1,-1 ; amove 0 2,-1 1 5 ; end");
        assert_eq!(parse_actions(&text), Ok(actions));
    }

    #[test]
    fn empty_list_is_a_dash() {
        assert_eq!(format_actions(&[]), "-");
        assert_eq!(parse_actions("-"), Ok(Vec::new()));
    }

    #[test]
    fn lists_tolerate_tight_separators() {
        assert_eq!(
            parse_actions("use 0 0 1;end"),
            Ok(vec![Action::AbilityUse { mob: 0, ability: 0, target: 1 }, Action::EndTurn])
        );
    }

    #[test]
    fn errors_name_the_problem() {
        assert_eq!(parse_action(""), Err(NotationError::EmptyInput));
        assert_eq!(parse_actions("  "), Err(NotationError::EmptyInput));
        assert_eq!(parse_action("hold 1"), Err(NotationError::UnknownAction("hold".to_string())));
        assert_eq!(parse_action("use 0 1"), Err(NotationError::UnexpectedEnd("target id")));
        assert_eq!(
            parse_action("move 0 1;2"),
            Err(NotationError::InvalidToken { expected: "coordinate", found: "1;2".to_string() })
        );
        assert_eq!(
            parse_action("use x 1 2"),
            Err(NotationError::InvalidToken { expected: "mob id", found: "x".to_string() })
        );
        assert_eq!(parse_action("end now"), Err(NotationError::Trailing("now".to_string())));
        assert!(parse_actions("end ; ").is_err());
    }
}
