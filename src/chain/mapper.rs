//! Routing of actions to their `(domain, key)` pair.
//!
//! Every action pushed to the chain names the domain and key it touches. The
//! pair is fixed per action kind and derived from the action's own arguments.

use std::fmt;
use std::str::FromStr;

use crate::chain::types::{Action, ChainError, ChainResult};

/// Where a routing field's value comes from.
enum Source {
    Literal(&'static str),
    Arg(&'static str),
}

/// Action kinds this client knows how to route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    NewDomain,
    UpdateDomain,
    IssueToken,
    Transfer,
    DestroyToken,
    NewGroup,
    UpdateGroup,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::NewDomain,
        ActionKind::UpdateDomain,
        ActionKind::IssueToken,
        ActionKind::Transfer,
        ActionKind::DestroyToken,
        ActionKind::NewGroup,
        ActionKind::UpdateGroup,
    ];

    /// Action type name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::NewDomain => "newdomain",
            ActionKind::UpdateDomain => "updatedomain",
            ActionKind::IssueToken => "issuetoken",
            ActionKind::Transfer => "transfer",
            ActionKind::DestroyToken => "destroytoken",
            ActionKind::NewGroup => "newgroup",
            ActionKind::UpdateGroup => "updategroup",
        }
    }

    fn rule(&self) -> (Source, Source) {
        use Source::{Arg, Literal};
        match self {
            ActionKind::NewDomain | ActionKind::UpdateDomain => (Literal("domain"), Arg("name")),
            ActionKind::IssueToken => (Arg("domain"), Literal("issue")),
            ActionKind::Transfer | ActionKind::DestroyToken => (Arg("domain"), Arg("name")),
            ActionKind::NewGroup | ActionKind::UpdateGroup => (Literal("group"), Arg("name")),
        }
    }

    /// Compute the `(domain, key)` pair for an action of this kind.
    pub fn route(&self, action: &Action) -> ChainResult<(String, String)> {
        let resolve = |source: Source| match source {
            Source::Literal(value) => Ok(value.to_string()),
            Source::Arg(field) => action
                .arg_str(field)
                .map(str::to_string)
                .ok_or_else(|| ChainError::MalformedAction {
                    action: action.action.clone(),
                    field: field.to_string(),
                }),
        };
        let (domain, key) = self.rule();
        Ok((resolve(domain)?, resolve(key)?))
    }
}

impl FromStr for ActionKind {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ChainError::UnsupportedAction(s.to_string()))
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
