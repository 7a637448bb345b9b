//! Classification of an action's position within the overall operation.

use std::fmt;

/// Where an action sits relative to the operation's input and output tokens.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ActionStep {
    /// Consumes the operation's input and produces its output.
    Direct,
    /// Consumes the operation's input only.
    TokenIn,
    /// Produces the operation's output only.
    TokenOut,
    /// Neither consumes the input nor produces the output.
    Middle,
}

impl ActionStep {
    /// Whether the action pulls the operation's input from the user.
    pub fn has_token_in(self) -> bool {
        matches!(self, ActionStep::Direct | ActionStep::TokenIn)
    }

    /// Whether the action delivers the operation's output to the user.
    pub fn has_token_out(self) -> bool {
        matches!(self, ActionStep::Direct | ActionStep::TokenOut)
    }
}

impl fmt::Display for ActionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionStep::Direct => "direct",
            ActionStep::TokenIn => "token_in",
            ActionStep::TokenOut => "token_out",
            ActionStep::Middle => "middle",
        };
        f.write_str(name)
    }
}

/// Classifies an action by comparing its token indices with the operation's.
///
/// All indices refer to the same asset list. An action that both consumes the
/// input and produces the output is `Direct`.
pub fn action_step(
    token_in_index: usize,
    token_out_index: usize,
    action_token_in_index: usize,
    action_token_out_index: usize,
) -> ActionStep {
    let consumes_input = action_token_in_index == token_in_index;
    let produces_output = action_token_out_index == token_out_index;
    match (consumes_input, produces_output) {
        (true, true) => ActionStep::Direct,
        (true, false) => ActionStep::TokenIn,
        (false, true) => ActionStep::TokenOut,
        (false, false) => ActionStep::Middle,
    }
}
