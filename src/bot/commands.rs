//! The operator command surface, reached through chat messages.
//!
//! One command exists: `chatbot on|off|auto`. Commands form a closed
//! enumeration; dispatch happens over a name lookup, not ad-hoc string
//! matching in the handler.

use super::overrides::OverrideState;

pub const USAGE_CHATBOT: &str = "Usage: chatbot on|off|auto";

pub const CONFIRM_ON: &str = "✅ Chatbot is now forced on.";
pub const CONFIRM_OFF: &str = "✅ Chatbot is now forced off.";
pub const CONFIRM_AUTO: &str = "✅ Chatbot is back on the night schedule.";
pub const CONFIRM_FAILED: &str = "⚠️ Couldn't update the override, cache unreachable.";

/// A recognized, well-formed command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Chatbot(OverrideState),
}

/// Outcome of parsing prefix-stripped command text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parsed {
    Command(Command),
    /// Known command name, missing or unrecognized argument.
    Malformed { usage: &'static str },
    /// Not a command we know; consumed silently.
    Unknown,
}

/// Parse command text with the prefix already stripped.
pub fn parse(input: &str) -> Parsed {
    let mut words = input.split_whitespace();
    let Some(name) = words.next() else {
        return Parsed::Unknown;
    };

    match name {
        "chatbot" => match words.next() {
            Some("on") => Parsed::Command(Command::Chatbot(OverrideState::On)),
            Some("off") => Parsed::Command(Command::Chatbot(OverrideState::Off)),
            Some("auto") => Parsed::Command(Command::Chatbot(OverrideState::Unset)),
            _ => Parsed::Malformed { usage: USAGE_CHATBOT },
        },
        _ => Parsed::Unknown,
    }
}

/// Confirmation text for a successful override change.
pub fn confirmation(state: OverrideState) -> &'static str {
    match state {
        OverrideState::On => CONFIRM_ON,
        OverrideState::Off => CONFIRM_OFF,
        OverrideState::Unset => CONFIRM_AUTO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chatbot_on() {
        assert_eq!(
            parse("chatbot on"),
            Parsed::Command(Command::Chatbot(OverrideState::On))
        );
    }

    #[test]
    fn test_parse_chatbot_off() {
        assert_eq!(
            parse("chatbot off"),
            Parsed::Command(Command::Chatbot(OverrideState::Off))
        );
    }

    #[test]
    fn test_parse_chatbot_auto_clears_override() {
        assert_eq!(
            parse("chatbot auto"),
            Parsed::Command(Command::Chatbot(OverrideState::Unset))
        );
    }

    #[test]
    fn test_parse_tolerates_extra_whitespace() {
        assert_eq!(
            parse("  chatbot   on  "),
            Parsed::Command(Command::Chatbot(OverrideState::On))
        );
    }

    #[test]
    fn test_parse_missing_argument_is_malformed() {
        assert_eq!(parse("chatbot"), Parsed::Malformed { usage: USAGE_CHATBOT });
    }

    #[test]
    fn test_parse_bad_argument_is_malformed() {
        assert_eq!(
            parse("chatbot maybe"),
            Parsed::Malformed { usage: USAGE_CHATBOT }
        );
    }

    #[test]
    fn test_parse_unknown_command() {
        assert_eq!(parse("weather nairobi"), Parsed::Unknown);
        assert_eq!(parse(""), Parsed::Unknown);
    }
}
