//! Parser for embedded command groups.
//!
//! Any grammar violation rejects the whole command. Legacy keywords are
//! accepted with a notice; notices raised before a rejection are still kept.

use std::collections::{BTreeMap, VecDeque};

use super::lexer::{command_text, lex, Token};
use super::{
    AxisSelector, CommandGroup, DisplayMode, EmbeddedCommand, MemberSelection, Placement,
};
use crate::diagnostics::{codes, Diagnostic};
use crate::model::QName;

/// Result of looking at one text-block value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    /// No command syntax, or the target is not a known cube.
    NotCommand,
    /// A command was attempted but is malformed.
    Invalid,
    Parsed(EmbeddedCommand),
}

/// Outcome plus the messages raised while parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandParse {
    pub outcome: ParseOutcome,
    pub diagnostics: Vec<Diagnostic>,
}

impl CommandParse {
    fn not_command() -> Self {
        Self {
            outcome: ParseOutcome::NotCommand,
            diagnostics: Vec::new(),
        }
    }

    pub fn command(&self) -> Option<&EmbeddedCommand> {
        match &self.outcome {
            ParseOutcome::Parsed(command) => Some(command),
            _ => None,
        }
    }
}

const END: &str = "(end of command)";

struct Parser<'a> {
    tokens: VecDeque<Token>,
    last_position: usize,
    prefixes: &'a BTreeMap<String, String>,
    source: &'a str,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    fn next(&mut self) -> Token {
        match self.tokens.pop_front() {
            Some(token) => {
                self.last_position = token.position;
                token
            }
            None => {
                self.last_position += 1;
                Token {
                    text: END.to_string(),
                    position: self.last_position,
                }
            }
        }
    }

    /// `ns_local` → `ns:local`, replacing only the first underscore.
    fn qname(&self, token: &str) -> QName {
        let prefixed = token.replacen('_', ":", 1);
        QName::from_prefixed(&prefixed, self.prefixes).unwrap_or_else(|| {
            let (prefix, local) = prefixed.split_once(':').unwrap_or(("", &prefixed));
            QName::new(prefix, "", local)
        })
    }

    fn reject(&mut self, code: &'static str, token: &Token, detail: &str) -> Option<Vec<CommandGroup>> {
        self.diagnostics.push(
            Diagnostic::error(
                code,
                format!(
                    "The token {}, at position {} in the list of tokens in {}, is malformed. {} \
                     These embedded commands will not be rendered.",
                    token.text, token.position, self.source, detail
                ),
            )
            .with("token", &token.text)
            .with("position", token.position)
            .with("list", self.source),
        );
        None
    }

    fn notice(&mut self, code: &'static str, keyword: &str, detail: &str) {
        self.diagnostics.push(
            Diagnostic::info(
                code,
                format!(
                    "The token at position {} in the list of tokens in {}, is {}. \
                     Currently, this keyword is not supported and {}.",
                    self.last_position, self.source, keyword, detail
                ),
            )
            .with("position", self.last_position)
            .with("list", self.source),
        );
    }

    fn groups(&mut self) -> Option<Vec<CommandGroup>> {
        let mut groups = Vec::new();
        while !self.tokens.is_empty() {
            let first = self.next();
            let placement = match first.folded().as_str() {
                "row" => Placement::Row,
                "column" => Placement::Column,
                _ => {
                    return self.reject(
                        codes::MALFORMED_TOKEN,
                        &first,
                        "An individual command can only start with row or column.",
                    )
                }
            };

            let second = self.next();
            let folded = second.folded();
            let axis = match folded.as_str() {
                "period" => AxisSelector::Period,
                "unit" => AxisSelector::Unit,
                "primary" => AxisSelector::Primary,
                _ if second.text.contains('_') => AxisSelector::Axis(self.qname(&second.text)),
                "separator" => {
                    let argument = self.next();
                    if argument.folded() == "segment" {
                        self.next();
                    }
                    self.notice(codes::TOKEN_NOT_SUPPORTED, "separator", "was ignored");
                    continue;
                }
                _ => {
                    return self.reject(
                        codes::MALFORMED_TOKEN_AXIS,
                        &second,
                        "The axis name can only be period, unit, primary or have an underscore.",
                    )
                }
            };

            let third = self.next();
            let mode = match third.folded().as_str() {
                "compact" => DisplayMode::Compact,
                "nodisplay" => DisplayMode::NoDisplay,
                "grouped" => {
                    self.notice(codes::GROUPED_TOKEN, "grouped", "was replaced with compact");
                    DisplayMode::Compact
                }
                "unitcell" => {
                    self.notice(codes::UNITCELL_TOKEN, "unitcell", "was replaced with compact");
                    DisplayMode::Compact
                }
                _ => {
                    return self.reject(
                        codes::MALFORMED_SECOND_TOKEN,
                        &third,
                        "The second token of an embedded command can only be compact, grouped, \
                         nodisplay or unitcell.",
                    )
                }
            };

            let mut member_tokens = Vec::new();
            while let Some(token) = self.tokens.front() {
                if matches!(token.folded().as_str(), "row" | "column") {
                    break;
                }
                member_tokens.push(self.next());
            }

            let sole = member_tokens.len() == 1;
            let mut listed = Vec::new();
            let mut wildcard = false;
            for token in &member_tokens {
                if token.text.contains('_') {
                    listed.push(self.qname(&token.text));
                } else if token.text == "*" && sole {
                    wildcard = true;
                } else {
                    return self.reject(
                        codes::MALFORMED_MEMBER_TOKEN,
                        token,
                        "The member name must either be * or have an underscore, and if there is \
                         a list of members for this axis, they all must contain an underscore.",
                    );
                }
            }
            let members = if wildcard {
                MemberSelection::All
            } else if listed.is_empty() {
                MemberSelection::Unspecified
            } else {
                MemberSelection::List(listed)
            };

            groups.push(CommandGroup {
                placement,
                axis,
                mode,
                members,
            });
        }
        Some(groups)
    }
}

/// Parse the embedded command, if any, inside a text-block value.
///
/// `is_cube` decides whether the first word names a known cube; `prefixes`
/// resolves `prefix_local` axis and member tokens; `describe` names the
/// source fact in messages.
pub fn parse_embedded_command(
    value: &str,
    is_cube: impl Fn(&str) -> bool,
    prefixes: &BTreeMap<String, String>,
    describe: &str,
) -> CommandParse {
    let Some(text) = command_text(value) else {
        return CommandParse::not_command();
    };
    let Some(lexed) = lex(text) else {
        return CommandParse::not_command();
    };
    if !is_cube(&lexed.target) {
        return CommandParse::not_command();
    }

    let source = format!("{} (~{}~)", describe, text.trim());
    let mut parser = Parser {
        tokens: lexed.tokens.into(),
        last_position: 1,
        prefixes,
        source: &source,
        diagnostics: Vec::new(),
    };
    let groups = parser.groups();
    let diagnostics = parser.diagnostics;
    let outcome = match groups {
        Some(groups) => ParseOutcome::Parsed(EmbeddedCommand {
            target: lexed.target,
            groups,
        }),
        None => ParseOutcome::Invalid,
    };
    CommandParse {
        outcome,
        diagnostics,
    }
}
