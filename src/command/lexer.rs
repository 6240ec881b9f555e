//! Tokenizer for embedded commands.

/// A word of command text with its 1-based position. The target linkrole is
/// position 1, so the first group token is position 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: usize,
}

impl Token {
    /// Case-folded text for keyword comparison.
    pub fn folded(&self) -> String {
        self.text.to_lowercase()
    }
}

/// Command text split into the target and its group tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    pub target: String,
    pub tokens: Vec<Token>,
}

/// The text between the first two `~` of a fact value.
///
/// `None` when there is no second tilde or the enclosed text is empty.
pub fn command_text(value: &str) -> Option<&str> {
    let (_, rest) = value.split_once('~')?;
    let (inner, _) = rest.split_once('~')?;
    if inner.is_empty() {
        None
    } else {
        Some(inner)
    }
}

/// Split command text into target and tokens.
///
/// The target is taken off first because linkroles may contain quotes; in the
/// remainder quotes become whitespace (they only wrap separator characters).
pub fn lex(command: &str) -> Option<Lexed> {
    let trimmed = command.trim_start();
    let (target, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((target, rest)) => (target, rest),
        None => (trimmed, ""),
    };
    if target.is_empty() {
        return None;
    }
    let cleaned = rest.replace('"', " ");
    let tokens = cleaned
        .split_whitespace()
        .enumerate()
        .map(|(i, text)| Token {
            text: text.to_string(),
            position: i + 2,
        })
        .collect();
    Some(Lexed {
        target: target.to_string(),
        tokens,
    })
}
