//! Command line parser
//!
//! Whitespace split into a command word and up to `MAX_ARGS` arguments.
//! Extra words are counted but not kept, so handlers can reject them.

/// Arguments kept per command line.
pub const MAX_ARGS: usize = 3;

/// Parsed command line, borrowing from the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand<'a> {
    /// The command name (first token), empty for a blank line
    pub command: &'a str,
    /// Arguments in order
    pub args: [Option<&'a str>; MAX_ARGS],
    /// Words after the command, including any that did not fit
    pub word_count: usize,
}

impl<'a> ParsedCommand<'a> {
    /// Blank line
    pub const fn empty() -> Self {
        Self {
            command: "",
            args: [None; MAX_ARGS],
            word_count: 0,
        }
    }

    /// Get argument by index (0-based)
    pub fn arg(&self, idx: usize) -> Option<&'a str> {
        self.args.get(idx).copied().flatten()
    }

    /// Check for a blank line
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}

/// Parse a command line
pub fn parse_line(line: &str) -> ParsedCommand<'_> {
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return ParsedCommand::empty();
    };

    let mut parsed = ParsedCommand {
        command,
        ..ParsedCommand::empty()
    };
    for (i, word) in words.enumerate() {
        if let Some(slot) = parsed.args.get_mut(i) {
            *slot = Some(word);
        }
        parsed.word_count += 1;
    }
    parsed
}
