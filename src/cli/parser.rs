use std::collections::HashMap;

/// Value attached to a parsed option flag.
///
/// Options carry either the literal string that followed them or a bare
/// boolean `true`; no further coercion happens here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Flag,
    Value(String),
}

impl OptionValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Flag => None,
            OptionValue::Value(value) => Some(value),
        }
    }
}

/// One tokenized process invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub command: Option<String>,
    pub subcommand: Option<String>,
    pub options: HashMap<String, OptionValue>,
    pub positional_args: Vec<String>,
}

impl Invocation {
    /// Looks up an option's string value, treating bare flags as absent.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).and_then(OptionValue::as_str)
    }

    /// True when the option was given at all, with or without a value.
    pub fn has_option(&self, name: &str) -> bool {
        self.options.contains_key(name)
    }
}

fn is_flag_shaped(token: &str) -> bool {
    token.starts_with('-')
}

/// Tokenizes `argv` (interpreter and program name already stripped).
///
/// Leading non-flag tokens become the command and, if the next token is also
/// not flag-shaped, the subcommand. Remaining tokens are classified as
/// `--name=value`, `--name [value]`, `-x [value]`, bundled `-abc` booleans,
/// or positional arguments. A token that looks like a flag is never consumed
/// as an option value; the next flag wins. When flags precede the command,
/// the first unconsumed non-flag token still becomes the command, and a
/// single-character option only takes a value once the command is resolved,
/// so the command itself cannot be swallowed as an option value.
pub fn parse(args: &[String]) -> Invocation {
    let mut invocation = Invocation::default();
    let mut tokens = args.iter().peekable();

    // Leading phase: `<command> [<subcommand>]` before any flag appears.
    if let Some(first) = tokens.peek() {
        if !is_flag_shaped(first) {
            invocation.command = tokens.next().cloned();
            if let Some(second) = tokens.peek() {
                if !is_flag_shaped(second) {
                    invocation.subcommand = tokens.next().cloned();
                }
            }
        }
    }

    while let Some(token) = tokens.next() {
        if let Some(long) = token.strip_prefix("--") {
            if long.is_empty() {
                invocation.positional_args.push(token.clone());
                continue;
            }
            if let Some((name, value)) = long.split_once('=') {
                invocation
                    .options
                    .insert(name.to_string(), OptionValue::Value(value.to_string()));
                continue;
            }
            match tokens.peek() {
                Some(next) if !is_flag_shaped(next) => {
                    let value = tokens.next().cloned().unwrap_or_default();
                    invocation
                        .options
                        .insert(long.to_string(), OptionValue::Value(value));
                }
                _ => {
                    invocation
                        .options
                        .insert(long.to_string(), OptionValue::Flag);
                }
            }
            continue;
        }

        if let Some(short) = token.strip_prefix('-') {
            match short.chars().count() {
                0 => invocation.positional_args.push(token.clone()),
                1 => {
                    let takes_value = invocation.command.is_some()
                        && tokens.peek().is_some_and(|next| !is_flag_shaped(next));
                    if takes_value {
                        let value = tokens.next().cloned().unwrap_or_default();
                        invocation
                            .options
                            .insert(short.to_string(), OptionValue::Value(value));
                    } else {
                        invocation
                            .options
                            .insert(short.to_string(), OptionValue::Flag);
                    }
                }
                _ => {
                    // Bundled short flags: every character is its own boolean.
                    for flag in short.chars() {
                        invocation
                            .options
                            .insert(flag.to_string(), OptionValue::Flag);
                    }
                }
            }
            continue;
        }

        if invocation.command.is_none() {
            invocation.command = Some(token.clone());
        } else {
            invocation.positional_args.push(token.clone());
        }
    }

    invocation
}
