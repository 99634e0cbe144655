//! Free-text command parsing.

/// A parsed command, ready to apply against the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    ListCommands,
    MakeId {
        id: String,
    },
    /// `id` is `None` on the anonymous path.
    CwRequest {
        id: Option<String>,
        topics: Vec<String>,
    },
    WillAttend {
        id: String,
    },
    WillNotAttend {
        id: String,
    },
    /// Raw slot tokens; empty means all three. Tokens are validated at
    /// apply time so the unknown-slot reply can name the offender.
    Subscribe {
        slots: Vec<String>,
    },
    Unsubscribe {
        slots: Vec<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty input")]
    Empty,
    #[error("unknown verb `{0}`")]
    UnknownVerb(String),
    #[error("too few arguments for `{0}`")]
    MissingArgs(&'static str),
}

/// Parse one line of trimmed input. The verb is case-insensitive;
/// arguments are whitespace-delimited.
pub fn parse_command(input: &str) -> Result<Command, ParseError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    let Some((verb, args)) = tokens.split_first() else {
        return Err(ParseError::Empty);
    };

    match verb.to_lowercase().as_str() {
        "help" => Ok(Command::Help),
        "list-commands" => Ok(Command::ListCommands),
        "make-id" => {
            let id = args.first().ok_or(ParseError::MissingArgs("make-id"))?;
            Ok(Command::MakeId { id: id.to_string() })
        }
        "cw-request" => {
            let (id, rest) = if args.first() == Some(&"-id") {
                let id = args.get(1).ok_or(ParseError::MissingArgs("cw-request"))?;
                (Some(id.to_string()), &args[2..])
            } else {
                (None, args)
            };
            let topics = split_topics(rest);
            if topics.is_empty() {
                return Err(ParseError::MissingArgs("cw-request"));
            }
            Ok(Command::CwRequest { id, topics })
        }
        "will-attend" => {
            let id = args.first().ok_or(ParseError::MissingArgs("will-attend"))?;
            Ok(Command::WillAttend { id: id.to_string() })
        }
        "will-not-attend" => {
            let id = args
                .first()
                .ok_or(ParseError::MissingArgs("will-not-attend"))?;
            Ok(Command::WillNotAttend { id: id.to_string() })
        }
        "subscribe" => Ok(Command::Subscribe {
            slots: args.iter().map(|s| s.to_string()).collect(),
        }),
        "unsubscribe" => Ok(Command::Unsubscribe {
            slots: args.iter().map(|s| s.to_string()).collect(),
        }),
        other => Err(ParseError::UnknownVerb(other.to_string())),
    }
}

/// Segment topics over `-r` markers: the tokens after each marker, up to
/// the next marker or end of input, join into one topic. Tokens before
/// the first marker and empty groups are dropped.
fn split_topics(tokens: &[&str]) -> Vec<String> {
    let mut topics = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for &token in tokens {
        if token == "-r" {
            if let Some(group) = current.take() {
                if !group.is_empty() {
                    topics.push(group.join(" "));
                }
            }
            current = Some(Vec::new());
        } else if let Some(group) = current.as_mut() {
            group.push(token);
        }
    }
    if let Some(group) = current {
        if !group.is_empty() {
            topics.push(group.join(" "));
        }
    }
    topics
}
