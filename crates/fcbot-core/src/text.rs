//! Static reply text.

pub const NO_COMMAND: &str = "No command specified";

pub const USAGE: &str = "I am the Feelings Checkin bot. I remind everyone about Feelings Checkin and collect requests \
for content warnings. There are two ways to request content warnings. You can submit topics between 9am and 3pm on \
Thursday for that day's Feelings Checkin, or, any day of the week, you can associate a persistent pseudonymous ID \
with a content warning request, and mark that ID as attending between 9am and 3pm on Thursday. You can also \
subscribe to reminders so you never miss a chance to express your feelings. Use `list-commands` for more \
information about what I can do.";

pub const STREAM_9AM: &str = "Good morning! Feelings Checkin will take place at 3pm in Babbage. I'm Feelings \
Checkin Bot. Send me a message with the word `help` to find out about the things I can do.";

pub const SUBSCRIBERS_9AM: &str = "Happy* Thursday! If you have any requests for content warnings, you can submit \
them today, or you can activate any requests associated with an ID by marking yourself as attending Feelings \
Checkin.\n\n*or disappointed or enraged or ambivalent -- all feelings about and on Thursdays are valid!";

pub const STREAM_ONE_HOUR: &str = "Feelings Checkin starts in an hour.";

pub const SUBSCRIBERS_ONE_HOUR: &str = "T minus one hour to Feelings Checkin!";

pub const STARTING: &str = "Feelings checkin is starting.";

pub const TOPIC_REPORT_LEAD: &str =
    "  These were the topics for which attendees requested content warnings.";

/// Long form, used on the anonymous request path.
pub const WRONG_TIME: &str =
    "You can only do that between 9am and 3pm on Thursdays. Type `help` for more information.";

/// Short form, used on the attendance path.
pub const WRONG_TIME_SHORT: &str = "You can only do that between 9am and 3pm on Thursdays.";

pub const UNRECOGNIZED: &str =
    "I don't know what you mean. Type `list-commands` to find out about the words I understand.";

pub const NOT_ENOUGH_ARGS: &str = "Looks like you didn't give me enough arguments.";

/// Command table: (invocation, description).
pub const COMMANDS: &[(&str, &str)] = &[
    ("help", "Display bot info"),
    ("list-commands", "Display the list of available commands"),
    ("make-id <id> ", "Make a new ID"),
    (
        "cw-request [options] -r <topic1> [-r <topic2> ...]\n\toptions: -id <id>",
        "Request content warnings (if called with -id, will overwrite previous requests for that id).",
    ),
    (
        "subscribe [9] [2] [3]",
        "Subscribe to FC reminders (all reminders by default, or a subset with opt. args.)\n\t9: \
the 9am reminder\n\t2: the 2pm reminder\n\t3: the 3pm reminder and content warning request report",
    ),
    (
        "unsubscribe [9] [2] [3]",
        "Unsubscribe from FC reminders (all reminders by default, or a subset with opt. args.)",
    ),
    ("will-attend <id>", "Mark an ID as attending"),
    (
        "will-not-attend <id>",
        "Mark an ID as not attending (only necessary if you previously marked the ID attending)",
    ),
];

/// Assemble the `list-commands` reply from the command table.
pub fn list_commands_reply() -> String {
    let mut response = String::from("**Available Commands:** \n");
    for (command, description) in COMMANDS {
        response.push_str(&format!(" - {command} : {description}\n"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_commands_covers_every_verb() {
        let reply = list_commands_reply();
        assert!(reply.starts_with("**Available Commands:** \n"));
        for verb in [
            "help",
            "list-commands",
            "make-id",
            "cw-request",
            "subscribe",
            "unsubscribe",
            "will-attend",
            "will-not-attend",
        ] {
            assert!(reply.contains(verb), "missing {verb}");
        }
    }
}
