//! Slash-command parsing.

/// A recognised bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    /// Open a rating poll for the invoker's pitch.
    RatePitch,
    /// Admin: start a weekly challenge with the given text.
    Challenge(String),
    /// Admin: drop a pending rating poll by id.
    CancelPoll(String),
    /// Admin: list scheduled jobs.
    Jobs,
}

impl Command {
    pub fn admin_only(&self) -> bool {
        matches!(
            self,
            Command::Challenge(_) | Command::CancelPoll(_) | Command::Jobs
        )
    }
}

/// Parse `text` as a command addressed to this bot.
///
/// Returns `None` for ordinary messages, unknown commands, and commands
/// carrying an `@username` suffix that names a different bot.
pub fn parse_command(text: &str, bot_username: Option<&str>) -> Option<Command> {
    let text = text.trim_start();
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.split_once(char::is_whitespace) {
        Some((head, args)) => (head, args.trim()),
        None => (rest, ""),
    };

    let name = match head.split_once('@') {
        Some((name, target)) => {
            if let Some(me) = bot_username {
                if !target.eq_ignore_ascii_case(me) {
                    return None;
                }
            }
            name
        }
        None => head,
    };

    let command = match name.to_ascii_lowercase().as_str() {
        "start" => Command::Start,
        "help" => Command::Help,
        "ratepitch" => Command::RatePitch,
        "challenge" => Command::Challenge(args.to_string()),
        "cancelpoll" => Command::CancelPoll(args.to_string()),
        "jobs" => Command::Jobs,
        _ => return None,
    };
    Some(command)
}
