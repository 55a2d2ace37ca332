//! IRC line parsing and the handful of commands the relay sends.

use std::fmt;

/// Maximum length of an IRC line including the trailing CRLF.
pub const LINE_LIMIT: usize = 512;

/// Room left for the `:nick!user@host ` prefix the server prepends when it
/// relays our PRIVMSG to other clients.
const PREFIX_RESERVE: usize = 100;

/// An inbound line, split into prefix, command and parameters.
///
/// IRCv3 message tags are accepted and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

impl Message {
    /// Parse a single line. Trailing CR/LF is ignored. Returns `None` for
    /// blank lines or lines without a command.
    pub fn parse(line: &str) -> Option<Self> {
        let mut rest = line.trim_end_matches(['\r', '\n']);

        if rest.starts_with('@') {
            rest = rest.split_once(' ').map_or("", |(_, r)| r);
        }
        rest = rest.trim_start_matches(' ');

        let prefix = match rest.strip_prefix(':') {
            Some(stripped) => {
                let (prefix, r) = stripped.split_once(' ').unwrap_or((stripped, ""));
                rest = r.trim_start_matches(' ');
                Some(prefix.to_string())
            },
            None => None,
        };

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                params.push(trailing.to_string());
                break;
            }
            let (param, r) = rest.split_once(' ').unwrap_or((rest, ""));
            params.push(param.to_string());
            rest = r;
        }

        Some(Self {
            prefix,
            command: command.to_ascii_uppercase(),
            params,
        })
    }

    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The last parameter, which carries free text on most replies.
    pub fn trailing(&self) -> &str {
        self.params.last().map_or("", String::as_str)
    }
}

/// Outbound commands. `Display` renders the line without CRLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    CapReq(&'a str),
    CapEnd,
    Authenticate(&'a str),
    Nick(&'a str),
    User { user: &'a str, realname: &'a str },
    Join { channel: &'a str, key: Option<&'a str> },
    Privmsg { target: &'a str, text: &'a str },
    Pong(&'a str),
    Quit(&'a str),
}

impl fmt::Display for Command<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapReq(caps) => write!(f, "CAP REQ :{caps}"),
            Self::CapEnd => write!(f, "CAP END"),
            Self::Authenticate(payload) => write!(f, "AUTHENTICATE {payload}"),
            Self::Nick(nick) => write!(f, "NICK {nick}"),
            Self::User { user, realname } => write!(f, "USER {user} 0 * :{realname}"),
            Self::Join {
                channel,
                key: Some(key),
            } => write!(f, "JOIN {channel} {key}"),
            Self::Join { channel, key: None } => write!(f, "JOIN {channel}"),
            Self::Privmsg { target, text } => write!(f, "PRIVMSG {target} :{text}"),
            Self::Pong(token) => write!(f, "PONG :{token}"),
            Self::Quit(reason) => write!(f, "QUIT :{reason}"),
        }
    }
}

/// Bytes of message text that fit in one PRIVMSG to `target`.
pub fn text_budget(target: &str) -> usize {
    let overhead = PREFIX_RESERVE + "PRIVMSG ".len() + target.len() + " :".len() + 2;
    LINE_LIMIT.saturating_sub(overhead).max(1)
}

/// Split `text` into chunks of at most `max_bytes`, preferring to break at
/// whitespace and never splitting a UTF-8 character.
pub fn split_message(text: &str, max_bytes: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.len() > max_bytes {
        let mut cut = max_bytes;
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // A single character wider than the budget; emit it whole.
            cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
        } else if let Some(space) = rest[..cut].rfind(' ')
            && space > 0
        {
            cut = space;
        }

        chunks.push(&rest[..cut]);
        rest = rest[cut..].trim_start_matches(' ');
    }

    if !rest.is_empty() {
        chunks.push(rest);
    }
    chunks
}
