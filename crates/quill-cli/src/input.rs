//! Piped standard input

use std::io::{self, IsTerminal, Read};

/// Read all of stdin when it is piped; empty when stdin is a terminal
pub fn read_from_pipe() -> io::Result<String> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(String::new());
    }
    let mut input = String::new();
    stdin.lock().read_to_string(&mut input)?;
    Ok(input.trim().to_string())
}

/// Combine the message given on the command line with piped input
pub fn compose_message(message: Option<&str>, piped: &str) -> Option<String> {
    let message = message.map(str::trim).filter(|m| !m.is_empty());
    match (message, piped.is_empty()) {
        (Some(m), true) => Some(m.to_string()),
        (Some(m), false) => Some(format!("{}\n\n{}", m, piped)),
        (None, false) => Some(piped.to_string()),
        (None, true) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compose_message() {
        assert_eq!(compose_message(Some("hi"), ""), Some("hi".into()));
        assert_eq!(
            compose_message(Some("summarize"), "some text"),
            Some("summarize\n\nsome text".into())
        );
        assert_eq!(compose_message(None, "piped"), Some("piped".into()));
        assert_eq!(compose_message(Some("  "), ""), None);
        assert_eq!(compose_message(None, ""), None);
    }
}
