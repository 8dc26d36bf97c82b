//! Per-line protocol parsing: classification of received lines and payload
//! extraction. Stateless; the session state it consults lives with the
//! caller.

use alloc::string::String;

use crate::traits::AtCommand;

const AT_PREFIX: &str = "AT";
const CME_ERROR: &str = "+CME ERROR";

/// What a received line means for the session awaiting `awaited`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub(crate) enum Classification {
    /// Terminal: the peripheral accepted the command.
    Ok,
    /// Terminal: the peripheral rejected the command.
    Error,
    /// Terminal: `+CME ERROR`, detail goes to the payload accumulator.
    CmeError,
    /// A payload line of the in-flight command.
    HandlingCmd,
    /// The peripheral requests the follow-on blob of a prompted write.
    PromptRequest,
    /// Unsolicited line or noise; routed through the handler registry.
    Unknown,
}

/// Local echo of a command we transmitted. Applies to any line starting with
/// `AT`, so a peripheral message that happens to begin with those letters is
/// dropped too.
pub(crate) fn is_echo(line: &str) -> bool {
    line.starts_with(AT_PREFIX)
}

pub(crate) fn classify<C: AtCommand>(line: &str, awaited: Option<C>) -> Classification {
    // With no command in flight nothing can be solicited.
    let Some(awaited) = awaited else {
        return Classification::Unknown;
    };

    if is_echo(line) {
        return Classification::Unknown;
    }

    match line {
        "OK" => return Classification::Ok,
        "ERROR" => return Classification::Error,
        ">" => return Classification::PromptRequest,
        _ => {}
    }

    if line.starts_with(CME_ERROR) {
        return Classification::CmeError;
    }

    if is_solicited(line, awaited) {
        return Classification::HandlingCmd;
    }

    Classification::Unknown
}

fn is_solicited<C: AtCommand>(line: &str, awaited: C) -> bool {
    // Responses to bare commands carry no name to match on; they are only
    // concluded by their OK/ERROR terminator.
    if !awaited.extended() {
        return false;
    }

    // A line without the namespace sigil is attributed to the in-flight
    // command. Unsolicited messages without a sigil (e.g. "RING") are
    // swallowed by this rule while a session is open; see DESIGN.md.
    if !line.as_bytes().first().is_some_and(|b| *b == b'+') {
        return true;
    }

    matches_extended(line, awaited.name())
}

/// Whether `line` is `+<name>...`.
pub(crate) fn matches_extended(line: &str, name: &str) -> bool {
    line.as_bytes().first().is_some_and(|b| *b == b'+') && line[1..].starts_with(name)
}

/// Drop the `+<name>:` header: one sigil, the name, one header character,
/// and one optional space. The byte at the header-character position is not
/// inspected.
pub(crate) fn strip_cmd_prefix<'a>(line: &'a str, name: &str) -> &'a str {
    let mut cut = 1 + name.len() + 1;
    if line.as_bytes().get(cut) == Some(&b' ') {
        cut += 1;
    }
    line.get(cut..).unwrap_or("")
}

/// Drop the `+CME ERROR` literal, keeping the remainder verbatim.
pub(crate) fn strip_cme_prefix(line: &str) -> &str {
    line.get(CME_ERROR.len()..).unwrap_or("")
}

/// Append a line to the accumulated payload, inserting the `\r\n` separator
/// iff the accumulator already holds something.
pub(crate) fn append_payload(payload: &mut String, line: &str) {
    if !payload.is_empty() {
        payload.push_str("\r\n");
    }
    payload.push_str(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::at_commands! {
        enum Cmd {
            Echo = bare "E",
            First = extended "FIRST",
            Seventh = extended "SEVENTH",
        }
    }

    #[test]
    fn nothing_is_solicited_without_a_session() {
        assert_eq!(Classification::Unknown, classify::<Cmd>("OK", None));
        assert_eq!(Classification::Unknown, classify::<Cmd>("+FIRST: data", None));
    }

    #[test]
    fn terminators_and_prompt() {
        let awaited = Some(Cmd::First);
        assert_eq!(Classification::Ok, classify("OK", awaited));
        assert_eq!(Classification::Error, classify("ERROR", awaited));
        assert_eq!(Classification::PromptRequest, classify(">", awaited));
        assert_eq!(Classification::CmeError, classify("+CME ERROR: 42", awaited));
    }

    #[test]
    fn echo_is_never_a_response() {
        assert_eq!(
            Classification::Unknown,
            classify("AT+FIRST=MEXICO", Some(Cmd::First))
        );
    }

    #[test]
    fn matching_prefix_is_a_payload_line() {
        assert_eq!(
            Classification::HandlingCmd,
            classify("+FIRST: data", Some(Cmd::First))
        );
    }

    #[test]
    fn mismatched_prefix_is_unsolicited() {
        assert_eq!(
            Classification::Unknown,
            classify("+FIRST: data", Some(Cmd::Seventh))
        );
    }

    #[test]
    fn bare_lines_continue_an_extended_session() {
        assert_eq!(
            Classification::HandlingCmd,
            classify("Some single line data without prefix", Some(Cmd::Seventh))
        );
    }

    #[test]
    fn bare_commands_have_no_payload_lines() {
        assert_eq!(
            Classification::Unknown,
            classify("whatever", Some(Cmd::Echo))
        );
    }

    #[test]
    fn strips_header_and_optional_space() {
        assert_eq!("data", strip_cmd_prefix("+FIRST: data", "FIRST"));
        assert_eq!("MAKARENA", strip_cmd_prefix("+NINTH:MAKARENA", "NINTH"));
        assert_eq!("", strip_cmd_prefix("+FIRST:", "FIRST"));
    }

    #[test]
    fn cme_detail_keeps_its_separator() {
        assert_eq!(": 42", strip_cme_prefix("+CME ERROR: 42"));
    }

    #[test]
    fn separator_only_between_chunks() {
        let mut payload = String::new();
        append_payload(&mut payload, "a");
        append_payload(&mut payload, "b");
        assert_eq!("a\r\nb", payload);
    }
}
