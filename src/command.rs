use alloc::string::String;

use crate::traits::AtCommand;

/// The four Hayes command shapes, selecting the trailing syntax of the
/// transmitted header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmdKind {
    /// Header only: `AT+X`
    Exec,
    /// Header plus `=` and a payload: `AT+X=...`
    Write,
    /// Header plus `?`: `AT+X?`
    Read,
    /// Header plus `=?`: `AT+X=?`
    Test,
}

/// Render the command header. The `\r\n` trailer is appended by the TX path,
/// not here: prompted writes split a transmission across several strings.
pub(crate) fn compose<C: AtCommand>(command: C, kind: CmdKind) -> String {
    let name = command.name();

    let mut header = String::with_capacity(3 + name.len() + 2);
    header.push_str("AT");
    if command.extended() {
        header.push('+');
    }
    header.push_str(name);

    match kind {
        CmdKind::Exec => {}
        CmdKind::Read => header.push('?'),
        CmdKind::Write => header.push('='),
        CmdKind::Test => header.push_str("=?"),
    }

    header
}

#[cfg(test)]
mod tests {
    use super::*;

    crate::at_commands! {
        enum Cmd {
            Base = bare "",
            Dial = bare "D",
            Creg = extended "CREG",
        }
    }

    #[test]
    fn base_command_is_plain_at() {
        assert_eq!("AT", compose(Cmd::Base, CmdKind::Exec));
    }

    #[test]
    fn bare_commands_skip_the_namespace_sigil() {
        assert_eq!("ATD", compose(Cmd::Dial, CmdKind::Exec));
        assert_eq!("ATD?", compose(Cmd::Dial, CmdKind::Read));
    }

    #[test]
    fn extended_commands_carry_the_namespace_sigil() {
        assert_eq!("AT+CREG", compose(Cmd::Creg, CmdKind::Exec));
        assert_eq!("AT+CREG?", compose(Cmd::Creg, CmdKind::Read));
        assert_eq!("AT+CREG=", compose(Cmd::Creg, CmdKind::Write));
        assert_eq!("AT+CREG=?", compose(Cmd::Creg, CmdKind::Test));
    }
}
