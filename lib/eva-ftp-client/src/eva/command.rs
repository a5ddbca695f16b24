/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;

use crate::error::EvaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaCommandKind {
    Abort,
    CheckPartition,
    GetEnvironmentValue,
    MediaType,
    Quit,
    Passive,
    PassiveAlt,
    Password,
    Reboot,
    Retrieve,
    SetEnvironmentValue,
    Store,
    SystemType,
    Type,
    UnsetEnvironmentValue,
    User,
}

/// A command verb with `{0}`, `{1}` argument placeholders.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaCommand {
    kind: EvaCommandKind,
    template: &'static str,
}

macro_rules! eva_commands {
    ( $( $(#[$docs:meta])* ($konst:ident, $kind:ident, $template:literal); )+ ) => {
        impl EvaCommand {
            $(
                $(#[$docs])*
                pub const $konst: EvaCommand = EvaCommand {
                    kind: EvaCommandKind::$kind,
                    template: $template,
                };
            )+

            pub const ALL: &'static [EvaCommand] = &[ $( EvaCommand::$konst ),+ ];
        }
    };
}

eva_commands! {
    (ABOR, Abort, "ABOR");
    /// Verify the flash contents.
    (CHECK, CheckPartition, "CHECK {0}");
    (GETENV, GetEnvironmentValue, "GETENV {0}");
    (MEDIA, MediaType, "MEDIA {0}");
    (QUIT, Quit, "QUIT");
    (PASV, Passive, "PASV");
    /// Passive mode spelling understood by some boot loader builds.
    (P_SW, PassiveAlt, "P@SW");
    (PASS, Password, "PASS {0}");
    (REBOOT, Reboot, "REBOOT");
    (RETR, Retrieve, "RETR {0}");
    (SETENV, SetEnvironmentValue, "SETENV {0} {1}");
    (STOR, Store, "STOR {0}");
    (SYST, SystemType, "SYST");
    (TYPE, Type, "TYPE {0}");
    (UNSETENV, UnsetEnvironmentValue, "UNSETENV {0}");
    (USER, User, "USER {0}");
}

impl EvaCommand {
    pub fn for_kind(kind: EvaCommandKind) -> EvaCommand {
        match kind {
            EvaCommandKind::Abort => EvaCommand::ABOR,
            EvaCommandKind::CheckPartition => EvaCommand::CHECK,
            EvaCommandKind::GetEnvironmentValue => EvaCommand::GETENV,
            EvaCommandKind::MediaType => EvaCommand::MEDIA,
            EvaCommandKind::Quit => EvaCommand::QUIT,
            EvaCommandKind::Passive => EvaCommand::PASV,
            EvaCommandKind::PassiveAlt => EvaCommand::P_SW,
            EvaCommandKind::Password => EvaCommand::PASS,
            EvaCommandKind::Reboot => EvaCommand::REBOOT,
            EvaCommandKind::Retrieve => EvaCommand::RETR,
            EvaCommandKind::SetEnvironmentValue => EvaCommand::SETENV,
            EvaCommandKind::Store => EvaCommand::STOR,
            EvaCommandKind::SystemType => EvaCommand::SYST,
            EvaCommandKind::Type => EvaCommand::TYPE,
            EvaCommandKind::UnsetEnvironmentValue => EvaCommand::UNSETENV,
            EvaCommandKind::User => EvaCommand::USER,
        }
    }

    #[inline]
    pub fn kind(&self) -> EvaCommandKind {
        self.kind
    }

    #[inline]
    pub fn template(&self) -> &'static str {
        self.template
    }

    pub fn verb(&self) -> &'static str {
        match self.template.split_once(' ') {
            Some((verb, _)) => verb,
            None => self.template,
        }
    }

    fn placeholders(&self) -> usize {
        (0..)
            .take_while(|i| self.template.contains(&format!("{{{i}}}")))
            .count()
    }

    /// Render the command line.
    ///
    /// The argument count has to match the template, and no argument may
    /// carry a line break.
    pub fn format(&self, args: &[&str]) -> Result<String, EvaError> {
        let expected = self.placeholders();
        if args.len() != expected {
            return Err(EvaError::InvalidCommandArguments {
                command: self.verb(),
                expected,
                given: args.len(),
            });
        }
        let mut line = self.template.to_string();
        for (i, arg) in args.iter().enumerate() {
            if arg.contains(['\r', '\n']) {
                return Err(EvaError::InvalidArgument(format!(
                    "argument #{i} of {} contains a line break",
                    self.verb()
                )));
            }
            line = line.replace(&format!("{{{i}}}"), arg);
        }
        Ok(line)
    }
}

impl fmt::Display for EvaCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_commands() {
        assert_eq!(EvaCommand::SYST.format(&[]).unwrap(), "SYST");
        assert_eq!(
            EvaCommand::GETENV.format(&["linux_fs_start"]).unwrap(),
            "GETENV linux_fs_start"
        );
        assert_eq!(
            EvaCommand::SETENV.format(&["linux_fs_start", "1"]).unwrap(),
            "SETENV linux_fs_start 1"
        );
        assert_eq!(EvaCommand::P_SW.format(&[]).unwrap(), "P@SW");
        assert_eq!(EvaCommand::MEDIA.format(&["SDRAM"]).unwrap(), "MEDIA SDRAM");
    }

    #[test]
    fn argument_count_checked() {
        let e = EvaCommand::SETENV.format(&["only_name"]).unwrap_err();
        assert!(matches!(
            e,
            EvaError::InvalidCommandArguments {
                command: "SETENV",
                expected: 2,
                given: 1
            }
        ));
        assert!(EvaCommand::QUIT.format(&["now"]).is_err());
    }

    #[test]
    fn line_break_rejected() {
        assert!(matches!(
            EvaCommand::GETENV.format(&["a\r\nREBOOT"]),
            Err(EvaError::InvalidArgument(_))
        ));
    }

    #[test]
    fn kinds_map_back() {
        assert_eq!(EvaCommand::ALL.len(), 16);
        for cmd in EvaCommand::ALL {
            assert_eq!(EvaCommand::for_kind(cmd.kind()), *cmd);
        }
        assert_eq!(EvaCommand::UNSETENV.verb(), "UNSETENV");
        assert_eq!(EvaCommand::ABOR.to_string(), "ABOR");
    }
}
