/// Declare the command namespace understood by a driver instance.
///
/// Every variant maps to a fixed upper-case name and a namespace kind
/// (`bare` commands are sent as `AT<name>`, `extended` ones as `AT+<name>`).
/// Names must be written in their transmitted upper-case form.
///
/// ```
/// atlink::at_commands! {
///     pub enum Cmd {
///         Base = bare "",
///         Echo = bare "E",
///         Creg = extended "CREG",
///     }
/// }
/// ```
#[macro_export]
macro_rules! at_commands {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $kind:ident $cmd:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $crate::AtCommand for $name {
            fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $cmd,)+
                }
            }

            fn extended(&self) -> bool {
                match self {
                    $(Self::$variant => $crate::__at_cmd_extended!($kind),)+
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __at_cmd_extended {
    (bare) => {
        false
    };
    (extended) => {
        true
    };
}

/// Declare the unsolicited message namespace understood by a driver instance.
///
/// ```
/// atlink::at_urc_messages! {
///     pub enum Msg {
///         Ring = "RING",
///         NoCarrier = "NO CARRIER",
///     }
/// }
/// ```
#[macro_export]
macro_rules! at_urc_messages {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident = $token:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $($(#[$vmeta])* $variant,)+
        }

        impl $crate::UrcMessage for $name {
            fn token(&self) -> &'static str {
                match self {
                    $(Self::$variant => $token,)+
                }
            }
        }
    };
}
