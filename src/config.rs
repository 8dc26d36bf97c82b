/// Configuration of the receive path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    pub(crate) prompt_chars: &'static [u8],
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            prompt_chars: b">",
        }
    }

    /// Characters that complete a line on their own, even without a trailing
    /// terminator, as long as no other bytes are pending.
    ///
    /// The default is `b">"`, for peripherals that emit the data prompt with
    /// no newline after it. Pass an empty slice when the peripheral
    /// terminates the prompt like any other line.
    #[must_use]
    pub const fn with_prompt_chars(mut self, chars: &'static [u8]) -> Self {
        self.prompt_chars = chars;
        self
    }
}
