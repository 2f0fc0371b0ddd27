//! Terminal styling helpers.

use std::borrow::Cow;

use console::Style;

/// [`Style`]s for terminal output.
#[derive(Clone, Debug)]
pub struct Styles {
    /// [`Style`] for rendering successful events.
    pub ok: Style,

    /// [`Style`] for rendering skipped and pending events.
    pub skipped: Style,

    /// [`Style`] for rendering errors and failed events.
    pub err: Style,

    /// [`Style`] for rendering headers.
    pub header: Style,

    /// [`Style`] for rendering __bold__.
    pub bold: Style,

    /// Indicates whether a terminal was detected.
    pub is_present: bool,
}

impl Default for Styles {
    fn default() -> Self {
        Self {
            ok: Style::new().green(),
            skipped: Style::new().cyan(),
            err: Style::new().red(),
            header: Style::new().blue(),
            bold: Style::new().bold(),
            is_present: console::user_attended()
                && console::colors_enabled(),
        }
    }
}

impl Styles {
    /// Creates new [`Styles`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// If a terminal is present colors `input` with [`Styles::ok`], or
    /// leaves it as is otherwise.
    #[must_use]
    pub fn ok<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.ok, input)
    }

    /// If a terminal is present colors `input` with [`Styles::skipped`], or
    /// leaves it as is otherwise.
    #[must_use]
    pub fn skipped<'a>(
        &self,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        self.apply(&self.skipped, input)
    }

    /// If a terminal is present colors `input` with [`Styles::err`], or
    /// leaves it as is otherwise.
    #[must_use]
    pub fn err<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.err, input)
    }

    /// If a terminal is present colors `input` with [`Styles::header`], or
    /// leaves it as is otherwise.
    #[must_use]
    pub fn header<'a>(
        &self,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        self.apply(&self.header, input)
    }

    /// If a terminal is present makes `input` __bold__, or leaves it as is
    /// otherwise.
    #[must_use]
    pub fn bold<'a>(&self, input: impl Into<Cow<'a, str>>) -> Cow<'a, str> {
        self.apply(&self.bold, input)
    }

    fn apply<'a>(
        &self,
        style: &Style,
        input: impl Into<Cow<'a, str>>,
    ) -> Cow<'a, str> {
        if self.is_present {
            style.apply_to(input.into()).to_string().into()
        } else {
            input.into()
        }
    }
}
