//! Style roles for CLI output
//!
//! Each logical role maps to an optional `colored::Color`. Colouring only
//! happens when the caller passes `enabled = true`, so there is no global
//! colour state.
//!
//! ```
//! use scanhub::core::styles::StyleRole;
//! assert_eq!(StyleRole::Header.paint("State", false), "State");
//! assert!(StyleRole::Header.paint("State", true).contains("State"));
//! ```

use clap::builder::styling::AnsiColor;
use colored::{Color, Colorize};

use crate::scan::types::ScanState;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }
        }
    }
}

style! {
    Header      => Some(Color::Yellow),
    Literal     => Some(Color::Cyan),
    Placeholder => Some(Color::Green),
    Error       => Some(Color::BrightRed),
    Running     => Some(Color::Blue),
    Good        => Some(Color::Green),
    Attention   => Some(Color::Yellow),
    Bad         => Some(Color::Red),
    Dim         => Some(Color::BrightBlack),
    Value       => None,
}

impl StyleRole {
    /// Role used to show a scan in `state`
    pub fn for_state(state: ScanState) -> Self {
        match state {
            ScanState::Init => StyleRole::Dim,
            s if s.is_in_progress() => StyleRole::Running,
            s if s.is_finished_bad() => StyleRole::Bad,
            s if s.is_processed() || s == ScanState::Finished => StyleRole::Good,
            _ => StyleRole::Attention,
        }
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.color() {
            Some(color) if enabled => text.color(color).to_string(),
            _ => text.to_string(),
        }
    }

    /// prettytable style spec, e.g. `Fg` for green foreground
    pub fn table_spec(self) -> Option<String> {
        let code = match self.color()? {
            Color::Red => "r",
            Color::Green => "g",
            Color::Yellow => "y",
            Color::Blue => "b",
            Color::Cyan => "c",
            Color::BrightRed => "R",
            Color::BrightBlack => "K",
            _ => return None,
        };
        Some(format!("F{code}"))
    }
}

fn clap_color(color: Color) -> Option<AnsiColor> {
    Some(match color {
        Color::Yellow => AnsiColor::Yellow,
        Color::Cyan => AnsiColor::Cyan,
        Color::Green => AnsiColor::Green,
        Color::BrightRed => AnsiColor::BrightRed,
        Color::Red => AnsiColor::Red,
        _ => return None,
    })
}

/// clap help styles built from the same roles
pub fn clap_styles(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new();
        if let Some(c) = role.color().and_then(clap_color) {
            s = s.fg_color(Some(ClapColor::Ansi(c)));
        }
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Literal, false))
        .placeholder(style(StyleRole::Placeholder, false))
        .error(style(StyleRole::Error, true))
}
