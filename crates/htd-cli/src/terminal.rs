//! Local terminal: renderer, raw mode and key translation

use std::io::{self, Write};
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen, SetTitle,
};
use crossterm::{cursor::MoveTo, execute};

use htd_client::{Renderer, RendererFactory};
use htd_protocol::TerminalSize;

type Output = Box<dyn Write + Send>;

/// Creates [`TerminalRenderer`]s drawing on one output (stdout by default)
#[derive(Clone)]
pub struct TerminalRenderers {
    output: Arc<dyn Fn() -> Output + Send + Sync>,
}

impl TerminalRenderers {
    /// Renderers writing to stdout
    pub fn stdout() -> Self {
        Self::with_output(|| Box::new(io::stdout()))
    }

    /// Renderers writing to whatever `output` returns
    pub fn with_output<F>(output: F) -> Self
    where
        F: Fn() -> Output + Send + Sync + 'static,
    {
        Self {
            output: Arc::new(output),
        }
    }
}

impl RendererFactory for TerminalRenderers {
    // Draws nothing until the first output frame; the caller owns the screen.
    fn create(&mut self) -> Box<dyn Renderer> {
        Box::new(TerminalRenderer {
            size: TerminalSize::default(),
            out: (self.output)(),
        })
    }
}

/// The local terminal acting as the character grid
pub struct TerminalRenderer {
    size: TerminalSize,
    out: Output,
}

impl Renderer for TerminalRenderer {
    fn write(&mut self, data: &str) {
        if let Err(e) = self
            .out
            .write_all(data.as_bytes())
            .and_then(|_| self.out.flush())
        {
            tracing::warn!("Failed to write to terminal: {}", e);
        }
    }

    fn size(&self) -> TerminalSize {
        self.size
    }

    fn fit(&mut self) -> TerminalSize {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => self.size = TerminalSize::new(cols, rows),
            Err(e) => tracing::debug!("Terminal size unavailable, keeping {}: {}", self.size, e),
        }
        self.size
    }

    fn dispose(&mut self) {
        if let Err(e) = execute!(self.out, Clear(ClearType::All), MoveTo(0, 0)) {
            tracing::debug!("Failed to clear terminal: {}", e);
        }
    }
}

/// Raw mode on the alternate screen; restored on drop
pub struct RawTerminal {
    _private: (),
}

impl RawTerminal {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        Ok(Self { _private: () })
    }

    /// Show the countdown and connection status in the window title
    pub fn set_title(&self, countdown: Option<&str>, status: &str) {
        let title = match countdown {
            Some(countdown) if status.is_empty() => format!("holdthedoor [{}]", countdown),
            Some(countdown) => format!("holdthedoor [{}] {}", countdown, status),
            None => "holdthedoor".to_string(),
        };
        let _ = execute!(io::stdout(), SetTitle(title));
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

/// Whether `key` is the detach chord (Ctrl+])
pub fn is_detach(key: &KeyEvent) -> bool {
    key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char(']')
}

/// Translate a key press into the characters a terminal would send
pub fn key_to_input(code: KeyCode, modifiers: KeyModifiers) -> String {
    use KeyCode::*;

    match code {
        Char(c) => {
            let control = modifiers
                .contains(KeyModifiers::CONTROL)
                .then(|| control_byte(c))
                .flatten();
            if let Some(byte) = control {
                char::from(byte).to_string()
            } else if modifiers.contains(KeyModifiers::ALT) {
                format!("\x1b{}", c)
            } else {
                c.to_string()
            }
        }
        Enter => "\r".into(),
        Tab => "\t".into(),
        BackTab => "\x1b[Z".into(),
        Backspace => "\x7f".into(),
        Esc => "\x1b".into(),
        Up => "\x1b[A".into(),
        Down => "\x1b[B".into(),
        Right => "\x1b[C".into(),
        Left => "\x1b[D".into(),
        Home => "\x1b[H".into(),
        End => "\x1b[F".into(),
        PageUp => "\x1b[5~".into(),
        PageDown => "\x1b[6~".into(),
        Delete => "\x1b[3~".into(),
        Insert => "\x1b[2~".into(),
        F(n) => match n {
            1 => "\x1bOP",
            2 => "\x1bOQ",
            3 => "\x1bOR",
            4 => "\x1bOS",
            5 => "\x1b[15~",
            6 => "\x1b[17~",
            7 => "\x1b[18~",
            8 => "\x1b[19~",
            9 => "\x1b[20~",
            10 => "\x1b[21~",
            11 => "\x1b[23~",
            12 => "\x1b[24~",
            _ => "",
        }
        .into(),
        _ => String::new(),
    }
}

/// C0 control code for Ctrl+`c`, as a VT100 keyboard produces it
fn control_byte(c: char) -> Option<u8> {
    match c {
        // Ctrl+A = 0x01 ... Ctrl+Z = 0x1a
        'a'..='z' | 'A'..='Z' => Some((c.to_ascii_lowercase() as u8) - b'a' + 1),
        '@' | ' ' | '2' => Some(0x00),
        '[' | '3' => Some(0x1b),
        '\\' | '4' => Some(0x1c),
        ']' | '5' => Some(0x1d),
        '^' | '6' => Some(0x1e),
        '_' | '-' | '/' | '7' => Some(0x1f),
        '?' | '8' => Some(0x7f),
        _ => None,
    }
}
