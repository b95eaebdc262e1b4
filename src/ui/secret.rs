use anyhow::{Result, bail};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Puts the terminal back into cooked mode on every exit path.
struct RawModeGuard;

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum KeyStep {
    Continue,
    Submit,
    Interrupt,
    EndOfInput,
}

/// Reads one line from the terminal without echoing the typed characters.
pub fn read_hidden_line() -> Result<String> {
    enable_raw_mode()?;
    let _guard = RawModeGuard;

    let mut line = String::new();
    loop {
        let Event::Key(key) = event::read()? else {
            continue;
        };
        match apply_key(&mut line, key) {
            KeyStep::Continue => {}
            KeyStep::Submit => return Ok(line),
            KeyStep::Interrupt => bail!("password entry interrupted"),
            KeyStep::EndOfInput => bail!("input closed before setup finished"),
        }
    }
}

fn apply_key(line: &mut String, key: KeyEvent) -> KeyStep {
    if key.kind != KeyEventKind::Press {
        return KeyStep::Continue;
    }
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Enter => KeyStep::Submit,
        KeyCode::Char('c') if ctrl => KeyStep::Interrupt,
        KeyCode::Char('d') if ctrl && line.is_empty() => KeyStep::EndOfInput,
        KeyCode::Char('u') if ctrl => {
            line.clear();
            KeyStep::Continue
        }
        KeyCode::Backspace => {
            line.pop();
            KeyStep::Continue
        }
        KeyCode::Char(ch) if !ctrl => {
            line.push(ch);
            KeyStep::Continue
        }
        _ => KeyStep::Continue,
    }
}
