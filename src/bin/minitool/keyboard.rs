use std::io::stdout;
use std::{process, time::Duration};

use crossterm::{
    cursor::{Hide, MoveToColumn, Show},
    event::{poll, read, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode},
    Result,
};

/// Waits up to `timeout` for a key press and returns `true` if it was `Esc`.
pub(crate) fn poll_escape(timeout: Duration) -> Result<bool> {
    enable_raw_mode()?;
    execute!(stdout(), Hide)?;
    let result = poll(timeout)?;
    let event = if result {
        // It's guaranteed that read() wont block if `poll` returns `Ok(true)`
        Some(read()?)
    } else {
        None
    };
    execute!(stdout(), MoveToColumn(0), Show)?;
    disable_raw_mode()?;

    match event {
        Some(event) => {
            exit_on_ctrl_c(&event);
            Ok(event == Event::Key(KeyCode::Esc.into()))
        }
        None => Ok(false),
    }
}

/// Blocks until `Enter` is pressed, swallowing any other key.
pub(crate) fn wait_for_enter() -> Result<()> {
    enable_raw_mode()?;
    let outcome = loop {
        match read() {
            Ok(event) => {
                if event == Event::Key(KeyCode::Enter.into()) {
                    break Ok(());
                }
                if is_ctrl_c(&event) {
                    disable_raw_mode()?;
                    process::exit(0);
                }
            }
            Err(e) => break Err(e),
        }
    };
    disable_raw_mode()?;
    outcome
}

fn is_ctrl_c(event: &Event) -> bool {
    *event
        == Event::Key(KeyEvent {
            modifiers: KeyModifiers::CONTROL,
            code: KeyCode::Char('c'),
        })
}

// As we are in raw mode, Ctrl+C is captured as a key event rather than a
// signal. Exit the process if that happens.
fn exit_on_ctrl_c(event: &Event) {
    if is_ctrl_c(event) {
        process::exit(0);
    }
}
