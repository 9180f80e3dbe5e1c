use std::io::IsTerminal;
use std::sync::mpsc;
use std::thread;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Watches the keyboard for `q` or Ctrl-C while a long operation runs.
/// Inert when stdin is not a terminal.
pub struct InputHandle {
    rx: mpsc::Receiver<()>,
    tx: Option<mpsc::Sender<()>>,
}

impl InputHandle {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { rx, tx: Some(tx) }
    }

    pub fn start(&mut self) {
        if !std::io::stdin().is_terminal() {
            return;
        }
        let Some(tx) = self.tx.take() else {
            return;
        };
        if enable_raw_mode().is_err() {
            return;
        }

        thread::spawn(move || {
            loop {
                let key_event = match event::read() {
                    Ok(Event::Key(key_event)) => key_event,
                    Ok(_) => continue,
                    Err(_) => break,
                };
                let is_q = key_event.code == KeyCode::Char('q');
                let is_ctrl_c = key_event.code == KeyCode::Char('c')
                    && key_event.modifiers.contains(KeyModifiers::CONTROL);

                if (is_q || is_ctrl_c) && key_event.kind == KeyEventKind::Press {
                    let _ = tx.send(());
                    break;
                }
            }
            let _ = disable_raw_mode();
        });
    }

    pub fn should_interrupt(&self) -> bool {
        self.rx.try_recv().is_ok()
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
    }
}
