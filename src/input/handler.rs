use crate::app::AppState;
use crate::domain::Clock;
use crate::error::TimerError;
use crate::notifications::Notice;
use crate::persistence::BlobStore;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::warn;

/// Handle keyboard input events. Returns true when the view should close.
pub fn handle_key<B: BlobStore, C: Clock>(app: &mut AppState<B, C>, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Up => {
            app.move_selection_up();
            Ok(false)
        }
        KeyCode::Down => {
            app.move_selection_down();
            Ok(false)
        }

        // Start/stop the highlighted task
        KeyCode::Char(' ') | KeyCode::Enter => {
            if let Err(e) = app.toggle_timer() {
                warn!(error = %e, "failed to toggle timer");
                app.apply_events();
                if let TimerError::Storage(_) = e {
                    app.message = Some(Notice::error(e.to_string()));
                }
            }
            Ok(false)
        }

        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Ok(true),
        KeyCode::Char('q') | KeyCode::Esc => Ok(true),

        _ => Ok(false),
    }
}
