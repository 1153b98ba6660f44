pub mod keybindings;
pub mod layout;
pub mod list_pane;
pub mod status_pane;
pub mod styles;

use crate::app::AppState;
use crate::domain::Clock;
use crate::persistence::BlobStore;
use keybindings::render_keybindings;
use layout::create_layout;
use list_pane::render_list_pane;
use ratatui::Frame;
use status_pane::render_status_pane;

/// Main render function - draws the entire UI
pub fn render<B: BlobStore, C: Clock>(f: &mut Frame, app: &AppState<B, C>) {
    let layout = create_layout(f.size());

    render_keybindings(f, layout.keybindings_area);
    render_list_pane(f, app, layout.list_area);
    render_status_pane(f, app, layout.status_area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::create_test_app;
    use crate::notifications::Notice;
    use ratatui::{backend::TestBackend, Terminal};

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_render_lists_tasks_and_status() {
        let (mut app, _) = create_test_app();
        app.toggle_timer().unwrap();
        app.message = Some(Notice::info("Time sent for task A-1"));

        let mut terminal = Terminal::new(TestBackend::new(60, 12)).unwrap();
        terminal.draw(|f| render(f, &app)).unwrap();
        let text = screen_text(&terminal);

        assert!(text.contains("Tasks (2)"));
        assert!(text.contains("A-1"));
        assert!(text.contains("[feat/b]"));
        assert!(text.contains("A-1: 0:01:01"));
        assert!(text.contains("Time sent for task A-1"));
    }
}
