use crate::app::AppState;
use crate::domain::Clock;
use crate::persistence::BlobStore;
use crate::ui::styles::{border_style, notice_style, running_style, stopped_style};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// Render the running timer and the latest message
pub fn render_status_pane<B: BlobStore, C: Clock>(f: &mut Frame, app: &AppState<B, C>, area: Rect) {
    let timer_style = if app.coordinator.is_running() {
        running_style()
    } else {
        stopped_style()
    };
    let mut lines = vec![Line::from(Span::styled(
        format!("⏱ {}", app.status_line()),
        timer_style,
    ))];
    if let Some(notice) = &app.message {
        lines.push(Line::from(Span::styled(
            notice.message.clone(),
            notice_style(notice.severity),
        )));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(border_style()),
    );
    f.render_widget(paragraph, area);
}
