use crate::app::AppState;
use crate::domain::{Clock, TaskRow};
use crate::persistence::BlobStore;
use crate::ui::styles::{
    border_style, branch_style, default_style, selected_style, status_style, title_style,
};
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};

/// Render the task list pane
pub fn render_list_pane<B: BlobStore, C: Clock>(f: &mut Frame, app: &AppState<B, C>, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style())
        .title(Span::styled(
            format!(" Tasks ({}) ", app.rows.len()),
            title_style(),
        ));

    if app.rows.is_empty() {
        let empty = Paragraph::new("No tasks. Run `trh fetch` to load your tasks.").block(block);
        f.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = app
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            let style = if idx == app.selected_index {
                selected_style()
            } else {
                default_style()
            };
            ListItem::new(create_task_line(row)).style(style)
        })
        .collect();

    f.render_widget(List::new(items).block(block), area);
}

/// Format: ▶ QUEUE-12  1:02:03  [feat/login]
fn create_task_line(row: &TaskRow) -> Line<'static> {
    let mut spans = vec![
        Span::styled(format!("{} ", row.status.badge()), status_style(row.status)),
        Span::raw(format!("{:<16}", row.key)),
        Span::raw(format!("{:>10}", row.elapsed_formatted())),
    ];
    if !row.branch.is_empty() {
        spans.push(Span::raw("  ".to_string()));
        spans.push(Span::styled(format!("[{}]", row.branch), branch_style()));
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RunStatus;

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_create_task_line() {
        let row = TaskRow {
            key: "QUEUE-12".to_string(),
            branch: "feat/login".to_string(),
            elapsed_ms: 3_723_000,
            status: RunStatus::Running,
        };
        let text = line_text(&create_task_line(&row));

        assert!(text.starts_with("▶ QUEUE-12"));
        assert!(text.contains("1:02:03"));
        assert!(text.ends_with("[feat/login]"));
    }

    #[test]
    fn test_unbound_task_has_no_branch_label() {
        let row = TaskRow {
            key: "QUEUE-7".to_string(),
            branch: String::new(),
            elapsed_ms: 0,
            status: RunStatus::Stopped,
        };
        let text = line_text(&create_task_line(&row));
        assert!(!text.contains('['));
        assert!(text.contains("0:00:00"));
    }
}
