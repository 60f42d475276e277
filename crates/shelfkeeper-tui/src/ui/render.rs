use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame,
};

use shelfkeeper_core::models::ProductField;
use shelfkeeper_core::view::NoticeKind;

use crate::app::{App, AppState, LoginFocus};
use crate::utils::{format_price, pad_to_width, truncate_string};

use super::styles;

/// Width of the value column in the product form
const FORM_VALUE_WIDTH: usize = 40;

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(8),    // Product table
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    render_products(frame, app, chunks[1]);
    render_status_bar(frame, app, chunks[2]);

    // Overlays, bottom to top
    if app.is_logging_in() {
        render_login_overlay(frame, app);
    }

    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }

    if app.view.modal().is_some() {
        render_form_overlay(frame, app);
    }

    if app.view.pending_delete().is_some() {
        render_delete_overlay(frame, app);
    }

    if app.view.notice().is_some() {
        render_notice_overlay(frame, app);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Shelfkeeper";
    let right = if app.view.is_authenticated() {
        "[?] Help"
    } else {
        "Signed out"
    };

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            area.width
                .saturating_sub(title.len() as u16 + right.len() as u16 + 4) as usize,
        )),
        Span::styled(right, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    frame.render_widget(Paragraph::new(title_line).block(block), area);
}

fn render_products(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Products ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(app.view.is_authenticated()));

    let products = app.view.products();
    if products.is_empty() {
        let message = if !app.view.is_authenticated() {
            ""
        } else if app.view.is_loading() {
            "Loading..."
        } else {
            "No products yet. Press [n] to add one."
        };
        let paragraph = Paragraph::new(Span::styled(message, styles::muted_style())).block(block);
        frame.render_widget(paragraph, area);
        return;
    }

    let header = Row::new(vec!["Category", "Title", "Original", "Price", "Status"])
        .style(styles::header_style());

    let rows: Vec<Row> = products
        .iter()
        .map(|p| {
            Row::new(vec![
                Cell::from(truncate_string(&p.category, 14)),
                Cell::from(truncate_string(&p.title, 40)),
                Cell::from(format_price(p.origin_price)),
                Cell::from(format_price(p.price)),
                Cell::from(Span::styled(
                    p.status_display(),
                    styles::enabled_style(p.is_enabled),
                )),
            ])
            .style(styles::list_item_style())
        })
        .collect();

    let widths = [
        Constraint::Length(16),
        Constraint::Min(20),
        Constraint::Length(12),
        Constraint::Length(12),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .row_highlight_style(styles::selected_style())
        .highlight_symbol("▶ ");

    let mut state = TableState::default().with_selected(Some(app.selection));
    frame.render_stateful_widget(table, area, &mut state);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let left_text = if app.view.is_busy() {
        " Saving... ".to_string()
    } else if app.view.is_loading() {
        " Loading... ".to_string()
    } else if app.view.is_authenticated() {
        format!(" {} ", app.view.pagination().display())
    } else {
        " Please sign in ".to_string()
    };
    let right_text = " [n]ew | [e]dit | [d]elete | ←/→ page | [u]pdate | [q]uit ";

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(52, 24, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");
    let key = |k: &'static str, desc: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", k), styles::help_key_style()),
            Span::styled(desc, styles::help_desc_style()),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled("  Shelfkeeper", styles::title_style())),
        Line::from(Span::styled(
            format!("  version {}", version),
            styles::muted_style(),
        )),
        Line::from(""),
        Line::from(Span::styled(" Navigation", styles::highlight_style())),
        key("↑/↓", "Select product"),
        key("←/→", "Previous/next page"),
        key("u", "Reload current page"),
        Line::from(""),
        Line::from(Span::styled(" Products", styles::highlight_style())),
        key("n", "New product"),
        key("e/Enter", "Edit selected product"),
        key("d", "Delete selected product"),
        Line::from(""),
        Line::from(Span::styled(" Form", styles::highlight_style())),
        key("Tab", "Next field"),
        key("Space", "Toggle enabled"),
        key("Ctrl+S", "Save"),
        key("Esc", "Discard changes"),
        Line::from(""),
        key("L", "Sign out"),
        key("q", "Quit"),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let height = if app.login_error.is_some() { 12 } else { 10 };
    let area = centered_rect_fixed(50, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![
        Line::from(Span::styled("  Shelfkeeper admin sign in", styles::title_style())),
        Line::from(""),
    ];

    let field = |label: &'static str, value: String, focused: bool| {
        let style = if focused {
            styles::selected_style()
        } else {
            styles::list_item_style()
        };
        let cursor = if focused { "▌" } else { "" };
        Line::from(vec![
            Span::styled(format!("  {:<10}[", label), styles::muted_style()),
            Span::styled(format!("{}{}", pad_to_width(&value, 28), cursor), style),
            Span::styled("]", styles::muted_style()),
        ])
    };

    lines.push(field(
        "Username:",
        app.login_username.clone(),
        app.login_focus == LoginFocus::Username,
    ));
    lines.push(field(
        "Password:",
        "*".repeat(app.login_password.chars().count().min(28)),
        app.login_focus == LoginFocus::Password,
    ));

    lines.push(Line::from(""));
    let button = if app.login_focus == LoginFocus::Button {
        Span::styled(" ▶ Sign in ◀ ", styles::selected_style())
    } else {
        Span::styled("   Sign in   ", styles::list_item_style())
    };
    lines.push(Line::from(vec![Span::raw("              ["), button, Span::raw("]")]));

    if let Some(ref error) = app.login_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", truncate_string(error, 46)),
            styles::error_style(),
        )));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_form_overlay(frame: &mut Frame, app: &App) {
    let Some(modal) = app.view.modal() else {
        return;
    };

    let extra = if app.form_error.is_some() { 2 } else { 0 };
    let height = ProductField::ALL.len() as u16 + 6 + extra;
    let area = centered_rect_fixed(62, height, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = vec![Line::from("")];
    for field in ProductField::ALL {
        let focused = field == app.form_field;
        let (value, style) = if focused {
            (format!("{}▌", app.form_input), styles::selected_style())
        } else {
            (modal.draft.text(field), styles::list_item_style())
        };
        lines.push(Line::from(vec![
            Span::styled(format!(" {:>15}: ", field.label()), styles::muted_style()),
            Span::styled(pad_to_width(&value, FORM_VALUE_WIDTH), style),
        ]));
    }

    if let Some(ref error) = app.form_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!(" {}", truncate_string(error, 58)),
            styles::error_style(),
        )));
    }

    lines.push(Line::from(""));
    let hint = if app.view.is_busy() {
        Line::from(Span::styled(" Saving...", styles::highlight_style()))
    } else {
        Line::from(vec![
            Span::styled(" [Tab]", styles::help_key_style()),
            Span::styled(" next  ", styles::muted_style()),
            Span::styled("[Ctrl+S]", styles::help_key_style()),
            Span::styled(" save  ", styles::muted_style()),
            Span::styled("[Esc]", styles::help_key_style()),
            Span::styled(" cancel", styles::muted_style()),
        ])
    };
    lines.push(hint);

    let block = Block::default()
        .title(format!(" {} ", modal.title()))
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_delete_overlay(frame: &mut Frame, app: &App) {
    let Some(pending) = app.view.pending_delete() else {
        return;
    };

    let area = centered_rect_fixed(50, 7, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            format!("  Delete \"{}\"?", truncate_string(&pending.title, 32)),
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to delete, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .title(" Delete Product ")
        .borders(Borders::ALL)
        .border_style(styles::error_style());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_notice_overlay(frame: &mut Frame, app: &App) {
    let Some(notice) = app.view.notice() else {
        return;
    };

    let area = centered_rect_fixed(50, 8, frame.area());
    frame.render_widget(Clear, area);

    let (title, style) = match notice.kind {
        NoticeKind::Info => (" Done ", styles::success_style()),
        NoticeKind::Error => (" Error ", styles::error_style()),
    };

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(format!(" {}", notice.message), style)),
        Line::from(""),
        Line::from(Span::styled(" Press Enter to continue", styles::muted_style())),
    ];

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(style);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 6, frame.area());
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}
