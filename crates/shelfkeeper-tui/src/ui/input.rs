//! Keyboard input handling for the TUI.
//!
//! Overlays take input in stacking order: notice, delete confirmation,
//! product form, login, help, quit confirmation, then the product list.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use shelfkeeper_core::models::ProductField;

use crate::app::{can_add_password_char, can_add_username_char, App, AppState, LoginFocus};

/// Returns `Ok(true)` when the application should exit.
pub async fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Notices block everything until dismissed
    if app.view.notice().is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ')) {
            app.view.dismiss_notice();
        }
        return Ok(false);
    }

    if app.view.pending_delete().is_some() {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.view.confirm_delete();
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.view.cancel_delete();
            }
            _ => {}
        }
        return Ok(false);
    }

    if app.view.modal().is_some() {
        handle_form_input(app, key);
        return Ok(false);
    }

    if app.is_logging_in() {
        return handle_login_input(app, key).await;
    }

    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => {
            app.state = AppState::ConfirmingQuit;
        }
        KeyCode::Char('?') => {
            app.state = AppState::ShowingHelp;
        }
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('[') => app.prev_page(),
        KeyCode::Right | KeyCode::Char(']') => app.next_page(),
        KeyCode::Char('n') => app.open_create(),
        KeyCode::Enter | KeyCode::Char('e') => app.open_edit_selected(),
        KeyCode::Char('d') | KeyCode::Delete => app.request_delete_selected(),
        KeyCode::Char('u') => app.view.refresh(),
        KeyCode::Char('L') => app.logout().await,
        _ => {}
    }

    Ok(false)
}

fn handle_form_input(app: &mut App, key: KeyEvent) {
    // Ctrl+S saves from any field
    if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.submit_form();
        return;
    }

    match key.code {
        KeyCode::Esc => app.cancel_form(),
        KeyCode::Down | KeyCode::Tab => app.form_next_field(),
        KeyCode::Up | KeyCode::BackTab => app.form_prev_field(),
        KeyCode::Enter => {
            // Enter on the last field saves, elsewhere it advances
            if app.form_field == *ProductField::ALL.last().unwrap_or(&ProductField::Title) {
                app.submit_form();
            } else {
                app.form_next_field();
            }
        }
        KeyCode::Backspace => app.form_backspace(),
        KeyCode::Char(' ') if app.form_field == ProductField::IsEnabled => app.toggle_enabled(),
        KeyCode::Char(c) => app.form_push_char(c),
        _ => {}
    }
}

async fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Password,
                LoginFocus::Password => LoginFocus::Button,
                LoginFocus::Button => LoginFocus::Username,
            };
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = match app.login_focus {
                LoginFocus::Username => LoginFocus::Button,
                LoginFocus::Password => LoginFocus::Username,
                LoginFocus::Button => LoginFocus::Password,
            };
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Username => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login().await,
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Username => {
                app.login_username.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Username => {
                if can_add_username_char(app.login_username.chars().count(), c) {
                    app.login_username.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            LoginFocus::Button => {}
        },
        _ => {}
    }

    Ok(false)
}
