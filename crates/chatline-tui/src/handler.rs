use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use chatline_core::UserIntent;
use crate::app::{App, InputMode, TEMPERATURE_STEP};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
        AppEvent::ChatFinished(outcome) => app.on_chat_finished(outcome),
        AppEvent::ModelsLoaded(models) => app.on_models_loaded(models),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    app.notice = None;
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    // Global keys that work in any mode
    match key.code {
        KeyCode::Char('c') if ctrl => {
            app.should_quit = true;
            return;
        }
        KeyCode::Char('k') if ctrl => {
            app.dispatch(UserIntent::FocusInput);
            return;
        }
        KeyCode::Char('l') if ctrl => {
            app.dispatch(UserIntent::TriggerClear);
            return;
        }
        _ => {}
    }

    // The error popup is modal until dismissed
    if app.session.error_message().is_some() {
        if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char(' ')) {
            app.dispatch(UserIntent::Acknowledge);
        }
        return;
    }

    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Char('i') | KeyCode::Enter | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
        }

        // Transcript scrolling
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down((app.transcript_height / 2).max(1));
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up((app.transcript_height / 2).max(1));
        }
        KeyCode::Char('g') => app.transcript_scroll = 0,
        KeyCode::Char('G') => app.scroll_transcript_to_bottom(),

        // Settings
        KeyCode::Char('m') => app.open_model_picker(),
        KeyCode::Char('+') | KeyCode::Char('=') => app.adjust_temperature(TEMPERATURE_STEP),
        KeyCode::Char('-') => app.adjust_temperature(-TEMPERATURE_STEP),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            insert_char(app, '\n');
        }
        KeyCode::Enter => app.dispatch(UserIntent::Submit),
        KeyCode::Backspace => app.session.composer_mut().backspace(),
        KeyCode::Delete => app.session.composer_mut().delete(),
        KeyCode::Left => app.session.composer_mut().move_left(),
        KeyCode::Right => app.session.composer_mut().move_right(),
        KeyCode::Home => app.session.composer_mut().move_home(),
        KeyCode::End => app.session.composer_mut().move_end(),
        KeyCode::Char(c) => insert_char(app, c),
        _ => {}
    }
}

fn insert_char(app: &mut App, c: char) {
    if !app.session.composer_mut().insert_char(c) {
        app.notice = Some(format!(
            "Message limit reached ({})",
            app.session.composer().count_label()
        ));
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_transcript = app
        .transcript_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_transcript {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::{ChatReply, ClientError, Config, SessionState};
    use crossterm::event::{KeyEventKind, KeyEventState};
    use tokio::sync::mpsc;

    fn app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let config = Config {
            endpoint: Some("http://127.0.0.1:9".to_string()),
            ..Config::new()
        };
        App::new(&config, tx).unwrap()
    }

    fn key(code: KeyCode) -> AppEvent {
        key_with(code, KeyModifiers::NONE)
    }

    fn key_with(code: KeyCode, modifiers: KeyModifiers) -> AppEvent {
        AppEvent::Key(KeyEvent {
            code,
            modifiers,
            kind: KeyEventKind::Press,
            state: KeyEventState::NONE,
        })
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_event(app, key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn typing_and_enter_submits() {
        let mut app = app();
        type_text(&mut app, "Hi");
        assert_eq!(app.session.composer().text(), "Hi");

        handle_event(&mut app, key(KeyCode::Enter));
        assert!(app.session.is_sending());
        assert_eq!(app.session.composer().text(), "");
    }

    #[tokio::test]
    async fn alt_enter_inserts_newline() {
        let mut app = app();
        type_text(&mut app, "a");
        handle_event(&mut app, key_with(KeyCode::Enter, KeyModifiers::ALT));
        type_text(&mut app, "b");
        assert_eq!(app.session.composer().text(), "a\nb");
        assert!(!app.session.is_sending());
    }

    #[tokio::test]
    async fn error_popup_swallows_keys_until_dismissed() {
        let mut app = app();
        type_text(&mut app, "x");
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(
            &mut app,
            AppEvent::ChatFinished(Err(ClientError::Service(Some("rate limited".into())))),
        );
        assert_eq!(app.session.error_message(), Some("rate limited"));

        type_text(&mut app, "ignored");
        assert_eq!(app.session.composer().text(), "");

        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.session.state(), &SessionState::Idle);
    }

    #[tokio::test]
    async fn ctrl_shortcuts_focus_and_clear() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Esc));
        assert_eq!(app.input_mode, InputMode::Normal);

        handle_event(&mut app, key_with(KeyCode::Char('k'), KeyModifiers::CONTROL));
        assert_eq!(app.input_mode, InputMode::Editing);

        type_text(&mut app, "q");
        handle_event(&mut app, key(KeyCode::Enter));
        handle_event(
            &mut app,
            AppEvent::ChatFinished(Ok(ChatReply { reply: "a".into() })),
        );
        assert_eq!(app.session.transcript().len(), 3);

        handle_event(&mut app, key_with(KeyCode::Char('l'), KeyModifiers::CONTROL));
        assert_eq!(app.session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn resize_leaves_state_alone() {
        let mut app = app();
        type_text(&mut app, "draft");
        handle_event(&mut app, AppEvent::Resize);
        assert_eq!(app.session.composer().text(), "draft");
        assert_eq!(app.input_mode, InputMode::Editing);
    }

    #[tokio::test]
    async fn normal_mode_keys_adjust_settings() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Esc));
        handle_event(&mut app, key(KeyCode::Char('+')));
        handle_event(&mut app, key(KeyCode::Char('+')));
        assert_eq!(app.session.settings().temperature(), 0.9);

        handle_event(&mut app, key(KeyCode::Char('q')));
        assert!(app.should_quit);
    }
}
