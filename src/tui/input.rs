use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use std::time::Duration;

use super::app::{App, Focus, MenuItem, Mode, Screen};

pub fn handle_events(app: &mut App) -> std::io::Result<bool> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Press {
                handle_key_event(app, key);
            }
        }
    }
    Ok(app.should_quit)
}

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // A dialog swallows the key that dismisses it.
    if app.dialog.is_some() {
        app.dismiss_dialog();
        return;
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        if app.screen == Screen::Query && app.mode == Mode::Insert {
            app.enter_normal_mode();
        } else {
            app.should_quit = true;
        }
        return;
    }

    if app.prompt.is_some() {
        handle_prompt(app, key);
        return;
    }

    match app.screen {
        Screen::Menu => handle_menu(app, key),
        Screen::Designer => handle_designer(app, key),
        Screen::Structure => handle_structure(app, key),
        Screen::Chart => handle_chart(app, key),
        Screen::Query => match app.mode {
            Mode::Normal => handle_normal_mode(app, key),
            Mode::Insert => handle_insert_mode(app, key),
            Mode::Command => handle_command_mode(app, key),
        },
    }
}

fn handle_menu(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('k') | KeyCode::Up => app.menu_up(),
        KeyCode::Char('j') | KeyCode::Down => app.menu_down(),
        KeyCode::Enter => app.activate(app.selected_menu_item()),
        KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
        KeyCode::Char(c @ '1'..='9') => {
            let idx = c as usize - '1' as usize;
            if let Some(item) = MenuItem::ALL.get(idx) {
                app.menu_index = idx;
                app.activate(*item);
            }
        }
        _ => {}
    }
}

fn handle_prompt(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_prompt(),
        KeyCode::Enter => app.submit_prompt(),
        code => {
            let Some(prompt) = app.prompt.as_mut() else {
                return;
            };
            let input = &mut prompt.input;
            match code {
                KeyCode::Backspace => input.delete_char(),
                KeyCode::Delete => input.delete_char_forward(),
                KeyCode::Left => input.move_left(),
                KeyCode::Right => input.move_right(),
                KeyCode::Home => input.move_start(),
                KeyCode::End => input.move_end(),
                KeyCode::Char(c) => input.insert_char(c),
                _ => {}
            }
        }
    }
}

fn handle_designer(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.back_to_menu(),
        KeyCode::F(5) => app.submit_designer(),
        KeyCode::Char('s') if ctrl => app.submit_designer(),
        code => {
            let form = &mut app.designer;
            match code {
                KeyCode::Char('t') if ctrl => form.add_table(),
                KeyCode::Char('f') if ctrl => form.add_field(),
                KeyCode::Tab | KeyCode::Down | KeyCode::Enter => form.focus_next(),
                KeyCode::BackTab | KeyCode::Up => form.focus_prev(),
                KeyCode::Right => form.cycle_type(true),
                KeyCode::Left => form.cycle_type(false),
                KeyCode::Backspace => form.delete_char(),
                KeyCode::Char(c) if !ctrl => form.insert_char(c),
                _ => {}
            }
        }
    }
}

fn handle_structure(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.structure_scroll += 1,
        KeyCode::Char('k') | KeyCode::Up => {
            app.structure_scroll = app.structure_scroll.saturating_sub(1)
        }
        KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => app.back_to_menu(),
        _ => {}
    }
}

fn handle_chart(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
        app.screen = Screen::Query;
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        // Mode switching
        KeyCode::Char('i') => app.enter_insert_mode(),
        KeyCode::Char('I') => {
            app.query.move_start();
            app.enter_insert_mode();
        }
        KeyCode::Char('A') => {
            app.query.move_end();
            app.enter_insert_mode();
        }
        KeyCode::Char(':') => app.enter_command_mode(),

        KeyCode::Char('q') | KeyCode::Esc => app.back_to_menu(),

        KeyCode::Tab => app.toggle_focus(),

        KeyCode::Char('h') | KeyCode::Left => {
            if app.focus == Focus::Query {
                app.query.move_left();
            } else {
                app.scroll_results_left();
            }
        }
        KeyCode::Char('l') | KeyCode::Right => {
            if app.focus == Focus::Query {
                app.query.move_right();
            } else {
                app.scroll_results_right();
            }
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == Focus::Results {
                app.scroll_results_down();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == Focus::Results {
                app.scroll_results_up();
            }
        }
        KeyCode::Char('d') if ctrl => app.page_down(),
        KeyCode::Char('u') if ctrl => app.page_up(),
        KeyCode::Char('x') if app.focus == Focus::Query => app.query.delete_char_forward(),
        KeyCode::Char('D') if app.focus == Focus::Query => app.query.delete_to_end(),

        KeyCode::Enter => app.execute_query(),
        _ => {}
    }
}

fn handle_insert_mode(app: &mut App, key: KeyEvent) {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Esc => app.enter_normal_mode(),
        // Alt+Enter breaks the line; plain Enter runs the query.
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => app.query.insert_char('\n'),
        KeyCode::Enter => {
            app.execute_query();
            app.enter_normal_mode();
        }
        KeyCode::Backspace => app.query.delete_char(),
        KeyCode::Delete => app.query.delete_char_forward(),
        KeyCode::Left => app.query.move_left(),
        KeyCode::Right => app.query.move_right(),
        KeyCode::Home => app.query.move_start(),
        KeyCode::End => app.query.move_end(),
        KeyCode::Up => app.history_up(),
        KeyCode::Down => app.history_down(),

        KeyCode::Char('u') if ctrl => app.query.delete_to_start(),
        KeyCode::Char('k') if ctrl => app.query.delete_to_end(),
        KeyCode::Char('a') if ctrl => app.query.move_start(),
        KeyCode::Char('e') if ctrl => app.query.move_end(),
        KeyCode::Char('g') if ctrl => app.visualize_query(),

        KeyCode::Char(c) if !ctrl => app.query.insert_char(c),

        _ => {}
    }
}

fn handle_command_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.command_buffer.clear();
            app.enter_normal_mode();
        }
        KeyCode::Enter => app.execute_command(),
        KeyCode::Backspace => {
            app.command_buffer.pop();
            if app.command_buffer.is_empty() {
                app.enter_normal_mode();
            }
        }
        KeyCode::Char(c) => app.command_buffer.push(c),
        _ => {}
    }
}
