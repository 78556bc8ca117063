use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crashmap::app::{App, SelectionChange, SortDirection};
use crashmap::ui;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::layout::Position;
use ratatui::DefaultTerminal;

fn main() -> Result<()> {
    // Logs go to stderr; redirect with 2>crashmap.log when debugging
    env_logger::init();

    let mut terminal = ratatui::init();
    terminal.clear()?;

    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

fn data_dir() -> PathBuf {
    std::env::var_os("CRASHMAP_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn run(terminal: &mut DefaultTerminal) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(data_dir(), size.width as usize, size.height as usize);

    // One-time load; failure leaves the dashboard in the not-loaded
    // state with `r` as the manual retry.
    app.load();

    loop {
        terminal.draw(|frame| ui::render(frame, &mut app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    handle_key(&mut app, key.code);
                }
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => {
            if app.trend_open() {
                app.close_trend();
            } else {
                app.quit();
            }
        }
        KeyCode::Char('r') => app.load(),

        // Everything below requires loaded data
        _ if !app.is_ready() => {}

        // Year stepping
        KeyCode::Left => app.step_year(-1),
        KeyCode::Right => app.step_year(1),

        // Sort toggles
        KeyCode::Char('a') | KeyCode::Char('A') => {
            app.apply(SelectionChange::Sort(SortDirection::Ascending));
        }
        KeyCode::Char('d') | KeyCode::Char('D') => {
            app.apply(SelectionChange::Sort(SortDirection::Descending));
        }

        KeyCode::Char('x') => app.close_trend(),

        // Pan with hjkl
        KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Char('j') => app.pan(0, 6),

        // Zoom
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

        _ => {}
    }
}

/// Mouse: hover tooltips, button/bar clicks, map drag-pan, scroll zoom.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track position for the hover tooltip
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        MouseEventKind::ScrollUp if app.is_ready() => {
            app.zoom_in_at(mouse.column, mouse.row);
        }
        MouseEventKind::ScrollDown if app.is_ready() => {
            app.zoom_out_at(mouse.column, mouse.row);
        }
        MouseEventKind::Down(MouseButton::Left) => {
            handle_click(app, mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            // Only pan drags that started on the map panel
            if app.last_mouse.is_some() {
                app.handle_drag(mouse.column, mouse.row);
            }
        }
        MouseEventKind::Up(MouseButton::Left) => app.end_drag(),
        _ => {}
    }
}

fn handle_click(app: &mut App, col: u16, row: u16) {
    if !app.is_ready() {
        return;
    }
    let regions = app.regions;
    let pos = Position::new(col, row);

    // An open popup captures clicks inside it; only the close control acts
    if app.trend_open() && regions.popup.contains(pos) {
        if regions.popup_close.contains(pos) {
            app.close_trend();
        }
        return;
    }

    if let Some(year) = ui::year_at(regions.years, col, row) {
        app.apply(SelectionChange::Year(year));
    } else if regions.sort_asc.contains(pos) {
        app.apply(SelectionChange::Sort(SortDirection::Ascending));
    } else if regions.sort_desc.contains(pos) {
        app.apply(SelectionChange::Sort(SortDirection::Descending));
    } else if regions.bars.contains(pos) {
        app.click_bar(col - regions.bars.x);
    } else if regions.map.contains(pos) {
        app.last_mouse = Some((col, row));
    }
}
