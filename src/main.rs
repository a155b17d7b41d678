use std::io::stdout;

use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;

use tabledesk::chart::BarChartData;
use tabledesk::cli::{Cli, OutputFormat};
use tabledesk::output::{render_csv, render_json, render_structure, render_table};
use tabledesk::session::Session;
use tabledesk::tui::{app::App, input::handle_events, ui::draw};

const CHART_WIDTH: usize = 50;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse_args();
    let interactive = !cli.is_batch();
    tabledesk::logging::init(cli.log_file.as_deref(), cli.log_level.as_deref(), interactive)?;

    let mut session = Session::new();
    if let Some(path) = &cli.database {
        session.create(path)?;
    }

    if interactive {
        run_tui(session)
    } else {
        run_batch(&cli, &mut session)
    }
}

/// Runs each requested action in order: import, export, schema, query, chart.
fn run_batch(cli: &Cli, session: &mut Session) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = &cli.import {
        for table in session.import_into_database(path)? {
            println!("Imported table {}", table);
        }
    }

    if let Some(path) = &cli.export {
        for file in session.export_tables(path)? {
            println!("Wrote {}", file.display());
        }
    }

    if cli.schema {
        print!("{}", render_structure(&session.list_table_structure()?));
    }

    if let Some(query) = &cli.query {
        if session.returns_rows(query)? {
            let result = session.query(query)?;
            let text = match cli.format {
                OutputFormat::Table => render_table(&result),
                OutputFormat::Csv => render_csv(&result)?,
                OutputFormat::Json => render_json(&result),
            };
            print!("{}", text);
        } else {
            session.execute(query)?;
            println!("OK");
        }
    }

    if let Some(query) = &cli.chart {
        let chart: BarChartData = session.run_visualization_query(query)?;
        print!("{}", chart.render_text(CHART_WIDTH));
    }

    Ok(())
}

fn run_tui(session: Session) -> Result<(), Box<dyn std::error::Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session);

    // Main loop
    let result = loop {
        if let Err(e) = terminal.draw(|frame| draw(frame, &app)) {
            break Err(e);
        }

        match handle_events(&mut app) {
            Ok(true) => break Ok(()),
            Ok(false) => {}
            Err(e) => break Err(e),
        }
    };

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(result?)
}
