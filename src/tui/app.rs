use std::path::{Path, PathBuf};

use tracing::warn;

use crate::chart::BarChartData;
use crate::designer::{self, DesignerForm};
use crate::session::{Session, TableStructure};
use crate::storage::dataset::Dataset;
use crate::storage::format::FormatRegistry;

use super::editor::{History, TextInput};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Screen {
    Menu,
    Designer,
    Structure,
    Query,
    Chart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MenuItem {
    CreateDatabase,
    CreateTables,
    Import,
    Export,
    Structure,
    SqlEditor,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 7] = [
        MenuItem::CreateDatabase,
        MenuItem::CreateTables,
        MenuItem::Import,
        MenuItem::Export,
        MenuItem::Structure,
        MenuItem::SqlEditor,
        MenuItem::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            MenuItem::CreateDatabase => "Create database",
            MenuItem::CreateTables => "Create tables",
            MenuItem::Import => "Import data",
            MenuItem::Export => "Export data",
            MenuItem::Structure => "Show table structure",
            MenuItem::SqlEditor => "SQL editor and charts",
            MenuItem::Quit => "Quit",
        }
    }
}

/// Vi-style modes of the SQL editor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Mode {
    Normal,
    Insert,
    Command,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Query,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DialogKind {
    Info,
    Error,
}

/// Modal message; while one is shown every key only dismisses it.
#[derive(Debug, Clone, PartialEq)]
pub struct Dialog {
    pub kind: DialogKind,
    pub title: String,
    pub message: String,
}

impl Dialog {
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Info,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: DialogKind::Error,
            title: "Error".to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPurpose {
    CreateDatabase,
    ImportFile,
    ExportFile,
    /// Save `script`; `then` is shown afterwards whether or not a path was given.
    SaveScript { script: String, then: Option<Dialog> },
}

/// Single-line path entry standing in for a file picker.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub purpose: PromptPurpose,
    pub input: TextInput,
}

impl Prompt {
    /// Import and export prompts list the extensions the registry knows.
    pub fn title(&self, formats: &FormatRegistry) -> String {
        let extensions = || {
            formats
                .extensions()
                .iter()
                .map(|e| format!(".{}", e))
                .collect::<Vec<_>>()
                .join(" ")
        };
        match self.purpose {
            PromptPurpose::CreateDatabase => " New database file (.db) ".to_string(),
            PromptPurpose::ImportFile => format!(" Import from ({}) ", extensions()),
            PromptPurpose::ExportFile => format!(" Export all tables to ({}) ", extensions()),
            PromptPurpose::SaveScript { .. } => {
                " Save SQL script as (.sql, empty to skip) ".to_string()
            }
        }
    }
}

pub struct App {
    pub session: Session,
    pub screen: Screen,
    pub dialog: Option<Dialog>,
    pub prompt: Option<Prompt>,
    pub menu_index: usize,
    pub designer: DesignerForm,
    pub structure: Vec<TableStructure>,
    pub structure_scroll: usize,
    pub chart: Option<BarChartData>,
    pub should_quit: bool,

    // SQL editor
    pub query: TextInput,
    pub result: Option<Dataset>,
    pub mode: Mode,
    pub focus: Focus,
    pub command_buffer: String,
    pub result_scroll: usize,
    pub result_horizontal_scroll: usize,
    pub history: History,
    pub column_widths: Vec<usize>,
}

impl App {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            screen: Screen::Menu,
            dialog: None,
            prompt: None,
            menu_index: 0,
            designer: DesignerForm::new(),
            structure: Vec::new(),
            structure_scroll: 0,
            chart: None,
            should_quit: false,
            query: TextInput::new(),
            result: None,
            mode: Mode::Normal,
            focus: Focus::Query,
            command_buffer: String::new(),
            result_scroll: 0,
            result_horizontal_scroll: 0,
            history: History::default(),
            column_widths: Vec::new(),
        }
    }

    pub fn show_error(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "action failed");
        self.dialog = Some(Dialog::error(message));
    }

    pub fn show_info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.dialog = Some(Dialog::info(title, message));
    }

    pub fn dismiss_dialog(&mut self) {
        self.dialog = None;
    }

    fn open_prompt(&mut self, purpose: PromptPurpose) {
        self.prompt = Some(Prompt {
            purpose,
            input: TextInput::new(),
        });
    }

    // ---- menu ----

    pub fn menu_up(&mut self) {
        self.menu_index = self.menu_index.saturating_sub(1);
    }

    pub fn menu_down(&mut self) {
        if self.menu_index + 1 < MenuItem::ALL.len() {
            self.menu_index += 1;
        }
    }

    pub fn selected_menu_item(&self) -> MenuItem {
        MenuItem::ALL[self.menu_index.min(MenuItem::ALL.len() - 1)]
    }

    pub fn activate(&mut self, item: MenuItem) {
        let needs_database = !matches!(item, MenuItem::CreateDatabase | MenuItem::Quit);
        if needs_database && !self.session.is_open() {
            self.show_error("No database is open. Create or open one first.");
            return;
        }

        match item {
            MenuItem::CreateDatabase => self.open_prompt(PromptPurpose::CreateDatabase),
            MenuItem::CreateTables => self.open_designer(),
            MenuItem::Import => self.open_prompt(PromptPurpose::ImportFile),
            MenuItem::Export => self.open_prompt(PromptPurpose::ExportFile),
            MenuItem::Structure => self.show_structure(),
            MenuItem::SqlEditor => {
                self.screen = Screen::Query;
                self.enter_insert_mode();
            }
            MenuItem::Quit => self.should_quit = true,
        }
    }

    pub fn back_to_menu(&mut self) {
        self.screen = Screen::Menu;
        self.mode = Mode::Normal;
    }

    // ---- prompts ----

    pub fn cancel_prompt(&mut self) {
        if let Some(Prompt {
            purpose: PromptPurpose::SaveScript { then, .. },
            ..
        }) = self.prompt.take()
        {
            self.dialog = then;
        }
    }

    pub fn submit_prompt(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let raw = prompt.input.text.trim().to_string();

        match prompt.purpose {
            PromptPurpose::SaveScript { script, then } => {
                if !raw.is_empty() {
                    let path = with_default_extension(&raw, "sql");
                    if let Err(e) = self.session.save_sql_script(&script, &path) {
                        self.show_error(e.to_string());
                        return;
                    }
                    if then.is_none() {
                        self.show_info("Saved", format!("SQL script saved to {}", path.display()));
                        return;
                    }
                }
                self.dialog = then;
            }
            _ if raw.is_empty() => {}
            PromptPurpose::CreateDatabase => {
                let path = with_default_extension(&raw, "db");
                match self.session.create(&path) {
                    Ok(()) => self.open_designer(),
                    Err(e) => self.show_error(e.to_string()),
                }
            }
            PromptPurpose::ImportFile => {
                let path = PathBuf::from(&raw);
                match self.session.import_into_database(&path) {
                    Ok(tables) => self.show_info(
                        "Import complete",
                        format!(
                            "Data from '{}' was imported into: {}",
                            raw,
                            tables.join(", ")
                        ),
                    ),
                    Err(e) => self.show_error(e.to_string()),
                }
            }
            PromptPurpose::ExportFile => {
                let path = PathBuf::from(&raw);
                match self.session.export_tables(&path) {
                    Ok(files) => {
                        let files: Vec<String> =
                            files.iter().map(|f| f.display().to_string()).collect();
                        self.show_info(
                            "Export complete",
                            format!("All tables were saved to: {}", files.join(", ")),
                        )
                    }
                    Err(e) => self.show_error(e.to_string()),
                }
            }
        }
    }

    // ---- designer ----

    pub fn open_designer(&mut self) {
        self.designer = DesignerForm::new();
        self.screen = Screen::Designer;
    }

    /// Executes one CREATE statement per complete form, then offers to save them as a script.
    pub fn submit_designer(&mut self) {
        let statements = self.designer.statements();
        if statements.is_empty() {
            self.show_error("Nothing to create: give a table a name and at least one field.");
            return;
        }

        let failures: Vec<String> = statements
            .iter()
            .filter_map(|sql| {
                self.session
                    .execute(sql)
                    .err()
                    .map(|e| format!("{}\n  {}", sql, e))
            })
            .collect();

        let then = if failures.is_empty() {
            Dialog::info("Success", "All tables were created.")
        } else {
            Dialog::error(format!(
                "{} of {} statements failed:\n{}",
                failures.len(),
                statements.len(),
                failures.join("\n")
            ))
        };

        self.back_to_menu();
        self.open_prompt(PromptPurpose::SaveScript {
            script: designer::script(&statements),
            then: Some(then),
        });
    }

    // ---- structure ----

    pub fn show_structure(&mut self) {
        match self.session.list_table_structure() {
            Ok(tables) => {
                self.structure = tables;
                self.structure_scroll = 0;
                self.screen = Screen::Structure;
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    // ---- SQL editor ----

    pub fn execute_query(&mut self) {
        if self.query.is_blank() {
            return;
        }
        let sql = self.query.text.clone();
        self.history.push(&sql);

        let outcome = self.session.returns_rows(&sql).and_then(|returns_rows| {
            if returns_rows {
                self.session.query(&sql).map(Some)
            } else {
                self.session.execute(&sql).map(|_| None)
            }
        });

        match outcome {
            Ok(Some(dataset)) => {
                self.calculate_column_widths(&dataset);
                self.result = Some(dataset);
                self.result_scroll = 0;
                self.result_horizontal_scroll = 0;
            }
            Ok(None) => self.show_info("Done", "Statement executed."),
            Err(e) => {
                self.result = None;
                self.show_error(e.to_string());
            }
        }
    }

    pub fn visualize_query(&mut self) {
        if self.query.is_blank() {
            self.show_error("Write a query to chart first.");
            return;
        }
        match self.session.run_visualization_query(&self.query.text) {
            Ok(chart) => {
                self.chart = Some(chart);
                self.screen = Screen::Chart;
            }
            Err(e) => self.show_error(e.to_string()),
        }
    }

    fn calculate_column_widths(&mut self, dataset: &Dataset) {
        self.column_widths = dataset
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| {
                let header_width = col.name.chars().count();
                let max_value_width = dataset
                    .rows
                    .iter()
                    .map(|row| row.values.get(i).map(|v| v.to_string().chars().count()).unwrap_or(0))
                    .max()
                    .unwrap_or(0);
                header_width.max(max_value_width).clamp(4, 40)
            })
            .collect();
    }

    pub fn history_up(&mut self) {
        if let Some(entry) = self.history.older() {
            let entry = entry.to_string();
            self.query.set(entry);
        }
    }

    pub fn history_down(&mut self) {
        if let Some(entry) = self.history.newer() {
            let entry = entry.to_string();
            self.query.set(entry);
        }
    }

    pub fn scroll_results_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(1);
    }

    pub fn scroll_results_down(&mut self) {
        if let Some(ref dataset) = self.result {
            if self.result_scroll < dataset.row_count().saturating_sub(1) {
                self.result_scroll += 1;
            }
        }
    }

    pub fn scroll_results_left(&mut self) {
        self.result_horizontal_scroll = self.result_horizontal_scroll.saturating_sub(1);
    }

    pub fn scroll_results_right(&mut self) {
        if self.result_horizontal_scroll + 1 < self.column_widths.len() {
            self.result_horizontal_scroll += 1;
        }
    }

    pub fn page_up(&mut self) {
        self.result_scroll = self.result_scroll.saturating_sub(10);
    }

    pub fn page_down(&mut self) {
        if let Some(ref dataset) = self.result {
            self.result_scroll = (self.result_scroll + 10).min(dataset.row_count().saturating_sub(1));
        }
    }

    pub fn enter_insert_mode(&mut self) {
        self.mode = Mode::Insert;
        self.focus = Focus::Query;
    }

    pub fn enter_normal_mode(&mut self) {
        self.mode = Mode::Normal;
    }

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::Command;
        self.command_buffer.clear();
    }

    pub fn execute_command(&mut self) {
        let cmd = self.command_buffer.trim().to_string();
        self.command_buffer.clear();
        self.mode = Mode::Normal;

        match cmd.as_str() {
            "q" | "quit" => self.back_to_menu(),
            "qa" => self.should_quit = true,
            "e" | "exec" | "execute" => self.execute_query(),
            "chart" | "plot" => self.visualize_query(),
            "w" | "write" => {
                if self.query.is_blank() {
                    self.show_error("The query is empty; nothing to save.");
                } else {
                    self.open_prompt(PromptPurpose::SaveScript {
                        script: format!("{}\n", self.query.text.trim_end()),
                        then: None,
                    });
                }
            }
            "clear" => {
                self.query.clear();
                self.result = None;
            }
            "" => {}
            other => self.show_error(format!("Unknown command: {}", other)),
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Query => Focus::Results,
            Focus::Results => Focus::Query,
        };
    }
}

/// Appends `.ext` when the path has no extension, like a save dialog's default type.
pub fn with_default_extension(raw: &str, ext: &str) -> PathBuf {
    let path = Path::new(raw);
    if path.extension().is_some() {
        path.to_path_buf()
    } else {
        path.with_extension(ext)
    }
}
