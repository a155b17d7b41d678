//! Table definition forms and the `CREATE TABLE` statements they produce.

use std::fmt;
use std::str::FromStr;

/// Column types offered by the table designer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeclaredType {
    #[default]
    Text,
    Integer,
    Real,
    Blob,
}

impl DeclaredType {
    pub const ALL: [DeclaredType; 4] = [
        DeclaredType::Text,
        DeclaredType::Integer,
        DeclaredType::Real,
        DeclaredType::Blob,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DeclaredType::Text => "TEXT",
            DeclaredType::Integer => "INTEGER",
            DeclaredType::Real => "REAL",
            DeclaredType::Blob => "BLOB",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

impl fmt::Display for DeclaredType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeclaredType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown column type: {}", s))
    }
}

/// Builds `CREATE TABLE IF NOT EXISTS <name> (<col> <type>, ...);`.
///
/// Names are trimmed and fields with an empty name are dropped. Returns `None`
/// when the table name is empty or no field is left.
pub fn create_table_sql<S: AsRef<str>>(name: &str, fields: &[(S, DeclaredType)]) -> Option<String> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }

    let columns: Vec<String> = fields
        .iter()
        .filter_map(|(field, ty)| {
            let field = field.as_ref().trim();
            (!field.is_empty()).then(|| format!("{} {}", field, ty))
        })
        .collect();

    if columns.is_empty() {
        return None;
    }

    Some(format!(
        "CREATE TABLE IF NOT EXISTS {} ({});",
        name,
        columns.join(", ")
    ))
}

/// Joins statements into the script text offered for saving.
pub fn script(statements: &[String]) -> String {
    statements.iter().map(|s| format!("{}\n", s)).collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldRow {
    pub name: String,
    pub declared_type: DeclaredType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableForm {
    pub name: String,
    pub fields: Vec<FieldRow>,
}

impl Default for TableForm {
    fn default() -> Self {
        Self::new()
    }
}

impl TableForm {
    pub fn new() -> Self {
        Self {
            name: String::new(),
            fields: vec![FieldRow::default()],
        }
    }

    pub fn add_field(&mut self) {
        self.fields.push(FieldRow::default());
    }

    pub fn create_statement(&self) -> Option<String> {
        let fields: Vec<(&str, DeclaredType)> = self
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.declared_type))
            .collect();
        create_table_sql(&self.name, &fields)
    }
}

/// The focusable inputs of one table form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    TableName,
    FieldName(usize),
    FieldType(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormFocus {
    pub table: usize,
    pub slot: Slot,
}

/// All table forms being edited in one designer session.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignerForm {
    pub tables: Vec<TableForm>,
    pub focus: FormFocus,
}

impl Default for DesignerForm {
    fn default() -> Self {
        Self::new()
    }
}

impl DesignerForm {
    pub fn new() -> Self {
        Self {
            tables: vec![TableForm::new()],
            focus: FormFocus {
                table: 0,
                slot: Slot::TableName,
            },
        }
    }

    /// Every valid statement, in form order. Forms without a name or fields are skipped.
    pub fn statements(&self) -> Vec<String> {
        self.tables
            .iter()
            .filter_map(TableForm::create_statement)
            .collect()
    }

    pub fn add_table(&mut self) {
        self.tables.push(TableForm::new());
        self.focus = FormFocus {
            table: self.tables.len() - 1,
            slot: Slot::TableName,
        };
    }

    pub fn add_field(&mut self) {
        let table = &mut self.tables[self.focus.table];
        table.add_field();
        self.focus.slot = Slot::FieldName(table.fields.len() - 1);
    }

    fn slots(&self) -> Vec<FormFocus> {
        let mut slots = Vec::new();
        for (t, table) in self.tables.iter().enumerate() {
            slots.push(FormFocus {
                table: t,
                slot: Slot::TableName,
            });
            for f in 0..table.fields.len() {
                slots.push(FormFocus {
                    table: t,
                    slot: Slot::FieldName(f),
                });
                slots.push(FormFocus {
                    table: t,
                    slot: Slot::FieldType(f),
                });
            }
        }
        slots
    }

    pub fn focus_next(&mut self) {
        let slots = self.slots();
        let i = slots.iter().position(|s| *s == self.focus).unwrap_or(0);
        self.focus = slots[(i + 1) % slots.len()];
    }

    pub fn focus_prev(&mut self) {
        let slots = self.slots();
        let i = slots.iter().position(|s| *s == self.focus).unwrap_or(0);
        self.focus = slots[(i + slots.len() - 1) % slots.len()];
    }

    fn focused_text(&mut self) -> Option<&mut String> {
        let table = self.tables.get_mut(self.focus.table)?;
        match self.focus.slot {
            Slot::TableName => Some(&mut table.name),
            Slot::FieldName(f) => table.fields.get_mut(f).map(|field| &mut field.name),
            Slot::FieldType(_) => None,
        }
    }

    pub fn insert_char(&mut self, c: char) {
        if let Slot::FieldType(_) = self.focus.slot {
            if c == ' ' {
                self.cycle_type(true);
            }
        } else if let Some(text) = self.focused_text() {
            text.push(c);
        }
    }

    pub fn delete_char(&mut self) {
        if let Some(text) = self.focused_text() {
            text.pop();
        }
    }

    /// Steps the focused field's type through TEXT, INTEGER, REAL, BLOB.
    pub fn cycle_type(&mut self, forward: bool) {
        if let Slot::FieldType(f) = self.focus.slot {
            if let Some(field) = self
                .tables
                .get_mut(self.focus.table)
                .and_then(|t| t.fields.get_mut(f))
            {
                field.declared_type = if forward {
                    field.declared_type.next()
                } else {
                    field.declared_type.prev()
                };
            }
        }
    }
}
