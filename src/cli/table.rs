use std::fmt::{self, Write};

pub(crate) struct Row {
    cells: Vec<String>,
}

impl Row {
    fn is_awk_safe(&self) -> bool {
        !self
            .cells
            .iter()
            .any(|cell| cell.is_empty() || cell.contains(char::is_whitespace))
    }
}

impl From<Vec<String>> for Row {
    fn from(cells: Vec<String>) -> Self {
        Row { cells }
    }
}

impl From<Vec<&str>> for Row {
    fn from(cells: Vec<&str>) -> Self {
        Row {
            cells: cells.into_iter().map(str::to_owned).collect(),
        }
    }
}

pub(crate) struct Table {
    header: Row,
    body: Vec<Row>,
    print_header: bool,
}

impl Table {
    /// A table with the given column names. Names must not contain whitespace.
    pub(crate) fn new<R: Into<Row>>(header: R) -> Table {
        let header = header.into();

        debug_assert!(header.is_awk_safe(), "table header contains whitespace");

        Table {
            header,
            body: Vec::new(),
            print_header: true,
        }
    }

    pub(crate) fn print_header(&mut self, print_header: bool) {
        self.print_header = print_header;
    }

    /// Appends a row. Missing cells are shown as `-`, extra cells are dropped.
    pub(crate) fn add_row<R: Into<Row>>(&mut self, row: R) {
        let mut row = row.into();
        let columns = self.header.cells.len();

        row.cells.resize(columns, "-".to_string());

        for cell in row.cells.iter_mut().filter(|cell| cell.is_empty()) {
            cell.push('-');
        }

        self.body.push(row);
    }

    fn visible_rows(&self) -> impl Iterator<Item = &Row> {
        let header = self.print_header.then_some(&self.header);

        header.into_iter().chain(self.body.iter())
    }

    fn column_widths(&self) -> Vec<usize> {
        let mut widths = vec![0usize; self.header.cells.len()];

        for row in self.visible_rows() {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.chars().count());
            }
        }

        widths
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let widths = self.column_widths();

        for row in self.visible_rows() {
            let last = row.cells.len().saturating_sub(1);

            for (i, cell) in row.cells.iter().enumerate() {
                if i == last {
                    f.write_str(cell)?;
                } else {
                    write!(f, "{:<width$}  ", cell, width = widths[i])?;
                }
            }

            f.write_char('\n')?;
        }

        Ok(())
    }
}

pub(crate) trait IntoTable: Into<Table> + Sized {
    fn into_table(self) -> Table {
        self.into()
    }
}

impl<T> IntoTable for T where T: Into<Table> + Sized {}

/// Joins a list for a single cell, `-` when empty.
pub(crate) fn joined<S: AsRef<str>>(items: &[S]) -> String {
    if items.is_empty() {
        return "-".to_string();
    }

    items
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligns_columns() {
        let mut tab = Table::new(vec!["PROVIDER", "LOCATION"]);
        tab.add_row(vec!["azure", "eastus"]);
        tab.add_row(vec!["openrouter", ""]);

        assert_eq!(
            tab.to_string(),
            "PROVIDER    LOCATION\nazure       eastus\nopenrouter  -\n"
        );
    }

    #[test]
    fn headerless_widths_ignore_header() {
        let mut tab = Table::new(vec!["PROVIDER", "NAME"]);
        tab.add_row(vec!["groq", "Groq"]);
        tab.print_header(false);

        assert_eq!(tab.to_string(), "groq  Groq\n");
    }

    #[test]
    fn joined_cells() {
        assert_eq!(joined(&["eastus", "eastus2"]), "eastus,eastus2");
        assert_eq!(joined::<&str>(&[]), "-");
    }
}
