use std::{fmt, fs::File, path::Path};

use serde::Serialize;

use stellaris_stat_viewer::views::{
    EconomyRow, FleetRow, MilitaryRow, OverviewRow, ResearchRow, StrategicResourcesRow,
    TechnologyRow,
};

/// A row that can be shown in a text table.
/// The headers match the serialized column names, so the text tables and
/// the exported CSV files read the same.
pub trait TableRow: Serialize {
    const HEADERS: &'static [&'static str];

    /// The cells of the row, one per header
    fn cells(&self) -> Vec<String>;
}

fn real(value: f64) -> String {
    format!("{:.2}", value)
}

impl TableRow for EconomyRow {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Energy",
        "Minerals",
        "Food",
        "Influence",
        "Unity",
        "Alloys",
        "Consumer Goods",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.energy),
            real(self.minerals),
            real(self.food),
            real(self.influence),
            real(self.unity),
            real(self.alloys),
            real(self.consumer_goods),
        ]
    }
}

impl TableRow for FleetRow {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Total Fleet Power",
        "# Corvettes",
        "# Destroyers",
        "# Cruisers",
        "# Battleships",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.total_power),
            self.corvettes.to_string(),
            self.destroyers.to_string(),
            self.cruisers.to_string(),
            self.battleships.to_string(),
        ]
    }
}

impl TableRow for OverviewRow {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Military",
        "Economy",
        "Technology",
        "# Technologies",
        "Systems owned",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.military),
            real(self.economy),
            real(self.technology),
            self.technologies.to_string(),
            self.systems_owned.to_string(),
        ]
    }
}

impl TableRow for StrategicResourcesRow {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Volatile Motes",
        "Rare Crystals",
        "Exotic Gases",
        "Zro",
        "Dark Matter",
        "Living Metal",
        "Nanites",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.volatile_motes),
            real(self.rare_crystals),
            real(self.exotic_gases),
            real(self.zro),
            real(self.dark_matter),
            real(self.living_metal),
            real(self.nanites),
        ]
    }
}

impl TableRow for ResearchRow {
    const HEADERS: &'static [&'static str] = &["Id", "Name", "Physics", "Society", "Engineering"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.physics),
            real(self.society),
            real(self.engineering),
        ]
    }
}

impl TableRow for TechnologyRow {
    const HEADERS: &'static [&'static str] = &["Id", "Name", "Technology"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            self.technology.to_string(),
        ]
    }
}

impl TableRow for MilitaryRow {
    const HEADERS: &'static [&'static str] = &[
        "Id",
        "Name",
        "Total Fleet Power",
        "# Corvettes",
        "# Destroyers",
        "# Cruisers",
        "# Battleships",
        "# Titans",
        "# Colossi",
        "# FE ships",
    ];

    fn cells(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.name.to_string(),
            real(self.power),
            self.corvettes.to_string(),
            self.destroyers.to_string(),
            self.cruisers.to_string(),
            self.battleships.to_string(),
            self.titans.to_string(),
            self.colossi.to_string(),
            self.fallen_empire.to_string(),
        ]
    }
}

/// A titled text table with aligned columns.
/// The name column is aligned left, everything else right.
pub struct Table<'a, R> {
    title: &'a str,
    rows: &'a [R],
}

impl<'a, R: TableRow> Table<'a, R> {
    pub fn new(title: &'a str, rows: &'a [R]) -> Self {
        Self { title, rows }
    }
}

impl<R: TableRow> fmt::Display for Table<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cells: Vec<Vec<String>> = self.rows.iter().map(TableRow::cells).collect();
        let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.chars().count()).collect();
        for row in cells.iter() {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }
        writeln!(f, "{}", self.title)?;
        let line = |f: &mut fmt::Formatter<'_>, row: &[&str]| -> fmt::Result {
            for (i, (cell, width)) in row.iter().zip(widths.iter()).enumerate() {
                if i > 0 {
                    f.write_str("  ")?;
                }
                if R::HEADERS.get(i) == Some(&"Name") {
                    write!(f, "{:<width$}", cell, width = width)?;
                } else {
                    write!(f, "{:>width$}", cell, width = width)?;
                }
            }
            writeln!(f)
        };
        line(f, R::HEADERS)?;
        let total: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        writeln!(f, "{}", "-".repeat(total))?;
        for row in cells.iter() {
            let row: Vec<&str> = row.iter().map(String::as_str).collect();
            line(f, &row)?;
        }
        Ok(())
    }
}

/// Writes the rows to a CSV file, the headers being the column names.
pub fn write_csv<R: TableRow>(path: &Path, rows: &[R]) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(File::create(path)?);
    if rows.is_empty() {
        writer.write_record(R::HEADERS)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use super::*;

    fn rows() -> Vec<OverviewRow> {
        vec![
            OverviewRow {
                id: 0,
                name: "United Nations of Earth".into(),
                military: 1234.5,
                economy: 99.0,
                technology: 42.0,
                technologies: 42,
                systems_owned: 7,
            },
            OverviewRow {
                id: 12,
                name: "Tzynn".into(),
                military: 0.0,
                economy: 1.25,
                technology: 3.5,
                technologies: 3,
                systems_owned: 0,
            },
        ]
    }

    #[test]
    fn test_table() {
        let rows = rows();
        let text = Table::new("Overview", &rows).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Overview");
        assert!(lines[1].starts_with("Id  Name"));
        assert!(lines[3].contains("United Nations of Earth"));
        assert!(lines[3].contains("1234.50"));
        assert!(lines[4].starts_with("12  Tzynn "));
        // every line of the table body is equally wide
        assert_eq!(lines[1].len(), lines[2].len());
        assert_eq!(lines[3].chars().count(), lines[4].chars().count());
    }

    #[test]
    fn test_csv() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("overview.csv");
        write_csv(&path, &rows())?;
        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Id,Name,Military,Economy,Technology,# Technologies,Systems owned")
        );
        assert_eq!(
            lines.next(),
            Some("0,United Nations of Earth,1234.5,99.0,42.0,42,7")
        );
        Ok(())
    }

    #[test]
    fn test_research_table() {
        let rows = [ResearchRow {
            id: 3,
            name: "Tzynn".into(),
            physics: 15.5,
            society: 0.0,
            engineering: 8.0,
        }];
        let text = Table::new("Research", &rows).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[1].ends_with("Physics  Society  Engineering"));
        assert!(lines[3].contains("15.50"));
        assert!(lines[3].ends_with("8.00"));
    }

    #[test]
    fn test_empty_csv() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("fleets.csv");
        write_csv::<FleetRow>(&path, &[])?;
        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("Id,Name,Total Fleet Power"));
        Ok(())
    }
}
