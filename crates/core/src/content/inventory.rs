use std::io::Read;
use std::path::Path;

use tracing::{info, warn};

use crate::domain::vehicle::{InventoryRecord, HORSEPOWER, MAKE, MODEL, PRICE, TRIM, YEAR_OF_MAKING};
use crate::errors::InventoryError;

/// Reads the inventory snapshot from a CSV file with a header row.
pub fn load_inventory(path: &Path) -> Result<Vec<InventoryRecord>, InventoryError> {
    if !path.exists() {
        return Err(InventoryError::NotFound(path.to_path_buf()));
    }

    let reader = csv::Reader::from_path(path)
        .map_err(|source| InventoryError::Csv { path: path.to_path_buf(), source })?;
    let records = read_records(reader, path)?;

    info!(
        event_name = "recommender.inventory.loaded",
        correlation_id = "bootstrap",
        path = %path.display(),
        rows = records.len(),
        "inventory snapshot loaded"
    );

    Ok(records)
}

/// Same as [`load_inventory`] for an in-memory source.
pub fn parse_inventory<R: Read>(source: R) -> Result<Vec<InventoryRecord>, InventoryError> {
    read_records(csv::Reader::from_reader(source), Path::new("<memory>"))
}

struct ColumnPositions {
    year_of_making: usize,
    price: Option<usize>,
    horsepower: Option<usize>,
    make: usize,
    model: usize,
    trim: usize,
}

fn read_records<R: Read>(
    mut reader: csv::Reader<R>,
    path: &Path,
) -> Result<Vec<InventoryRecord>, InventoryError> {
    let headers = reader
        .headers()
        .map_err(|source| InventoryError::Csv { path: path.to_path_buf(), source })?
        .clone();
    let position = |column: &str| headers.iter().position(|header| header.trim() == column);
    let required = |column: &'static str| position(column).ok_or(InventoryError::MissingColumn(column));

    let columns = ColumnPositions {
        year_of_making: required(YEAR_OF_MAKING)?,
        price: position(PRICE),
        horsepower: position(HORSEPOWER),
        make: required(MAKE)?,
        model: required(MODEL)?,
        trim: required(TRIM)?,
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;

    // Line 1 is the header.
    for (line, row) in reader.records().enumerate().map(|(index, row)| (index + 2, row)) {
        let row = row.map_err(|source| InventoryError::Csv { path: path.to_path_buf(), source })?;
        match parse_row(&row, &columns) {
            Some(record) => records.push(record),
            None => {
                skipped += 1;
                warn!(
                    event_name = "recommender.inventory.row_skipped",
                    correlation_id = "bootstrap",
                    line = line,
                    "inventory row lacks a usable year, make, model or trim"
                );
            }
        }
    }

    if skipped > 0 {
        warn!(
            event_name = "recommender.inventory.rows_skipped",
            correlation_id = "bootstrap",
            skipped = skipped,
            kept = records.len(),
            "some inventory rows were skipped"
        );
    }

    if records.is_empty() {
        return Err(InventoryError::Empty);
    }

    Ok(records)
}

fn parse_row(row: &csv::StringRecord, columns: &ColumnPositions) -> Option<InventoryRecord> {
    let text = |position: usize| {
        row.get(position).map(str::trim).filter(|value| !value.is_empty()).map(str::to_owned)
    };
    let number = |position: Option<usize>| {
        position
            .and_then(|position| row.get(position))
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    };

    let year_of_making = row.get(columns.year_of_making).and_then(parse_year)?;

    Some(InventoryRecord {
        year_of_making,
        price: number(columns.price),
        horsepower: number(columns.horsepower),
        make: text(columns.make)?,
        model: text(columns.model)?,
        trim: text(columns.trim)?,
    })
}

fn parse_year(value: &str) -> Option<i32> {
    let value = value.trim();
    value.parse::<i32>().ok().or_else(|| {
        value
            .parse::<f64>()
            .ok()
            .filter(|year| year.fract() == 0.0 && year.is_finite())
            .and_then(|year| i32::try_from(year as i64).ok())
    })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{load_inventory, parse_inventory};
    use crate::errors::InventoryError;

    #[test]
    fn parses_rows_and_ignores_extra_columns() {
        let csv = "\
VIN,YearOfMaking,Price,Horsepower,Make,Model,Trim
1HGCM,2020,21000,158,Honda,Civic,EX
2T1BU,2021.0,,139,Toyota,Corolla,LE
";
        let records = parse_inventory(csv.as_bytes()).expect("inventory should parse");

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].item_id(), "2020_honda_civic_ex");
        assert_eq!(records[0].price, Some(21_000.0));
        assert_eq!(records[1].year_of_making, 2021);
        assert_eq!(records[1].price, None);
        assert_eq!(records[1].horsepower, Some(139.0));
    }

    #[test]
    fn rows_without_identity_fields_are_skipped() {
        let csv = "\
YearOfMaking,Price,Horsepower,Make,Model,Trim
unknown,21000,158,Honda,Civic,EX
2019,18000,150,,Civic,LX
2018,17000,140,Honda,Fit,Sport
";
        let records = parse_inventory(csv.as_bytes()).expect("inventory should parse");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].item_id(), "2018_honda_fit_sport");
    }

    #[test]
    fn years_outside_i32_are_skipped_not_saturated() {
        let csv = "\
YearOfMaking,Price,Horsepower,Make,Model,Trim
1e20,21000,158,Honda,Civic,EX
-3000000000,18000,150,Honda,Civic,LX
2018.0,17000,140,Honda,Fit,Sport
";
        let records = parse_inventory(csv.as_bytes()).expect("inventory should parse");

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].year_of_making, 2018);
    }

    #[test]
    fn optional_columns_may_be_absent_entirely() {
        let csv = "YearOfMaking,Make,Model,Trim\n2022,Kia,Soul,GT Line\n";
        let records = parse_inventory(csv.as_bytes()).expect("inventory should parse");

        assert_eq!(records[0].price, None);
        assert_eq!(records[0].horsepower, None);
    }

    #[test]
    fn missing_required_column_is_reported() {
        let csv = "YearOfMaking,Price,Make,Model\n2020,1,Honda,Civic\n";
        let error = parse_inventory(csv.as_bytes()).expect_err("trim column is required");

        assert!(matches!(error, InventoryError::MissingColumn("Trim")));
    }

    #[test]
    fn header_only_inventory_is_empty() {
        let csv = "YearOfMaking,Price,Horsepower,Make,Model,Trim\n";
        let error = parse_inventory(csv.as_bytes()).expect_err("no rows");

        assert!(matches!(error, InventoryError::Empty));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().expect("temp dir");
        let error = load_inventory(&dir.path().join("inventory.csv")).expect_err("absent file");

        assert!(matches!(error, InventoryError::NotFound(_)));
    }

    #[test]
    fn file_on_disk_loads() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("inventory.csv");
        fs::write(&path, "YearOfMaking,Price,Horsepower,Make,Model,Trim\n2020,1,2,Ford,F 150,XL\n")
            .expect("write inventory");

        let records = load_inventory(&path).expect("inventory should load");
        assert_eq!(records[0].item_id(), "2020_ford_f_150_xl");
    }
}
