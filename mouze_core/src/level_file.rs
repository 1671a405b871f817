//! Reading levels from `.dat` files.
//!
//! A file holds any number of levels, each a `rows cols` header line
//! followed by `rows` lines of board symbols:
//!
//! ```text
//! 3 4
//! ####
//! #& #
//! ####
//! ```
//!
//! Invalid levels are reported and skipped; the file is only rejected as a
//! whole when it cannot be read or no level survives.

use std::path::Path;

use tracing::{info, warn};

use crate::{
    board::{Board, Cell, Level, MAX_DIMENSION},
    map::Grid,
};

/// Why a single level was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LevelError {
    #[error("invalid dimensions {rows}x{cols}: rows and columns must be between 1 and {max}", max = MAX_DIMENSION)]
    InvalidDimensions { rows: i64, cols: i64 },
    #[error("invalid character {symbol:?} at row {row}, column {col}")]
    InvalidSymbol { symbol: char, row: usize, col: usize },
    #[error("row {row} is {width} characters wide but the level has {cols} columns")]
    RowTooWide { row: usize, width: usize, cols: usize },
    #[error("the file ends after {found} of {expected} rows")]
    Truncated { expected: usize, found: usize },
    #[error("no spawn point ('&')")]
    MissingSpawn,
    #[error("{count} spawn points ('&'), expected exactly one")]
    MultipleSpawns { count: usize },
    #[error("expected a 'rows cols' header, found {line:?}")]
    MalformedHeader { line: String },
}

/// Failures that stop the run before it starts.
#[derive(Debug, thiserror::Error)]
pub enum LevelFileError {
    #[error("could not read level file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("no valid levels found")]
    NoValidLevels,
}

/// Outcome of parsing a level file.
#[derive(Debug, Default)]
pub struct ParsedLevels {
    pub levels: Vec<Level>,
    /// Rejected levels by their 1-based position in the file.
    pub rejected: Vec<(usize, LevelError)>,
}

/// Parses every level in `text`.
///
/// Parsing stops at the first header that is not two integers. A header with
/// an out-of-range row count has no usable body length, so its lines are
/// skipped up to the next header.
pub fn parse_levels(text: &str) -> ParsedLevels {
    let mut parsed = ParsedLevels::default();
    let mut lines = text.lines().peekable();
    let mut number = 0;

    while let Some(header) = lines.by_ref().find(|line| !line.trim().is_empty()) {
        number += 1;
        let Some((rows, cols)) = parse_header(header) else {
            parsed.rejected.push((
                number,
                LevelError::MalformedHeader {
                    line: header.to_string(),
                },
            ));
            break;
        };

        if !dimension_in_range(rows) {
            while lines.next_if(|line| parse_header(line).is_none()).is_some() {}
            parsed
                .rejected
                .push((number, LevelError::InvalidDimensions { rows, cols }));
            continue;
        }

        let body: Vec<&str> = lines.by_ref().take(rows as usize).collect();
        match parse_level(number, rows, cols, &body) {
            Ok(level) => parsed.levels.push(level),
            Err(err) => parsed.rejected.push((number, err)),
        }
    }

    parsed
}

/// Reads a `rows cols` header line.
fn parse_header(line: &str) -> Option<(i64, i64)> {
    let mut fields = line.split_whitespace().map(str::parse::<i64>);
    match (fields.next(), fields.next()) {
        (Some(Ok(rows)), Some(Ok(cols))) => Some((rows, cols)),
        _ => None,
    }
}

fn dimension_in_range(n: i64) -> bool {
    (1..=MAX_DIMENSION as i64).contains(&n)
}

/// Validates one level body against its header.
pub fn parse_level(number: usize, rows: i64, cols: i64, body: &[&str]) -> Result<Level, LevelError> {
    if !dimension_in_range(rows) || !dimension_in_range(cols) {
        return Err(LevelError::InvalidDimensions { rows, cols });
    }
    let (rows, cols) = (rows as usize, cols as usize);
    if body.len() < rows {
        return Err(LevelError::Truncated {
            expected: rows,
            found: body.len(),
        });
    }

    let mut parsed_rows: Vec<Vec<Cell>> = Vec::with_capacity(rows);
    let mut spawns = 0;
    for (row, line) in body.iter().enumerate() {
        let line = line.trim_end_matches('\r');
        let width = line.chars().count();
        if width > cols {
            return Err(LevelError::RowTooWide {
                row: row + 1,
                width,
                cols,
            });
        }
        let mut cells = Vec::with_capacity(cols);
        for (col, symbol) in line.chars().enumerate() {
            let cell = Cell::from_symbol(symbol).ok_or(LevelError::InvalidSymbol {
                symbol,
                row: row + 1,
                col: col + 1,
            })?;
            if cell == Cell::Spawn {
                spawns += 1;
            }
            cells.push(cell);
        }
        // Editors often strip trailing blanks; missing cells are open floor.
        cells.resize(cols, Cell::Open);
        parsed_rows.push(cells);
    }

    match spawns {
        0 => return Err(LevelError::MissingSpawn),
        1 => {}
        count => return Err(LevelError::MultipleSpawns { count }),
    }

    let grid = Grid::from_generator(rows, cols, |position| {
        parsed_rows[position.row as usize][position.col as usize]
    });
    let board = Board::new(grid).ok_or(LevelError::MissingSpawn)?;
    Ok(Level::new(number, board))
}

/// Reads and validates the levels in `path`, logging every rejected level.
pub fn load_levels(path: &Path) -> Result<Vec<Level>, LevelFileError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelFileError::Io {
        path: path.display().to_string(),
        source,
    })?;

    let ParsedLevels { levels, rejected } = parse_levels(&text);
    for (number, err) in &rejected {
        warn!("Level {} ignored: {}", number, err);
    }
    for level in &levels {
        info!(
            "Level {} of {}x{} loaded successfully",
            level.number,
            level.board.rows(),
            level.board.cols()
        );
    }

    if levels.is_empty() {
        return Err(LevelFileError::NoValidLevels);
    }
    Ok(levels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Position;

    #[test]
    fn parses_several_levels() {
        let text = "3 4\n####\n#& #\n####\n\n2 3\n&@%\n. #\n";
        let parsed = parse_levels(text);
        assert!(parsed.rejected.is_empty());
        assert_eq!(parsed.levels.len(), 2);

        let first = &parsed.levels[0];
        assert_eq!(first.number, 1);
        assert_eq!(first.spawn(), Position::new(1, 1));
        let second = &parsed.levels[1];
        assert_eq!(second.number, 2);
        assert_eq!(second.elevated, vec![Position::new(0, 1), Position::new(0, 2)]);
    }

    #[test]
    fn invalid_levels_are_skipped() {
        let text = concat!(
            "1 3\n&&.\n",   // two spawns
            "1 3\n#x&\n",   // bad symbol
            "1 3\n###\n",   // no spawn
            "0 3\n",        // bad dimensions
            "101 1\n",      // bad dimensions
        );
        let parsed = parse_levels(text);
        assert!(parsed.levels.is_empty());
        let errors: Vec<&LevelError> = parsed.rejected.iter().map(|(_, e)| e).collect();
        assert_eq!(errors[0], &LevelError::MultipleSpawns { count: 2 });
        assert_eq!(
            errors[1],
            &LevelError::InvalidSymbol {
                symbol: 'x',
                row: 1,
                col: 2
            }
        );
        assert_eq!(errors[2], &LevelError::MissingSpawn);
        assert_eq!(errors[3], &LevelError::InvalidDimensions { rows: 0, cols: 3 });
        assert_eq!(errors[4], &LevelError::InvalidDimensions { rows: 101, cols: 1 });
    }

    #[test]
    fn a_bad_level_does_not_swallow_the_next_one() {
        let text = "2 2\n#?\n&#\n1 2\n& \n";
        let parsed = parse_levels(text);
        assert_eq!(parsed.rejected.len(), 1);
        assert_eq!(parsed.levels.len(), 1);
        assert_eq!(parsed.levels[0].number, 2);
    }

    #[test]
    fn short_rows_are_padded_and_wide_rows_rejected() {
        let parsed = parse_levels("2 3\n&\r\n#\n1 2\n& #\n");
        assert_eq!(parsed.levels.len(), 1);
        let board = &parsed.levels[0].board;
        assert_eq!(board.to_text(), "&  \n#  \n");
        assert_eq!(
            parsed.rejected[0].1,
            LevelError::RowTooWide {
                row: 1,
                width: 3,
                cols: 2
            }
        );
    }

    #[test]
    fn out_of_range_row_count_does_not_swallow_the_next_level() {
        let parsed = parse_levels("150 3\n1 2\n& \n");
        assert_eq!(parsed.levels.len(), 1);
        assert_eq!(parsed.levels[0].number, 2);
        assert_eq!(
            parsed.rejected,
            vec![(1, LevelError::InvalidDimensions { rows: 150, cols: 3 })]
        );

        // Body lines of the rejected level are skipped, not read as headers.
        let parsed = parse_levels("0 3\n###\n#&#\n\n1 2\n& \n");
        assert_eq!(parsed.levels.len(), 1);
        assert_eq!(parsed.levels[0].board.to_text(), "& \n");
        assert_eq!(parsed.rejected.len(), 1);
    }

    #[test]
    fn truncated_level_is_rejected() {
        let parsed = parse_levels("3 3\n&  \n   \n");
        assert_eq!(
            parsed.rejected[0].1,
            LevelError::Truncated {
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn malformed_header_stops_parsing() {
        let parsed = parse_levels("1 1\n&\nlevel two\n1 1\n&\n");
        assert_eq!(parsed.levels.len(), 1);
        assert!(matches!(
            parsed.rejected[0].1,
            LevelError::MalformedHeader { .. }
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_levels(Path::new("/no/such/dir/levels.dat")).unwrap_err();
        assert!(matches!(err, LevelFileError::Io { .. }));
    }
}
