// src/cartography/layout.rs

/// How a region is drawn on the tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Square,
    Circle,
}

/// Grid cell of one region; `row` grows downward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub code: &'static str,
    pub row: u8,
    pub col: u8,
    pub shape: Shape,
}

const fn sq(code: &'static str, row: u8, col: u8) -> Tile {
    Tile { code, row, col, shape: Shape::Square }
}

const fn dot(code: &'static str, row: u8, col: u8) -> Tile {
    Tile { code, row, col, shape: Shape::Circle }
}

pub const GRID_ROWS: u8 = 9;
pub const GRID_COLS: u8 = 12;

/// Contiguous states keep their rough relative position; AK and HI sit in the
/// left column as insets, D.C. is a circle beside MD, and the territories
/// line up under PR.
pub const TILES: &[Tile] = &[
    sq("AK", 0, 0),
    sq("ME", 0, 11),
    sq("WI", 1, 6),
    sq("VT", 1, 10),
    sq("NH", 1, 11),
    sq("WA", 2, 1),
    sq("ID", 2, 2),
    sq("MT", 2, 3),
    sq("ND", 2, 4),
    sq("MN", 2, 5),
    sq("IL", 2, 6),
    sq("MI", 2, 7),
    sq("NY", 2, 9),
    sq("MA", 2, 10),
    sq("OR", 3, 1),
    sq("NV", 3, 2),
    sq("WY", 3, 3),
    sq("SD", 3, 4),
    sq("IA", 3, 5),
    sq("IN", 3, 6),
    sq("OH", 3, 7),
    sq("PA", 3, 8),
    sq("NJ", 3, 9),
    sq("CT", 3, 10),
    sq("RI", 3, 11),
    sq("CA", 4, 1),
    sq("UT", 4, 2),
    sq("CO", 4, 3),
    sq("NE", 4, 4),
    sq("MO", 4, 5),
    sq("KY", 4, 6),
    sq("WV", 4, 7),
    sq("VA", 4, 8),
    sq("MD", 4, 9),
    sq("DE", 4, 10),
    sq("AZ", 5, 2),
    sq("NM", 5, 3),
    sq("KS", 5, 4),
    sq("AR", 5, 5),
    sq("TN", 5, 6),
    sq("NC", 5, 7),
    sq("SC", 5, 8),
    dot("DC", 5, 9),
    sq("OK", 6, 4),
    sq("LA", 6, 5),
    sq("MS", 6, 6),
    sq("AL", 6, 7),
    sq("GA", 6, 8),
    sq("HI", 7, 0),
    sq("TX", 7, 4),
    sq("FL", 7, 9),
    sq("PR", 7, 11),
    dot("AS", 8, 8),
    dot("GU", 8, 9),
    dot("MP", 8, 10),
    dot("VI", 8, 11),
];

pub fn tile(code: &str) -> Option<&'static Tile> {
    TILES.iter().find(|t| t.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geography;
    use std::collections::HashSet;

    #[test]
    fn every_region_has_one_distinct_cell() {
        let codes: HashSet<_> = TILES.iter().map(|t| t.code).collect();
        assert_eq!(codes.len(), TILES.len());
        let all: HashSet<_> = geography::us_states().iter().map(|(code, _)| *code).collect();
        assert_eq!(codes, all);

        let cells: HashSet<_> = TILES.iter().map(|t| (t.row, t.col)).collect();
        assert_eq!(cells.len(), TILES.len());
        assert!(TILES.iter().all(|t| t.row < GRID_ROWS && t.col < GRID_COLS));
    }

    #[test]
    fn small_regions_are_circles() {
        for code in ["DC", "AS", "GU", "MP", "VI"] {
            assert_eq!(tile(code).unwrap().shape, Shape::Circle);
        }
        assert_eq!(tile("PR").unwrap().shape, Shape::Square);
    }
}
