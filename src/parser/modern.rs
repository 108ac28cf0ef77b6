use super::{
    cell_text, collapse_whitespace, has_class, id_from_url, raw_text, row_cells, strip_layout,
    text_between, TableExtractor,
};
use crate::constants::{
    LOCATION_ENDS, LOCATION_START, MODERN_ID_MARKER, ORGANIZER_END, ORGANIZER_LABEL,
    ORGANIZER_START,
};
use crate::types::{CompetitionEntry, Tournament};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use tracing::{debug, warn};

const TABLE_CLASS: &str = "responsive-individual";

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".responsive-individual tbody tr").expect("static selector"));
static TITLE_SELECTORS: Lazy<[Selector; 3]> = Lazy::new(|| {
    [
        Selector::parse("h2 a").expect("static selector"),
        Selector::parse("h3 a").expect("static selector"),
        Selector::parse("a").expect("static selector"),
    ]
});
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("static selector"));
static SUB_ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table tbody tr").expect("static selector"));
static SPAN_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span").expect("static selector"));

const DATE_RANGE_CLASS: &str = "daterange";
const COMPETITION_CLASS: &str = "competitionAbbr";
const NAME_CLASS: &str = "name";

/// Listing where each tournament is a header row (date range, heading link and a
/// descriptive paragraph) with competitions in a nested sub-table. A tournament's
/// competitions may continue over later rows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModernExtractor;

/// Row-walk state: committed tournaments in document order, their positions by id
/// and the position competitions are currently attached to
#[derive(Default)]
struct RowState {
    tournaments: Vec<Tournament>,
    positions: HashMap<String, usize>,
    active: Option<usize>,
}

impl RowState {
    fn commit(&mut self, tournament: Tournament) {
        let idx = self.tournaments.len();
        self.positions.insert(tournament.id.clone(), idx);
        self.tournaments.push(tournament);
        self.active = Some(idx);
    }

    fn latest(&self) -> Option<usize> {
        self.tournaments.len().checked_sub(1)
    }

    /// Continuation rows target the tournament their link points to, or the latest one
    fn follow(&mut self, linked_id: Option<String>) {
        self.active = linked_id
            .and_then(|id| self.positions.get(&id).copied())
            .or_else(|| self.latest());
    }

    fn attach(&mut self, entries: Vec<CompetitionEntry>) {
        if entries.is_empty() {
            return;
        }
        match self.active {
            Some(idx) => self.tournaments[idx].entries.extend(entries),
            None => debug!(count = entries.len(), "Dropping competitions without a tournament"),
        }
    }
}

impl TableExtractor for ModernExtractor {
    fn extract(&self, document: &Html) -> Vec<Tournament> {
        let mut state = RowState::default();

        for row in document.select(&ROW_SELECTOR) {
            if super::is_nested_row(&row, TABLE_CLASS) || raw_text(&row).trim().is_empty() {
                continue;
            }
            let cells = row_cells(&row);

            match header_cells(&cells) {
                Some((date_cell, info_cell)) => {
                    let tournament = parse_header(date_cell, info_cell);
                    if tournament.is_committable() {
                        state.commit(tournament);
                    } else {
                        debug!(
                            title = %tournament.title,
                            url = %tournament.url,
                            "Dropping modern row without title or identifier"
                        );
                        state.follow(None);
                    }
                }
                None => state.follow(linked_id(&cells)),
            }

            if let Some(competition_cell) = cells.iter().find(|c| has_class(c, COMPETITION_CLASS)) {
                state.attach(parse_competitions(competition_cell));
            }
        }

        state.tournaments
    }
}

/// A header row has a date-range cell followed by a cell mentioning the organizer label
fn header_cells<'a, 'b>(cells: &'b [ElementRef<'a>]) -> Option<(&'b ElementRef<'a>, &'b ElementRef<'a>)> {
    let date_idx = cells.iter().position(|c| has_class(c, DATE_RANGE_CLASS))?;
    let info = cells[date_idx + 1..]
        .iter()
        .find(|c| raw_text(c).contains(ORGANIZER_LABEL))?;
    Some((&cells[date_idx], info))
}

fn parse_header(date_cell: &ElementRef, info_cell: &ElementRef) -> Tournament {
    let mut tournament = Tournament {
        date: cell_text(date_cell),
        ..Default::default()
    };

    let anchor = TITLE_SELECTORS
        .iter()
        .find_map(|selector| info_cell.select(selector).next());
    if let Some(anchor) = anchor {
        tournament.title = cell_text(&anchor);
        tournament.url = anchor.value().attr("href").unwrap_or_default().to_string();
        tournament.id = id_from_url(&tournament.url, MODERN_ID_MARKER);
    }

    if let Some(paragraph) = info_cell.select(&PARAGRAPH_SELECTOR).next() {
        let text = collapse_whitespace(&raw_text(&paragraph));
        if let Some(organizer) = text_between(&text, ORGANIZER_START, ORGANIZER_END) {
            tournament.organizer = organizer.trim().to_string();
        }
        if let Some(location) = LOCATION_ENDS
            .iter()
            .find_map(|end| text_between(&text, LOCATION_START, end))
        {
            tournament.location = location.trim().to_string();
        }
    }

    if tournament.location.is_empty() && tournament.is_committable() {
        warn!(
            title = %tournament.title,
            date = %tournament.date,
            "Tournament location missing"
        );
    }
    tournament
}

/// Identifier of the first detail link outside the competition cell
fn linked_id(cells: &[ElementRef]) -> Option<String> {
    cells
        .iter()
        .filter(|c| !has_class(c, COMPETITION_CLASS))
        .find_map(|c| c.select(&ANCHOR_SELECTOR).next())
        .and_then(|a| a.value().attr("href"))
        .map(|href| id_from_url(href, MODERN_ID_MARKER))
        .filter(|id| !id.is_empty())
}

fn parse_competitions(cell: &ElementRef) -> Vec<CompetitionEntry> {
    let mut entries = Vec::new();
    for sub_row in cell.select(&SUB_ROW_SELECTOR) {
        let sub_cells = row_cells(&sub_row);
        let competition = sub_cells.first().map(competition_name).unwrap_or_default();
        if competition.is_empty() {
            continue;
        }
        // third column holds results and is ignored
        let skill_level = sub_cells.get(1).map(cell_text).unwrap_or_default();
        entries.push(CompetitionEntry {
            competition,
            skill_level,
        });
    }
    entries
}

fn competition_name(cell: &ElementRef) -> String {
    if has_class(cell, NAME_CLASS) {
        let span_text: String = cell
            .select(&SPAN_SELECTOR)
            .map(|span| raw_text(&span))
            .collect();
        let span_text = strip_layout(&span_text).trim().to_string();
        if !span_text.is_empty() {
            return span_text;
        }
    }
    cell_text(cell)
}
