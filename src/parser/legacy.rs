use super::{cell_text, clean_skill_level, id_from_url, raw_text, row_cells, strip_layout, TableExtractor};
use crate::constants::{LEGACY_ID_MARKER, LEGACY_ORGANIZER_SEPARATOR};
use crate::types::{CompetitionEntry, Tournament};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".result-set tr").expect("static selector"));
static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("static selector"));

/// Flat result table where the first two cells of a tournament's first row span
/// all of its competition rows.
///
/// Start row columns: 0 date, 1 title/link/organizer block, 2 competition, 3 skill level.
/// Continuation rows only carry competition and skill level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyExtractor;

/// Where continuation rows are appended
enum Target {
    /// Nothing started yet
    None,
    /// The last start row was dropped; its continuation rows go with it
    Dropped,
    Committed(usize),
}

impl TableExtractor for LegacyExtractor {
    fn extract(&self, document: &Html) -> Vec<Tournament> {
        let mut tournaments: Vec<Tournament> = Vec::new();
        let mut target = Target::None;

        for row in document.select(&ROW_SELECTOR) {
            if raw_text(&row).trim().is_empty() {
                continue;
            }
            let cells = row_cells(&row);

            if is_start_row(&cells) {
                let tournament = parse_start_row(&cells);
                if tournament.is_committable() {
                    tournaments.push(tournament);
                    target = Target::Committed(tournaments.len() - 1);
                } else {
                    debug!(
                        title = %tournament.title,
                        url = %tournament.url,
                        "Dropping legacy row without title or identifier"
                    );
                    target = Target::Dropped;
                }
                continue;
            }

            let entry = entry_from(cells.first(), cells.get(1));
            match target {
                Target::Committed(idx) => {
                    if !entry.is_empty() {
                        tournaments[idx].entries.push(entry);
                    }
                }
                Target::Dropped => {}
                Target::None => debug!("Skipping continuation row before first tournament"),
            }
        }

        tournaments
    }
}

fn is_start_row(cells: &[ElementRef]) -> bool {
    let spans = |idx: usize| {
        cells
            .get(idx)
            .and_then(|c| c.value().attr("rowspan"))
            .map(|v| !v.is_empty())
            .unwrap_or(false)
    };
    spans(0) && spans(1)
}

fn parse_start_row(cells: &[ElementRef]) -> Tournament {
    let mut tournament = Tournament {
        date: cells.first().map(cell_text).unwrap_or_default(),
        ..Default::default()
    };

    if let Some(title_cell) = cells.get(1) {
        if let Some(anchor) = title_cell.select(&ANCHOR_SELECTOR).next() {
            tournament.title = cell_text(&anchor);
            tournament.url = anchor.value().attr("href").unwrap_or_default().to_string();
            tournament.id = id_from_url(&tournament.url, LEGACY_ID_MARKER);
        }
        if !tournament.title.is_empty() {
            match organizer_from_title_cell(&raw_text(title_cell)) {
                Some(organizer) => tournament.organizer = organizer,
                None => warn!(
                    title = %tournament.title,
                    date = %tournament.date,
                    "Tournament organizer missing"
                ),
            }
        }
    }

    let first = entry_from(cells.get(2), cells.get(3));
    if !first.is_empty() {
        tournament.entries.push(first);
    }
    tournament
}

/// Organizer block following the anchor text; `None` when the separator is absent
/// or nothing follows it
fn organizer_from_title_cell(text: &str) -> Option<String> {
    let (_, rest) = text.split_once(LEGACY_ORGANIZER_SEPARATOR)?;
    let organizer = strip_layout(rest).trim().to_string();
    if organizer.is_empty() {
        None
    } else {
        Some(organizer)
    }
}

fn entry_from(competition: Option<&ElementRef>, skill: Option<&ElementRef>) -> CompetitionEntry {
    CompetitionEntry {
        competition: competition.map(cell_text).unwrap_or_default(),
        skill_level: skill.map(|c| clean_skill_level(&cell_text(c))).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(rows: &str) -> String {
        format!(
            "<html><body><table class=\"result-set\"><tr><th>Datum</th><th>Turnier</th><th>Konkurrenz</th><th>LK</th></tr>{}</table></body></html>",
            rows
        )
    }

    fn start_row(date: &str, title: &str, id: &str, organizer: &str, comp: &str, lk: &str) -> String {
        format!(
            "<tr><td rowspan=\"2\">{date}</td><td rowspan=\"2\"><a href=\"https://mybigpoint.tennis.de/web/guest/turniersuche?tournamentId={id}\">{title}</a>\n\t\n\n\n{organizer}</td><td>{comp}</td><td>{lk}</td></tr>"
        )
    }

    #[test]
    fn start_row_followed_by_continuation_row() {
        let html = page(&format!(
            "{}<tr><td>Herren Doppel</td><td>LK8</td></tr>",
            start_row("12.05.2026", "Example Cup", "4711", "TC Musterstadt", "Herren Einzel", "LK5")
        ));
        let tournaments = LegacyExtractor.extract_from_str(&html);

        assert_eq!(tournaments.len(), 1);
        let t = &tournaments[0];
        assert_eq!(t.id, "4711");
        assert_eq!(t.title, "Example Cup");
        assert_eq!(t.date, "12.05.2026");
        assert_eq!(t.organizer, "TC Musterstadt");
        assert_eq!(
            t.entries,
            vec![
                CompetitionEntry::new("Herren Einzel", "LK5"),
                CompetitionEntry::new("Herren Doppel", "LK8"),
            ]
        );
    }

    #[test]
    fn counts_only_rowspan_rows_with_title_and_id() {
        let html = page(&format!(
            "{}{}{}",
            start_row("01.06.2026", "Cup A", "1", "TC A", "Damen Einzel", "LK10"),
            // no identifier in the link
            "<tr><td rowspan=\"1\">02.06.2026</td><td rowspan=\"1\"><a href=\"/turnier\">Cup B</a></td><td>Damen Doppel</td><td></td></tr>",
            start_row("03.06.2026", "Cup C", "3", "TC C", "Herren Einzel", "&amp;nbsp;"),
        ));
        let tournaments = LegacyExtractor.extract_from_str(&html);

        let ids: Vec<_> = tournaments.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);
        assert_eq!(tournaments[1].entries[0].skill_level, "");
    }

    #[test]
    fn continuation_rows_of_dropped_start_row_are_discarded() {
        let html = page(&format!(
            "{}<tr><td rowspan=\"2\">02.06.2026</td><td rowspan=\"2\"><a href=\"/x\">No Id</a></td><td>A</td><td>B</td></tr><tr><td>Mixed</td><td>LK1</td></tr>",
            start_row("01.06.2026", "Cup A", "1", "TC A", "Damen Einzel", "LK10"),
        ));
        let tournaments = LegacyExtractor.extract_from_str(&html);

        assert_eq!(tournaments.len(), 1);
        assert_eq!(tournaments[0].entries.len(), 1);
    }

    #[test]
    fn continuation_row_before_any_start_row_is_dropped() {
        let html = page("<tr><td>Herren Doppel</td><td>LK8</td></tr>");
        assert!(LegacyExtractor.extract_from_str(&html).is_empty());
    }

    #[test]
    fn missing_separator_means_no_organizer() {
        let html = page(
            "<tr><td rowspan=\"1\">01.06.2026</td><td rowspan=\"1\"><a href=\"?tournamentId=9\">Cup</a> TC Somewhere</td><td></td><td></td></tr>",
        );
        let tournaments = LegacyExtractor.extract_from_str(&html);

        assert_eq!(tournaments.len(), 1);
        assert_eq!(tournaments[0].organizer, "");
        assert!(tournaments[0].entries.is_empty());
    }

    #[test]
    fn extraction_is_deterministic() {
        let html = page(&format!(
            "{}<tr><td>Herren Doppel</td><td>LK8</td></tr>",
            start_row("12.05.2026", "Example Cup", "4711", "TC Musterstadt", "Herren Einzel", "LK5")
        ));
        assert_eq!(
            LegacyExtractor.extract_from_str(&html),
            LegacyExtractor.extract_from_str(&html)
        );
    }
}
