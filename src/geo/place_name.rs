//! Heuristic that turns a club name ("TC Blau-Weiß Heidelberger e.V.") into the
//! place it is most likely located in, so the geocoder gets a usable query.

use once_cell::sync::Lazy;
use regex::Regex;

/// Clubs whose names do not reduce to their city by the generic rules
const SPECIAL_CASES: &[(&str, &str)] = &[
    ("Post Südstadt Karlsruhe", "Karlsruhe"),
    ("Heidelberger Tennis-Club", "Heidelberg"),
    ("Eppelheimer Tennis-Club", "Eppelheim"),
    ("Karbener Sportverein", "Karben"),
    ("Unterbarmer Tennisclub", "Wuppertal"),
    ("Ratinger Tennisclub", "Ratingen"),
    ("Lohausener Sport-Verein", "Düsseldorf"),
];

/// Multi-word or punctuated fragments removed before tokenizing
const NOISE_PHRASES: &[&str] = &[
    "Turn- u. Sportverein",
    "- Abt. Tennis",
    "Abt. Tennis",
    "Abt.",
    "e. V.",
    "e.V.",
    "e.v.",
    " , TA",
    "- TA",
    ", TA",
    "Grün Weiß",
    "Grün Weiss",
    "von 1845",
    "von 1890",
];

const CLUB_TYPES: &[&str] = &[
    "Turnverein", "Tennisverein", "Tennis-Club", "Tennisclub", "Tennisklub", "Sportverein",
    "Sport-Verein", "Sportvereinigung", "Sportgemeinschaft", "Tennisgemeinschaft", "TC", "TK",
    "TG", "TV", "SG", "SV", "SKV", "FC", "ATV", "SuS", "TSG", "SC", "SF", "TSC", "TA", "Tennis",
    "DJK", "Post", "Tura", "Germania", "Bezirk", "Optimus", "Olympia", "Nicolai", "Club", "zu",
];

const CLUB_COLORS: &[&str] = &[
    "Rot-Weiß", "Blau-Weiß", "Grün-Weiß", "Grün-Weiss", "Grün-Gelb", "Grün-Weiß-Rot",
    "Blau-Gelb", "Schwarz-Weiß", "Weiss-Rot", "GW", "BW", "RW", "SW",
];

/// Words that are never a place even when capitalized
const CLUB_WORDS: &[&str] = &[
    "Tennis", "Club", "Verein", "Sport", "Turn", "Klub", "Gemeinschaft", "Sportverein",
    "Tennisverein", "Sportgemeinschaft", "Tennisgemeinschaft", "Turnverein", "Sportvereinigung",
    "Optimus", "Olympia", "Germania", "Nicolai", "Post", "Tura", "Bezirk", "Karbener",
    "Heidelberger", "Ratinger", "Lohausener", "Unterbarmer", "Eppelheimer", "Südstadt",
];

/// Places in the federations' areas that the suffix rule misses
const KNOWN_PLACES: &[&str] = &[
    "Leipzig", "Erfurt", "Pinnow", "Apolda", "Speyer", "Konstanz", "Lorsch", "Karlsruhe",
    "Duisburg", "Wesel", "Dümpten", "Eigen", "Büderich", "Wixhausen", "Neckarau", "Denzlingen",
    "Niederursel", "Blumberg", "Ratingen", "Büttelborn", "Ladenburg", "Offenthal", "Niefern",
    "Öschelbronn", "Buchen", "Mönchengladbach", "Unterfeldhaus", "Friedrichsfeld", "Bermatingen",
    "Mülheim", "Heißen", "Mörfelden", "Lußheim", "Großsachsen", "Wössingen", "Mühlhausen",
    "Dauchingen", "Schriesheim", "Eppelheim", "Durmersheim", "Wiesental", "Grenzach", "Malsch",
    "Eggenstein", "Mackenbach", "Dreieichenhain", "Mehrhoog", "Heidelberg", "Kassel",
    "Nordshausen", "Karben", "Wuppertal", "Düsseldorf",
];

static PLACE_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(heim|hausen|feld|berg|burg|furt|stadt|dorf|bach|tal|au|weiler|kirchen|ingen|ungen|stein|bronn|brunn|baden|bad)$")
        .expect("static regex")
});

/// Best-effort place name for an organizer; returns the input unchanged when
/// nothing place-like is found
pub fn place_from_organizer(organizer: &str) -> String {
    if let Some(place) = special_case(organizer) {
        return place;
    }
    if let Some(place) = demonym_stem(organizer) {
        return place;
    }

    let words = significant_words(organizer);
    if words.is_empty() {
        return organizer.to_string();
    }

    words
        .iter()
        .find(|w| is_likely_place(w))
        .cloned()
        .or_else(|| compound_place(&words))
        .or_else(|| {
            words
                .iter()
                .filter(|w| w.chars().count() >= 4 && is_capitalized(w) && !is_club_word(w))
                .fold(None::<&String>, |best, w| match best {
                    Some(b) if b.chars().count() >= w.chars().count() => Some(b),
                    _ => Some(w),
                })
                .cloned()
        })
        .or_else(|| {
            words
                .iter()
                .find(|w| w.chars().count() >= 3 && is_capitalized(w) && !is_club_word(w))
                .cloned()
        })
        .unwrap_or_else(|| organizer.to_string())
}

fn special_case(organizer: &str) -> Option<String> {
    SPECIAL_CASES
        .iter()
        .find(|(pattern, _)| organizer.contains(pattern))
        .map(|(_, place)| place.to_string())
}

/// "Heidelberger" -> "Heidelberg", "Ratinger" -> "Ratingen", "Eppelheimer" -> "Eppelheim"
fn demonym_stem(organizer: &str) -> Option<String> {
    organizer
        .split_whitespace()
        .filter(|w| w.ends_with("er") && w.chars().count() > 4)
        .find_map(|word| {
            let stem = &word[..word.len() - 2];
            [stem.to_string(), format!("{}en", stem), format!("{}m", stem)]
                .into_iter()
                .find(|candidate| is_likely_place(candidate))
        })
}

/// Words left after removing legal forms, club types, colors and years
fn significant_words(organizer: &str) -> Vec<String> {
    let mut cleaned = organizer.to_string();
    for phrase in NOISE_PHRASES {
        cleaned = cleaned.replace(phrase, " ");
    }

    cleaned
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c == ',' || c == '.' || c == '(' || c == ')'))
        .filter(|w| !w.is_empty() && *w != "-")
        .filter(|w| !CLUB_TYPES.contains(w) && !CLUB_COLORS.contains(w))
        .filter(|w| !is_year_like(w))
        .map(str::to_string)
        .collect()
}

/// Hyphenated or split compound place names, e.g. "Gelsenkirchen-Buer" or "Groß Sachsen"
fn compound_place(words: &[String]) -> Option<String> {
    let hyphen_part = words
        .iter()
        .filter(|w| w.contains('-'))
        .flat_map(|w| w.split('-'))
        .find(|part| is_likely_place(part));
    if let Some(part) = hyphen_part {
        return Some(part.to_string());
    }

    words
        .windows(2)
        .map(|pair| format!("{}{}", pair[0], pair[1].to_lowercase()))
        .find(|compound| is_likely_place(compound))
}

/// Capitalized word ending in a typical German place suffix, or a known place
pub fn is_likely_place(word: &str) -> bool {
    if word.chars().count() < 3 || !is_capitalized(word) {
        return false;
    }
    if PLACE_SUFFIX.is_match(word) {
        return true;
    }
    let lower = word.to_lowercase();
    KNOWN_PLACES
        .iter()
        .any(|place| lower.contains(&place.to_lowercase()))
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map(char::is_uppercase).unwrap_or(false)
}

fn is_club_word(word: &str) -> bool {
    CLUB_WORDS.iter().any(|w| w.eq_ignore_ascii_case(word))
}

/// Founding years and year ranges such as "1890", "08/29" or "1920/75"
fn is_year_like(word: &str) -> bool {
    word.chars().all(|c| c.is_ascii_digit() || c == '/')
}
