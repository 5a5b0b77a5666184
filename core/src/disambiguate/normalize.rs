//! Grouping key for display names.
//!
//! Case-insensitive, whitespace-collapsed, with standalone roman numerals
//! `II`..`XX` read as arabic numbers so "Final Fantasy VII" and
//! "Final Fantasy 7" collide. Standalone `V` and `X` are numerals too, which
//! also folds titles like "Mega Man X" onto "Mega Man 10".

const ROMAN: &[(&str, &str)] = &[
    ("ii", "2"),
    ("iii", "3"),
    ("iv", "4"),
    ("v", "5"),
    ("vi", "6"),
    ("vii", "7"),
    ("viii", "8"),
    ("ix", "9"),
    ("x", "10"),
    ("xi", "11"),
    ("xii", "12"),
    ("xiii", "13"),
    ("xiv", "14"),
    ("xv", "15"),
    ("xvi", "16"),
    ("xvii", "17"),
    ("xviii", "18"),
    ("xix", "19"),
    ("xx", "20"),
];

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let word = word.to_lowercase();
            ROMAN
                .iter()
                .find(|(roman, _)| *roman == word)
                .map(|(_, arabic)| arabic.to_string())
                .unwrap_or(word)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_and_whitespace() {
        assert_eq!(normalize_name("  Pac-Man "), "pac-man");
        assert_eq!(normalize_name("PAC-MAN"), normalize_name("pac-man"));
        assert_eq!(normalize_name("Super\tMario  World"), "super mario world");
    }

    #[test]
    fn test_roman_numerals() {
        assert_eq!(normalize_name("Final Fantasy VII"), "final fantasy 7");
        assert_eq!(normalize_name("Final Fantasy 7"), "final fantasy 7");
        assert_eq!(normalize_name("Street Fighter II"), "street fighter 2");
        assert_eq!(normalize_name("Mega Man X"), normalize_name("Mega Man 10"));
    }

    #[test]
    fn test_numerals_inside_words_untouched() {
        assert_eq!(normalize_name("Vixen"), "vixen");
        assert_eq!(normalize_name("Civilization"), "civilization");
        assert_eq!(normalize_name("I Am Alive"), "i am alive");
    }
}
