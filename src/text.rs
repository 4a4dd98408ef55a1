//! Text formatting for the scribble strips
//!
//! A strip cell is 7 characters wide and only shows 7-bit ASCII. Titles are
//! sanitized, abbreviated to 6 characters and centered in the cell so one
//! column always separates neighbouring channels.

/// Width of one scribble-strip cell
pub const CELL_WIDTH: usize = 7;

/// Longest text shown in a cell
pub const CELL_TEXT_WIDTH: usize = CELL_WIDTH - 1;

const DIGRAPHS: &[&str] = &["ch", "gh", "gn", "kn", "ph", "qu", "sh", "th", "wh", "wr"];
const DIBLENDS: &[&str] = &[
    "bl", "br", "cl", "cr", "fl", "fr", "gl", "gr", "pl", "pr", "sc", "sl", "sm", "sn", "sp", "st",
];
const TRIGRAPHS: &[&str] = &["chr", "sch"];
const TRIBLENDS: &[&str] = &["shr", "spl", "spr", "squ", "str", "thr"];

/// Remove every character outside 7-bit ASCII
pub fn strip_non_ascii(s: &str) -> String {
    s.chars().filter(char::is_ascii).collect()
}

/// Pad `s` with spaces so it appears centered in `width` columns
///
/// Strings at least `width` characters long are returned as is.
pub fn center(s: &str, width: usize) -> String {
    let len = s.chars().count();
    if len >= width {
        return s.to_string();
    }

    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{}{}", " ".repeat(left), s, " ".repeat(right))
}

/// Text as it is written to one scribble-strip cell
pub fn format_cell(s: &str) -> String {
    let ascii = strip_non_ascii(s);
    center(&abbreviate(ascii.trim(), CELL_TEXT_WIDTH), CELL_WIDTH)
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || matches!(c, '-' | '_' | '/' | '.' | ',' | ':')
}

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn word_starts(chars: &[char]) -> Vec<bool> {
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            if i == 0 {
                return true;
            }
            let prev = chars[i - 1];
            is_separator(prev)
                || (c.is_ascii_uppercase() && prev.is_ascii_lowercase())
                || (c.is_ascii_digit() && !prev.is_ascii_digit())
        })
        .collect()
}

/// Letters kept and their word-start flags, edited in lockstep
struct Word {
    chars: Vec<char>,
    starts: Vec<bool>,
}

impl Word {
    fn remove(&mut self, i: usize) {
        self.chars.remove(i);
        self.starts.remove(i);
    }

    fn window_in(&self, from: usize, len: usize, list: &[&str]) -> bool {
        let Some(window) = self.chars.get(from..from + len) else {
            return false;
        };
        let window: String = window.iter().map(char::to_ascii_lowercase).collect();
        list.contains(&window.as_str())
    }

    /// Whether the character at `i` belongs to a multi-letter graph
    fn in_graph(&self, i: usize) -> bool {
        let pairs = [i.checked_sub(1), Some(i)];
        let triples = [i.checked_sub(2), i.checked_sub(1), Some(i)];

        pairs.into_iter().flatten().any(|from| {
            self.window_in(from, 2, DIGRAPHS) || self.window_in(from, 2, DIBLENDS)
        }) || triples.into_iter().flatten().any(|from| {
            self.window_in(from, 3, TRIGRAPHS) || self.window_in(from, 3, TRIBLENDS)
        })
    }

    /// Remove matching characters from the end until `max_len` is reached
    fn remove_from_end<F>(&mut self, max_len: usize, mut should_remove: F)
    where
        F: FnMut(&Word, usize) -> bool,
    {
        let mut i = self.chars.len();
        while i > 0 && self.chars.len() > max_len {
            i -= 1;
            if should_remove(self, i) {
                self.remove(i);
            }
        }
    }
}

/// Shorten `s` to exactly `max_len` characters
///
/// Strings shorter than `max_len` are returned unchanged. Longer strings lose,
/// in this order and always scanning from the end: lowercase vowels, doubled
/// letters, word separators (the next word gets capitalized), lowercase
/// consonants outside of digraphs and blends, any other lowercase letter.
/// Word-start characters survive all of these; what is still too long is cut.
pub fn abbreviate(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < max_len {
        return s.to_string();
    }

    let starts = word_starts(&chars);
    let mut word = Word { chars, starts };

    word.remove_from_end(max_len, |w, i| {
        !w.starts[i] && is_vowel(w.chars[i])
    });

    word.remove_from_end(max_len, |w, i| {
        !w.starts[i] && i > 0 && w.chars[i].is_ascii_alphabetic() && w.chars[i] == w.chars[i - 1]
    });

    // Separators go and the following word start is capitalized
    let mut i = word.chars.len();
    while i > 0 && word.chars.len() > max_len {
        i -= 1;
        if i > 0 && is_separator(word.chars[i]) {
            word.remove(i);
            if let Some(next) = word.chars.get_mut(i) {
                *next = next.to_ascii_uppercase();
            }
        }
    }

    word.remove_from_end(max_len, |w, i| {
        let c = w.chars[i];
        !w.starts[i] && c.is_ascii_lowercase() && !is_vowel(c) && !w.in_graph(i)
    });

    word.remove_from_end(max_len, |w, i| {
        !w.starts[i] && w.chars[i].is_ascii_lowercase()
    });

    word.chars.truncate(max_len);
    word.chars.into_iter().collect()
}
