use hashbrown::HashSet;

/// At most `max_chars` characters of `text`, with an ellipsis when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((i, _)) => format!("{}…", &text[..i]),
        None => text.to_owned(),
    }
}

/// Byte offset `n` characters past `from`, clamped to the end of `text`.
pub fn advance_chars(text: &str, from: usize, n: usize) -> usize {
    text[from..]
        .char_indices()
        .nth(n)
        .map_or(text.len(), |(i, _)| from + i)
}

pub fn is_digits(s: &str, width: usize) -> bool {
    s.len() == width && s.bytes().all(|b| b.is_ascii_digit())
}

/// Order-preserving set of strings with a size cap.
#[derive(Debug, Default)]
pub struct UniqueList {
    items: Vec<String>,
    seen: HashSet<String>,
    cap: usize,
}

impl UniqueList {
    pub fn with_cap(cap: usize) -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
            cap,
        }
    }

    /// Returns whether `value` is in the list afterwards.
    pub fn push(&mut self, value: &str) -> bool {
        if self.seen.contains(value) {
            return true;
        }
        if self.items.len() >= self.cap {
            return false;
        }
        self.seen.insert(value.to_owned());
        self.items.push(value.to_owned());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("ผลหวยรัฐบาล", 3), "ผลห…");
        assert_eq!(excerpt("  short ", 10), "short");
    }

    #[test]
    fn unique_list_caps_and_dedups() {
        let mut list = UniqueList::with_cap(2);
        assert!(list.push("12"));
        assert!(list.push("12"));
        assert!(list.push("34"));
        assert!(!list.push("56"));
        assert!(list.contains("34"));
        assert_eq!(list.into_vec(), ["12", "34"]);
    }

    #[test]
    fn advance_is_clamped() {
        let s = "ab ฮานอย";
        assert_eq!(advance_chars(s, 0, 2), 2);
        assert_eq!(advance_chars(s, 3, 100), s.len());
    }
}
