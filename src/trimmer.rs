//! Post-processing of generated text so that it ends on a natural boundary.
//!
//! Generation is cut off by a token budget, which usually leaves the last
//! sentence dangling. [`trim_to_complete_sentences`] shortens the text to
//! the last complete sentence, or failing that to a late clause break or
//! the last whole word.

const SENTENCE_ENDINGS: [char; 3] = ['.', '!', '?'];
const CLAUSE_BREAKS: [char; 3] = [',', ';', ':'];
const SENTENCE_GAP: [char; 3] = [' ', '\n', '\t'];

/// Fraction of the text a clause break must lie beyond to be used as a cut.
const CLAUSE_BREAK_MIN_POSITION: f64 = 0.7;

/// Trims `text` so that it ends on a complete sentence or logical boundary.
///
/// The function is total: when no boundary can be found the input is
/// returned verbatim.
///
/// # Example
///
/// ```
/// use kornia_glimpse::trim_to_complete_sentences;
///
/// assert_eq!(
///     trim_to_complete_sentences("A dog runs. It looks happy and"),
///     "A dog runs."
/// );
/// ```
pub fn trim_to_complete_sentences(text: &str) -> String {
    let Some(last) = text.chars().last() else {
        return String::new();
    };

    if SENTENCE_ENDINGS.contains(&last) {
        return text.to_string();
    }

    if let Some(end) = last_sentence_end(text) {
        return text[..end].trim().to_string();
    }

    if let Some(cut) = late_clause_break(text) {
        return format!("{}.", text[..cut].trim());
    }

    let mut words: Vec<&str> = text.split_whitespace().collect();
    if words.len() > 1 {
        // the last word was most likely cut off by the token budget
        let ends_cleanly = words.last().is_some_and(|word| {
            word.ends_with(|c: char| SENTENCE_ENDINGS.contains(&c) || CLAUSE_BREAKS.contains(&c))
        });
        if !ends_cleanly {
            words.pop();
        }
        return format!("{}.", words.join(" "));
    }

    text.to_string()
}

/// Byte offset just past the last sentence ending that is followed by a
/// gap or closes the text. Endings at the very first character do not count.
fn last_sentence_end(text: &str) -> Option<usize> {
    let mut last_complete = None;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !SENTENCE_ENDINGS.contains(&c) {
            continue;
        }
        let closes = match chars.peek() {
            Some((_, next)) => SENTENCE_GAP.contains(next),
            None => true,
        };
        if closes {
            last_complete = Some(idx);
        }
    }

    // sentence endings are ASCII, so the mark is one byte long
    last_complete.filter(|&idx| idx > 0).map(|idx| idx + 1)
}

/// Byte offset of the first clause break kind whose last occurrence lies
/// past [`CLAUSE_BREAK_MIN_POSITION`] of the text, measured in characters.
fn late_clause_break(text: &str) -> Option<usize> {
    let char_len = text.chars().count() as f64;

    CLAUSE_BREAKS.iter().find_map(|&mark| {
        let byte_idx = text.rfind(mark)?;
        let char_idx = text[..byte_idx].chars().count() as f64;
        (char_idx > char_len * CLAUSE_BREAK_MIN_POSITION).then_some(byte_idx)
    })
}

#[cfg(test)]
mod tests {
    use super::trim_to_complete_sentences as trim;

    #[test]
    fn empty_text_stays_empty() {
        assert_eq!(trim(""), "");
    }

    #[test]
    fn terminated_text_is_unchanged() {
        assert_eq!(trim("Hello world."), "Hello world.");
        assert_eq!(trim("Is that a cat?"), "Is that a cat?");
        assert_eq!(trim("Wow!"), "Wow!");
    }

    #[test]
    fn cuts_after_last_complete_sentence() {
        assert_eq!(
            trim("A person sits at a desk. They are typing on a"),
            "A person sits at a desk."
        );
        assert_eq!(
            trim("It is sunny! The sky is blue.\nA bird flies over the"),
            "It is sunny! The sky is blue."
        );
    }

    #[test]
    fn ignores_periods_inside_tokens() {
        // "3.5" is not a sentence end, so the word fallback applies
        assert_eq!(trim("The version is 3.5 and it runs"), "The version is 3.5 and it.");
    }

    #[test]
    fn leading_punctuation_is_not_a_sentence() {
        assert_eq!(trim(". hello there"), ". hello.");
    }

    #[test]
    fn cuts_at_late_comma() {
        assert_eq!(
            trim("A man in a red shirt holding a mug, and"),
            "A man in a red shirt holding a mug."
        );
    }

    #[test]
    fn early_comma_falls_back_to_words() {
        // the comma sits at about half the length, short of the 70% mark
        assert_eq!(trim("A cat sitting, looking at"), "A cat sitting, looking.");
        assert_eq!(
            trim("Well, the room has a table and two chairs near"),
            "Well, the room has a table and two chairs."
        );
    }

    #[test]
    fn clause_marks_are_checked_in_order() {
        // the comma qualifies first even though the semicolon is later
        assert_eq!(trim("a b c d e f g h i j k l, m; n"), "a b c d e f g h i j k l.");
        let text = "One two three four five six seven; eight nine";
        assert_eq!(trim(text), "One two three four five six seven.");
    }

    #[test]
    fn two_words_degrade_to_one() {
        assert_eq!(trim("Hello world"), "Hello.");
        assert_eq!(trim("The cat is on the mat"), "The cat is on the.");
    }

    #[test]
    fn trailing_clause_mark_becomes_period() {
        assert_eq!(trim("first second third:"), "first second third.");
        assert_eq!(
            trim("alpha beta gamma delta epsilon zeta; eta,"),
            "alpha beta gamma delta epsilon zeta; eta."
        );
    }

    #[test]
    fn single_word_is_returned_verbatim() {
        assert_eq!(trim("Hello"), "Hello");
        assert_eq!(trim("   "), "   ");
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(trim("Un café. Très bon et"), "Un café.");
        assert_eq!(trim("Der Hund läuft schnell über"), "Der Hund läuft schnell.");
    }

    #[test]
    fn trimming_is_idempotent() {
        let samples = [
            "",
            "Hello",
            "Hello world",
            "Hello world.",
            "A cat sitting, looking at",
            "A person sits at a desk. They are typing on a",
            "  padded. text with gaps ",
            "alpha beta gamma delta epsilon zeta; eta,",
            ". hello there",
            "Un café. Très bon et",
        ];
        for sample in samples {
            let once = trim(sample);
            assert_eq!(trim(&once), once, "not idempotent for {sample:?}");
        }
    }
}
