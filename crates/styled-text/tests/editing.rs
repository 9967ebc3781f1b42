use pretty_assertions::assert_eq;
use proptest::prelude::*;
use styled_text::{
    EditKind, IllegalCharPolicy, PlainTextFormat, ReflowConfig, ReplaceOptions, SearchOptions,
    SearchPattern, Style, StyledText, TextConfig, TextCount, TextIndex, decode_private,
};

fn regex_pattern(query: &str, case_sensitive: bool) -> SearchPattern {
    SearchPattern::new(
        query,
        SearchOptions {
            case_sensitive,
            regex: true,
        },
    )
    .unwrap()
}

#[test]
fn test_find_and_replace_tracks_bytes() {
    let mut text = StyledText::from_text("naïve café, naïve plan");
    let pattern = SearchPattern::new("naïve", SearchOptions::default()).unwrap();

    let hit = text.search_forward(TextIndex::ZERO, &pattern, false, false).unwrap();
    assert_eq!(hit.range.chars, 0..5);
    assert_eq!(hit.range.bytes, 0..6);

    let written = text
        .replace_match(&hit, &pattern, "simple", ReplaceOptions::default())
        .unwrap();
    assert_eq!(written, TextCount::new(6, 6));
    assert_eq!(text.text(), "simple café, naïve plan");

    let next = text
        .search_forward(hit.range.first() + written, &pattern, false, false)
        .unwrap();
    assert_eq!(next.range.chars, 13..18);
    assert_eq!(next.range.bytes, 14..20);

    text.undo().unwrap();
    assert_eq!(text.text(), "naïve café, naïve plan");
}

#[test]
fn test_stale_match_is_rejected() {
    let mut text = StyledText::from_text("abc abc");
    let pattern = SearchPattern::new("abc", SearchOptions::default()).unwrap();
    let hit = text.search_forward(TextIndex::ZERO, &pattern, false, false).unwrap();

    let first = text.char_range(0..1).unwrap();
    text.delete_text(&first).unwrap();
    assert!(
        text.replace_match(&hit, &pattern, "x", ReplaceOptions::default())
            .is_err()
    );
    assert_eq!(text.text(), "bc abc");
}

#[test]
fn test_replace_all_preserves_case_in_one_step() {
    let mut text = StyledText::from_text("Color colour COLOR");
    let pattern = regex_pattern("colou?r", false);
    let all = text.select_all();
    let options = ReplaceOptions {
        interpolate: false,
        preserve_case: true,
    };

    let placed = text
        .replace_all_in_range(&all, &pattern, false, "hue", options)
        .unwrap()
        .unwrap();
    assert_eq!(text.text(), "Hue hue HUE");
    assert_eq!(placed.chars, 0..11);
    assert_eq!(text.undo_kind(), Some(EditKind::ReplaceAll));

    text.undo().unwrap();
    assert_eq!(text.text(), "Color colour COLOR");
}

#[test]
fn test_replace_all_interpolates_groups() {
    let mut text = StyledText::from_text("due 2024-01-05, paid 2024-02-10");
    let pattern = regex_pattern(r"(\d+)-(\d+)-(\d+)", true);
    let all = text.select_all();
    let options = ReplaceOptions {
        interpolate: true,
        preserve_case: false,
    };
    text.replace_all_in_range(&all, &pattern, false, "$3/$2/$1", options)
        .unwrap();
    assert_eq!(text.text(), "due 05/01/2024, paid 10/02/2024");
}

#[test]
fn test_replace_all_entire_words_only() {
    let mut text = StyledText::from_text("cat concat cat");
    let pattern = SearchPattern::new("cat", SearchOptions::default()).unwrap();
    let all = text.select_all();
    text.replace_all_in_range(&all, &pattern, true, "dog", ReplaceOptions::default())
        .unwrap();
    assert_eq!(text.text(), "dog concat dog");

    let none = SearchPattern::new("bird", SearchOptions::default()).unwrap();
    let all = text.select_all();
    assert_eq!(
        text.replace_all_in_range(&all, &none, false, "x", ReplaceOptions::default())
            .unwrap(),
        None
    );
}

#[test]
fn test_configured_buffer_reflows_quotes_and_indents_with_spaces() {
    let config = TextConfig::from_json_str(
        r#"{
            "tab_to_spaces": true,
            "reflow": {
                "line_width": 13,
                "rules": [
                    { "first": "[ \\t]*>[ \\t>]*", "rest": "[ \\t]*>[ \\t>]*", "replace": "$0" }
                ]
            }
        }"#,
    )
    .unwrap();
    let mut text = StyledText::with_config(config).unwrap();
    text.set_text("> one two three four\n", None).unwrap();

    text.clean_right_margin(TextIndex::ZERO, None, false)
        .unwrap()
        .unwrap();
    assert_eq!(text.text(), "> one two\n> three four\n");
    assert_eq!(text.undo_kind(), Some(EditKind::Reflow));

    let first_line = text.char_range(0..1).unwrap();
    text.indent(&first_line, 1).unwrap();
    assert_eq!(text.text(), "        > one two\n> three four\n");
}

#[test]
fn test_invalid_rule_is_a_config_error() {
    let err = TextConfig::from_json_str(r#"{"reflow":{"rules":[{"first":"(","rest":"","replace":""}]}}"#);
    assert!(err.is_err());
}

#[test]
fn test_clipboard_keeps_styles() {
    let bold = Style::default().with_bold(true);
    let mut source = StyledText::from_text("Hello bold world");
    let word = source.char_range(6..10).unwrap();
    source.set_style(&word, &bold).unwrap();

    let mut clipboard = Vec::new();
    source.write_private_range(&mut clipboard, &word).unwrap();
    let (copied, styles) = decode_private(clipboard.as_slice()).unwrap();
    assert_eq!(copied, "bold");

    let mut target = StyledText::from_text("[]");
    let caret = target.char_range(1..1).unwrap();
    let placed = target.paste(&caret, &copied, Some(&styles)).unwrap();
    assert_eq!(placed.chars, 1..5);
    assert_eq!(target.text(), "[bold]");
    assert_eq!(target.style_at(0), Some(&Style::default()));
    assert_eq!(target.style_at(1), Some(&bold));
    assert_eq!(target.style_at(5), Some(&Style::default()));
    assert_eq!(target.undo_kind(), Some(EditKind::Paste));
}

#[test]
fn test_plain_text_round_trip_keeps_line_endings() {
    let input = b"first\r\nsecond\r\n";
    let mut text = StyledText::new();
    let format = text.read_plain_text(&input[..]).unwrap();
    assert_eq!(format, PlainTextFormat::Dos);
    assert_eq!(text.char_count(), 13);

    let mut out = Vec::new();
    text.write_plain_text(&mut out, format).unwrap();
    assert_eq!(out, input);
}

#[test]
fn test_illegal_characters() {
    let mut text = StyledText::from_text("ab");
    let outcome = text
        .insert_text(TextIndex::ZERO, "x\u{1}y", &Style::default())
        .unwrap();
    assert!(outcome.cleaned);
    assert_eq!(outcome.range.chars, 0..2);
    assert_eq!(text.text(), "xyab");

    text.set_illegal_char_policy(IllegalCharPolicy::Reject);
    assert!(
        text.insert_text(TextIndex::ZERO, "\u{7}", &Style::default())
            .is_err()
    );
    assert_eq!(text.text(), "xyab");
}

#[test]
fn test_move_and_copy() {
    let mut text = StyledText::from_text("one two");
    let word = text.char_range(4..7).unwrap();
    let moved = text.move_text(&word, TextIndex::ZERO, false).unwrap().unwrap();
    assert_eq!(text.text(), "twoone ");
    assert_eq!(moved.chars, 0..3);

    let word = text.char_range(0..3).unwrap();
    let copied = text.move_text(&word, text.beyond_end(), true).unwrap().unwrap();
    assert_eq!(text.text(), "twoone two");
    assert_eq!(copied.chars, 7..10);

    text.undo().unwrap();
    text.undo().unwrap();
    assert_eq!(text.text(), "one two");

    // Dropping text onto itself does nothing.
    let word = text.char_range(0..3).unwrap();
    let inside = text.char_index_to_text_index(1);
    assert_eq!(text.move_text(&word, inside, false).unwrap(), None);
}

#[test]
fn test_words_and_paragraphs() {
    let text = StyledText::from_text("ab\ncd ef\n");
    let at = |i| text.char_index_to_text_index(i);
    assert_eq!(text.paragraph_start(at(4)).char_index, 3);
    assert_eq!(text.paragraph_end(at(4)).char_index, 9);
    assert_eq!(text.word_start(at(7)).char_index, 6);
    assert_eq!(text.word_end(at(3)).char_index, 5);

    let word = text.char_range(6..8).unwrap();
    assert!(text.is_entire_word(&word));
    let partial = text.char_range(6..7).unwrap();
    assert!(!text.is_entire_word(&partial));
}

/// One paragraph: words separated by runs of spaces or by line breaks that repeat the prefix.
fn paragraph() -> impl Strategy<Value = String> {
    let separator = prop::sample::select(vec![" ", "  ", "   ", "\n"]);
    (
        prop::sample::select(vec!["", "  "]),
        "[a-c.]{1,5}",
        prop::collection::vec((separator, "[a-c.]{1,5}"), 0..16),
        any::<bool>(),
    )
        .prop_map(|(prefix, first, rest, trailing_space)| {
            let mut text = format!("{prefix}{first}");
            for (separator, word) in rest {
                text.push_str(separator);
                if separator == "\n" {
                    text.push_str(prefix);
                }
                text.push_str(&word);
            }
            if trailing_space {
                text.push(' ');
            }
            text
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Reflowing a paragraph that was just reflowed changes nothing.
    #[test]
    fn reflow_is_idempotent(text in paragraph(), line_width in 4usize..16) {
        let config = TextConfig {
            reflow: ReflowConfig {
                line_width,
                ..ReflowConfig::default()
            },
            ..TextConfig::default()
        };
        let mut buffer = StyledText::with_config(config).unwrap();
        buffer.set_text(&text, None).unwrap();

        buffer.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        let once = buffer.text().to_string();
        let again = buffer.clean_right_margin(TextIndex::ZERO, None, false).unwrap();
        prop_assert_eq!(again, None, "{:?} became {:?}", text, once);
        prop_assert_eq!(buffer.text(), once.as_str());
    }
}
