//! Splitting a console line into tokens.
//!
//! The grammar is deliberately tiny: words separated by spaces, double quoted
//! spans that keep their spaces, and `\"` for a quote inside a quoted span.
//! There is no error case; an unterminated quote simply runs to the end of
//! the line.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuoted,
}

struct LexingFSM {
    input: Vec<char>,
    pos: usize,
    state: LexingState,
    buffer: String,
    // A word that contained quotes is kept even when empty, so `""` is an argument.
    quoted: bool,
}

impl LexingFSM {
    fn new(line: &str) -> Self {
        LexingFSM {
            input: line.chars().collect(),
            pos: 0,
            state: LexingState::Start,
            buffer: String::new(),
            quoted: false,
        }
    }

    fn make_tokens(mut self) -> Vec<String> {
        let mut out = Vec::new();

        while let Some(ch) = self.read_char() {
            match self.state {
                LexingState::Start => self.handle_start(ch),
                LexingState::ReadingWord => self.handle_word(ch, &mut out),
                LexingState::ReadingQuoted => self.handle_quoted(ch),
            }
        }

        // Also covers an unterminated quote: the rest of the line is the last token.
        self.finish_word(&mut out);
        out
    }

    fn read_char(&mut self) -> Option<char> {
        let ch = self.input.get(self.pos).copied();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn handle_start(&mut self, ch: char) {
        match ch {
            ' ' | '\t' => {}
            '"' => {
                self.quoted = true;
                self.state = LexingState::ReadingQuoted;
            }
            c => {
                self.buffer.push(c);
                self.state = LexingState::ReadingWord;
            }
        }
    }

    fn handle_word(&mut self, ch: char, out: &mut Vec<String>) {
        match ch {
            ' ' | '\t' => {
                self.finish_word(out);
                self.state = LexingState::Start;
            }
            '"' => {
                self.quoted = true;
                self.state = LexingState::ReadingQuoted;
            }
            c => self.buffer.push(c),
        }
    }

    fn handle_quoted(&mut self, ch: char) {
        match ch {
            '\\' if self.peek_char() == Some('"') => {
                self.read_char();
                self.buffer.push('"');
            }
            '"' => self.state = LexingState::ReadingWord,
            c => self.buffer.push(c),
        }
    }

    fn finish_word(&mut self, out: &mut Vec<String>) {
        if !self.buffer.is_empty() || self.quoted {
            out.push(std::mem::take(&mut self.buffer));
        }
        self.quoted = false;
    }
}

/// Split `line` into tokens on unquoted whitespace.
///
/// ```
/// use dev_console::parser::tokenize;
/// assert_eq!(
///     tokenize(r#"spawnEnemy "Big Orc" 1 2 3"#),
///     vec!["spawnEnemy", "Big Orc", "1", "2", "3"]
/// );
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    LexingFSM::new(line).make_tokens()
}

/// Split on the first `=` outside a quoted span.
///
/// Returns the untrimmed left and right parts, or `None` when the line is not an
/// assignment. Quoting follows [`tokenize`], so a backslash only escapes a
/// quote that directly follows it inside a quoted span.
pub fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let mut in_quotes = false;
    let mut chars = line.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match ch {
            '\\' if in_quotes && matches!(chars.peek(), Some((_, '"'))) => {
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            '=' if !in_quotes => return Some((&line[..idx], &line[idx + 1..])),
            _ => {}
        }
    }
    None
}

/// Strip one pair of surrounding double quotes, honoring `\"` inside.
///
/// Text that is not fully quoted is returned trimmed but otherwise untouched.
pub fn unquote(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        let tokens = tokenize(trimmed);
        if let [single] = tokens.as_slice() {
            return single.clone();
        }
    }
    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quoted_span_keeps_spaces() {
        assert_eq!(
            tokenize("spawnEnemy \"Big Orc\" 1 2 3"),
            vec!["spawnEnemy", "Big Orc", "1", "2", "3"]
        );
    }

    #[test]
    fn test_blank_line_has_no_tokens() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("   \t ").is_empty());
    }

    #[test]
    fn test_repeated_spaces_are_one_separator() {
        assert_eq!(tokenize("  heal   25  "), vec!["heal", "25"]);
    }

    #[test]
    fn test_escaped_quote_does_not_terminate() {
        assert_eq!(
            tokenize(r#"say "he said \"hi\" twice" done"#),
            vec!["say", r#"he said "hi" twice"#, "done"]
        );
    }

    #[test]
    fn test_unterminated_quote_runs_to_end() {
        assert_eq!(tokenize("say \"hello  world"), vec!["say", "hello  world"]);
    }

    #[test]
    fn test_quotes_inside_word_join() {
        assert_eq!(tokenize("a\"b c\"d e"), vec!["ab cd", "e"]);
    }

    #[test]
    fn test_empty_quotes_are_an_argument() {
        assert_eq!(tokenize("saveGame \"\""), vec!["saveGame", ""]);
    }

    #[test]
    fn test_split_assignment() {
        assert_eq!(split_assignment("a=1"), Some(("a", "1")));
        assert_eq!(split_assignment("timeScale = 0.5"), Some(("timeScale ", " 0.5")));
        assert_eq!(split_assignment("motd = a=b"), Some(("motd ", " a=b")));
        assert_eq!(split_assignment("say \"x=y\""), None);
        assert_eq!(split_assignment("heal 10"), None);
    }

    #[test]
    fn test_split_assignment_agrees_with_tokenize_on_escapes() {
        // The first backslash is literal; the second escapes the quote, so the span stays open.
        let line = r#"say "x\\"=y""#;
        assert_eq!(tokenize(line), vec!["say", r#"x\"=y"#]);
        assert_eq!(split_assignment(line), None);

        assert_eq!(split_assignment(r#"motd "x\" y" = z"#), Some((r#"motd "x\" y" "#, " z")));
        assert_eq!(split_assignment(r#"path = C:\temp"#), Some(("path ", r#" C:\temp"#)));
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(" \"Big Orc\" "), "Big Orc");
        assert_eq!(unquote(" plain text "), "plain text");
        assert_eq!(unquote("\"a\" \"b\""), "\"a\" \"b\"");
    }
}
