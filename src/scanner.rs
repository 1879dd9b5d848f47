//! The single shared raw-text scanner used by every checker that needs to
//! reason about SQL text outside of string literals and comments.
//!
//! [`Tokenizer`] walks a SQL string once, tracking
//! `{in_single_quote, in_double_quote, in_back_quote, in_line_comment,
//! in_block_comment}` with doubled-quote escape handling, and reports for
//! every character whether it is "live" — outside any string literal or
//! comment. Everything else in this module (`scan`, `leading_keyword`, and
//! the parser façade's normaliser) is built on top of that one walk.

/// One character as seen by the tokenizer, with the quoting/comment state
/// that was in effect when it was consumed.
#[derive(Debug, Clone, Copy)]
pub struct ScannedChar {
    pub index: usize,
    pub ch: char,
    /// Outside any string literal and outside any comment.
    pub live: bool,
    pub in_comment: bool,
}

#[derive(Default, Clone, Copy)]
struct State {
    in_single: bool,
    in_double: bool,
    in_back: bool,
    in_line_comment: bool,
    in_block_comment: bool,
}

impl State {
    fn in_string(&self) -> bool {
        self.in_single || self.in_double || self.in_back
    }

    fn in_comment(&self) -> bool {
        self.in_line_comment || self.in_block_comment
    }

    fn live(&self) -> bool {
        !self.in_string() && !self.in_comment()
    }
}

/// Walks `sql` once, calling `visit` for every character with the state
/// that applied when that character was consumed. Handles comment
/// delimiters (`--`, `#`, `/* ... */`) and doubled-quote escaping
/// (`''`, `""`, `` `` ``) inside the matching quote kind.
pub fn walk(sql: &str, mut visit: impl FnMut(ScannedChar)) {
    let chars: Vec<(usize, char)> = sql.char_indices().collect();
    let mut state = State::default();
    let mut i = 0;

    while i < chars.len() {
        let (idx, ch) = chars[i];
        let next = chars.get(i + 1).map(|&(_, c)| c);

        if state.in_line_comment {
            visit(ScannedChar { index: idx, ch, live: false, in_comment: true });
            if ch == '\n' {
                state.in_line_comment = false;
            }
            i += 1;
            continue;
        }

        if state.in_block_comment {
            visit(ScannedChar { index: idx, ch, live: false, in_comment: true });
            if ch == '*' && next == Some('/') {
                let (_, c2) = chars[i + 1];
                visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: true });
                state.in_block_comment = false;
                i += 2;
                continue;
            }
            i += 1;
            continue;
        }

        if state.in_single {
            visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
            if ch == '\'' {
                if next == Some('\'') {
                    let (_, c2) = chars[i + 1];
                    visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: false });
                    i += 2;
                    continue;
                }
                state.in_single = false;
            }
            i += 1;
            continue;
        }

        if state.in_double {
            visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
            if ch == '"' {
                if next == Some('"') {
                    let (_, c2) = chars[i + 1];
                    visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: false });
                    i += 2;
                    continue;
                }
                state.in_double = false;
            }
            i += 1;
            continue;
        }

        if state.in_back {
            visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
            if ch == '`' {
                if next == Some('`') {
                    let (_, c2) = chars[i + 1];
                    visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: false });
                    i += 2;
                    continue;
                }
                state.in_back = false;
            }
            i += 1;
            continue;
        }

        // Not inside any literal or comment: look for the start of one.
        match ch {
            '\'' => {
                state.in_single = true;
                visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
                i += 1;
            }
            '"' => {
                state.in_double = true;
                visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
                i += 1;
            }
            '`' => {
                state.in_back = true;
                visit(ScannedChar { index: idx, ch, live: false, in_comment: false });
                i += 1;
            }
            '-' if next == Some('-') => {
                state.in_line_comment = true;
                visit(ScannedChar { index: idx, ch, live: state.live(), in_comment: false });
                let (_, c2) = chars[i + 1];
                visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: true });
                i += 2;
            }
            '#' => {
                state.in_line_comment = true;
                visit(ScannedChar { index: idx, ch, live: state.live(), in_comment: false });
                i += 1;
            }
            '/' if next == Some('*') => {
                state.in_block_comment = true;
                visit(ScannedChar { index: idx, ch, live: state.live(), in_comment: false });
                let (_, c2) = chars[i + 1];
                visit(ScannedChar { index: idx + ch.len_utf8(), ch: c2, live: false, in_comment: true });
                i += 2;
            }
            _ => {
                visit(ScannedChar { index: idx, ch, live: true, in_comment: false });
                i += 1;
            }
        }
    }
}

/// Facts raw-text checkers need, gathered in a single pass over `sql`
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    /// Byte offset of every unquoted `;` that is followed by further
    /// non-whitespace, non-comment tokens — a trailing `;` does not count.
    pub stray_semicolons: Vec<usize>,
    /// True if `--`, `#`, or `/* ... */` appears outside a string literal.
    pub has_comment: bool,
    /// True if the only block comments seen open with the optimizer-hint
    /// marker `/*+`.
    pub only_optimizer_hints: bool,
    /// Byte offset of `INTO OUTFILE`/`INTO DUMPFILE`, case-insensitive,
    /// requiring the keyword to immediately follow `INTO`.
    pub into_outfile: Option<usize>,
    pub into_dumpfile: Option<usize>,
}

pub fn scan(sql: &str) -> ScanReport {
    let mut report = ScanReport::default();
    let mut saw_comment = false;

    // Live characters with their original byte offsets, so downstream
    // token scans never see anything inside a string or comment.
    let mut live: Vec<(usize, char)> = Vec::new();

    walk(sql, |sc| {
        if sc.in_comment {
            saw_comment = true;
        }
        if sc.live {
            live.push((sc.index, sc.ch));
        }
    });

    report.has_comment = saw_comment;
    if saw_comment {
        report.only_optimizer_hints = only_hint_comments(sql);
    }

    // Stray semicolons: a `;` in the live stream followed by further
    // non-whitespace live text.
    for i in 0..live.len() {
        if live[i].1 == ';' && live[i + 1..].iter().any(|(_, c)| !c.is_whitespace()) {
            report.stray_semicolons.push(live[i].0);
        }
    }

    // INTO OUTFILE / INTO DUMPFILE: tokenize the live stream into
    // whitespace-separated identifiers and look for adjacent INTO, KEYWORD.
    let tokens = tokenize(&live);
    for pair in tokens.windows(2) {
        let (into_tok, into_pos) = &pair[0];
        let (next_tok, next_pos) = &pair[1];
        if into_tok.eq_ignore_ascii_case("INTO") {
            let _ = into_pos;
            if next_tok.eq_ignore_ascii_case("OUTFILE") {
                report.into_outfile.get_or_insert(*next_pos);
            } else if next_tok.eq_ignore_ascii_case("DUMPFILE") {
                report.into_dumpfile.get_or_insert(*next_pos);
            }
        }
    }

    report
}

/// Splits a live character stream into whitespace/punctuation-delimited
/// identifier tokens, each paired with its starting byte offset.
fn tokenize(live: &[(usize, char)]) -> Vec<(String, usize)> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;

    for &(idx, ch) in live {
        if ch.is_alphanumeric() || ch == '_' {
            if current.is_empty() {
                start = idx;
            }
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push((std::mem::take(&mut current), start));
        }
    }
    if !current.is_empty() {
        tokens.push((current, start));
    }
    tokens
}

/// True if every block comment (`/* ... */`) in `sql` opens with `/*+`
/// (the optimizer-hint convention). Line comments (`--`, `#`) are never
/// hints, so any line comment makes this false.
fn only_hint_comments(sql: &str) -> bool {
    let bytes = sql.as_bytes();
    let mut any_comment = false;
    let mut all_hints = true;
    let mut state = State::default();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if state.in_single_or_double_or_back() {
            match b {
                b'\'' if state.in_single => state.in_single = false,
                b'"' if state.in_double => state.in_double = false,
                b'`' if state.in_back => state.in_back = false,
                _ => {}
            }
            i += 1;
            continue;
        }
        match b {
            b'\'' => {
                state.in_single = true;
                i += 1;
            }
            b'"' => {
                state.in_double = true;
                i += 1;
            }
            b'`' => {
                state.in_back = true;
                i += 1;
            }
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                any_comment = true;
                all_hints = false;
                // skip to end of line
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'#' => {
                any_comment = true;
                all_hints = false;
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                any_comment = true;
                if bytes.get(i + 2) != Some(&b'+') {
                    all_hints = false;
                }
                i += 2;
                while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                    i += 1;
                }
                i += 2;
            }
            _ => i += 1,
        }
    }
    any_comment && all_hints
}

impl State {
    fn in_single_or_double_or_back(&self) -> bool {
        self.in_single || self.in_double || self.in_back
    }
}

/// The first meaningful token of `sql`, uppercased, skipping leading
/// whitespace and comments. Used both for statement-kind classification and
/// by checkers that key off the literal first keyword (e.g. `SET`).
pub fn leading_keyword(sql: &str) -> Option<String> {
    let mut token = String::new();
    let mut started = false;
    let mut done = false;

    walk(sql, |sc| {
        if done {
            return;
        }
        if !sc.live {
            return;
        }
        if !started {
            if sc.ch.is_whitespace() {
                return;
            }
            started = true;
        }
        if sc.ch.is_whitespace() || sc.ch == '(' || sc.ch == ';' {
            done = true;
            return;
        }
        token.push(sc.ch);
    });

    if token.is_empty() {
        None
    } else {
        Some(token.to_uppercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_keyword_skips_comments() {
        assert_eq!(
            leading_keyword("-- a comment\n  SELECT 1"),
            Some("SELECT".to_string())
        );
        assert_eq!(
            leading_keyword("/* hint */ UPDATE t SET x=1"),
            Some("UPDATE".to_string())
        );
    }

    #[test]
    fn leading_keyword_of_update_is_update_not_set() {
        assert_eq!(
            leading_keyword("UPDATE users SET name='x' WHERE id=1"),
            Some("UPDATE".to_string())
        );
    }

    #[test]
    fn stray_semicolon_detected_for_stacked_statements() {
        let report = scan("SELECT * FROM users; DROP TABLE users--");
        assert_eq!(report.stray_semicolons.len(), 1);
        assert!(report.has_comment);
    }

    #[test]
    fn trailing_semicolon_is_not_stray() {
        let report = scan("SELECT * FROM users;   ");
        assert!(report.stray_semicolons.is_empty());
    }

    #[test]
    fn semicolon_inside_string_literal_is_ignored() {
        let report = scan("SELECT * FROM t WHERE name = 'a;b'");
        assert!(report.stray_semicolons.is_empty());
    }

    #[test]
    fn comment_inside_string_is_not_a_comment() {
        let report = scan("SELECT * FROM t WHERE name = '-- not a comment'");
        assert!(!report.has_comment);
    }

    #[test]
    fn into_outfile_detected_but_not_scalar_into() {
        let report = scan("SELECT col INTO @var FROM t");
        assert!(report.into_outfile.is_none());

        let report = scan("SELECT * INTO OUTFILE '/tmp/x' FROM t");
        assert!(report.into_outfile.is_some());
    }

    #[test]
    fn into_dumpfile_detected() {
        let report = scan("SELECT * INTO DUMPFILE '/tmp/x' FROM t");
        assert!(report.into_dumpfile.is_some());
    }

    #[test]
    fn optimizer_hint_exempted_from_plain_comment_classification() {
        assert!(only_hint_comments("SELECT /*+ INDEX(t idx) */ * FROM t"));
        assert!(!only_hint_comments("SELECT /* plain */ * FROM t"));
        assert!(!only_hint_comments("SELECT /*+ hint */ * FROM t -- trailing"));
    }
}
