//! Top-level boundary scanning for caller-supplied SELECT statements.
//!
//! This is not a SQL parser. The scanner only tracks quoting, comments and
//! parenthesis depth so that clause keywords at the outermost level can be
//! located. Everything nested (sub-queries, window definitions, function
//! calls) is opaque.

use std::ops::Range;

use crate::error::Error;

const COUNT_ALIAS: &str = "rowmap_count";

/// A SELECT statement with its top-level clause boundaries located.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    body_end: usize,
    select_end: usize,
    from: Option<usize>,
    projection: Range<usize>,
    order_terms: Vec<String>,
    distinct: bool,
    grouped: bool,
    compound: bool,
    placeholders: Vec<Placeholder>,
}

/// A bind parameter marker: `?`, `?N`, `$N`, `:name` or `@name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Placeholder {
    at: usize,
    // `?` without a number binds by position in the text
    anonymous: bool,
}

#[derive(Debug, Clone, Copy)]
struct Word {
    start: usize,
    end: usize,
}

#[derive(Debug, Default)]
struct Scan {
    words: Vec<Word>,
    commas: Vec<usize>,
    comments: Vec<Range<usize>>,
    line_comments: Vec<Range<usize>>,
    terminators: Vec<usize>,
    placeholders: Vec<Placeholder>,
}

impl Statement {
    /// Locate the top-level clauses of `sql`.
    ///
    /// A single trailing `;` is dropped, along with any comments after it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedStatement`] for unterminated quotes or
    /// comments, unbalanced parentheses, several statements, a missing
    /// top-level `SELECT`, or a statement that already limits its rows with
    /// `LIMIT`, `OFFSET`, `FETCH` or `TOP`.
    pub fn parse(sql: &str) -> Result<Self, Error> {
        let mut text = sql.trim().to_string();
        let mut scan = scan(&text)?;

        if let Some(&last) = scan.terminators.last()
            && strip_comments(&text, last + 1..text.len(), &scan.comments).trim().is_empty()
        {
            text.truncate(last);
            let trimmed = text.trim_end().len();
            text.truncate(trimmed);
            scan = scan_checked(&text)?;
        }
        if !scan.terminators.is_empty() {
            return Err(Error::malformed("only one statement can be paged"));
        }

        // anything appended after a trailing line comment must start on a new line
        if scan.line_comments.iter().any(|c| c.end == text.len()) {
            text.push('\n');
        }

        Self::locate(text, &scan)
    }

    fn locate(sql: String, scan: &Scan) -> Result<Self, Error> {
        let keyword = |word: &Word, kw: &str| sql[word.start..word.end].eq_ignore_ascii_case(kw);
        let words = &scan.words;

        let select = words
            .iter()
            .position(|w| keyword(w, "SELECT"))
            .ok_or_else(|| Error::malformed("no top-level SELECT"))?;

        let mut select_end = words[select].end;
        let mut distinct = false;
        let mut modifier = select + 1;
        if let Some(next) = words.get(modifier)
            && (keyword(next, "DISTINCT") || keyword(next, "ALL"))
        {
            distinct = keyword(next, "DISTINCT");
            select_end = next.end;
            modifier += 1;
        }
        if words.get(modifier).is_some_and(|w| keyword(w, "TOP")) {
            return Err(Error::malformed("statement already limits its rows with TOP"));
        }

        let mut from = None;
        let mut order: Option<(usize, usize)> = None;
        let mut grouped = false;
        let mut compound = false;

        for (index, word) in words.iter().enumerate().skip(select + 1) {
            let followed_by_by = words.get(index + 1).is_some_and(|w| keyword(w, "BY"));
            match sql[word.start..word.end].to_ascii_uppercase().as_str() {
                "FROM" if from.is_none() && !compound => from = Some(word.start),
                "GROUP" if followed_by_by => grouped = true,
                "HAVING" => grouped = true,
                "UNION" | "INTERSECT" | "EXCEPT" | "MINUS" => {
                    compound = true;
                    order = None;
                }
                "ORDER" if followed_by_by => {
                    order = Some((word.start, words[index + 1].end));
                }
                kw @ ("LIMIT" | "OFFSET" | "FETCH") => {
                    return Err(Error::malformed(format!("statement already limits its rows with {kw}")));
                }
                _ => {}
            }
        }

        let projection = select_end..from.unwrap_or(select_end);
        let (body_end, order_terms) = match order {
            Some((start, list_start)) => {
                (body_end(&sql, start, scan), order_terms(&sql, list_start, scan))
            }
            None => (sql.len(), Vec::new()),
        };

        Ok(Self {
            sql,
            body_end,
            select_end,
            from,
            projection,
            order_terms,
            distinct,
            grouped,
            compound,
            placeholders: scan.placeholders.clone(),
        })
    }

    /// The full statement, trailing `;` removed.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The statement without its trailing top-level `ORDER BY`.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.sql[..self.body_end]
    }

    /// Returns `true` when the statement ends with a top-level `ORDER BY`.
    #[must_use]
    pub const fn has_order_by(&self) -> bool {
        !self.order_terms.is_empty()
    }

    /// Terms of the trailing `ORDER BY`, comments removed.
    #[must_use]
    pub fn order_terms(&self) -> &[String] {
        &self.order_terms
    }

    /// The trailing `ORDER BY` clause rebuilt from its terms.
    #[must_use]
    pub fn order_clause(&self) -> Option<String> {
        self.has_order_by().then(|| format!("ORDER BY {}", self.order_terms.join(", ")))
    }

    /// Returns `true` when the trailing `ORDER BY` contains bind parameters.
    #[must_use]
    pub fn order_has_placeholders(&self) -> bool {
        self.has_placeholder_in(self.body_end..self.sql.len())
    }

    /// Returns `true` when moving the trailing `ORDER BY` in front of the body
    /// would change which values anonymous `?` placeholders bind.
    #[must_use]
    pub fn order_binds_by_position(&self) -> bool {
        self.order_has_placeholders()
            && self.has_placeholder_in(0..self.body_end)
            && self.placeholders.iter().any(|p| p.anonymous)
    }

    /// Returns `true` when the statement is a single `SELECT ... FROM` whose
    /// projection can be replaced with `COUNT(*)` without changing the number
    /// of rows counted or the parameters bound.
    #[must_use]
    pub fn is_plain_select(&self) -> bool {
        // a parenthesis in the projection may be an aggregate, which collapses rows
        self.from.is_some()
            && !self.distinct
            && !self.grouped
            && !self.compound
            && !self.sql[self.projection.clone()].contains('(')
            && !self.has_placeholder_in(self.projection.clone())
    }

    /// Statement returning the number of rows `sql` yields.
    ///
    /// The count binds the same parameters as the statement itself: an
    /// `ORDER BY` holding placeholders is kept inside the wrapped count.
    #[must_use]
    pub fn count_sql(&self) -> String {
        if self.order_has_placeholders() {
            return format!("SELECT COUNT(*) FROM ({}) {COUNT_ALIAS}", self.sql);
        }
        let body = self.body();
        match self.from {
            Some(from) if self.is_plain_select() => {
                let select = &body[..self.select_end];
                format!("{select} COUNT(*) {}", &body[from..])
            }
            _ => format!("SELECT COUNT(*) FROM ({body}) {COUNT_ALIAS}"),
        }
    }

    fn has_placeholder_in(&self, range: Range<usize>) -> bool {
        self.placeholders.iter().any(|p| range.contains(&p.at))
    }
}

// Backs over trailing whitespace before ORDER BY, keeping the newline that
// ends a line comment.
fn body_end(sql: &str, order_start: usize, scan: &Scan) -> usize {
    let end = sql[..order_start].trim_end().len();
    scan.line_comments
        .iter()
        .find(|c| c.start < end && end <= c.end)
        .map_or(end, |c| c.end + 1)
}

fn order_terms(sql: &str, list_start: usize, scan: &Scan) -> Vec<String> {
    let mut bounds: Vec<usize> = vec![list_start];
    bounds.extend(scan.commas.iter().filter(|&&c| c > list_start).map(|c| c + 1));
    bounds.push(sql.len() + 1);

    bounds
        .windows(2)
        .map(|pair| {
            let range = pair[0]..pair[1] - 1;
            let text = strip_comments(sql, range, &scan.comments);
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        })
        .filter(|term| !term.is_empty())
        .collect()
}

fn strip_comments(sql: &str, range: Range<usize>, comments: &[Range<usize>]) -> String {
    let mut text = String::with_capacity(range.len());
    let mut cursor = range.start;
    for comment in comments.iter().filter(|c| c.start >= range.start && c.start < range.end) {
        text.push_str(&sql[cursor..comment.start]);
        text.push(' ');
        cursor = comment.end.min(range.end);
    }
    if cursor < range.end {
        text.push_str(&sql[cursor..range.end]);
    }
    text
}

fn scan_checked(sql: &str) -> Result<Scan, Error> {
    let scan = scan(sql)?;
    if scan.terminators.is_empty() { Ok(scan) } else { Err(Error::malformed("only one statement can be paged")) }
}

/// Walk `sql` once, recording top-level words and commas plus every comment
/// and bind parameter.
///
/// Words preceded by `.` are qualified names, never keywords, and are skipped.
fn scan(sql: &str) -> Result<Scan, Error> {
    let bytes = sql.as_bytes();
    let len = bytes.len();
    let mut scan = Scan::default();
    let mut depth = 0usize;
    let mut i = 0;

    while i < len {
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth = depth.checked_sub(1).ok_or_else(|| Error::malformed("unbalanced ')'"))?;
            }
            quote @ (b'\'' | b'"' | b'`') => i = skip_quoted(bytes, i, quote)?,
            b'[' => i = skip_bracketed(bytes, i)?,
            b'-' if bytes.get(i + 1) == Some(&b'-') => {
                let end = skip_line_comment(bytes, i);
                scan.comments.push(i..end);
                scan.line_comments.push(i..end);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                let end = skip_block_comment(bytes, i)?;
                scan.comments.push(i..end + 1);
                i = end;
            }
            b',' if depth == 0 => scan.commas.push(i),
            b';' if depth == 0 => scan.terminators.push(i),
            b'?' => {
                let end = run_end(bytes, i + 1, |b| b.is_ascii_digit());
                scan.placeholders.push(Placeholder { at: i, anonymous: end == i + 1 });
                i = end - 1;
            }
            b'$' if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                scan.placeholders.push(Placeholder { at: i, anonymous: false });
                i = run_end(bytes, i + 1, |b| b.is_ascii_digit()) - 1;
            }
            // `::` casts and `@@` globals are not parameters
            sigil @ (b':' | b'@')
                if (i == 0 || bytes[i - 1] != sigil)
                    && bytes.get(i + 1).is_some_and(|&b| is_word_byte(b) && b != b'$') =>
            {
                scan.placeholders.push(Placeholder { at: i, anonymous: false });
                i = run_end(bytes, i + 1, is_word_byte) - 1;
            }
            byte if is_word_byte(byte) => {
                let start = i;
                while i + 1 < len && is_word_byte(bytes[i + 1]) {
                    i += 1;
                }
                let qualified = start > 0 && bytes[start - 1] == b'.';
                if depth == 0 && !qualified && !bytes[start].is_ascii_digit() {
                    scan.words.push(Word { start, end: i + 1 });
                }
            }
            _ => {}
        }
        i += 1;
    }

    if depth != 0 {
        return Err(Error::malformed("unbalanced '('"));
    }
    Ok(scan)
}

// Multi-byte UTF-8 sequences only contain bytes >= 0x80, so word boundaries
// always fall on character boundaries.
const fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$' || byte >= 0x80
}

/// Returns the index just past the run of bytes from `i` matching `pred`.
fn run_end(bytes: &[u8], i: usize, pred: impl Fn(u8) -> bool) -> usize {
    bytes[i..].iter().position(|&b| !pred(b)).map_or(bytes.len(), |offset| i + offset)
}

/// Returns the index of the closing quote. Doubled quotes are escapes.
fn skip_quoted(bytes: &[u8], i: usize, quote: u8) -> Result<usize, Error> {
    let mut j = i + 1;
    while j < bytes.len() {
        if bytes[j] == quote {
            if bytes.get(j + 1) == Some(&quote) {
                j += 2;
                continue;
            }
            return Ok(j);
        }
        j += 1;
    }
    Err(Error::malformed(format!("unterminated {} quote", quote as char)))
}

fn skip_bracketed(bytes: &[u8], i: usize) -> Result<usize, Error> {
    bytes[i + 1..]
        .iter()
        .position(|&b| b == b']')
        .map(|offset| i + 1 + offset)
        .ok_or_else(|| Error::malformed("unterminated [ identifier"))
}

/// Returns the index of the terminating newline, or the end of input.
fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
    bytes[i + 2..].iter().position(|&b| b == b'\n').map_or(bytes.len(), |offset| i + 2 + offset)
}

/// Returns the index of the closing `/`.
fn skip_block_comment(bytes: &[u8], i: usize) -> Result<usize, Error> {
    let mut j = i + 2;
    while j + 1 < bytes.len() {
        if bytes[j] == b'*' && bytes[j + 1] == b'/' {
            return Ok(j + 1);
        }
        j += 1;
    }
    Err(Error::malformed("unterminated block comment"))
}
