//! Line-record reader for the legacy KiCad text formats (versions 4-5).
//!
//! A record is one logical line with its leading keyword extracted
//! (`$Comp`, `F`, `L`, `$EndComp`, ...) plus the remaining tokens split on
//! whitespace. Quoted strings (`"..."`) may contain spaces and count as one
//! token. Malformed quoting fails with a [`ParseError`]; the reader does not
//! attempt recovery.

use crate::parser::sexp::ParseError;

/// One logical line of a legacy file.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// Leading keyword (first whitespace-delimited token); empty for blank lines.
    pub keyword: String,
    /// Remaining tokens, quote-aware.
    pub args: Vec<String>,
    /// 1-based line number.
    pub line_no: usize,
    /// The raw line, untrimmed. Label text lines are consumed raw.
    pub raw: String,
}

impl LineRecord {
    pub fn is_blank(&self) -> bool {
        self.keyword.is_empty()
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn f64_arg(&self, index: usize) -> Option<f64> {
        self.arg(index)?.parse().ok()
    }
}

/// Streaming reader over the lines of a legacy file. Single forward pass.
pub struct LegacyReader<'a> {
    input: &'a str,
    lines: std::str::Lines<'a>,
    line_no: usize,
    offset: usize,
}

impl<'a> LegacyReader<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            lines: input.lines(),
            line_no: 0,
            offset: 0,
        }
    }

    /// Split a line into quote-aware tokens. A `"` opens a token that runs to
    /// the matching close quote and may contain spaces; `\"` escapes a quote.
    fn tokenize(&self, line: &str, line_start: usize) -> Result<Vec<String>, ParseError> {
        let mut tokens = Vec::new();
        let mut chars = line.char_indices().peekable();

        while let Some(&(i, ch)) = chars.peek() {
            if ch.is_whitespace() {
                chars.next();
                continue;
            }
            if ch == '"' {
                chars.next();
                let mut token = String::new();
                let mut closed = false;
                let mut escaped = false;
                for (_, c) in chars.by_ref() {
                    if escaped {
                        token.push(c);
                        escaped = false;
                    } else if c == '\\' {
                        escaped = true;
                    } else if c == '"' {
                        closed = true;
                        break;
                    } else {
                        token.push(c);
                    }
                }
                if !closed {
                    return Err(ParseError::new(
                        self.input,
                        line_start + i,
                        "unterminated quoted string",
                    ));
                }
                tokens.push(token);
            } else {
                let start = i;
                let mut end = line.len();
                while let Some(&(j, c)) = chars.peek() {
                    if c.is_whitespace() || c == '"' {
                        end = j;
                        break;
                    }
                    chars.next();
                }
                if chars.peek().is_none() {
                    end = line.len();
                }
                tokens.push(line[start..end].to_string());
            }
        }
        Ok(tokens)
    }
}

impl<'a> Iterator for LegacyReader<'a> {
    type Item = Result<LineRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let line = self.lines.next()?;
        let line_start = self.offset;
        self.offset += line.len() + 1;
        self.line_no += 1;

        let mut tokens = match self.tokenize(line, line_start) {
            Ok(t) => t,
            Err(e) => return Some(Err(e)),
        };
        let keyword = if tokens.is_empty() {
            String::new()
        } else {
            tokens.remove(0)
        };
        Some(Ok(LineRecord {
            keyword,
            args: tokens,
            line_no: self.line_no,
            raw: line.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_all(input: &str) -> Vec<LineRecord> {
        LegacyReader::new(input)
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    #[test]
    fn test_keyword_and_args() {
        let records = read_all("L Device:R R1\nP 1200 8900\n");
        assert_eq!(records[0].keyword, "L");
        assert_eq!(records[0].args, vec!["Device:R", "R1"]);
        assert_eq!(records[1].keyword, "P");
        assert_eq!(records[1].f64_arg(0), Some(1200.0));
    }

    #[test]
    fn test_quoted_token_keeps_spaces() {
        let records = read_all(r#"F 1 "10k 1%" H 1200 8750 50  0000 C CNN"#);
        assert_eq!(records[0].keyword, "F");
        assert_eq!(records[0].arg(1), Some("10k 1%"));
        assert_eq!(records[0].arg(2), Some("H"));
    }

    #[test]
    fn test_blank_line_record() {
        let records = read_all("$Comp\n\n$EndComp\n");
        assert_eq!(records.len(), 3);
        assert!(records[1].is_blank());
    }

    #[test]
    fn test_line_numbers() {
        let records = read_all("a\nb\nc\n");
        let lines: Vec<_> = records.iter().map(|r| r.line_no).collect();
        assert_eq!(lines, vec![1, 2, 3]);
    }

    #[test]
    fn test_unterminated_quote_is_fatal() {
        let mut reader = LegacyReader::new("F 1 \"10k\nP 0 0\n");
        let err = reader.next().unwrap().unwrap_err();
        assert!(err.message.contains("unterminated"));
        assert_eq!(err.line, 1);
    }

    #[test]
    fn test_escaped_quote_inside_token() {
        let records = read_all(r#"F 4 "a \"b\" c" H"#);
        assert_eq!(records[0].arg(1), Some(r#"a "b" c"#));
    }
}
