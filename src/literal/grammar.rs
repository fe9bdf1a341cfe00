use winnow::ascii::multispace0;
use winnow::combinator::{alt, delimited, separated};
use winnow::error::ModalResult;
use winnow::prelude::*;
use winnow::token::{any, take_till};

// -- Tokens -----------------------------------------------------------------

fn quoted(input: &mut &str) -> ModalResult<String> {
    let quote = alt(('"', '\'')).parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            c if c == quote => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' | '\'' | '\\' => s.push(esc),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

fn bare(input: &mut &str) -> ModalResult<String> {
    take_till(0.., |c: char| c == ',' || c == ']')
        .map(|s: &str| s.trim().to_owned())
        .parse_next(input)
}

fn item(input: &mut &str) -> ModalResult<String> {
    delimited(multispace0, alt((quoted, bare)), multispace0).parse_next(input)
}

// -- Lists ------------------------------------------------------------------

fn bracket_list(input: &mut &str) -> ModalResult<Vec<String>> {
    '['.parse_next(input)?;
    let items: Vec<String> = separated(0.., item, ',').parse_next(input)?;
    ']'.parse_next(input)?;
    Ok(items)
}

/// Parse `[a, "b,c", 'd']` into its items. Returns `None` unless the whole
/// input is one well-formed list.
pub(crate) fn parse_bracket_list(input: &str) -> Option<Vec<String>> {
    let mut items = bracket_list.parse(input.trim()).ok()?;
    if items.len() == 1 && items[0].is_empty() {
        items.clear();
    }
    Some(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_items() {
        assert_eq!(
            parse_bracket_list("[1,2, 3 ]"),
            Some(vec!["1".to_owned(), "2".to_owned(), "3".to_owned()])
        );
    }

    #[test]
    fn quoted_items_keep_commas() {
        assert_eq!(
            parse_bracket_list(r#"["1,0", '1,12']"#),
            Some(vec!["1,0".to_owned(), "1,12".to_owned()])
        );
    }

    #[test]
    fn escapes() {
        assert_eq!(
            parse_bracket_list(r#"["a\"b", "c\\d"]"#),
            Some(vec!["a\"b".to_owned(), "c\\d".to_owned()])
        );
    }

    #[test]
    fn empty_list() {
        assert_eq!(parse_bracket_list("[]"), Some(vec![]));
        assert_eq!(parse_bracket_list("[  ]"), Some(vec![]));
    }

    #[test]
    fn malformed_is_rejected() {
        assert_eq!(parse_bracket_list("[1,2"), None);
        assert_eq!(parse_bracket_list("1,2]"), None);
        assert_eq!(parse_bracket_list(r#"["a"b]"#), None);
        assert_eq!(parse_bracket_list("[1]x"), None);
    }
}
