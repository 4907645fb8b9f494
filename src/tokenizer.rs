use crate::error::TokenizeError;

/// Splits a shell-like command string into an argument vector.
///
/// Tokens are separated by whitespace. A token beginning with `'` or `"`
/// opens a quoted span that swallows subsequent tokens, joined by single
/// spaces, until a token ending in the matching quote character closes
/// it; the quote characters are stripped from the final argument. As a
/// consequence, runs of whitespace inside a quoted span collapse to a
/// single space.
///
/// A span still open at the end of the string is an error, as is a
/// command with no tokens at all.
pub fn tokenize(command: &str) -> Result<Vec<String>, TokenizeError> {
    let mut args = Vec::new();
    // The currently open quote character and the text gathered so far.
    let mut open: Option<(char, String)> = None;

    for word in command.split_whitespace() {
        match open.take() {
            Some((quote, mut span)) => {
                span.push(' ');
                span.push_str(word);
                if word.ends_with(quote) {
                    args.push(strip_quotes(&span));
                } else {
                    open = Some((quote, span));
                }
            }
            None => match word.chars().next() {
                Some(first @ ('\'' | '"')) => {
                    // A lone quote character opens a span; it cannot
                    // close itself.
                    if word.len() > 1 && word.ends_with(first) {
                        args.push(strip_quotes(word));
                    } else {
                        open = Some((first, word.to_string()));
                    }
                }
                _ => args.push(word.to_string()),
            },
        }
    }

    if let Some((quote, _)) = open {
        return Err(TokenizeError::UnterminatedQuote {
            quote,
            command: command.trim().to_string(),
        });
    }
    if args.is_empty() {
        return Err(TokenizeError::EmptyCommand);
    }
    Ok(args)
}

/// Drops the first and last character of a closed quoted span. Both are
/// guaranteed by the caller to be the same single-byte quote character.
fn strip_quotes(span: &str) -> String {
    span[1..span.len() - 1].to_string()
}
