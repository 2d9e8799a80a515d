//! Placeholder resolution for legacy image sources.
//!
//! Legacy image sources may embed placeholders that depend on the issue being
//! drawn. The patterns are applied one after the other, each as a replace-all
//! pass over the output of the previous one:
//!
//! 1. `[Hauteur]*<coefficient>` - canvas height multiplied by the coefficient
//! 2. `[Numero]` - the issue number
//! 3. `[Numero[<digit>]]` - one character of the issue number
//!
//! # Example
//!
//! ```
//! # use edgecreator_legacy::template::{TemplateContext, resolve_template};
//! let context = TemplateContext::new("142", 200.0);
//! assert_eq!(resolve_template("Tete.[Numero].png", &context), "Tete.142.png");
//! assert_eq!(resolve_template("Chiffre.[Numero[1]].png", &context), "Chiffre.4.png");
//! assert_eq!(resolve_template("Fond.[Hauteur]*0.5_b.png", &context), "Fond.100_b.png");
//! ```

use winnow::{
    Parser as _,
    combinator::{delimited, preceded},
    error::{ContextError, ErrMode},
    token::take_while,
};

type IResult<O> = std::result::Result<O, ErrMode<ContextError>>;

/// Issue-dependent values substituted into templates.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    issue_number: &'a str,
    height: f64,
}

impl<'a> TemplateContext<'a> {
    pub fn new(issue_number: &'a str, height: f64) -> Self {
        Self {
            issue_number,
            height,
        }
    }
}

/// `[Hauteur]*0.5` yields the coefficient text `0.5`.
fn height_pattern<'i>(input: &mut &'i str) -> IResult<&'i str> {
    preceded(
        "[Hauteur]*",
        take_while(1.., |c: char| c.is_ascii_digit() || c == '.'),
    )
    .parse_next(input)
}

fn issue_number_pattern<'i>(input: &mut &'i str) -> IResult<&'i str> {
    "[Numero]".parse_next(input)
}

/// `[Numero[2]]` yields the digit index `2`.
fn issue_digit_pattern(input: &mut &str) -> IResult<usize> {
    delimited(
        "[Numero[",
        take_while(1..=1, |c: char| c.is_ascii_digit()).verify_map(|digit: &str| digit.parse().ok()),
        "]]",
    )
    .parse_next(input)
}

/// Replace every match of `pattern` in `text`.
///
/// `replacement` receives the parser output and the matched text; the scan
/// resumes after the match.
fn replace_all<'i, O>(
    text: &'i str,
    mut pattern: impl FnMut(&mut &'i str) -> IResult<O>,
    mut replacement: impl FnMut(O, &'i str) -> String,
) -> String {
    let mut output = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        let mut input = rest;
        match pattern(&mut input) {
            Ok(matched) if input.len() < rest.len() => {
                let matched_text = &rest[..rest.len() - input.len()];
                output.push_str(&replacement(matched, matched_text));
                rest = input;
            }
            _ => {
                let mut chars = rest.chars();
                if let Some(c) = chars.next() {
                    output.push(c);
                }
                rest = chars.as_str();
            }
        }
    }

    output
}

/// Resolve every placeholder of `text` for the given issue.
///
/// Empty input and input without placeholders are returned unchanged. An
/// unparsable coefficient leaves its `[Hauteur]` placeholder untouched; a
/// digit index past the end of the issue number resolves to nothing.
pub fn resolve_template(text: &str, context: &TemplateContext<'_>) -> String {
    if text.is_empty() {
        return String::new();
    }

    let resolved = replace_all(text, height_pattern, |coefficient, matched| {
        match coefficient.parse::<f64>() {
            Ok(coefficient) => (context.height * coefficient).to_string(),
            Err(_) => matched.to_string(),
        }
    });
    let resolved = replace_all(&resolved, issue_number_pattern, |_, _| {
        context.issue_number.to_string()
    });
    replace_all(&resolved, issue_digit_pattern, |index, _| {
        context
            .issue_number
            .chars()
            .nth(index)
            .map(String::from)
            .unwrap_or_default()
    })
}
