//! Build-argument expansion
//!
//! Supports `$NAME` and `${NAME}` references. Expansion over a spec is
//! all-or-nothing: an undefined variable is an error, never an empty
//! substitution, so misspelled args fail at compile time rather than
//! producing a silently wrong build.

use std::collections::BTreeMap;

use pakket_errors::SpecError;

/// Expand `$NAME` / `${NAME}` references in `input` against `args`.
///
/// A literal `$$` produces a single `$`. A `$` not followed by a valid
/// variable name passes through unchanged.
///
/// # Errors
///
/// Returns [`SpecError::ArgExpansion`] when a referenced variable is not
/// present in `args` or a `${...}` reference is unterminated.
pub fn expand_args(input: &str, args: &BTreeMap<String, String>) -> Result<String, SpecError> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some((_, c)) = chars.next() {
        if c != '$' {
            out.push(c);
            continue;
        }

        match chars.peek().copied() {
            Some((_, '$')) => {
                chars.next();
                out.push('$');
            }
            Some((start, '{')) => {
                chars.next();
                let mut name = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(SpecError::ArgExpansion {
                        context: input.to_string(),
                        reason: format!("unterminated ${{ at byte {start}"),
                    });
                }
                out.push_str(lookup(&name, args, input)?);
            }
            Some((_, c)) if is_name_start(c) => {
                let mut name = String::new();
                while let Some((_, c)) = chars.peek().copied() {
                    if !is_name_char(c) {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                out.push_str(lookup(&name, args, input)?);
            }
            _ => out.push('$'),
        }
    }

    Ok(out)
}

fn lookup<'a>(
    name: &str,
    args: &'a BTreeMap<String, String>,
    input: &str,
) -> Result<&'a str, SpecError> {
    if name.is_empty() {
        return Err(SpecError::ArgExpansion {
            context: input.to_string(),
            reason: "empty variable name".to_string(),
        });
    }
    args.get(name)
        .map(String::as_str)
        .ok_or_else(|| SpecError::ArgExpansion {
            context: input.to_string(),
            reason: format!("undefined build arg {name}"),
        })
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_char(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn expands_braced_and_bare_references() {
        let a = args(&[("NAME", "app"), ("VER", "1.2")]);
        assert_eq!(expand_args("$NAME-${VER}.tar", &a).unwrap(), "app-1.2.tar");
    }

    #[test]
    fn dollar_dollar_escapes() {
        let a = args(&[]);
        assert_eq!(expand_args("cost: $$5", &a).unwrap(), "cost: $5");
    }

    #[test]
    fn lone_dollar_passes_through() {
        let a = args(&[]);
        assert_eq!(expand_args("a$ b", &a).unwrap(), "a$ b");
        assert_eq!(expand_args("tail$", &a).unwrap(), "tail$");
    }

    #[test]
    fn undefined_variable_is_an_error() {
        let err = expand_args("$MISSING", &args(&[])).unwrap_err();
        assert!(matches!(err, SpecError::ArgExpansion { .. }));
    }

    #[test]
    fn unterminated_brace_is_an_error() {
        let err = expand_args("${NAME", &args(&[("NAME", "x")])).unwrap_err();
        assert!(matches!(err, SpecError::ArgExpansion { .. }));
    }
}

#[cfg(test)]
mod prop_tests {
    use std::collections::BTreeMap;

    use proptest::prelude::*;

    use super::expand_args;

    proptest! {
        #[test]
        fn input_without_references_is_identity(input in "[a-zA-Z0-9 ./_-]{0,64}") {
            let args = BTreeMap::new();
            prop_assert_eq!(expand_args(&input, &args).unwrap(), input);
        }

        #[test]
        fn expansion_substitutes_every_reference(
            name in "[A-Z][A-Z0-9_]{0,8}",
            value in "[a-z0-9.]{1,16}",
        ) {
            let mut args = BTreeMap::new();
            args.insert(name.clone(), value.clone());
            let expanded = expand_args(&format!("pre-${{{name}}}-post"), &args).unwrap();
            prop_assert_eq!(expanded, format!("pre-{value}-post"));
        }
    }
}
