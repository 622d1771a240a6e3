//! Managed-side aliases for native member names.
//!
//! Native `getFooBar()` is also reachable as `get_foo_bar`, `foo_bar`, and (for
//! boolean results) `foo_bar?`; `setFooBar(x)` as `foo_bar=`; `isReady()` as
//! `ready?`.

use crossbind_core::{Callable, PrimitiveKind, TypeSig};

/// Convert a camelCase name to snake_case. Acronyms collapse: `getURLPath` → `get_url_path`.
pub fn to_snake_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && prev != '_' {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

/// Strip a bean prefix (`get`, `set`, `is`) when followed by an upper-case letter.
fn strip_bean_prefix<'a>(name: &'a str, prefix: &str) -> Option<&'a str> {
    let rest = name.strip_prefix(prefix)?;
    rest.chars()
        .next()
        .filter(|c| c.is_uppercase())
        .map(|_| rest)
}

fn returns_boolean(callable: &Callable) -> bool {
    matches!(
        callable.return_type,
        TypeSig::Primitive(PrimitiveKind::Boolean) | TypeSig::Boxed(PrimitiveKind::Boolean)
    )
}

/// Alternative managed names for a method, excluding its native name.
///
/// Constructors have no aliases.
pub fn managed_aliases(callable: &Callable) -> Vec<String> {
    let mut names = Vec::new();
    let mut push = |name: String| {
        if name != callable.name && !names.contains(&name) {
            names.push(name);
        }
    };

    let snake = to_snake_case(&callable.name);
    push(snake.clone());

    let arity = callable.arity();
    let boolean = returns_boolean(callable);

    if let Some(property) = strip_bean_prefix(&callable.name, "get") {
        if arity == 0 {
            let property = to_snake_case(property);
            if boolean {
                push(format!("{}?", property));
            }
            push(property);
        }
    } else if let Some(property) = strip_bean_prefix(&callable.name, "set") {
        if arity == 1 {
            push(format!("{}=", to_snake_case(property)));
        }
    } else if let Some(property) = strip_bean_prefix(&callable.name, "is") {
        if arity == 0 && boolean {
            let property = to_snake_case(property);
            push(format!("{}?", property));
            push(property);
        }
    }

    if boolean && arity == 0 {
        push(format!("{}?", snake));
    }

    names
}
