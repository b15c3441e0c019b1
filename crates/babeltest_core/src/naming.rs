//! Naming helpers that bridge identifier conventions across languages.
//!
//! Test specifications are written once and replayed against several codebases, so a member
//! called `get_by_id` in one language may be `getById` in another. Resolution compares names
//! through [`names_match`], which accepts either spelling in both directions.

use crate::lang::conventions::CAPABILITY_MARKER;

/// Convert `snake_case` or `kebab-case` to `camelCase` (`get_by_id` → `getById`).
///
/// Already-camel input is returned unchanged.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for (idx, ch) in name.chars().enumerate() {
        if ch == '_' || ch == '-' {
            // Leading separators are kept so private-style names stay distinct.
            if idx == 0 || out.is_empty() {
                out.push(ch);
            } else {
                upper_next = true;
            }
            continue;
        }
        if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// Convert `camelCase`, `PascalCase` or `kebab-case` to `snake_case` (`getById` → `get_by_id`).
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let chars: Vec<char> = name.chars().collect();
    for (idx, &ch) in chars.iter().enumerate() {
        if ch == '-' {
            out.push('_');
            continue;
        }
        if ch.is_uppercase() {
            let prev = idx.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(idx + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                // `HTTPServer` → `http_server`: split before the last capital of a run.
                Some(p) if p.is_uppercase() => next.is_some_and(|n| n.is_lowercase()),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Lower the first character (`OrderService` → `orderService`); used for factory names.
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Every spelling a name may take in another codebase: itself, camelCase and snake_case.
///
/// The original spelling always comes first; duplicates are removed.
pub fn name_variants(name: &str) -> Vec<String> {
    let mut variants = vec![name.to_string()];
    for candidate in [to_camel_case(name), to_snake_case(name)] {
        if !variants.contains(&candidate) {
            variants.push(candidate);
        }
    }
    variants
}

/// Whether two member names refer to the same thing under the naming bridge.
pub fn names_match(requested: &str, declared: &str) -> bool {
    if requested == declared {
        return true;
    }
    to_snake_case(requested) == to_snake_case(declared) || to_camel_case(requested) == to_camel_case(declared)
}

/// Strip a leading capability marker (`IPaymentGateway` → `PaymentGateway`).
///
/// Only strips when the marker is followed by another capital, so `Invoice` is left alone.
pub fn strip_capability_marker(name: &str) -> &str {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some(CAPABILITY_MARKER), Some(second)) if second.is_uppercase() => &name[CAPABILITY_MARKER.len_utf8()..],
        _ => name,
    }
}

/// Whether two capability names match, ignoring a capability marker on either side.
pub fn capabilities_match(a: &str, b: &str) -> bool {
    a == b || strip_capability_marker(a) == strip_capability_marker(b)
}

/// Whether a path segment starts with an uppercase letter (i.e. looks like a type name).
pub fn is_capitalized(segment: &str) -> bool {
    segment.chars().next().is_some_and(char::is_uppercase)
}

/// Last dotted segment of a path (`example.payment.OrderService` → `OrderService`).
pub fn short_name(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}
