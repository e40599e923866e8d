//! Naming conventions that turn declarations into HTTP routes.
//!
//! All functions accept both `snake_case` and `PascalCase`/`camelCase` input,
//! so contracts written by hand and contracts recorded by the attribute macro
//! resolve identically.

use http::Method;

/// Splits an identifier into lowercase words.
///
/// Word boundaries are `_`, `-`, spaces, lower-to-upper transitions and the
/// end of an acronym (`HTTPServer` is `http`, `server`).
#[must_use]
pub fn words(identifier: &str) -> Vec<String> {
    let chars: Vec<char> = identifier.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if matches!(c, '_' | '-' | ' ') {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_is_lower)
            {
                words.push(std::mem::take(&mut current));
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Converts an identifier to kebab-case.
///
/// ```
/// use hermes_contract::naming::kebab_case;
///
/// assert_eq!(kebab_case("GetUserAsync"), "get-user-async");
/// assert_eq!(kebab_case("get_user_async"), "get-user-async");
/// assert_eq!(kebab_case("HTTPServer"), "http-server");
/// ```
#[must_use]
pub fn kebab_case(identifier: &str) -> String {
    words(identifier).join("-")
}

/// Returns the route segment for an operation: kebab-case with a trailing
/// `async` word removed.
///
/// ```
/// use hermes_contract::naming::operation_segment;
///
/// assert_eq!(operation_segment("get_user_async"), "get-user");
/// assert_eq!(operation_segment("CreateOrderAsync"), "create-order");
/// assert_eq!(operation_segment("async"), "async");
/// ```
#[must_use]
pub fn operation_segment(operation: &str) -> String {
    let mut words = words(operation);
    if words.len() > 1 && words.last().is_some_and(|w| w == "async") {
        words.pop();
    }
    words.join("-")
}

/// Returns the default route prefix of a contract: kebab-case of its simple
/// name, without a leading interface marker (`I` followed by an upper-case
/// letter).
///
/// ```
/// use hermes_contract::naming::contract_prefix;
///
/// assert_eq!(contract_prefix("IUserContract"), "user-contract");
/// assert_eq!(contract_prefix("UserContract"), "user-contract");
/// assert_eq!(contract_prefix("Inventory"), "inventory");
/// ```
#[must_use]
pub fn contract_prefix(contract: &str) -> String {
    let simple = contract.rsplit("::").next().unwrap_or(contract);
    let mut chars = simple.chars();
    let stripped = match (chars.next(), chars.next()) {
        (Some('I'), Some(second)) if second.is_uppercase() => &simple[1..],
        _ => simple,
    };
    kebab_case(stripped)
}

/// Resolves the HTTP verb of an operation from the prefix of its name.
///
/// Matching ignores case and looks at characters, not words, so `Get2FACode`
/// and `UpdatesFeed` resolve like `GetUser` and `UpdateUser`.
///
/// | Prefix | Verb |
/// |---|---|
/// | `get`, `find`, `list`, `search` | GET |
/// | `create`, `add` | POST |
/// | `update` | PUT |
/// | `delete`, `remove` | DELETE |
/// | anything else | POST |
#[must_use]
pub fn verb_for(operation: &str) -> Method {
    const TABLE: [(&str, Method); 9] = [
        ("get", Method::GET),
        ("find", Method::GET),
        ("list", Method::GET),
        ("search", Method::GET),
        ("create", Method::POST),
        ("add", Method::POST),
        ("update", Method::PUT),
        ("delete", Method::DELETE),
        ("remove", Method::DELETE),
    ];
    let name = operation.trim_start_matches('_').to_ascii_lowercase();
    TABLE
        .into_iter()
        .find(|(prefix, _)| name.starts_with(prefix))
        .map_or(Method::POST, |(_, method)| method)
}
