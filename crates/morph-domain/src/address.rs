use crate::workspace::WorkspaceName;

/// Resolves the active workspace from an address such as `https://host/#orders`.
///
/// Everything after the first `#` is the name; a missing or empty fragment
/// selects the default workspace.
pub fn resolve(address: &str) -> WorkspaceName {
    let fragment = address.split_once('#').map_or("", |(_, fragment)| fragment);
    WorkspaceName::new(fragment).unwrap_or_default()
}

pub fn address_for(name: &WorkspaceName) -> String {
    format!("#{name}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DEFAULT_WORKSPACE;

    #[test]
    fn missing_fragment_resolves_to_default() {
        assert_eq!(resolve("").as_str(), DEFAULT_WORKSPACE);
        assert_eq!(resolve("https://example.test/app").as_str(), DEFAULT_WORKSPACE);
        assert_eq!(resolve("#").as_str(), DEFAULT_WORKSPACE);
    }

    #[test]
    fn fragment_names_the_workspace() {
        assert_eq!(resolve("#foo").as_str(), "foo");
        assert_eq!(resolve("https://example.test/app#orders").as_str(), "orders");
        assert_eq!(resolve("#a#b").as_str(), "a#b");
    }

    #[test]
    fn address_round_trips_through_resolve() {
        let name = WorkspaceName::new("reports 2024").unwrap();
        assert_eq!(resolve(&address_for(&name)), name);
    }
}
