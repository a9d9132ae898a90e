use std::collections::BTreeSet;

use regex::Regex;

use crate::core::errors::{Result, StratusError};
use crate::core::models::stack::StackTemplate;

/// Dependency ordering and stack selection over a planned stack set.
pub struct StackGraph;

impl StackGraph {
    /// Order templates so every stack comes after the stacks it
    /// depends on.
    ///
    /// Ties break by position in `templates`, so the planner's creation
    /// order is preserved wherever the graph allows it and the result
    /// is stable across runs.
    ///
    /// # Errors
    ///
    /// `CircularDependency` with the offending chain if the graph has
    /// a cycle. Dependencies pointing outside `templates` are ignored;
    /// callers pass a closed set.
    pub fn order<'a>(&self, templates: &'a [StackTemplate]) -> Result<Vec<&'a StackTemplate>> {
        let names: BTreeSet<&str> = templates.iter().map(|t| t.name.as_str()).collect();
        let mut emitted: Vec<&StackTemplate> = Vec::with_capacity(templates.len());
        let mut done: BTreeSet<&str> = BTreeSet::new();

        while emitted.len() < templates.len() {
            let next = templates.iter().find(|template| {
                !done.contains(template.name.as_str())
                    && template
                        .depends_on
                        .iter()
                        .all(|dep| done.contains(dep.as_str()) || !names.contains(dep.as_str()))
            });
            match next {
                Some(template) => {
                    done.insert(template.name.as_str());
                    emitted.push(template);
                }
                None => {
                    let remaining: Vec<&StackTemplate> = templates
                        .iter()
                        .filter(|t| !done.contains(t.name.as_str()))
                        .collect();
                    return Err(StratusError::CircularDependency {
                        chain: cycle_chain(&remaining),
                    });
                }
            }
        }
        Ok(emitted)
    }

    /// Resolve positional stack patterns against the planned set.
    ///
    /// `*` in a pattern matches any run of characters. Every pattern
    /// must match at least one stack. Returns matched names in planner
    /// order, deduplicated. `all` selects everything.
    pub fn select(
        &self,
        templates: &[StackTemplate],
        patterns: &[String],
        all: bool,
    ) -> Result<Vec<String>> {
        if all {
            return Ok(templates.iter().map(|t| t.name.clone()).collect());
        }

        let mut selected: BTreeSet<&str> = BTreeSet::new();
        for pattern in patterns {
            let matcher = wildcard_regex(pattern)?;
            let mut matched = false;
            for template in templates {
                if matcher.is_match(&template.name) {
                    selected.insert(template.name.as_str());
                    matched = true;
                }
            }
            if !matched {
                let available: Vec<&str> = templates.iter().map(|t| t.name.as_str()).collect();
                return Err(StratusError::UnknownStack {
                    pattern: pattern.clone(),
                    available: available.join(", "),
                });
            }
        }

        Ok(templates
            .iter()
            .filter(|t| selected.contains(t.name.as_str()))
            .map(|t| t.name.clone())
            .collect())
    }

    /// Expand a selection with everything the selected stacks
    /// transitively depend on. Deploying a stack without its
    /// dependencies would leave its imports dangling.
    pub fn with_dependencies(
        &self,
        templates: &[StackTemplate],
        selection: &[String],
    ) -> Vec<String> {
        let mut wanted: BTreeSet<String> = selection.iter().cloned().collect();
        loop {
            let mut added = false;
            for template in templates {
                if wanted.contains(&template.name) {
                    for dep in &template.depends_on {
                        if wanted.insert(dep.clone()) {
                            added = true;
                        }
                    }
                }
            }
            if !added {
                break;
            }
        }
        templates
            .iter()
            .filter(|t| wanted.contains(&t.name))
            .map(|t| t.name.clone())
            .collect()
    }

    /// Expand a selection with everything that transitively depends on
    /// the selected stacks. Destroying a stack under a live dependent
    /// would strand the dependent's imports.
    pub fn with_dependents(
        &self,
        templates: &[StackTemplate],
        selection: &[String],
    ) -> Vec<String> {
        let mut wanted: BTreeSet<String> = selection.iter().cloned().collect();
        loop {
            let mut added = false;
            for template in templates {
                if !wanted.contains(&template.name)
                    && template.depends_on.iter().any(|dep| wanted.contains(dep))
                    && wanted.insert(template.name.clone())
                {
                    added = true;
                }
            }
            if !added {
                break;
            }
        }
        templates
            .iter()
            .filter(|t| wanted.contains(&t.name))
            .map(|t| t.name.clone())
            .collect()
    }
}

/// Walk dependency edges among the remaining nodes until a name
/// repeats, rendering the loop as `a -> b -> a`.
fn cycle_chain(remaining: &[&StackTemplate]) -> String {
    let names: BTreeSet<&str> = remaining.iter().map(|t| t.name.as_str()).collect();
    let mut seen: Vec<&str> = Vec::new();
    let mut current = match remaining.first() {
        Some(template) => template.name.as_str(),
        None => return String::new(),
    };

    loop {
        if let Some(pos) = seen.iter().position(|name| *name == current) {
            let mut chain = seen[pos..].to_vec();
            chain.push(current);
            return chain.join(" -> ");
        }
        seen.push(current);
        let next = remaining
            .iter()
            .find(|t| t.name == current)
            .and_then(|t| {
                t.depends_on
                    .iter()
                    .find(|dep| names.contains(dep.as_str()))
            });
        match next {
            Some(dep) => current = dep.as_str(),
            // every remaining node keeps an edge into the remainder,
            // so this only guards against inconsistent input
            None => return seen.join(" -> "),
        }
    }
}

/// Compile a `*` wildcard pattern into an anchored regex.
fn wildcard_regex(pattern: &str) -> Result<Regex> {
    let escaped: Vec<String> = pattern.split('*').map(|part| regex::escape(part)).collect();
    let source = format!("^{}$", escaped.join(".*"));
    Regex::new(&source).map_err(|e| StratusError::InvalidConfig {
        detail: format!("bad stack pattern '{pattern}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::stack::StackKind;
    use std::collections::BTreeMap;

    /// Helper: a minimal template with explicit dependencies.
    fn make_stack(name: &str, deps: &[&str]) -> StackTemplate {
        StackTemplate {
            name: name.to_string(),
            kind: StackKind::Service,
            environment: "dev".to_string(),
            resources: BTreeMap::new(),
            outputs: vec![],
            tags: BTreeMap::new(),
            depends_on: deps.iter().map(|d| d.to_string()).collect(),
        }
    }

    fn names(ordered: &[&StackTemplate]) -> Vec<String> {
        ordered.iter().map(|t| t.name.clone()).collect()
    }

    #[test]
    fn order_respects_dependencies() {
        let templates = vec![
            make_stack("client", &["svc"]),
            make_stack("svc", &["net"]),
            make_stack("net", &[]),
        ];

        let ordered = StackGraph.order(&templates).unwrap();

        assert_eq!(names(&ordered), vec!["net", "svc", "client"]);
    }

    #[test]
    fn order_breaks_ties_by_position() {
        let templates = vec![
            make_stack("net", &[]),
            make_stack("b-svc", &["net"]),
            make_stack("a-svc", &["net"]),
        ];

        let ordered = StackGraph.order(&templates).unwrap();

        // b-svc planned first, so it stays first
        assert_eq!(names(&ordered), vec!["net", "b-svc", "a-svc"]);
    }

    #[test]
    fn order_reports_cycles_with_chain() {
        let templates = vec![
            make_stack("a", &["b"]),
            make_stack("b", &["a"]),
        ];

        let result = StackGraph.order(&templates);

        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("a -> b -> a") || err.contains("b -> a -> b"));
    }

    #[test]
    fn order_ignores_unknown_dependencies() {
        let templates = vec![make_stack("svc", &["not-planned"])];

        let ordered = StackGraph.order(&templates).unwrap();

        assert_eq!(names(&ordered), vec!["svc"]);
    }

    #[test]
    fn select_all() {
        let templates = vec![make_stack("a", &[]), make_stack("b", &[])];

        let selected = StackGraph.select(&templates, &[], true).unwrap();

        assert_eq!(selected, vec!["a", "b"]);
    }

    #[test]
    fn select_exact_name() {
        let templates = vec![make_stack("demo-network-dev", &[]), make_stack("demo-client-dev", &[])];

        let selected = StackGraph
            .select(&templates, &["demo-client-dev".to_string()], false)
            .unwrap();

        assert_eq!(selected, vec!["demo-client-dev"]);
    }

    #[test]
    fn select_wildcard() {
        let templates = vec![
            make_stack("demo-url-fetcher-dev", &[]),
            make_stack("demo-random-web-dev", &[]),
            make_stack("demo-client-dev", &[]),
        ];

        let selected = StackGraph
            .select(&templates, &["demo-*-web-dev".to_string()], false)
            .unwrap();

        assert_eq!(selected, vec!["demo-random-web-dev"]);
    }

    #[test]
    fn select_unmatched_pattern_fails() {
        let templates = vec![make_stack("demo-network-dev", &[])];

        let result = StackGraph.select(&templates, &["nope-*".to_string()], false);

        assert!(result.is_err());
        let err = result.unwrap_err().to_string();
        assert!(err.contains("nope-*"));
        assert!(err.contains("demo-network-dev"));
    }

    #[test]
    fn wildcard_escapes_regex_metacharacters() {
        let templates = vec![make_stack("demo.network", &[])];

        // a literal dot in the pattern must not act as a regex dot
        let result = StackGraph.select(&templates, &["demoXnetwork".to_string()], false);
        assert!(result.is_err());

        let selected = StackGraph
            .select(&templates, &["demo.network".to_string()], false)
            .unwrap();
        assert_eq!(selected, vec!["demo.network"]);
    }

    #[test]
    fn dependencies_expand_transitively() {
        let templates = vec![
            make_stack("net", &[]),
            make_stack("cluster", &["net"]),
            make_stack("svc", &["cluster"]),
            make_stack("other", &[]),
        ];

        let expanded = StackGraph.with_dependencies(&templates, &["svc".to_string()]);

        assert_eq!(expanded, vec!["net", "cluster", "svc"]);
    }

    #[test]
    fn dependents_expand_transitively() {
        let templates = vec![
            make_stack("net", &[]),
            make_stack("cluster", &["net"]),
            make_stack("svc", &["cluster"]),
            make_stack("other", &[]),
        ];

        let expanded = StackGraph.with_dependents(&templates, &["net".to_string()]);

        assert_eq!(expanded, vec!["net", "cluster", "svc"]);
    }
}
