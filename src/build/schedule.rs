// src/build/schedule.rs

//! Build order
//!
//! A variant of Kahn's algorithm over queue candidates. Packages are referred
//! to by arena index; edges point from a package to the pending packages
//! producing its dependencies. When every remaining package waits on another
//! one, cycles are broken by building a package against the existing binary
//! of its blocker. If that is impossible the scheduler fails and lists every
//! unresolved edge.

use crate::arch::Arch;
use crate::build::queue::{BuildQueueItem, Diagnostic};
use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// Resolves a dependency name to the pkgname that provides it
pub trait PackageLookup {
    /// Owning pkgname of `name` (subpackages map to their parent), `None`
    /// when no recipe or binary package knows the name
    fn owner(&self, name: &str, arch: Arch) -> Result<Option<String>>;
}

impl<F> PackageLookup for F
where
    F: Fn(&str, Arch) -> Option<String>,
{
    fn owner(&self, name: &str, arch: Arch) -> Result<Option<String>> {
        Ok(self(name, arch))
    }
}

/// Orders queue candidates so dependencies are built first
pub struct BuildScheduler<'a> {
    bootstrap: &'a [String],
    lookup: &'a dyn PackageLookup,
}

impl<'a> BuildScheduler<'a> {
    /// `bootstrap` lists packages that always go first, in that order
    pub fn new(bootstrap: &'a [String], lookup: &'a dyn PackageLookup) -> Self {
        Self { bootstrap, lookup }
    }

    /// Produce the build order for `candidates`
    pub fn schedule(&self, candidates: Vec<BuildQueueItem>) -> Result<Vec<BuildQueueItem>> {
        let mut seen = BTreeSet::new();
        let mut items: Vec<BuildQueueItem> = Vec::with_capacity(candidates.len());
        for item in candidates {
            if seen.insert((item.arch, item.name.clone())) {
                items.push(item);
            } else {
                debug!("{}/{}: dropping duplicate candidate", item.arch, item.name);
            }
        }

        let mut queue: Vec<BuildQueueItem> = Vec::with_capacity(items.len());
        for pkgname in self.bootstrap {
            let (first, rest): (Vec<_>, Vec<_>) =
                items.into_iter().partition(|item| &item.name == pkgname);
            items = rest;
            queue.extend(first);
        }

        let mut graph = Graph::build(&items, self.lookup)?;
        let mut slots: Vec<Option<BuildQueueItem>> = items.into_iter().map(Some).collect();
        let mut warned: BTreeSet<(usize, usize)> = BTreeSet::new();

        while graph.pending_count() > 0 {
            let Some((id, note)) = graph.next_ready(&slots, &mut warned) else {
                return Err(Error::CyclicDependencyUnbreakable {
                    edges: graph.unresolved_edges(&slots),
                });
            };
            graph.pending[id] = false;
            if let Some(mut item) = slots[id].take() {
                if let Some(diagnostic) = note {
                    item.diagnostics.push(diagnostic);
                }
                debug!("{}/{}: queued", item.arch, item.name);
                queue.push(item);
            }
        }

        Ok(queue)
    }
}

/// Dependency edges between pending candidates
struct Graph {
    /// `edges[i]` lists the candidates `i` waits for
    edges: Vec<Vec<usize>>,
    pending: Vec<bool>,
}

impl Graph {
    fn build(items: &[BuildQueueItem], lookup: &dyn PackageLookup) -> Result<Self> {
        let mut producers: BTreeMap<(Arch, String), usize> = BTreeMap::new();
        for (id, item) in items.iter().enumerate() {
            producers.entry((item.arch, item.name.clone())).or_insert(id);
            for sub in item.subpackages() {
                producers.entry((item.arch, sub.to_string())).or_insert(id);
            }
        }

        let mut edges = Vec::with_capacity(items.len());
        for (id, item) in items.iter().enumerate() {
            let mut targets = Vec::new();
            for dep in &item.depends {
                if item.produces(dep) {
                    continue;
                }
                let Some(owner) = lookup.owner(dep, item.arch)? else {
                    return Err(Error::UnresolvedPackage {
                        name: dep.clone(),
                        referrer: Some(item.name.clone()),
                    });
                };
                if item.produces(&owner) {
                    continue;
                }
                let target = producers
                    .get(&(item.arch, owner))
                    .or_else(|| producers.get(&(item.arch, dep.clone())));
                if let Some(&target) = target {
                    if target != id && !targets.contains(&target) {
                        targets.push(target);
                    }
                }
            }
            edges.push(targets);
        }

        Ok(Self {
            pending: vec![true; items.len()],
            edges,
        })
    }

    fn pending_count(&self) -> usize {
        self.pending.iter().filter(|p| **p).count()
    }

    fn unmet(&self, id: usize) -> impl Iterator<Item = usize> + '_ {
        self.edges[id].iter().copied().filter(|dep| self.pending[*dep])
    }

    /// Whether `from` waits, directly or transitively, on `to`
    fn reaches(&self, from: usize, to: usize) -> bool {
        let mut visited = vec![false; self.edges.len()];
        let mut work = VecDeque::from([from]);
        while let Some(node) = work.pop_front() {
            if node == to {
                return true;
            }
            if std::mem::replace(&mut visited[node], true) {
                continue;
            }
            work.extend(self.unmet(node));
        }
        false
    }

    /// First pending candidate that can be queued now, in candidate order
    fn next_ready(
        &self,
        slots: &[Option<BuildQueueItem>],
        warned: &mut BTreeSet<(usize, usize)>,
    ) -> Option<(usize, Option<Diagnostic>)> {
        for id in (0..self.edges.len()).filter(|id| self.pending[*id]) {
            let item = slots[id].as_ref()?;
            let unmet: Vec<usize> = self.unmet(id).collect();
            if unmet.is_empty() {
                return Some((id, None));
            }

            let Some(blocker) = unmet.iter().copied().find(|dep| self.reaches(*dep, id)) else {
                debug!(
                    "{}: waiting for {} dependencies, trying other packages first",
                    item.name,
                    unmet.len()
                );
                continue;
            };
            let blocker_name = slots[blocker]
                .as_ref()
                .map(|b| b.name.clone())
                .unwrap_or_default();

            if item.has_binary {
                warn!(
                    "Cyclic build dependency: building {} with binary package of {}",
                    item.name, blocker_name
                );
                return Some((
                    id,
                    Some(Diagnostic::CycleBroken {
                        blocker: blocker_name,
                    }),
                ));
            }
            if warned.insert((id, blocker)) {
                warn!(
                    "Cyclic build dependency: can't build {}, no binary package to stand in for {}",
                    item.name, blocker_name
                );
            }
        }
        None
    }

    /// Every remaining `package -> blocking dependency` edge, sorted
    fn unresolved_edges(&self, slots: &[Option<BuildQueueItem>]) -> Vec<(String, String)> {
        let name = |id: usize| {
            slots[id]
                .as_ref()
                .map(|item| item.name.clone())
                .unwrap_or_default()
        };
        let mut edges: Vec<(String, String)> = (0..self.edges.len())
            .filter(|id| self.pending[*id])
            .flat_map(|id| self.unmet(id).map(move |dep| (id, dep)))
            .map(|(id, dep)| (name(id), name(dep)))
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::queue::output_path;
    use crate::recipe::Recipe;

    fn item(name: &str, depends: &[&str], has_binary: bool) -> BuildQueueItem {
        let recipe = Recipe::new(name, "1.0").with_depends(depends);
        BuildQueueItem {
            name: name.to_string(),
            arch: Arch::X86_64,
            has_binary,
            depends: depends.iter().map(|s| s.to_string()).collect(),
            version: recipe.version(),
            output: output_path(Arch::X86_64, name, "1.0", 0),
            repo: None,
            channel: "edge".to_string(),
            diagnostics: Vec::new(),
            recipe,
        }
    }

    fn identity(name: &str, _: Arch) -> Option<String> {
        Some(name.to_string())
    }

    fn names(queue: &[BuildQueueItem]) -> Vec<&str> {
        queue.iter().map(|i| i.name.as_str()).collect()
    }

    fn schedule(candidates: Vec<BuildQueueItem>) -> Result<Vec<BuildQueueItem>> {
        let bootstrap = vec!["abuild".to_string(), "build-base".to_string()];
        BuildScheduler::new(&bootstrap, &identity).schedule(candidates)
    }

    #[test]
    fn test_dependency_first() {
        let queue = schedule(vec![item("a", &["b"], false), item("b", &[], false)]).unwrap();
        assert_eq!(names(&queue), vec!["b", "a"]);
    }

    #[test]
    fn test_chain_and_independent() {
        let queue = schedule(vec![
            item("app", &["lib", "tool"], false),
            item("lib", &["tool"], false),
            item("tool", &[], false),
            item("other", &[], false),
        ])
        .unwrap();
        assert_eq!(names(&queue), vec!["tool", "lib", "app", "other"]);
    }

    #[test]
    fn test_bootstrap_packages_first() {
        let queue = schedule(vec![
            item("hello", &[], false),
            item("build-base", &["musl"], false),
            item("abuild", &[], false),
        ])
        .unwrap();
        assert_eq!(names(&queue), vec!["abuild", "build-base", "hello"]);
    }

    #[test]
    fn test_subpackage_dependency_maps_to_parent() {
        let parent = {
            let mut i = item("linux-pam", &[], false);
            i.recipe = i.recipe.clone().with_subpackage("linux-pam-dev", None);
            i
        };
        let lookup = |name: &str, _: Arch| match name {
            "linux-pam-dev" => Some("linux-pam".to_string()),
            other => Some(other.to_string()),
        };
        let bootstrap = Vec::new();
        let queue = BuildScheduler::new(&bootstrap, &lookup)
            .schedule(vec![item("shadow", &["linux-pam-dev"], false), parent])
            .unwrap();
        assert_eq!(names(&queue), vec!["linux-pam", "shadow"]);
    }

    #[test]
    fn test_cycle_broken_with_binary() {
        let queue = schedule(vec![item("a", &["b"], true), item("b", &["a"], false)]).unwrap();
        assert_eq!(names(&queue), vec!["a", "b"]);
        assert_eq!(
            queue[0].diagnostics,
            vec![Diagnostic::CycleBroken {
                blocker: "b".to_string()
            }]
        );
        assert!(queue[1].diagnostics.is_empty());

        // Candidate order doesn't matter
        let queue = schedule(vec![item("b", &["a"], false), item("a", &["b"], true)]).unwrap();
        assert_eq!(names(&queue), vec!["a", "b"]);
    }

    #[test]
    fn test_transitive_cycle_broken() {
        let queue = schedule(vec![
            item("a", &["b"], false),
            item("b", &["c"], false),
            item("c", &["a"], true),
        ])
        .unwrap();
        assert_eq!(names(&queue), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_unbreakable_cycle_lists_edges() {
        let err = schedule(vec![
            item("a", &["b"], false),
            item("b", &["a"], false),
            item("c", &[], false),
        ])
        .unwrap_err();
        match err {
            Error::CyclicDependencyUnbreakable { edges } => assert_eq!(
                edges,
                vec![
                    ("a".to_string(), "b".to_string()),
                    ("b".to_string(), "a".to_string())
                ]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_dependency_is_named() {
        let lookup = |name: &str, _: Arch| (name != "ghost").then(|| name.to_string());
        let bootstrap = Vec::new();
        let err = BuildScheduler::new(&bootstrap, &lookup)
            .schedule(vec![item("a", &["ghost"], false)])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::UnresolvedPackage { ref name, referrer: Some(ref parent) }
                if name == "ghost" && parent == "a"
        ));
    }

    #[test]
    fn test_dependencies_outside_candidates_are_met() {
        let queue = schedule(vec![item("a", &["musl", "busybox"], false)]).unwrap();
        assert_eq!(names(&queue), vec!["a"]);
    }

    #[test]
    fn test_duplicates_dropped() {
        let queue = schedule(vec![item("a", &[], false), item("a", &[], true)]).unwrap();
        assert_eq!(queue.len(), 1);
        assert!(!queue[0].has_binary);
    }

    #[test]
    fn test_stable_order() {
        let build = || {
            vec![
                item("x", &["z"], false),
                item("y", &[], false),
                item("z", &[], false),
            ]
        };
        let first = names(&schedule(build()).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let second = names(&schedule(build()).unwrap())
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        assert_eq!(first, second);
        assert_eq!(first, vec!["y", "z", "x"]);
    }
}
