use media_catalog_models::{LibrarySection, RefreshTarget};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// A path resolved to its owning library section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryMatch {
    pub library_id: String,
    pub path: PathBuf,
}

/// How a batch of refresh targets will be issued against the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshPlan {
    /// Every target resolved; one call per distinct (library, directory).
    Targeted(Vec<(String, PathBuf)>),
    /// At least one target did not resolve to a library, which poisons
    /// precision for the whole batch.
    Full,
}

/// Map a filesystem path to the owning library section.
///
/// Ownership is descendant-or-equal against each section's root
/// locations, compared component-wise on lexically normalized paths so
/// trailing separators and `.`/`..` segments cannot defeat the match.
/// The first owning section in provider listing order wins; configured
/// roots are assumed not to overlap or nest, and the listing order is
/// unspecified when they do.
pub fn find_owning_library(
    path: Option<&Path>,
    libraries: &[LibrarySection],
) -> Option<LibraryMatch> {
    let path = path?;
    let normalized = normalize(path);
    for library in libraries {
        for location in &library.locations {
            if is_subpath(&normalized, &normalize(location)) {
                return Some(LibraryMatch {
                    library_id: library.id.clone(),
                    path: normalized,
                });
            }
        }
    }
    debug!(path = %path.display(), "Path is outside all configured library roots");
    None
}

/// Collapse refresh targets into per-directory refresh calls, falling
/// back to one whole-catalog refresh when any target fails to resolve.
/// Multiple targets under the same directory (episodes of one season)
/// merge into a single call.
pub fn plan_refresh(targets: &[RefreshTarget], libraries: &[LibrarySection]) -> RefreshPlan {
    let mut resolved: BTreeMap<PathBuf, String> = BTreeMap::new();
    for target in targets {
        match find_owning_library(Some(&target.target_path), libraries) {
            Some(found) => {
                resolved.insert(found.path, found.library_id);
            }
            None => {
                debug!(
                    path = %target.target_path.display(),
                    title = target.title.as_deref().unwrap_or(""),
                    "Refresh target did not resolve to a library, falling back to full refresh"
                );
                return RefreshPlan::Full;
            }
        }
    }
    RefreshPlan::Targeted(resolved.into_iter().map(|(path, id)| (id, path)).collect())
}

/// Lexical normalization: drop `.` segments, fold `..` onto the parent,
/// and let component iteration absorb trailing separators. `..` never
/// climbs above a root or prefix component.
fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(Component::ParentDir),
            },
            other => parts.push(other),
        }
    }
    parts.into_iter().collect()
}

fn is_subpath(path: &Path, parent: &Path) -> bool {
    let path: Vec<Component> = path.components().collect();
    let parent: Vec<Component> = parent.components().collect();
    path.len() >= parent.len() && path[..parent.len()] == parent[..]
}
