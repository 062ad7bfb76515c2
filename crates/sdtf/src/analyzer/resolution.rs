//! Alias graph checks shared by the analyzer and the live tree state.
//!
//! Order matters: self references and cycles are rejected before anything
//! follows alias chains, so every later traversal terminates.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use sdtf_token_types::{MatchOutcome, TokenTypeRegistry, ValueSegment};

use super::decompose::TokenValue;
use crate::alias::{AliasFrom, AliasReference, AliasTo};
use crate::error::{CycleScope, Result, SdtfError};
use crate::path::{TreePath, ValuePath};
use crate::value_parts::{RawValuePart, TokenRawValueParts};

pub(crate) struct TokenEntry<'a> {
    pub token_type: &'a str,
    pub value: &'a TokenValue,
}

/// Read access to the token namespace of a tree under analysis.
pub(crate) trait TokenGraph {
    /// Token paths in document order.
    fn token_paths(&self) -> Vec<&TreePath>;
    fn token_entry(&self, path: &TreePath) -> Option<TokenEntry<'_>>;
    /// Nearest ancestor collection of `path` and its declared modes.
    fn owning_collection(&self, path: &TreePath) -> Option<(&TreePath, &[String])>;
}

/// Modes of a token, following top-level aliases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComputedModes {
    Resolved(Vec<String>),
    Unresolved,
}

impl ComputedModes {
    pub fn modes(&self) -> Option<&[String]> {
        match self {
            ComputedModes::Resolved(modes) => Some(modes),
            ComputedModes::Unresolved => None,
        }
    }

    fn contains(&self, mode: &str) -> bool {
        self.modes()
            .map(|modes| modes.iter().any(|m| m == mode))
            .unwrap_or(false)
    }
}

/// Path-keyed cache of computed modes for one tree revision.
///
/// Entries are written once, on first resolution, and never change until the
/// owning tree rebuilds the cache after a mutation.
#[derive(Debug, Clone, Default)]
pub struct ComputedModesCache {
    entries: HashMap<TreePath, ComputedModes>,
}

impl ComputedModesCache {
    pub fn get(&self, path: &TreePath) -> Option<&ComputedModes> {
        self.entries.get(path)
    }

    /// Local modes when present, else the cached entry, else the modes of the
    /// top-level alias target, memoized on `path`.
    pub(crate) fn resolve<G: TokenGraph + ?Sized>(
        &mut self,
        graph: &G,
        path: &TreePath,
    ) -> ComputedModes {
        let Some(entry) = graph.token_entry(path) else {
            return ComputedModes::Unresolved;
        };
        match entry.value {
            TokenValue::Modes(parts) => {
                let modes = ComputedModes::Resolved(parts.modes());
                self.entries.insert(path.clone(), modes.clone());
                modes
            }
            TokenValue::TopLevelAlias { target } => {
                if let Some(cached) = self.entries.get(path) {
                    return cached.clone();
                }
                let resolved = self.resolve(graph, target);
                self.entries.insert(path.clone(), resolved.clone());
                resolved
            }
        }
    }
}

/// Resolvability flags of one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenResolvability {
    pub modes: IndexMap<String, bool>,
    pub is_fully_resolvable: bool,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Resolution {
    pub aliases: Vec<AliasReference>,
    pub computed_modes: ComputedModesCache,
    pub resolvability: HashMap<TreePath, TokenResolvability>,
}

/// Runs every alias check over `graph`.
pub(crate) fn resolve<G: TokenGraph + ?Sized>(
    graph: &G,
    registry: &dyn TokenTypeRegistry,
    scope: CycleScope,
) -> Result<Resolution> {
    let paths: Vec<TreePath> = graph.token_paths().into_iter().cloned().collect();

    check_self_references(graph, &paths)?;
    detect_cycles(graph, &paths, scope)?;
    check_alias_types(graph, &paths, registry)?;

    let mut computed_modes = ComputedModesCache::default();
    for path in &paths {
        computed_modes.resolve(graph, path);
    }

    let aliases = collect_references(graph, &paths, &computed_modes);
    check_mode_coherence(graph, &paths, &computed_modes)?;

    let resolvability = {
        let mut flags = FlagResolver {
            graph,
            computed_modes: &computed_modes,
            memo: HashMap::new(),
        };
        let mut resolvability = HashMap::with_capacity(paths.len());
        for path in &paths {
            resolvability.insert(path.clone(), flags.token(path));
        }
        resolvability
    };

    Ok(Resolution {
        aliases,
        computed_modes,
        resolvability,
    })
}

fn check_self_references<G: TokenGraph + ?Sized>(graph: &G, paths: &[TreePath]) -> Result<()> {
    for path in paths {
        let Some(entry) = graph.token_entry(path) else {
            continue;
        };
        let self_aliased = match entry.value {
            TokenValue::TopLevelAlias { target } => target == path,
            TokenValue::Modes(parts) => parts.aliases().any(|part| match part {
                RawValuePart::Alias {
                    mode,
                    target,
                    target_mode,
                    ..
                } => target == path && target_mode == mode,
                RawValuePart::Primitive { .. } => false,
            }),
        };
        if self_aliased {
            return Err(SdtfError::SelfReference {
                token: path.clone(),
            });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Depth-first search over token-level alias edges; any back edge (a token
/// reaching itself through any chain or mode) is a cycle.
fn detect_cycles<G: TokenGraph + ?Sized>(
    graph: &G,
    paths: &[TreePath],
    scope: CycleScope,
) -> Result<()> {
    let mut edges: HashMap<&TreePath, Vec<&TreePath>> = HashMap::with_capacity(paths.len());
    for path in paths {
        if let Some(entry) = graph.token_entry(path) {
            let mut targets: Vec<&TreePath> = Vec::new();
            for target in entry.value.alias_targets() {
                if graph.token_entry(target).is_some() && !targets.contains(&target) {
                    targets.push(target);
                }
            }
            edges.insert(path, targets);
        }
    }

    fn visit<'a>(
        node: &'a TreePath,
        edges: &HashMap<&'a TreePath, Vec<&'a TreePath>>,
        state: &mut HashMap<&'a TreePath, Visit>,
    ) -> bool {
        match state.get(node) {
            Some(Visit::InProgress) => return true,
            Some(Visit::Done) => return false,
            None => {}
        }
        state.insert(node, Visit::InProgress);
        if let Some(targets) = edges.get(node) {
            for &target in targets {
                if visit(target, edges, state) {
                    return true;
                }
            }
        }
        state.insert(node, Visit::Done);
        false
    }

    let mut state: HashMap<&TreePath, Visit> = HashMap::with_capacity(paths.len());
    for path in paths {
        if visit(path, &edges, &mut state) {
            return Err(SdtfError::CircularAlias { scope });
        }
    }
    Ok(())
}

fn primitive_lookup<'a>(
    parts: &'a TokenRawValueParts,
    mode: &'a str,
) -> impl Fn(&[ValueSegment]) -> Option<Value> + 'a {
    move |segments: &[ValueSegment]| match parts.get(mode, &ValuePath::new(segments.to_vec())) {
        Some(RawValuePart::Primitive { value, .. }) => Some(value.clone()),
        _ => None,
    }
}

fn check_alias_types<G: TokenGraph + ?Sized>(
    graph: &G,
    paths: &[TreePath],
    registry: &dyn TokenTypeRegistry,
) -> Result<()> {
    for path in paths {
        let Some(entry) = graph.token_entry(path) else {
            continue;
        };
        match entry.value {
            TokenValue::TopLevelAlias { target } => {
                let Some(target_entry) = graph.token_entry(target) else {
                    continue;
                };
                let outcome =
                    registry.match_type_at(target_entry.token_type, entry.token_type, &[], None)?;
                mismatch(path, target, target_entry.token_type, outcome)?;
            }
            TokenValue::Modes(parts) => {
                for part in parts.aliases() {
                    let RawValuePart::Alias {
                        mode,
                        value_path,
                        target,
                        ..
                    } = part
                    else {
                        continue;
                    };
                    let Some(target_entry) = graph.token_entry(target) else {
                        continue;
                    };
                    let lookup = primitive_lookup(parts, mode);
                    let outcome = registry.match_type_at(
                        target_entry.token_type,
                        entry.token_type,
                        value_path.segments(),
                        Some(&lookup),
                    )?;
                    mismatch(path, target, target_entry.token_type, outcome)?;
                }
            }
        }
    }
    Ok(())
}

fn mismatch(token: &TreePath, alias: &TreePath, actual: &str, outcome: MatchOutcome) -> Result<()> {
    match outcome {
        MatchOutcome::Success => Ok(()),
        MatchOutcome::Failure { expected_type } => Err(SdtfError::AliasTypeMismatch {
            alias: alias.clone(),
            token: token.clone(),
            actual: actual.to_string(),
            expected: expected_type,
        }),
    }
}

fn target_resolvable<G: TokenGraph + ?Sized>(
    graph: &G,
    computed_modes: &ComputedModesCache,
    target: &TreePath,
    target_mode: Option<&str>,
) -> bool {
    if graph.token_entry(target).is_none() {
        return false;
    }
    match target_mode {
        None => true,
        Some(mode) => computed_modes
            .get(target)
            .map(|modes| modes.contains(mode))
            .unwrap_or(false),
    }
}

fn collect_references<G: TokenGraph + ?Sized>(
    graph: &G,
    paths: &[TreePath],
    computed_modes: &ComputedModesCache,
) -> Vec<AliasReference> {
    let mut out = Vec::new();
    for path in paths {
        let Some(entry) = graph.token_entry(path) else {
            continue;
        };
        match entry.value {
            TokenValue::TopLevelAlias { target } => out.push(AliasReference {
                from: AliasFrom {
                    tree_path: path.clone(),
                    value_path: ValuePath::mode_level(),
                    mode: None,
                },
                to: AliasTo {
                    tree_path: target.clone(),
                    mode: None,
                },
                is_resolvable: target_resolvable(graph, computed_modes, target, None),
            }),
            TokenValue::Modes(parts) => {
                for part in parts.aliases() {
                    if let RawValuePart::Alias {
                        mode,
                        value_path,
                        target,
                        target_mode,
                    } = part
                    {
                        out.push(AliasReference {
                            from: AliasFrom {
                                tree_path: path.clone(),
                                value_path: value_path.clone(),
                                mode: Some(mode.clone()),
                            },
                            to: AliasTo {
                                tree_path: target.clone(),
                                mode: Some(target_mode.clone()),
                            },
                            is_resolvable: target_resolvable(
                                graph,
                                computed_modes,
                                target,
                                Some(target_mode),
                            ),
                        });
                    }
                }
            }
        }
    }
    out
}

fn check_mode_coherence<G: TokenGraph + ?Sized>(
    graph: &G,
    paths: &[TreePath],
    computed_modes: &ComputedModesCache,
) -> Result<()> {
    for path in paths {
        let Some((collection, allowed)) = graph.owning_collection(path) else {
            continue;
        };
        let modes = match computed_modes.get(path) {
            Some(ComputedModes::Resolved(modes)) => modes,
            _ => {
                return Err(SdtfError::UnresolvableModes {
                    token: path.clone(),
                    collection: collection.clone(),
                })
            }
        };
        let same = modes.len() == allowed.len() && modes.iter().all(|m| allowed.contains(m));
        if !same {
            return Err(SdtfError::ModeCoherence {
                token: path.clone(),
                collection: collection.clone(),
                token_modes: modes.clone(),
                collection_modes: allowed.to_vec(),
            });
        }
    }
    Ok(())
}

struct FlagResolver<'a, G: ?Sized> {
    graph: &'a G,
    computed_modes: &'a ComputedModesCache,
    memo: HashMap<(TreePath, String), bool>,
}

impl<G: TokenGraph + ?Sized> FlagResolver<'_, G> {
    fn token(&mut self, path: &TreePath) -> TokenResolvability {
        let computed_modes = self.computed_modes;
        let Some(ComputedModes::Resolved(modes)) = computed_modes.get(path) else {
            return TokenResolvability::default();
        };
        let mut flags = IndexMap::with_capacity(modes.len());
        for mode in modes {
            flags.insert(mode.clone(), self.mode(path, mode));
        }
        let is_fully_resolvable = flags.values().all(|ok| *ok);
        TokenResolvability {
            modes: flags,
            is_fully_resolvable,
        }
    }

    fn mode(&mut self, path: &TreePath, mode: &str) -> bool {
        let key = (path.clone(), mode.to_string());
        if let Some(known) = self.memo.get(&key) {
            return *known;
        }
        let graph = self.graph;
        let computed_modes = self.computed_modes;
        let result = match graph.token_entry(path) {
            None => false,
            Some(entry) => match entry.value {
                TokenValue::TopLevelAlias { target } => {
                    target_resolvable(graph, computed_modes, target, Some(mode))
                        && self.mode(target, mode)
                }
                TokenValue::Modes(parts) => {
                    let mut ok = parts.has_mode(mode);
                    for part in parts.parts_for_mode(mode) {
                        if let RawValuePart::Alias {
                            target,
                            target_mode,
                            ..
                        } = part
                        {
                            ok = ok
                                && target_resolvable(
                                    graph,
                                    computed_modes,
                                    target,
                                    Some(target_mode),
                                )
                                && self.mode(target, target_mode);
                        }
                    }
                    ok
                }
            },
        };
        self.memo.insert(key, result);
        result
    }
}
